//! Interop service registry: the host functions reachable through `SYSCALL`.
//!
//! Configuration goes through [`InteropServiceBuilder`], which registers
//! services (first registration of a name wins, later ones are rejected) and
//! merges other tables without overwriting existing names. [`build`] freezes
//! the table into an [`InteropService`] that is shared read-only, usually as
//! an `Arc`, by every engine running under that configuration.
//!
//! Services known at compile time are the closed [`Syscall`] set and dispatch
//! through a `match`; anything else is an [`Service::Extension`] closure.
//!
//! [`build`]: InteropServiceBuilder::build

use crate::debug;
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::{InteropError, VMError};
use crate::virtual_machine::stack_item::StackItem;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

/// Host function exposed to scripts.
///
/// Gets mutable access to the engine for exactly one dispatch and must not
/// keep anything borrowed from it.
pub type InteropHandler = Arc<dyn Fn(&mut ExecutionEngine) -> Result<(), VMError> + Send + Sync>;

/// Method name to service table.
pub type ServiceMap = HashMap<String, Service>;

/// Built-in system calls exposing script-container and script-identity data.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Syscall {
    /// Pushes the script container as an interop item.
    GetScriptContainer,
    /// Pushes the code hash of the current context.
    GetExecutingScriptHash,
    /// Pushes the code hash of the context that called the current one.
    GetCallingScriptHash,
    /// Pushes the code hash of the outermost context.
    GetEntryScriptHash,
}

impl Syscall {
    pub const ALL: [Syscall; 4] = [
        Syscall::GetScriptContainer,
        Syscall::GetExecutingScriptHash,
        Syscall::GetCallingScriptHash,
        Syscall::GetEntryScriptHash,
    ];

    /// Registered method name.
    pub const fn name(&self) -> &'static str {
        match self {
            Syscall::GetScriptContainer => "System.ExecutionEngine.GetScriptContainer",
            Syscall::GetExecutingScriptHash => "System.ExecutionEngine.GetExecutingScriptHash",
            Syscall::GetCallingScriptHash => "System.ExecutionEngine.GetCallingScriptHash",
            Syscall::GetEntryScriptHash => "System.ExecutionEngine.GetEntryScriptHash",
        }
    }

    pub fn from_name(name: &str) -> Option<Syscall> {
        Syscall::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Runs the call against `engine`, pushing exactly one item on success.
    ///
    /// Context failures propagate before anything is pushed.
    pub fn invoke(self, engine: &mut ExecutionEngine) -> Result<(), VMError> {
        let item = match self {
            Syscall::GetScriptContainer => {
                StackItem::Interop(Arc::clone(engine.script_container()))
            }
            Syscall::GetExecutingScriptHash => engine.current_context()?.code_hash().into(),
            Syscall::GetCallingScriptHash => engine.calling_context()?.code_hash().into(),
            Syscall::GetEntryScriptHash => engine.entry_context()?.code_hash().into(),
        };
        engine.push(item);
        Ok(())
    }
}

/// A registry entry.
#[derive(Clone)]
pub enum Service {
    Builtin(Syscall),
    Extension(InteropHandler),
}

impl Service {
    /// Wraps a closure as an extension service.
    pub fn handler<F>(f: F) -> Service
    where
        F: Fn(&mut ExecutionEngine) -> Result<(), VMError> + Send + Sync + 'static,
    {
        Service::Extension(Arc::new(f))
    }

    fn invoke(&self, engine: &mut ExecutionEngine) -> Result<(), VMError> {
        match self {
            Service::Builtin(syscall) => syscall.invoke(engine),
            Service::Extension(handler) => handler(engine),
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Builtin(s) => f.debug_tuple("Builtin").field(s).finish(),
            Service::Extension(_) => f.write_str("Extension(..)"),
        }
    }
}

/// Mutable interop table used while a VM configuration is being assembled.
#[derive(Debug, Default, Clone)]
pub struct InteropServiceBuilder {
    services: ServiceMap,
}

impl InteropServiceBuilder {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Creates a table holding every [`Syscall`] under its documented name.
    pub fn with_builtins() -> Self {
        let mut builder = Self::new();
        for syscall in Syscall::ALL {
            builder.register(syscall.name(), Service::Builtin(syscall));
        }
        builder
    }

    /// Inserts `service` under `name` unless the name is taken.
    ///
    /// Returns whether the insertion happened. A rejected call leaves the
    /// existing entry untouched.
    pub fn register(&mut self, name: impl Into<String>, service: Service) -> bool {
        match self.services.entry(name.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(service);
                true
            }
        }
    }

    /// [`register`](Self::register) for a plain closure.
    pub fn register_handler<F>(&mut self, name: impl Into<String>, f: F) -> bool
    where
        F: Fn(&mut ExecutionEngine) -> Result<(), VMError> + Send + Sync + 'static,
    {
        self.register(name, Service::handler(f))
    }

    /// Like [`register`](Self::register), but a taken name is a configuration error.
    pub fn try_register(
        &mut self,
        name: impl Into<String>,
        service: Service,
    ) -> Result<&mut Self, InteropError> {
        let name = name.into();
        if self.services.contains_key(&name) {
            return Err(InteropError::DuplicateService(name));
        }
        self.services.insert(name, service);
        Ok(self)
    }

    /// Adds every entry of `other` whose name is not registered yet.
    ///
    /// Entries already present in `self` win, so an extension table can
    /// never shadow a built-in.
    pub fn merge(&mut self, other: &ServiceMap) -> &mut Self {
        for (name, service) in other {
            if !self.services.contains_key(name) {
                self.services.insert(name.clone(), service.clone());
            }
        }
        self
    }

    /// Read-only view of the table under construction.
    pub fn service_map(&self) -> &ServiceMap {
        &self.services
    }

    /// Freezes the table.
    pub fn build(self) -> InteropService {
        InteropService {
            services: self.services,
        }
    }
}

/// Frozen interop table. Immutable, `Send + Sync`, safe for any number of
/// concurrent readers.
#[derive(Debug, Clone)]
pub struct InteropService {
    services: ServiceMap,
}

impl Default for InteropService {
    fn default() -> Self {
        InteropService::with_builtins()
    }
}

impl InteropService {
    pub fn builder() -> InteropServiceBuilder {
        InteropServiceBuilder::new()
    }

    /// Table with only the built-in system calls.
    pub fn with_builtins() -> Self {
        InteropServiceBuilder::with_builtins().build()
    }

    /// Runs the service registered as `name` against `engine`.
    ///
    /// An unknown name fails with [`VMError::NotSupportService`] without
    /// touching the engine; otherwise the handler's result is returned as is.
    pub fn dispatch(&self, name: &str, engine: &mut ExecutionEngine) -> Result<(), VMError> {
        let Some(service) = self.services.get(name) else {
            return Err(VMError::NotSupportService {
                name: name.to_string(),
            });
        };
        debug!("invoke interop service {name}");
        service.invoke(engine)
    }

    /// Read-only view of the registered services.
    pub fn service_map(&self) -> &ServiceMap {
        &self.services
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::bytes::Bytes;
    use crate::virtual_machine::engine::tests::{engine_with_scripts, test_container};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn marker(value: i64) -> Service {
        Service::handler(move |engine: &mut ExecutionEngine| {
            engine.push(StackItem::Integer(value));
            Ok(())
        })
    }

    fn top(engine: &ExecutionEngine) -> Option<&StackItem> {
        engine.evaluation_stack().last()
    }

    #[test]
    fn builtin_names_roundtrip() {
        for syscall in Syscall::ALL {
            assert_eq!(Syscall::from_name(syscall.name()), Some(syscall));
        }
        assert_eq!(Syscall::from_name("System.ExecutionEngine.getentryscripthash"), None);
    }

    #[test]
    fn register_new_name_then_dispatch_invokes_it() {
        let mut builder = InteropServiceBuilder::new();
        assert!(builder.register("Test.Marker", marker(7)));
        let service = builder.build();

        let mut engine = engine_with_scripts(&[&[0x00]]);
        service.dispatch("Test.Marker", &mut engine).unwrap();
        assert_eq!(top(&engine), Some(&StackItem::Integer(7)));
    }

    #[test]
    fn second_registration_is_rejected_and_first_handler_kept() {
        let mut builder = InteropServiceBuilder::new();
        assert!(builder.register("Test.Marker", marker(1)));
        assert!(!builder.register("Test.Marker", marker(2)));
        let service = builder.build();

        let mut engine = engine_with_scripts(&[&[0x00]]);
        service.dispatch("Test.Marker", &mut engine).unwrap();
        assert_eq!(engine.evaluation_stack(), &[StackItem::Integer(1)]);
    }

    #[test]
    fn builtins_cannot_be_replaced() {
        let mut builder = InteropServiceBuilder::with_builtins();
        assert!(!builder.register(Syscall::GetEntryScriptHash.name(), marker(9)));
        assert!(matches!(
            builder.service_map().get(Syscall::GetEntryScriptHash.name()),
            Some(Service::Builtin(Syscall::GetEntryScriptHash))
        ));
    }

    #[test]
    fn frozen_registry_knows_its_names() {
        let mut builder = InteropServiceBuilder::with_builtins();
        builder.register("Test.Extra", marker(1));
        let service = builder.build();

        assert!(service.contains(Syscall::GetCallingScriptHash.name()));
        assert!(service.contains("Test.Extra"));
        assert!(!service.contains("Test.Missing"));
        assert!(!service.contains("system.executionengine.getentryscripthash"));
    }

    #[test]
    fn try_register_duplicate_is_config_error() {
        let mut builder = InteropServiceBuilder::with_builtins();
        let err = builder
            .try_register(Syscall::GetScriptContainer.name(), marker(0))
            .unwrap_err();
        assert_eq!(
            err,
            InteropError::DuplicateService(Syscall::GetScriptContainer.name().to_string())
        );
        assert!(builder.try_register("Test.New", marker(0)).is_ok());
    }

    #[test]
    fn merge_keeps_existing_entries() {
        let mut base = InteropServiceBuilder::new();
        base.register("X", marker(1));

        let mut ext = InteropServiceBuilder::new();
        ext.register("X", marker(2));
        ext.register("Y", marker(3));

        base.merge(ext.service_map());
        let service = base.build();
        assert_eq!(service.len(), 2);

        let mut engine = engine_with_scripts(&[&[0x00]]);
        service.dispatch("X", &mut engine).unwrap();
        service.dispatch("Y", &mut engine).unwrap();
        assert_eq!(
            engine.evaluation_stack(),
            &[StackItem::Integer(1), StackItem::Integer(3)]
        );
    }

    #[test]
    fn dispatch_unknown_name_leaves_engine_untouched() {
        let service = InteropService::with_builtins();
        let mut engine = engine_with_scripts(&[&[0x00]]);
        engine.push(StackItem::Integer(5));

        let err = service.dispatch("Foo.Bar", &mut engine).unwrap_err();
        assert_eq!(
            err,
            VMError::NotSupportService {
                name: "Foo.Bar".to_string()
            }
        );
        assert_eq!(engine.evaluation_stack(), &[StackItem::Integer(5)]);
        assert_eq!(engine.invocation_depth(), 1);
    }

    #[test]
    fn dispatch_returns_handler_error_unchanged() {
        let mut builder = InteropServiceBuilder::new();
        builder.register_handler("Test.Fail", |_engine: &mut ExecutionEngine| {
            Err(VMError::Handler("boom".into()))
        });
        let service = builder.build();

        let mut engine = engine_with_scripts(&[&[0x00]]);
        assert_eq!(
            service.dispatch("Test.Fail", &mut engine),
            Err(VMError::Handler("boom".into()))
        );
    }

    #[test]
    fn handler_runs_once_per_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut builder = InteropServiceBuilder::new();
        builder.register_handler("Test.Count", move |_engine: &mut ExecutionEngine| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let service = builder.build();

        let mut engine = engine_with_scripts(&[&[0x00]]);
        service.dispatch("Test.Count", &mut engine).unwrap();
        service.dispatch("Test.Count", &mut engine).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn script_container_is_pushed_by_identity() {
        let service = InteropService::with_builtins();
        let mut engine = engine_with_scripts(&[&[0x00]]);
        service
            .dispatch(Syscall::GetScriptContainer.name(), &mut engine)
            .unwrap();

        let pushed = top(&engine).and_then(StackItem::as_container).unwrap();
        assert!(Arc::ptr_eq(pushed, engine.script_container()));
        assert_eq!(pushed.hash(), test_container().hash());
    }

    #[test]
    fn executing_equals_entry_at_depth_one() {
        let service = InteropService::with_builtins();
        let mut engine = engine_with_scripts(&[&[0x00, 0x30]]);
        service
            .dispatch(Syscall::GetExecutingScriptHash.name(), &mut engine)
            .unwrap();
        service
            .dispatch(Syscall::GetEntryScriptHash.name(), &mut engine)
            .unwrap();

        let stack = engine.evaluation_stack();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack[0], stack[1]);
        assert_eq!(
            stack[0],
            StackItem::ByteArray(Bytes::new(
                crate::types::hash::Hash::digest(&[0x00, 0x30]).to_vec()
            ))
        );
    }

    #[test]
    fn calling_hash_needs_a_caller() {
        let service = InteropService::with_builtins();
        let mut engine = engine_with_scripts(&[&[0x00]]);
        assert_eq!(
            service.dispatch(Syscall::GetCallingScriptHash.name(), &mut engine),
            Err(VMError::InsufficientDepth {
                required: 2,
                actual: 1
            })
        );
        assert!(engine.evaluation_stack().is_empty());
    }

    #[test]
    fn three_level_addressing() {
        let c1: &[u8] = &[0x00, 0x01];
        let c2: &[u8] = &[0x00, 0x02];
        let c3: &[u8] = &[0x00, 0x03];
        let service = InteropService::with_builtins();
        let mut engine = engine_with_scripts(&[c1, c2, c3]);

        for syscall in [
            Syscall::GetCallingScriptHash,
            Syscall::GetEntryScriptHash,
            Syscall::GetExecutingScriptHash,
        ] {
            service.dispatch(syscall.name(), &mut engine).unwrap();
        }

        let hash = |code: &[u8]| StackItem::from(crate::types::hash::Hash::digest(code));
        assert_eq!(engine.evaluation_stack(), &[hash(c2), hash(c1), hash(c3)]);
    }

    #[test]
    fn context_handlers_fail_on_empty_stack() {
        let service = InteropService::with_builtins();
        let mut engine = engine_with_scripts(&[]);
        for syscall in [Syscall::GetExecutingScriptHash, Syscall::GetEntryScriptHash] {
            assert_eq!(
                service.dispatch(syscall.name(), &mut engine),
                Err(VMError::EmptyInvocationStack)
            );
        }
        assert!(engine.evaluation_stack().is_empty());
    }

    #[test]
    fn service_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InteropService>();
        assert_send_sync::<ExecutionEngine>();
    }
}
