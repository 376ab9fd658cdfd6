//! Stack-based execution engine.
//!
//! The engine owns an invocation stack of [`ExecutionContext`]s (bottom =
//! entry script, top = current script) and an evaluation stack of
//! [`StackItem`]s. It runs scripts until the invocation stack is empty and
//! hands `SYSCALL`s to the shared [`InteropService`].

use crate::config::EngineLimits;
use crate::types::bytes::Bytes;
use crate::types::hash::{HASH_LEN, Hash};
use crate::virtual_machine::context::ExecutionContext;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::interop::InteropService;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::script_table::ScriptTable;
use crate::virtual_machine::stack_item::{ScriptContainer, StackItem};
use crate::warn;
use std::sync::Arc;


/// Outcome of the last [`ExecutionEngine::run`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VMState {
    /// Not run yet, or still running.
    None,
    /// Every context returned normally.
    Halt,
    /// Execution aborted with an error.
    Fault,
}

/// One script execution: stacks, container and the configuration it runs under.
///
/// Engines are never shared; run as many as needed in parallel, each with
/// its own container, all pointing at the same `Arc<InteropService>`.
pub struct ExecutionEngine {
    invocation_stack: Vec<ExecutionContext>,
    evaluation_stack: Vec<StackItem>,
    script_container: Arc<dyn ScriptContainer>,
    service: Arc<InteropService>,
    table: Option<Arc<dyn ScriptTable>>,
    limits: EngineLimits,
    state: VMState,
}

impl ExecutionEngine {
    /// Creates an idle engine for `container` with default limits and no contract table.
    pub fn new(container: Arc<dyn ScriptContainer>, service: Arc<InteropService>) -> Self {
        Self {
            invocation_stack: Vec::new(),
            evaluation_stack: Vec::new(),
            script_container: container,
            service,
            table: None,
            limits: EngineLimits::default(),
            state: VMState::None,
        }
    }

    /// Attaches the contract table used by `APPCALL`.
    pub fn with_script_table(mut self, table: Arc<dyn ScriptTable>) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Pushes a new context running `script` on top of the invocation stack.
    pub fn load_script(&mut self, script: impl Into<Bytes>) -> Result<(), VMError> {
        let depth = self.invocation_stack.len();
        if depth >= self.limits.max_invocation_depth {
            return Err(VMError::InvocationDepthExceeded {
                limit: self.limits.max_invocation_depth,
            });
        }
        self.invocation_stack
            .push(ExecutionContext::new(script.into(), depth));
        Ok(())
    }

    /// Context whose code is executing (top of the invocation stack).
    pub fn current_context(&self) -> Result<&ExecutionContext, VMError> {
        self.invocation_stack
            .last()
            .ok_or(VMError::EmptyInvocationStack)
    }

    /// Context that called the current one.
    ///
    /// Fails with [`VMError::InsufficientDepth`] when the current context is
    /// the entry: a script without a caller cannot ask for one.
    pub fn calling_context(&self) -> Result<&ExecutionContext, VMError> {
        let depth = self.invocation_stack.len();
        if depth < 2 {
            return Err(VMError::InsufficientDepth {
                required: 2,
                actual: depth,
            });
        }
        Ok(&self.invocation_stack[depth - 2])
    }

    /// Outermost context of this execution.
    pub fn entry_context(&self) -> Result<&ExecutionContext, VMError> {
        self.invocation_stack
            .first()
            .ok_or(VMError::EmptyInvocationStack)
    }

    pub fn invocation_depth(&self) -> usize {
        self.invocation_stack.len()
    }

    pub fn evaluation_stack(&self) -> &[StackItem] {
        &self.evaluation_stack
    }

    pub fn script_container(&self) -> &Arc<dyn ScriptContainer> {
        &self.script_container
    }

    pub fn interop_service(&self) -> &Arc<InteropService> {
        &self.service
    }

    pub fn state(&self) -> VMState {
        self.state
    }

    /// Pushes a value onto the evaluation stack.
    pub fn push(&mut self, item: StackItem) {
        self.evaluation_stack.push(item);
    }

    /// Pops the top value, failing on an empty stack.
    pub fn pop(&mut self, instruction: &'static str) -> Result<StackItem, VMError> {
        self.evaluation_stack
            .pop()
            .ok_or(VMError::StackUnderflow { instruction })
    }

    fn peek(&self, instruction: &'static str) -> Result<&StackItem, VMError> {
        self.evaluation_stack
            .last()
            .ok_or(VMError::StackUnderflow { instruction })
    }

    fn current_mut(&mut self) -> Result<&mut ExecutionContext, VMError> {
        self.invocation_stack
            .last_mut()
            .ok_or(VMError::EmptyInvocationStack)
    }

    /// Runs until every context has returned or an instruction fails.
    ///
    /// On failure the engine is left in [`VMState::Fault`] with its stacks as
    /// they were at the failing instruction.
    pub fn run(&mut self) -> Result<(), VMError> {
        self.state = VMState::None;
        while !self.invocation_stack.is_empty() {
            if let Err(e) = self.step() {
                self.state = VMState::Fault;
                warn!(
                    "execution for container {} faulted: {e}",
                    self.script_container.hash()
                );
                return Err(e);
            }
        }
        self.state = VMState::Halt;
        Ok(())
    }

    /// Executes one instruction of the current context.
    ///
    /// Running off the end of a script returns from it.
    pub fn step(&mut self) -> Result<(), VMError> {
        let ctx = self.current_mut()?;
        if ctx.at_end() {
            self.invocation_stack.pop();
            return Ok(());
        }

        let offset = ctx.instruction_pointer();
        let opcode = ctx.read_u8()?;
        let instr = Instruction::try_from(opcode)
            .map_err(|_| VMError::InvalidInstruction { opcode, offset })?;
        self.exec(instr, offset)?;

        let size = self.evaluation_stack.len();
        if size > self.limits.max_stack_size {
            return Err(VMError::StackOverflow {
                size,
                limit: self.limits.max_stack_size,
            });
        }
        Ok(())
    }

    fn exec(&mut self, instr: Instruction, offset: usize) -> Result<(), VMError> {
        let name = instr.mnemonic();
        match instr {
            Instruction::Nop => {}
            Instruction::PushData => {
                let ctx = self.current_mut()?;
                let len = ctx.read_u8()? as usize;
                let data = Bytes::new(ctx.read_exact(len)?);
                self.push(StackItem::ByteArray(data));
            }
            Instruction::PushInt => {
                let bytes = self.read_array::<8>()?;
                self.push(StackItem::Integer(i64::from_le_bytes(bytes)));
            }
            Instruction::Dup => {
                let top = self.peek(name)?.clone();
                self.push(top);
            }
            Instruction::Drop => {
                self.pop(name)?;
            }
            Instruction::Equal => {
                let b = self.pop(name)?;
                let a = self.pop(name)?;
                let equal = match (&a, &b) {
                    (StackItem::Interop(_), _) | (_, StackItem::Interop(_)) => a == b,
                    _ => a.to_bytes(name)? == b.to_bytes(name)?,
                };
                self.push(StackItem::Boolean(equal));
            }
            Instruction::ThrowIfNot => {
                if !self.pop(name)?.as_bool() {
                    return Err(VMError::AssertionFailed { offset });
                }
            }
            Instruction::Ret => {
                self.invocation_stack.pop();
            }
            Instruction::AppCall => {
                let hash = Hash(self.read_array::<HASH_LEN>()?);
                let script = self
                    .table
                    .as_ref()
                    .ok_or(VMError::NoScriptTable)?
                    .get_script(&hash)
                    .ok_or(VMError::UnknownContract { hash })?;
                self.load_script(script)?;
            }
            Instruction::Syscall => {
                let ctx = self.current_mut()?;
                let len = ctx.read_u8()? as usize;
                let method = std::str::from_utf8(ctx.read_exact(len)?)
                    .map_err(|_| VMError::InvalidSyscallName)?
                    .to_string();
                let service = Arc::clone(&self.service);
                service.dispatch(&method, self)?;
            }
        }
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], VMError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.current_mut()?.read_exact(N)?);
        Ok(out)
    }
}
