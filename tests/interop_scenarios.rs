//! End-to-end interop scenarios through the public API.

use chain_node::core::transaction::Transaction;
use chain_node::network::record::{SUCCESS, send_record_transaction};
use chain_node::network::txpool::{TransactionSink, TxPool};
use chain_node::types::hash::Hash;
use chain_node::virtual_machine::engine::{ExecutionEngine, VMState};
use chain_node::virtual_machine::errors::VMError;
use chain_node::virtual_machine::interop::{InteropService, InteropServiceBuilder, Syscall};
use chain_node::virtual_machine::isa::Instruction;
use chain_node::virtual_machine::script_builder::ScriptBuilder;
use chain_node::virtual_machine::script_table::ContractTable;
use chain_node::virtual_machine::stack_item::{ScriptContainer, StackItem};
use serde_json::json;
use std::sync::Arc;

fn engine(service: &Arc<InteropService>, scripts: &[&[u8]]) -> ExecutionEngine {
    let container: Arc<dyn ScriptContainer> =
        Arc::new(Transaction::record("record", b"scenario".as_slice()));
    let mut engine = ExecutionEngine::new(container, Arc::clone(service));
    for script in scripts {
        engine.load_script(*script).unwrap();
    }
    engine
}

#[test]
fn entry_hash_of_single_context() {
    let service = Arc::new(InteropService::with_builtins());
    let code: &[u8] = &[0x00, 0x30];
    let mut engine = engine(&service, &[code]);

    service
        .dispatch("System.ExecutionEngine.GetEntryScriptHash", &mut engine)
        .unwrap();
    assert_eq!(
        engine.evaluation_stack(),
        &[StackItem::from(Hash::digest(code))]
    );
}

#[test]
fn three_contexts_addressed_from_the_top() {
    let service = Arc::new(InteropService::with_builtins());
    let (c1, c2, c3): (&[u8], &[u8], &[u8]) = (&[0x01, 1, 0xc1], &[0x01, 1, 0xc2], &[0x01, 1, 0xc3]);
    let mut engine = engine(&service, &[c1, c2, c3]);

    service
        .dispatch(Syscall::GetCallingScriptHash.name(), &mut engine)
        .unwrap();
    service
        .dispatch(Syscall::GetEntryScriptHash.name(), &mut engine)
        .unwrap();
    service
        .dispatch(Syscall::GetExecutingScriptHash.name(), &mut engine)
        .unwrap();

    assert_eq!(
        engine.evaluation_stack(),
        &[
            StackItem::from(Hash::digest(c2)),
            StackItem::from(Hash::digest(c1)),
            StackItem::from(Hash::digest(c3)),
        ]
    );
}

#[test]
fn unregistered_name_is_not_supported() {
    let service = Arc::new(InteropService::with_builtins());
    let mut engine = engine(&service, &[&[0x00]]);
    engine.push(StackItem::Integer(1));
    engine.push(StackItem::Boolean(true));

    let err = service.dispatch("Foo.Bar", &mut engine).unwrap_err();
    assert!(matches!(err, VMError::NotSupportService { ref name } if name == "Foo.Bar"));
    assert_eq!(
        engine.evaluation_stack(),
        &[StackItem::Integer(1), StackItem::Boolean(true)]
    );
}

#[test]
fn extension_layered_over_builtins() {
    let mut extensions = InteropServiceBuilder::new();
    extensions.register_handler("Node.Answer", |engine: &mut ExecutionEngine| {
        engine.push(StackItem::Integer(42));
        Ok(())
    });
    extensions.register_handler(Syscall::GetEntryScriptHash.name(), |_: &mut ExecutionEngine| {
        Err(VMError::Handler("shadowed".into()))
    });

    let mut builder = InteropServiceBuilder::with_builtins();
    builder.merge(extensions.service_map());
    let service = Arc::new(builder.build());
    assert_eq!(service.len(), 5);

    let script = ScriptBuilder::new()
        .syscall("Node.Answer")
        .unwrap()
        .syscall(Syscall::GetEntryScriptHash.name())
        .unwrap()
        .to_bytes();
    let mut engine = engine(&service, &[script.as_slice()]);
    engine.run().unwrap();

    assert_eq!(
        engine.evaluation_stack(),
        &[StackItem::Integer(42), StackItem::from(Hash::digest(&script))]
    );
}

#[test]
fn record_transaction_container_reaches_scripts() {
    let pool = TxPool::default();
    let cmd = json!({
        "CAkey": "key",
        "RecordData": { "Data": { "Text": "hello" }, "SeqNo": "1", "Timestamp": 0 }
    });
    let resp = send_record_transaction(&cmd, &pool);
    assert_eq!(resp.error, SUCCESS);

    let tx = pool.transactions().remove(0);
    assert_eq!(resp.result, tx.hash().to_hex());
    assert!(pool.submit(tx.clone()).is_err());

    let container: Arc<dyn ScriptContainer> = Arc::new(tx);
    let service = Arc::new(InteropService::with_builtins());
    let mut engine = ExecutionEngine::new(Arc::clone(&container), service);
    engine
        .load_script(
            ScriptBuilder::new()
                .syscall(Syscall::GetScriptContainer.name())
                .unwrap()
                .to_bytes(),
        )
        .unwrap();
    engine.run().unwrap();

    let pushed = engine.evaluation_stack()[0].as_container().unwrap();
    assert!(Arc::ptr_eq(pushed, &container));
    assert_eq!(pushed.hash().to_hex(), resp.result);
}

/// Guard contract: faults unless the caller is the hash on top of the stack.
fn guarded_call(table: &ContractTable, honest: bool) -> Vec<u8> {
    let guard = table.deploy(
        ScriptBuilder::new()
            .syscall(Syscall::GetCallingScriptHash.name())
            .unwrap()
            .emit(Instruction::Equal)
            .emit(Instruction::ThrowIfNot)
            .to_bytes(),
    );
    let builder = if honest {
        ScriptBuilder::new()
            .syscall(Syscall::GetExecutingScriptHash.name())
            .unwrap()
    } else {
        ScriptBuilder::new().push_data(&[0u8; 32]).unwrap()
    };
    builder.app_call(&guard).to_bytes()
}

#[tokio::test]
async fn concurrent_engines_share_one_registry() {
    let service = Arc::new(InteropService::with_builtins());
    let table = Arc::new(ContractTable::new());

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let service = Arc::clone(&service);
        let table = Arc::clone(&table);
        handles.push(tokio::task::spawn_blocking(move || {
            let honest = i % 2 == 0;
            let entry = guarded_call(&table, honest);
            let container: Arc<dyn ScriptContainer> =
                Arc::new(Transaction::record("record", vec![i; 4]));
            let mut engine = ExecutionEngine::new(container, service).with_script_table(table);
            engine.load_script(entry).unwrap();
            let result = engine.run();
            (honest, result.is_ok(), engine.state())
        }));
    }

    for handle in handles {
        let (honest, ok, state) = handle.await.unwrap();
        assert_eq!(ok, honest);
        assert_eq!(state, if honest { VMState::Halt } else { VMState::Fault });
    }
    assert_eq!(table.len(), 1);
}
