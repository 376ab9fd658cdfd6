//! Command-line front end for the contract engine and node diagnostics.
//!
//! # Usage
//! ```text
//! chain_node run <script-hex> [--record <text>]
//! chain_node disasm <script-hex>
//! chain_node info
//! ```
//!
//! # Commands
//! - `run`: Executes the script with the built-in interop services, using a
//!   record transaction as script container, and prints the final state and
//!   evaluation stack. Exits with status 1 on fault.
//! - `disasm`: Prints one line per instruction.
//! - `info`: Prints the diagnostics page of this node.
//!
//! Configuration is read from `CHAIN_NODE_*` environment variables.

use chain_node::config::NodeConfig;
use chain_node::core::transaction::Transaction;
use chain_node::network::nodeinfo::{LedgerView, Neighbor, NodeView, build_page_info, render_page};
use chain_node::types::bytes::Bytes;
use chain_node::types::hash::Hash;
use chain_node::utils::log::set_max_level;
use chain_node::virtual_machine::engine::ExecutionEngine;
use chain_node::virtual_machine::interop::InteropService;
use chain_node::virtual_machine::script_builder::disassemble;
use chain_node::virtual_machine::stack_item::StackItem;
use chain_node::{error, info};
use std::env;
use std::process;
use std::sync::Arc;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(program_name(&args));
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let config = NodeConfig::from_env().unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    });
    set_max_level(config.log_level);

    match args[1].as_str() {
        "run" => run(&args, &config),
        "disasm" => {
            let script = script_arg(&args);
            match disassemble(&script) {
                Ok(text) => print!("{text}"),
                Err(e) => {
                    error!("Disassembly failed: {e}");
                    process::exit(1);
                }
            }
        }
        "info" => {
            let node = StandaloneNode::new(&config);
            println!("{}", render_page(&build_page_info(&config, &node, &node)));
        }
        other => {
            error!("Unexpected command: {}\n", other);
            print_usage(program_name(&args));
            process::exit(1);
        }
    }
}

fn run(args: &[String], config: &NodeConfig) {
    let script = script_arg(args);
    let mut record = String::from("cli");

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--record" | "-r") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                record = args[i].clone();
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(program_name(args));
                process::exit(1);
            }
        }
    }

    let container = Arc::new(Transaction::record("record", record.into_bytes()));
    let mut engine = ExecutionEngine::new(container, Arc::new(InteropService::with_builtins()))
        .with_limits(config.engine);
    if let Err(e) = engine.load_script(script) {
        error!("{e}");
        process::exit(1);
    }

    let result = engine.run();
    println!("state: {:?}", engine.state());
    for (depth, item) in engine.evaluation_stack().iter().enumerate().rev() {
        println!("{depth:>4}: {}", describe(item));
    }

    match result {
        Ok(()) => info!("Execution halted"),
        Err(e) => {
            error!("Execution faulted: {e}");
            process::exit(1);
        }
    }
}

fn script_arg(args: &[String]) -> Vec<u8> {
    let Some(raw) = args.get(2) else {
        error!("{} requires a hex script argument", args[1]);
        process::exit(1);
    };
    hex::decode(raw.trim_start_matches("0x")).unwrap_or_else(|e| {
        error!("Invalid script hex: {e}");
        process::exit(1);
    })
}

fn describe(item: &StackItem) -> String {
    match item {
        StackItem::ByteArray(b) => format!("ByteArray 0x{}", hex::encode(b.as_slice())),
        StackItem::Integer(i) => format!("Integer {i}"),
        StackItem::Boolean(b) => format!("Boolean {b}"),
        StackItem::Interop(c) => format!("Interop container {}", c.hash()),
    }
}

/// Node without peers or chain state, identified by its configuration.
struct StandaloneNode {
    id: u64,
    public_key: Bytes,
}

impl StandaloneNode {
    fn new(config: &NodeConfig) -> Self {
        let seed = Hash::sha3()
            .chain(config.version.as_bytes())
            .chain(&config.node_port.to_le_bytes())
            .finalize();
        let mut id = [0u8; 8];
        id.copy_from_slice(&seed.as_slice()[..8]);
        Self {
            id: u64::from_le_bytes(id),
            public_key: Bytes::from(seed.as_slice()),
        }
    }
}

impl NodeView for StandaloneNode {
    fn id(&self) -> u64 {
        self.id
    }

    fn public_key(&self) -> Bytes {
        self.public_key.clone()
    }

    fn neighbors(&self) -> Vec<Neighbor> {
        Vec::new()
    }
}

impl LedgerView for StandaloneNode {
    fn block_height(&self) -> u32 {
        0
    }

    fn bookkeepers(&self) -> Vec<Bytes> {
        vec![self.public_key.clone()]
    }
}

const USAGE: &str = "\
Chain Node

USAGE:
    {program} run <script-hex> [--record <text>]
    {program} disasm <script-hex>
    {program} info

OPTIONS:
    -r, --record <text>    Payload of the record transaction used as script container
    -h, --help             Print this help message

ENVIRONMENT:
    CHAIN_NODE_LOG                     Minimum log level (debug, info, warn, error)
    CHAIN_NODE_PORT                    Node port shown on the info page
    CHAIN_NODE_HTTP_*_PORT             INFO, REST, WS, JSON and LOCAL ports
    CHAIN_NODE_MAX_INVOCATION_DEPTH    Nested call limit per execution
    CHAIN_NODE_MAX_STACK_SIZE          Evaluation stack limit per execution

EXAMPLES:
    # Push the entry script hash and stop
    {program} run 322953797374656d2e457865637574696f6e456e67696e652e476574456e74727953637269707448617368
";

/// Name the binary was invoked as, for usage text.
fn program_name(args: &[String]) -> &str {
    args.first().map_or("chain_node", String::as_str)
}

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_name_falls_back_without_argv0() {
        assert_eq!(program_name(&[]), "chain_node");
        assert_eq!(program_name(&["./node".to_string()]), "./node");
    }
}
