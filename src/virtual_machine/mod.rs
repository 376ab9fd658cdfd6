//! Stack-based contract engine and its interop layer.
//!
//! Scripts run on an [`engine::ExecutionEngine`] that keeps an invocation
//! stack of [`context::ExecutionContext`]s (entry at the bottom, current on
//! top) and an evaluation stack of [`stack_item::StackItem`]s. Host functions
//! are reached through `SYSCALL` and looked up in an immutable
//! [`interop::InteropService`] shared by every engine of a configuration.
//!
//! # Modules
//!
//! - [`context`]: Execution frames and their code hashes
//! - [`engine`]: Interpreter loop and context addressing
//! - [`errors`]: Execution and registry error types
//! - [`interop`]: Service registry, dispatch and the built-in system calls
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`script_builder`]: Bytecode emission and disassembly
//! - [`script_table`]: Deployed contracts addressable by `APPCALL`
//! - [`stack_item`]: Evaluation stack values and the script container trait

pub mod context;
pub mod engine;
pub mod errors;
pub mod interop;
pub mod isa;
pub mod script_builder;
pub mod script_table;
pub mod stack_item;
