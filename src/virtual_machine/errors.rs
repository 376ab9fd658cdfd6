use crate::types::hash::Hash;
use thiserror::Error;

/// Errors that abort the current script execution.
///
/// None of these take the host down: the engine moves to
/// [`VMState::Fault`](super::engine::VMState::Fault) and the error is returned
/// to whoever called [`ExecutionEngine::run`](super::engine::ExecutionEngine::run).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    /// A `SYSCALL` named a method that is not registered.
    #[error("interop service not supported: {name}")]
    NotSupportService { name: String },
    /// A context accessor ran with no script loaded.
    #[error("invocation stack is empty")]
    EmptyInvocationStack,
    /// The invocation stack is too shallow for the requested context.
    #[error("invocation stack depth {actual} is below the required {required}")]
    InsufficientDepth { required: usize, actual: usize },
    /// Unknown opcode encountered in bytecode.
    #[error("invalid instruction 0x{opcode:02x} at offset {offset}")]
    InvalidInstruction { opcode: u8, offset: usize },
    /// Script ended while reading an operand.
    #[error("unexpected end of script at {ip}: requested {requested} bytes, {available} available")]
    UnexpectedEndOfScript {
        ip: usize,
        requested: usize,
        available: usize,
    },
    /// An instruction needed more items than the evaluation stack holds.
    #[error("{instruction}: evaluation stack underflow")]
    StackUnderflow { instruction: &'static str },
    /// The evaluation stack grew past its limit.
    #[error("evaluation stack size {size} exceeds limit {limit}")]
    StackOverflow { size: usize, limit: usize },
    /// A nested call would exceed the invocation depth limit.
    #[error("invocation depth limit {limit} exceeded")]
    InvocationDepthExceeded { limit: usize },
    /// Stack item has the wrong type for the instruction.
    #[error("{instruction} expected {expected} but got {actual}")]
    TypeMismatch {
        instruction: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    /// `APPCALL` target is not in the contract table.
    #[error("unknown contract {hash}")]
    UnknownContract { hash: Hash },
    /// `APPCALL` executed on an engine without a contract table.
    #[error("no contract table attached to the engine")]
    NoScriptTable,
    /// `SYSCALL` operand is not valid UTF-8.
    #[error("syscall name is not valid utf-8")]
    InvalidSyscallName,
    /// `THROWIFNOT` popped a false value.
    #[error("assertion failed at offset {offset}")]
    AssertionFailed { offset: usize },
    /// Inline operand does not fit its one-byte length prefix.
    #[error("{instruction}: operand of {len} bytes exceeds 255")]
    OperandTooLong {
        instruction: &'static str,
        len: usize,
    },
    /// Failure reported by an extension interop handler.
    #[error("interop handler failed: {0}")]
    Handler(String),
}

/// Errors raised while assembling an interop registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InteropError {
    /// A second registration under a name that is already taken.
    #[error("interop service already registered: {0}")]
    DuplicateService(String),
}
