//! Instruction set of the contract engine.
//!
//! Only the instructions needed to move data, call other contracts, issue
//! system calls and assert on results. The `define_instructions!` invocation
//! below is the canonical list: opcode byte, mnemonic and documentation.
//!
//! # Bytecode format
//!
//! - Opcode: 1 byte
//! - `PUSHDATA` / `SYSCALL`: 1-byte length followed by that many bytes
//! - `PUSHINT`: 8-byte little-endian i64
//! - `APPCALL`: 32-byte code hash of the callee

use crate::virtual_machine::errors::VMError;

macro_rules! define_instructions {
    ($( $(#[$doc:meta])* $name:ident = $opcode:literal, $mnemonic:literal, )*) => {
        /// Engine instruction with its opcode byte as discriminant.
        #[repr(u8)]
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        pub enum Instruction {
            $( $(#[$doc])* $name = $opcode, )*
        }

        impl Instruction {
            /// Assembly mnemonic, used in error messages and disassembly.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }
        }

        impl TryFrom<u8> for Instruction {
            type Error = VMError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Instruction::$name), )*
                    _ => Err(VMError::InvalidInstruction { opcode: value, offset: 0 }),
                }
            }
        }
    };
}

define_instructions! {
    /// NOP ; does nothing
    Nop = 0x00, "NOP",
    /// PUSHDATA len, bytes ; pushes a byte array
    PushData = 0x01, "PUSHDATA",
    /// PUSHINT imm64 ; pushes an integer
    PushInt = 0x02, "PUSHINT",
    /// DUP ; duplicates the top item
    Dup = 0x10, "DUP",
    /// DROP ; removes the top item
    Drop = 0x11, "DROP",
    /// EQUAL ; pops b, a and pushes a == b compared as bytes
    Equal = 0x20, "EQUAL",
    /// THROWIFNOT ; pops a value and faults if it is false
    ThrowIfNot = 0x21, "THROWIFNOT",
    /// RET ; leaves the current context
    Ret = 0x30, "RET",
    /// APPCALL hash ; runs the contract whose code hash follows
    AppCall = 0x31, "APPCALL",
    /// SYSCALL len, name ; dispatches a host interop service
    Syscall = 0x32, "SYSCALL",
}
