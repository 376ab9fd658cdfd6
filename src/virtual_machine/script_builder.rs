//! Bytecode emission and disassembly.

use crate::types::hash::{HASH_LEN, Hash};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use std::fmt::Write;

/// Largest operand `PUSHDATA` and `SYSCALL` can carry (one length byte).
pub const MAX_INLINE_LEN: usize = u8::MAX as usize;

/// Appends instructions to a growing script.
///
/// ```ignore
/// let script = ScriptBuilder::new()
///     .syscall(Syscall::GetCallingScriptHash.name())?
///     .push_data(owner.as_slice())?
///     .emit(Instruction::Equal)
///     .emit(Instruction::ThrowIfNot)
///     .to_bytes();
/// ```
#[derive(Default, Clone, Debug)]
pub struct ScriptBuilder {
    code: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    /// Appends an instruction without operands.
    pub fn emit(mut self, instr: Instruction) -> Self {
        self.code.push(instr as u8);
        self
    }

    /// `PUSHDATA len, data`.
    pub fn push_data(self, data: &[u8]) -> Result<Self, VMError> {
        self.with_inline(Instruction::PushData, data)
    }

    /// `PUSHINT imm64`.
    pub fn push_int(mut self, value: i64) -> Self {
        self.code.push(Instruction::PushInt as u8);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// `APPCALL hash`.
    pub fn app_call(mut self, hash: &Hash) -> Self {
        self.code.push(Instruction::AppCall as u8);
        self.code.extend_from_slice(hash.as_slice());
        self
    }

    /// `SYSCALL len, name`.
    pub fn syscall(self, method: &str) -> Result<Self, VMError> {
        self.with_inline(Instruction::Syscall, method.as_bytes())
    }

    fn with_inline(mut self, instr: Instruction, data: &[u8]) -> Result<Self, VMError> {
        let len = u8::try_from(data.len()).map_err(|_| VMError::OperandTooLong {
            instruction: instr.mnemonic(),
            len: data.len(),
        })?;
        self.code.push(instr as u8);
        self.code.push(len);
        self.code.extend_from_slice(data);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.code
    }
}

/// Reads `n` bytes of `script` at `ip`, advancing it.
fn take<'a>(script: &'a [u8], ip: &mut usize, n: usize) -> Result<&'a [u8], VMError> {
    let start = *ip;
    let end = start
        .checked_add(n)
        .filter(|&end| end <= script.len())
        .ok_or(VMError::UnexpectedEndOfScript {
            ip: start,
            requested: n,
            available: script.len().saturating_sub(start),
        })?;
    *ip = end;
    Ok(&script[start..end])
}

/// Renders a script as one `offset: MNEMONIC operands` line per instruction.
pub fn disassemble(script: &[u8]) -> Result<String, VMError> {
    let mut out = String::new();
    let mut ip = 0;

    while ip < script.len() {
        let offset = ip;
        let opcode = take(script, &mut ip, 1)?[0];
        let instr = Instruction::try_from(opcode)
            .map_err(|_| VMError::InvalidInstruction { opcode, offset })?;
        let _ = write!(out, "{offset:04}: {}", instr.mnemonic());

        match instr {
            Instruction::PushData => {
                let len = take(script, &mut ip, 1)?[0] as usize;
                let _ = write!(out, " 0x{}", hex::encode(take(script, &mut ip, len)?));
            }
            Instruction::PushInt => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(take(script, &mut ip, 8)?);
                let _ = write!(out, " {}", i64::from_le_bytes(arr));
            }
            Instruction::AppCall => {
                let _ = write!(out, " 0x{}", hex::encode(take(script, &mut ip, HASH_LEN)?));
            }
            Instruction::Syscall => {
                let len = take(script, &mut ip, 1)?[0] as usize;
                let name = String::from_utf8_lossy(take(script, &mut ip, len)?);
                let _ = write!(out, " \"{name}\"");
            }
            _ => {}
        }
        out.push('\n');
    }
    Ok(out)
}
