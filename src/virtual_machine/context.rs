//! One frame of the invocation stack.

use crate::types::bytes::Bytes;
use crate::types::hash::{Hash, HashCache};
use crate::virtual_machine::errors::VMError;

/// A running script: its code, where it is in that code, and its identity.
///
/// The code never changes once the context exists, so the code hash is
/// computed on first request and cached for the context's lifetime.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Script bytecode.
    script: Bytes,
    /// Offset of the next byte to read.
    ip: usize,
    /// Position in the invocation stack (0 = entry).
    depth: usize,
    code_hash: HashCache,
}

impl ExecutionContext {
    pub(crate) fn new(script: Bytes, depth: usize) -> Self {
        Self {
            script,
            ip: 0,
            depth,
            code_hash: HashCache::new(),
        }
    }

    /// Script bytecode of this frame.
    pub fn script(&self) -> &Bytes {
        &self.script
    }

    /// SHA3-256 of the script.
    pub fn code_hash(&self) -> Hash {
        self.code_hash
            .get_or_compute(|| Hash::digest(self.script.as_slice()))
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    /// Frame identity: index of this context in the invocation stack.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True once every byte of the script has been consumed.
    pub(crate) fn at_end(&self) -> bool {
        self.ip >= self.script.len()
    }

    /// Reads exactly `count` bytes at the instruction pointer and advances past them.
    pub(crate) fn read_exact(&mut self, count: usize) -> Result<&[u8], VMError> {
        let start = self.ip;
        let available = self.script.len().saturating_sub(start);
        let end = start
            .checked_add(count)
            .filter(|&end| end <= self.script.len())
            .ok_or(VMError::UnexpectedEndOfScript {
                ip: start,
                requested: count,
                available,
            })?;
        self.ip = end;
        Ok(&self.script[start..end])
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, VMError> {
        Ok(self.read_exact(1)?[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_hash_is_digest_of_script() {
        let ctx = ExecutionContext::new(Bytes::from(&[1, 2, 3]), 0);
        assert_eq!(ctx.code_hash(), Hash::digest(&[1, 2, 3]));
        assert_eq!(ctx.code_hash(), ctx.code_hash());
    }

    #[test]
    fn read_exact_advances_and_bounds_checks() {
        let mut ctx = ExecutionContext::new(Bytes::from(&[9, 8, 7]), 0);
        assert_eq!(ctx.read_u8().unwrap(), 9);
        assert_eq!(ctx.read_exact(2).unwrap(), &[8, 7]);
        assert!(ctx.at_end());
        assert_eq!(
            ctx.read_exact(1),
            Err(VMError::UnexpectedEndOfScript {
                ip: 3,
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn same_code_same_identity() {
        let a = ExecutionContext::new(Bytes::from(&[0x30]), 0);
        let b = ExecutionContext::new(Bytes::from(&[0x30]), 3);
        assert_eq!(a.code_hash(), b.code_hash());
        assert_ne!(a.depth(), b.depth());
    }
}
