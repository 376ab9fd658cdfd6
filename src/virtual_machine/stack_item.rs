//! Values living on the evaluation stack and the container interface.

use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use crate::virtual_machine::errors::VMError;
use std::fmt;
use std::sync::Arc;

/// The object whose execution triggered a top-level invocation.
///
/// Usually a transaction. Scripts only ever see it through
/// `System.ExecutionEngine.GetScriptContainer`, as an opaque interop item.
pub trait ScriptContainer: Send + Sync + fmt::Debug {
    /// Identity of the container.
    fn hash(&self) -> Hash;
    /// Bytes a witness signs for this container.
    fn message(&self) -> Vec<u8>;
}

/// A value on the evaluation stack.
#[derive(Clone, Debug)]
pub enum StackItem {
    ByteArray(Bytes),
    Integer(i64),
    Boolean(bool),
    /// Host object reference; compared by identity, never by content.
    Interop(Arc<dyn ScriptContainer>),
}

impl StackItem {
    /// Returns the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::ByteArray(_) => "ByteArray",
            StackItem::Integer(_) => "Integer",
            StackItem::Boolean(_) => "Boolean",
            StackItem::Interop(_) => "Interop",
        }
    }

    /// Byte view of a primitive item.
    ///
    /// Integers use minimal little-endian two's complement (zero is empty),
    /// booleans are `[1]` or empty. Interop items have no byte view.
    pub fn to_bytes(&self, instruction: &'static str) -> Result<Vec<u8>, VMError> {
        match self {
            StackItem::ByteArray(b) => Ok(b.to_vec()),
            StackItem::Integer(i) => Ok(integer_bytes(*i)),
            StackItem::Boolean(true) => Ok(vec![1]),
            StackItem::Boolean(false) => Ok(Vec::new()),
            StackItem::Interop(_) => Err(VMError::TypeMismatch {
                instruction,
                expected: "primitive",
                actual: "Interop",
            }),
        }
    }

    /// Truthiness: any non-zero byte, non-zero integer, `true`, or any interop item.
    pub fn as_bool(&self) -> bool {
        match self {
            StackItem::ByteArray(b) => b.iter().any(|&x| x != 0),
            StackItem::Integer(i) => *i != 0,
            StackItem::Boolean(v) => *v,
            StackItem::Interop(_) => true,
        }
    }

    /// Returns the container reference held by an interop item.
    pub fn as_container(&self) -> Option<&Arc<dyn ScriptContainer>> {
        match self {
            StackItem::Interop(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the bytes held by a byte array item.
    pub fn as_byte_array(&self) -> Option<&Bytes> {
        match self {
            StackItem::ByteArray(b) => Some(b),
            _ => None,
        }
    }
}

impl PartialEq for StackItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StackItem::ByteArray(a), StackItem::ByteArray(b)) => a == b,
            (StackItem::Integer(a), StackItem::Integer(b)) => a == b,
            (StackItem::Boolean(a), StackItem::Boolean(b)) => a == b,
            (StackItem::Interop(a), StackItem::Interop(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Hash> for StackItem {
    fn from(hash: Hash) -> Self {
        StackItem::ByteArray(Bytes::new(hash.as_slice()))
    }
}

impl From<Bytes> for StackItem {
    fn from(b: Bytes) -> Self {
        StackItem::ByteArray(b)
    }
}

impl From<i64> for StackItem {
    fn from(i: i64) -> Self {
        StackItem::Integer(i)
    }
}

impl From<bool> for StackItem {
    fn from(b: bool) -> Self {
        StackItem::Boolean(b)
    }
}

fn integer_bytes(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let mut bytes = value.to_le_bytes().to_vec();
    while bytes.len() > 1 {
        let last = bytes[bytes.len() - 1];
        let sign = bytes[bytes.len() - 2] & 0x80;
        if (last == 0x00 && sign == 0) || (last == 0xff && sign != 0) {
            bytes.pop();
        } else {
            break;
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Dummy;

    impl ScriptContainer for Dummy {
        fn hash(&self) -> Hash {
            Hash::zero()
        }
        fn message(&self) -> Vec<u8> {
            Vec::new()
        }
    }

    #[test]
    fn integer_bytes_are_minimal() {
        assert_eq!(integer_bytes(0), Vec::<u8>::new());
        assert_eq!(integer_bytes(1), vec![1]);
        assert_eq!(integer_bytes(-1), vec![0xff]);
        assert_eq!(integer_bytes(128), vec![0x80, 0x00]);
        assert_eq!(integer_bytes(-129), vec![0x7f, 0xff]);
    }

    #[test]
    fn interop_items_compare_by_identity() {
        let a: Arc<dyn ScriptContainer> = Arc::new(Dummy);
        let b: Arc<dyn ScriptContainer> = Arc::new(Dummy);
        assert_eq!(StackItem::Interop(a.clone()), StackItem::Interop(a.clone()));
        assert_ne!(StackItem::Interop(a), StackItem::Interop(b));
    }

    #[test]
    fn interop_has_no_byte_view() {
        let item = StackItem::Interop(Arc::new(Dummy));
        assert!(matches!(
            item.to_bytes("EQUAL"),
            Err(VMError::TypeMismatch { actual: "Interop", .. })
        ));
    }

    #[test]
    fn truthiness() {
        assert!(!StackItem::ByteArray(Bytes::new(vec![0, 0])).as_bool());
        assert!(StackItem::ByteArray(Bytes::new(vec![0, 1])).as_bool());
        assert!(!StackItem::Integer(0).as_bool());
        assert!(StackItem::Boolean(true).as_bool());
    }

    #[test]
    fn hash_converts_to_byte_array() {
        let h = Hash::digest(b"code");
        assert_eq!(
            StackItem::from(h).as_byte_array().map(|b| b.to_vec()),
            Some(h.to_vec())
        );
    }
}
