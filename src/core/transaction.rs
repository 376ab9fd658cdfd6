//! Transactions: the script containers submitted by the record endpoint.

use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use crate::types::hash::{Hash, HashCache};
use crate::virtual_machine::stack_item::ScriptContainer;

/// Longest payload a single attribute may carry.
pub const ATTRIBUTE_MAX_LEN: usize = 252;

/// Specifies the kind of operation a transaction performs.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum TransactionType {
    /// Asset transfer. Record data rides along in description attributes.
    TransferAsset = 0x80,
    /// Dedicated record transaction carrying a [`RecordPayload`].
    Record = 0x81,
}

impl TryFrom<u8> for TransactionType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x80 => Ok(TransactionType::TransferAsset),
            0x81 => Ok(TransactionType::Record),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

/// What an attribute's data means.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum AttributeUsage {
    /// Free-form text, at most [`ATTRIBUTE_MAX_LEN`] bytes.
    Description = 0x90,
}

impl TryFrom<u8> for AttributeUsage {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x90 => Ok(AttributeUsage::Description),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

/// Tagged data attached to a transaction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TxAttribute {
    pub usage: AttributeUsage,
    pub data: Bytes,
}

impl TxAttribute {
    pub fn description(data: impl Into<Bytes>) -> Self {
        Self {
            usage: AttributeUsage::Description,
            data: data.into(),
        }
    }
}

/// Splits `data` into consecutive description attributes of at most
/// [`ATTRIBUTE_MAX_LEN`] bytes each. Empty input yields no attributes.
pub fn description_chunks(data: &[u8]) -> Vec<TxAttribute> {
    data.chunks(ATTRIBUTE_MAX_LEN)
        .map(TxAttribute::description)
        .collect()
}

/// Body of a [`TransactionType::Record`] transaction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordPayload {
    pub record_type: String,
    pub data: Bytes,
}

/// A transaction as seen by the VM and the pool.
///
/// Immutable after construction; the hash is computed once and cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub tx_type: TransactionType,
    pub attributes: Vec<TxAttribute>,
    /// Present for record transactions only.
    pub payload: Option<RecordPayload>,

    /// Cached transaction id, do not use directly.
    cached_hash: HashCache,
}

impl Transaction {
    pub fn new(
        tx_type: TransactionType,
        attributes: Vec<TxAttribute>,
        payload: Option<RecordPayload>,
    ) -> Self {
        Self {
            tx_type,
            attributes,
            payload,
            cached_hash: HashCache::new(),
        }
    }

    /// Transfer-asset transaction without inputs or outputs, carrying only attributes.
    pub fn transfer_asset(attributes: Vec<TxAttribute>) -> Self {
        Self::new(TransactionType::TransferAsset, attributes, None)
    }

    /// Record transaction holding `data` under `record_type`.
    pub fn record(record_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(
            TransactionType::Record,
            Vec::new(),
            Some(RecordPayload {
                record_type: record_type.into(),
                data: data.into(),
            }),
        )
    }

    /// Transaction id: SHA3-256 over a domain tag and the binary encoding.
    pub fn hash(&self) -> Hash {
        self.cached_hash.get_or_compute(|| {
            let mut h = Hash::sha3();
            h.update(b"TX");
            self.encode(&mut h);
            h.finalize()
        })
    }
}

impl ScriptContainer for Transaction {
    fn hash(&self) -> Hash {
        Transaction::hash(self)
    }

    fn message(&self) -> Vec<u8> {
        self.to_bytes()
    }
}

impl Encode for TransactionType {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for TransactionType {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        TransactionType::try_from(u8::decode(input)?)
    }
}

impl Encode for TxAttribute {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (self.usage as u8).encode(out);
        self.data.encode(out);
    }
}

impl Decode for TxAttribute {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let usage = AttributeUsage::try_from(u8::decode(input)?)?;
        let data = Bytes::decode(input)?;
        Ok(TxAttribute { usage, data })
    }
}

impl Encode for RecordPayload {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.record_type.encode(out);
        self.data.encode(out);
    }
}

impl Decode for RecordPayload {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(RecordPayload {
            record_type: String::decode(input)?,
            data: Bytes::decode(input)?,
        })
    }
}

impl Encode for Transaction {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.tx_type.encode(out);
        self.attributes.encode(out);
        self.payload.encode(out);
    }
}

impl Decode for Transaction {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let tx_type = TransactionType::decode(input)?;
        let attributes = Vec::<TxAttribute>::decode(input)?;
        let payload = Option::<RecordPayload>::decode(input)?;
        Ok(Transaction::new(tx_type, attributes, payload))
    }
}
