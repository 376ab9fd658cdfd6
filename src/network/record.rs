//! REST "record" submission: turns a JSON request into a transaction,
//! hands it to the pool and reports the outcome as a response pack.
//!
//! ```json
//! { "Action": "", "Desc": "SUCCESS", "Error": 0, "Result": "<tx hash hex>", "Version": "1.0.0" }
//! ```

use crate::core::transaction::{Transaction, TxAttribute, description_chunks};
use crate::network::txpool::TransactionSink;
use crate::{info, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const SUCCESS: i64 = 0;
pub const INVALID_PARAMS: i64 = 42003;
pub const INTERNAL_ERROR: i64 = 45002;

/// API version reported in every response.
pub const API_VERSION: &str = "1.0.0";

/// Record type used by [`send_record_transaction`].
pub const RECORD_TYPE: &str = "record";

/// Human-readable text for a response code.
pub fn error_desc(code: i64) -> &'static str {
    match code {
        SUCCESS => "SUCCESS",
        INVALID_PARAMS => "INVALID PARAMS",
        INTERNAL_ERROR => "INTERNAL ERROR",
        45006 => "INVALID ATTRIBUTE",
        45008 => "INVALID TRANSACTION PAYLOAD",
        _ => "UNKNOWN ERROR",
    }
}

/// Uniform REST response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponsePack {
    pub action: String,
    pub desc: String,
    pub error: i64,
    pub result: String,
    pub version: String,
}

impl ResponsePack {
    pub fn new(code: i64) -> Self {
        Self {
            action: String::new(),
            desc: error_desc(code).to_string(),
            error: code,
            result: String::new(),
            version: API_VERSION.to_string(),
        }
    }

    fn set_error(&mut self, code: i64) {
        self.error = code;
        self.desc = error_desc(code).to_string();
    }

    pub fn is_success(&self) -> bool {
        self.error == SUCCESS
    }
}

/// Why a record request could not be turned into bytes.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("RecordData must be a hex string in raw mode")]
    RawNotString,
    #[error("RecordData is not valid hex: {0}")]
    BadHex(#[from] hex::FromHexError),
    #[error("RecordData must be an object")]
    NotAnObject,
    #[error("CAkey must be a string")]
    MissingCaKey,
    #[error("malformed RecordData: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl RequestError {
    pub fn code(&self) -> i64 {
        INVALID_PARAMS
    }
}

const RECORD_FIELDS: &[&str] = &["CAkey", "Data", "SeqNo", "Timestamp"];
const CONTENT_FIELDS: &[&str] = &["Algrithem", "Hash", "Signature", "Text"];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RecordContent {
    #[serde(rename = "Algrithem", deserialize_with = "null_as_default")]
    algorithm: String,
    #[serde(rename = "Hash", deserialize_with = "null_as_default")]
    hash: String,
    #[serde(rename = "Signature", deserialize_with = "null_as_default")]
    signature: String,
    #[serde(rename = "Text", deserialize_with = "null_as_default")]
    text: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RecordData {
    #[serde(rename = "CAkey", deserialize_with = "null_as_default")]
    ca_key: String,
    #[serde(rename = "Data", deserialize_with = "null_as_default")]
    data: RecordContent,
    #[serde(rename = "SeqNo", deserialize_with = "null_as_default")]
    seq_no: String,
    #[serde(
        rename = "Timestamp",
        deserialize_with = "null_as_default",
        serialize_with = "whole_number"
    )]
    timestamp: f64,
}

/// `null` leaves the field at its default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Writes integral values without a fractional part (`1700000000`, not `1700000000.0`).
fn whole_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(value) {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Renames keys that match one of `fields` ignoring ASCII case and drops the
/// rest. A key spelled exactly like the field wins over a case-folded one.
fn fold_keys(object: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    let mut folded = Map::new();
    for (key, value) in object {
        let Some(field) = fields.iter().find(|f| f.eq_ignore_ascii_case(key)) else {
            continue;
        };
        if *field == key.as_str() || !object.contains_key(*field) {
            folded.insert(field.to_string(), value.clone());
        }
    }
    folded
}

#[derive(Serialize)]
struct InnerTimestamp {
    #[serde(rename = "InnerTimestamp")]
    inner_timestamp: u64,
}

/// Extracts the record bytes from a request.
///
/// With `"Raw": "1"` the `RecordData` field is hex. Otherwise it is a
/// structured record whose `CAkey` is replaced by the request's top-level
/// `CAkey`, re-serialized as JSON. Field names match without regard to
/// ASCII case and `null` fields keep their defaults.
pub fn record_data(cmd: &Value) -> Result<Vec<u8>, RequestError> {
    if cmd.get("Raw").and_then(Value::as_str) == Some("1") {
        let hex_str = cmd
            .get("RecordData")
            .and_then(Value::as_str)
            .ok_or(RequestError::RawNotString)?;
        return Ok(hex::decode(hex_str)?);
    }

    let object = cmd
        .get("RecordData")
        .and_then(Value::as_object)
        .ok_or(RequestError::NotAnObject)?;
    let mut fields = fold_keys(object, RECORD_FIELDS);
    if let Some(content) = fields
        .get("Data")
        .and_then(Value::as_object)
        .map(|c| fold_keys(c, CONTENT_FIELDS))
    {
        fields.insert("Data".to_string(), Value::Object(content));
    }
    let mut record = RecordData::deserialize(Value::Object(fields))?;
    record.ca_key = cmd
        .get("CAkey")
        .and_then(Value::as_str)
        .ok_or(RequestError::MissingCaKey)?
        .to_string();
    Ok(serde_json::to_vec(&record)?)
}

/// JSON `{"InnerTimestamp": unix}` stamped into record transfers.
pub fn inner_timestamp(unix_secs: u64) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&InnerTimestamp {
        inner_timestamp: unix_secs,
    })
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Submits the record as description attributes of a transfer-asset transaction.
pub fn send_record(cmd: &Value, sink: &dyn TransactionSink) -> ResponsePack {
    send_record_at(cmd, sink, now_unix())
}

/// [`send_record`] with an explicit inner timestamp.
pub fn send_record_at(cmd: &Value, sink: &dyn TransactionSink, unix_secs: u64) -> ResponsePack {
    let mut resp = ResponsePack::new(SUCCESS);

    let inner = match inner_timestamp(unix_secs) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("record: cannot encode inner timestamp: {e}");
            resp.set_error(INTERNAL_ERROR);
            return resp;
        }
    };
    let data = match record_data(cmd) {
        Ok(data) => data,
        Err(e) => {
            warn!("record: rejected request: {e}");
            resp.set_error(e.code());
            return resp;
        }
    };

    let mut attributes = vec![TxAttribute::description(inner)];
    attributes.extend(description_chunks(&data));
    let tx = Transaction::transfer_asset(attributes);
    let hash = tx.hash();

    if let Err(e) = sink.submit(tx) {
        warn!("record: transaction {hash} refused: {e}");
        resp.set_error(e.code());
        return resp;
    }
    info!("record: submitted transfer {hash} ({} bytes)", data.len());
    resp.result = hash.to_hex();
    resp
}

/// Submits the record as the payload of a dedicated record transaction.
///
/// The hash is reported even when the pool refuses the transaction.
pub fn send_record_transaction(cmd: &Value, sink: &dyn TransactionSink) -> ResponsePack {
    let mut resp = ResponsePack::new(SUCCESS);

    let data = match record_data(cmd) {
        Ok(data) => data,
        Err(e) => {
            warn!("record: rejected request: {e}");
            resp.set_error(e.code());
            return resp;
        }
    };

    let tx = Transaction::record(RECORD_TYPE, data);
    let hash = tx.hash();
    resp.result = hash.to_hex();

    match sink.submit(tx) {
        Ok(()) => info!("record: submitted record transaction {hash}"),
        Err(e) => {
            warn!("record: transaction {hash} refused: {e}");
            resp.set_error(e.code());
        }
    }
    resp
}
