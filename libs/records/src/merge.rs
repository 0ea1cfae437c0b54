//! Decoding and partial merge of sub-collection entries.
//!
//! Entries travel as JSON objects. Decoding runs them through the typed
//! entry (applying defaults, dropping unknown fields) and validates the
//! result. Merging overlays a patch on the stored fields one key deep and
//! re-validates the merged entry before anything is written back.

use serde_json::{Map, Value};
use validator::Validate;

use crate::{Entry, RecordError, Result};

/// Key the entry id is exposed under; never part of the stored fields.
pub const ENTRY_ID_KEY: &str = "id";

/// Decode a JSON payload into a validated entry.
pub fn decode_entry<T: Entry>(payload: Value) -> Result<T> {
    let mut fields = into_object(payload, T::COLLECTION.label())?;
    fields.remove(ENTRY_ID_KEY);

    let entry: T = serde_json::from_value(Value::Object(fields)).map_err(|e| {
        RecordError::Malformed {
            collection: T::COLLECTION,
            message: e.to_string(),
        }
    })?;
    entry
        .validate()
        .map_err(|e| RecordError::invalid(T::COLLECTION.label(), e))?;
    Ok(entry)
}

/// Serialize an entry to the object form that gets stored.
pub fn encode_entry<T: Entry>(entry: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(entry) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(RecordError::NotAnObject(T::COLLECTION.label())),
        Err(e) => Err(RecordError::Serialization(e.to_string())),
    }
}

/// Result of merging a patch over a stored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Full entry after the merge, as it should read back.
    pub fields: Map<String, Value>,
    /// Keys to overwrite in storage.
    pub set: Map<String, Value>,
    /// Keys to drop from storage.
    pub removed: Vec<String>,
}

impl MergeOutcome {
    pub fn is_noop(&self) -> bool {
        self.set.is_empty() && self.removed.is_empty()
    }
}

/// Shallow-merge `patch` over `current` and validate the result as `T`.
///
/// Keys absent from the patch keep their stored value. The entry id cannot
/// be changed. Only keys the patch touched end up in `set`/`removed`, so a
/// store can apply the outcome without rewriting untouched fields.
pub fn merge_entry<T: Entry>(current: &Map<String, Value>, patch: Value) -> Result<MergeOutcome> {
    let mut patch = into_object(patch, T::COLLECTION.label())?;
    patch.remove(ENTRY_ID_KEY);

    let mut merged = current.clone();
    overlay(&mut merged, &patch);

    let entry: T = decode_entry(Value::Object(merged))?;
    let normalized = encode_entry(&entry)?;

    let mut set = Map::new();
    let mut removed = Vec::new();
    for key in patch.keys() {
        match normalized.get(key) {
            Some(value) => {
                if current.get(key) != Some(value) {
                    set.insert(key.clone(), value.clone());
                }
            }
            None if current.contains_key(key) => removed.push(key.clone()),
            None => {}
        }
    }

    let mut fields = current.clone();
    for key in &removed {
        fields.remove(key);
    }
    overlay(&mut fields, &set);

    Ok(MergeOutcome {
        fields,
        set,
        removed,
    })
}

/// Write every key of `patch` into `target`, one level deep.
pub fn overlay(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

fn into_object(payload: Value, context: &'static str) -> Result<Map<String, Value>> {
    match payload {
        Value::Object(fields) => Ok(fields),
        _ => Err(RecordError::NotAnObject(context)),
    }
}
