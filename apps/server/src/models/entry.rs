use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// One persisted sub-collection entry.
///
/// `fields` is the validated entry as the typed model serialized it; the id
/// lives beside it and is merged in only when the entry is rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl StoredEntry {
    pub fn new(fields: Map<String, JsonValue>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields,
        }
    }
}
