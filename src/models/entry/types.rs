use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use sqlx::types::Json;

pub type EntryData = Map<String, Value>;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct EntryRow {
    pub id: i64,
    pub form_id: i64,
    pub data: Json<EntryData>,
    pub sub_rows: Json<Vec<EntryData>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One submitted record, keyed by field label (category fields by `"<category> - <label>"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormEntry {
    pub id: i64,
    pub form_id: i64,
    pub data: EntryData,
    pub sub_rows: Vec<EntryData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EntryRow> for FormEntry {
    fn from(row: EntryRow) -> Self {
        FormEntry {
            id: row.id,
            form_id: row.form_id,
            data: row.data.0,
            sub_rows: row.sub_rows.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl FormEntry {
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Create/update body.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntryInput {
    #[serde(default)]
    pub data: EntryData,
    #[serde(default)]
    pub sub_rows: Vec<EntryData>,
}

/// Normalized payload ready to store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanEntry {
    pub data: EntryData,
    pub sub_rows: Vec<EntryData>,
}

/// Raised on save when an exist-field value is already present in the referenced form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExistFlag {
    pub key: String,
    pub value: String,
    pub matches: i64,
}

/// Save response: the stored entry plus any duplicate indicators.
#[derive(Debug, Clone, Serialize)]
pub struct SavedEntry {
    #[serde(flatten)]
    pub entry: FormEntry,
    pub flags: Vec<ExistFlag>,
}
