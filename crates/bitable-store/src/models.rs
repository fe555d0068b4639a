use common::{field_set_to_json, FieldSet, TableRecord};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct RecordDto {
    pub record_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SingleRecordData {
    pub record: RecordDto,
}

#[derive(Debug, Deserialize)]
pub struct RecordListData {
    #[serde(default)]
    pub records: Vec<RecordDto>,
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub items: Vec<RecordDto>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub page_token: Option<String>,
}

impl From<RecordDto> for TableRecord {
    fn from(dto: RecordDto) -> Self {
        // Tables may carry column types this service never writes (formulas,
        // lookups). Those cells are dropped from the view rather than
        // failing the whole page; diff inputs are parsed strictly elsewhere.
        let mut fields = FieldSet::new();
        for (name, value) in &dto.fields {
            if value.is_null() {
                continue;
            }
            match common::FieldValue::from_json(value) {
                Ok(parsed) => {
                    fields.insert(name.clone(), parsed);
                }
                Err(e) => {
                    warn!(record_id = %dto.record_id, field = %name, error = %e, "skipping unreadable cell");
                }
            }
        }
        TableRecord { record_id: dto.record_id, fields }
    }
}

pub fn fields_body(fields: &FieldSet) -> Value {
    Value::Object(field_set_to_json(fields))
}
