use crate::domain::field::FieldSet;
use crate::domain::result::DomainResult;
use async_trait::async_trait;

/// A stored row: opaque record id plus its field values
#[derive(Debug, Clone, PartialEq)]
pub struct TableRecord {
    pub record_id: String,
    pub fields: FieldSet,
}

/// One element of a batch update
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub record_id: String,
    pub fields: FieldSet,
}

/// Exact-match filter on a single field
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    pub field: String,
    pub value: String,
}

impl RecordFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self { field: field.into(), value: value.into() }
    }
}

/// One page request against the store's search endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub filter: Option<RecordFilter>,
    pub page_size: usize,
    pub page_token: Option<String>,
}

/// One page of search results; `next_page_token` is `None` on the last page
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub items: Vec<TableRecord>,
    pub next_page_token: Option<String>,
}

/// Remote tabular store operations
///
/// Implementations translate these to the vendor's HTTP API. Mutating
/// operations are normally reached through the mutation queue rather than
/// called directly.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create a single record, returning it with its assigned id
    async fn create_record(&self, table_id: &str, fields: &FieldSet) -> DomainResult<TableRecord>;

    /// Update a single record's given fields
    async fn update_record(
        &self,
        table_id: &str,
        record_id: &str,
        fields: &FieldSet,
    ) -> DomainResult<TableRecord>;

    /// Create a batch of records in one call
    async fn batch_create_records(
        &self,
        table_id: &str,
        records: &[FieldSet],
    ) -> DomainResult<Vec<TableRecord>>;

    /// Update a batch of records in one call
    async fn batch_update_records(
        &self,
        table_id: &str,
        updates: &[RecordUpdate],
    ) -> DomainResult<Vec<TableRecord>>;

    /// One page of a (possibly filtered) record search
    async fn search_records(&self, table_id: &str, query: &SearchQuery) -> DomainResult<SearchPage>;
}
