use crate::domain::result::DomainResult;
use crate::domain::store::{RecordFilter, SearchQuery, TableRecord, TableStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Resolves records by a caller-chosen unique-key field.
///
/// The store does not enforce uniqueness, so lookups return every match;
/// multiplicity is logged as a key conflict and callers broadcast updates
/// to all matches.
pub struct UniqueKeyResolver {
    store: Arc<dyn TableStore>,
    page_size: usize,
}

impl UniqueKeyResolver {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store, page_size: DEFAULT_PAGE_SIZE }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// All records whose `field` equals `value`, across every result page
    #[instrument(skip(self), fields(table_id = %table_id, field = %field))]
    pub async fn find_all_by_unique_key(
        &self,
        table_id: &str,
        field: &str,
        value: &str,
    ) -> DomainResult<Vec<TableRecord>> {
        let mut matches = Vec::new();
        let mut page_token = None;

        loop {
            let query = SearchQuery {
                filter: Some(RecordFilter::equals(field, value)),
                page_size: self.page_size,
                page_token,
            };
            let page = self.store.search_records(table_id, &query).await?;
            matches.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if matches.len() > 1 {
            warn!(
                value = %value,
                count = matches.len(),
                "unique key matched multiple records, updates will be broadcast"
            );
        }
        Ok(matches)
    }

    /// Broad scan collecting the key field's text value from every record
    #[instrument(skip(self), fields(table_id = %table_id, field = %field))]
    pub async fn collect_key_values(
        &self,
        table_id: &str,
        field: &str,
    ) -> DomainResult<HashSet<String>> {
        let mut keys = HashSet::new();
        let mut page_token = None;
        let mut scanned = 0usize;

        loop {
            let query = SearchQuery {
                filter: None,
                page_size: self.page_size,
                page_token,
            };
            let page = self.store.search_records(table_id, &query).await?;
            scanned += page.items.len();
            for record in &page.items {
                if let Some(key) = record.fields.get(field).and_then(|v| v.as_key_text()) {
                    keys.insert(key);
                }
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(scanned, distinct = keys.len(), "collected existing key values");
        Ok(keys)
    }
}
