use crate::client::BitableClient;
use crate::models::{fields_body, RecordListData, SearchData, SingleRecordData};
use async_trait::async_trait;
use common::{
    DomainError, DomainResult, FieldSet, RecordUpdate, SearchPage, SearchQuery, TableRecord,
    TableStore,
};
use serde_json::json;
use tracing::{debug, instrument};

/// HTTP implementation of [`TableStore`] against the bitable open API
pub struct BitableStore {
    client: BitableClient,
}

impl BitableStore {
    pub fn new(client: BitableClient) -> Self {
        Self { client }
    }

    fn records_path(&self, table_id: &str) -> String {
        format!(
            "/open-apis/bitable/v1/apps/{}/tables/{table_id}/records",
            self.client.app_token()
        )
    }

    // The store's exact-match filter expression
    fn render_filter(field: &str, value: &str) -> String {
        format!("CurrentValue.[{field}]=\"{value}\"")
    }
}

#[async_trait]
impl TableStore for BitableStore {
    #[instrument(skip(self, fields), fields(table_id = %table_id))]
    async fn create_record(&self, table_id: &str, fields: &FieldSet) -> DomainResult<TableRecord> {
        let body = json!({ "fields": fields_body(fields) });
        let data: SingleRecordData = self
            .client
            .post(&self.records_path(table_id), &body)
            .await
            .map_err(DomainError::StoreError)?;
        debug!(record_id = %data.record.record_id, "created record");
        Ok(data.record.into())
    }

    #[instrument(skip(self, fields), fields(table_id = %table_id, record_id = %record_id))]
    async fn update_record(
        &self,
        table_id: &str,
        record_id: &str,
        fields: &FieldSet,
    ) -> DomainResult<TableRecord> {
        let path = format!("{}/{record_id}", self.records_path(table_id));
        let body = json!({ "fields": fields_body(fields) });
        let data: SingleRecordData = self
            .client
            .put(&path, &body)
            .await
            .map_err(DomainError::StoreError)?;
        Ok(data.record.into())
    }

    #[instrument(skip(self, records), fields(table_id = %table_id, count = records.len()))]
    async fn batch_create_records(
        &self,
        table_id: &str,
        records: &[FieldSet],
    ) -> DomainResult<Vec<TableRecord>> {
        let path = format!("{}/batch_create", self.records_path(table_id));
        let body = json!({
            "records": records
                .iter()
                .map(|fields| json!({ "fields": fields_body(fields) }))
                .collect::<Vec<_>>(),
        });
        let data: RecordListData = self
            .client
            .post(&path, &body)
            .await
            .map_err(DomainError::StoreError)?;
        debug!(created = data.records.len(), "batch created records");
        Ok(data.records.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, updates), fields(table_id = %table_id, count = updates.len()))]
    async fn batch_update_records(
        &self,
        table_id: &str,
        updates: &[RecordUpdate],
    ) -> DomainResult<Vec<TableRecord>> {
        let path = format!("{}/batch_update", self.records_path(table_id));
        let body = json!({
            "records": updates
                .iter()
                .map(|update| json!({
                    "record_id": update.record_id,
                    "fields": fields_body(&update.fields),
                }))
                .collect::<Vec<_>>(),
        });
        let data: RecordListData = self
            .client
            .post(&path, &body)
            .await
            .map_err(DomainError::StoreError)?;
        Ok(data.records.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, query), fields(table_id = %table_id))]
    async fn search_records(&self, table_id: &str, query: &SearchQuery) -> DomainResult<SearchPage> {
        let mut params: Vec<(&str, String)> =
            vec![("page_size", query.page_size.to_string())];
        if let Some(filter) = &query.filter {
            params.push(("filter", Self::render_filter(&filter.field, &filter.value)));
        }
        if let Some(token) = &query.page_token {
            params.push(("page_token", token.clone()));
        }

        let data: SearchData = self
            .client
            .get(&self.records_path(table_id), &params)
            .await
            .map_err(DomainError::StoreError)?;

        let next_page_token = if data.has_more { data.page_token } else { None };
        Ok(SearchPage {
            items: data.items.into_iter().map(Into::into).collect(),
            next_page_token,
        })
    }
}
