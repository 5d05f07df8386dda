//! Record API operations, shared by every record kind.

use uuid::Uuid;

use stockroom_core::record::{PageQuery, Record, RecordFilter, UpsertInput};
use stockroom_core::service::{UpsertPolicy, UpsertSummary};
use stockroom_core::storage::Pagination;

use super::StockroomClient;
use crate::error::Result;

/// Path segment of the upsert endpoint serving `policy`.
pub fn upsert_route(policy: UpsertPolicy) -> &'static str {
    match policy {
        UpsertPolicy::Immediate => "upsert",
        UpsertPolicy::PrefetchBatched => "upsert-batch-fetching",
        UpsertPolicy::Transactional => "upsert-with-transaction",
        UpsertPolicy::TransactionalLocked => "upsert-with-lock",
    }
}

impl StockroomClient {
    fn record_url<R: Record>(&self, path: &str) -> String {
        self.url(&format!("/api/{}/{}", R::KIND, path))
    }

    /// Submit an upsert batch.
    ///
    /// Item failures come back as `ClientError::UpsertFailed` with the outputs.
    pub async fn upsert<R: Record>(
        &self,
        policy: UpsertPolicy,
        inputs: &[UpsertInput],
    ) -> Result<UpsertSummary> {
        let response = self
            .client
            .post(self.record_url::<R>(upsert_route(policy)))
            .json(inputs)
            .send()
            .await?;
        self.handle_response(response, R::KIND).await
    }

    /// Get a record by ID.
    pub async fn get<R: Record>(&self, id: Uuid) -> Result<R> {
        let response = self
            .client
            .get(self.record_url::<R>(&id.to_string()))
            .send()
            .await?;
        self.handle_response(response, &format!("{} {id}", R::KIND))
            .await
    }

    /// List records matching a filter.
    pub async fn filter<R: Record>(&self, filter: &RecordFilter) -> Result<Vec<R>> {
        let response = self
            .client
            .post(self.record_url::<R>("filter"))
            .json(filter)
            .send()
            .await?;
        self.handle_response(response, R::KIND).await
    }

    /// Get one page of records matching a filter.
    pub async fn page<R: Record>(
        &self,
        filter: &RecordFilter,
        query: PageQuery,
    ) -> Result<Pagination<R>> {
        let response = self
            .client
            .post(self.record_url::<R>("pagination"))
            .query(&[("page", query.page), ("limit", query.limit)])
            .json(filter)
            .send()
            .await?;
        self.handle_response(response, R::KIND).await
    }

    /// Delete records by ID.
    pub async fn delete<R: Record>(&self, ids: Vec<Uuid>) -> Result<()> {
        let response = self
            .client
            .delete(self.record_url::<R>("delete"))
            .json(&RecordFilter::by_ids(ids))
            .send()
            .await?;
        self.handle_empty_response(response, R::KIND).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::record::{Channel, Location};

    #[test]
    fn test_upsert_routes_are_distinct() {
        let routes: std::collections::HashSet<_> =
            UpsertPolicy::ALL.iter().map(|p| upsert_route(*p)).collect();
        assert_eq!(routes.len(), 4);
    }

    #[test]
    fn test_record_url_uses_kind() {
        let client = StockroomClient::new("http://localhost:3000");

        assert_eq!(
            client.record_url::<Channel>("upsert-with-lock"),
            "http://localhost:3000/api/channel/upsert-with-lock"
        );
        assert_eq!(
            client.record_url::<Location>("filter"),
            "http://localhost:3000/api/location/filter"
        );
    }
}
