// Repository trait for snapshot data access
use crate::domain::record::{LaundryRecord, RecordFilter};
use async_trait::async_trait;

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Load every record matching the filter's date range and categorical
    /// filters, in one scan. Band filters are applied by the caller after
    /// derivation. Rows with unparseable timestamps are dropped, not errors.
    async fn load_records(&self, filter: &RecordFilter) -> anyhow::Result<Vec<LaundryRecord>>;

    /// Column headers for the preview table, in stored order.
    fn preview_columns(&self) -> Vec<String>;
}
