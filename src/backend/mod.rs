pub mod azdo;
pub mod tfs;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::draft::{Draft, TypeDef};
use crate::model::identity::{DestIdentity, SourceIdentity};
use crate::model::work_item::{HistoryEntry, LinkEntry, SourceItem};

/// Saved query as stored on the source collection.
#[derive(Debug, Clone)]
pub struct QueryDefinition {
    pub id: String,
    pub name: String,
    pub wiql: String,
    pub project: String,
}

/// Result of persisting a draft. The first save of an item mints its ID;
/// later saves echo it back.
#[derive(Debug, Clone, Copy)]
pub struct SaveOutcome {
    pub id: i64,
}

/// Read side of a migration: the collection the items come from.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn query_definition(&self, query_id: &str) -> Result<Option<QueryDefinition>>;
    async fn run_query(&self, query: &QueryDefinition) -> Result<Vec<SourceItem>>;
    async fn tags(&self, item_id: i64) -> Result<String>;
    async fn history(&self, item_id: i64) -> Result<Vec<HistoryEntry>>;
    async fn links(&self, item_id: i64) -> Result<Vec<LinkEntry>>;
    async fn identity_by_display_name(&self, display_name: &str)
        -> Result<Option<SourceIdentity>>;
    /// Browser URL of the item in the source collection's web editor.
    fn editor_url(&self, item_id: i64) -> String;
}

/// Write side of a migration: the collection the items land in.
#[async_trait]
pub trait DestClient: Send + Sync {
    /// Field schemas of every work item type in the destination project.
    async fn work_item_types(&self) -> Result<Vec<TypeDef>>;
    /// Persist the draft: create on first save, update after.
    async fn save(&self, draft: &Draft) -> Result<SaveOutcome>;
    async fn identity_by_mail(&self, mail: &str) -> Result<Option<DestIdentity>>;
}
