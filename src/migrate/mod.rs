pub mod fields;
pub mod identity;
pub mod reader;
pub mod replay;

use tracing::{info, warn};

use crate::backend::{DestClient, SourceClient};
use crate::config::MigrationConfig;
use crate::error::MigrateError;
use crate::model::draft::TypeCatalog;
use crate::model::work_item::SourceItem;

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationStats {
    pub total: usize,
    pub migrated: usize,
    pub failed: usize,
}

/// Copy every item the query returns. One bad item is logged and skipped;
/// a bad query or an unreadable destination schema stops the run.
pub async fn run(
    cfg: &MigrationConfig,
    source: &dyn SourceClient,
    dest: &dyn DestClient,
) -> Result<MigrationStats, MigrateError> {
    let items = reader::read_query_items(source, &cfg.query_id, &cfg.query_name).await?;
    let catalog = TypeCatalog::new(dest.work_item_types().await?);
    let resolver = identity::IdentityResolver::new(source, dest, &cfg.domain_suffix);
    let engine = replay::ReplayEngine::new(source, dest, &resolver);

    let mut stats = MigrationStats {
        total: items.len(),
        ..MigrationStats::default()
    };
    for (index, item) in items.iter().enumerate() {
        info!("===========================================================");
        info!(
            "=========== Processing work item {} ({} of {}) ===========",
            item.id,
            index + 1,
            items.len()
        );
        match migrate_item(item, &catalog, cfg, &engine).await {
            Ok(summary) => {
                stats.migrated += 1;
                match summary.dest_id {
                    Some(dest_id) => info!(
                        "*********** Complete processing work item: Src: {} Dest: {} ***********",
                        item.id, dest_id
                    ),
                    None => warn!(
                        "Work item {} produced no destination item (no save landed)",
                        item.id
                    ),
                }
            }
            Err(err) => {
                stats.failed += 1;
                warn!("Work item {} failed to migrate: {err:#}", item.id);
            }
        }
    }
    info!(
        "*********** Migration completed: {} of {} work items ({} failed) ***********",
        stats.migrated, stats.total, stats.failed
    );
    Ok(stats)
}

async fn migrate_item(
    item: &SourceItem,
    catalog: &TypeCatalog,
    cfg: &MigrationConfig,
    engine: &replay::ReplayEngine<'_>,
) -> Result<replay::ReplaySummary, MigrateError> {
    let draft = fields::build_draft(item, catalog, &cfg.source_project, &cfg.dest_project)?;
    engine.run(item, draft).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::{MockDest, MockSource, standard_types};

    fn config() -> MigrationConfig {
        MigrationConfig {
            source_url: "http://tfs.local:8080/tfs/Coll".to_string(),
            dest_url: "https://dest.example/Coll".to_string(),
            query_id: "q-1".to_string(),
            query_name: "Items To Move".to_string(),
            sync_paths: false,
            migrate_items: true,
            source_project: "Src".to_string(),
            dest_project: "Dst".to_string(),
            dest_user: "user".to_string(),
            dest_password: "secret".to_string(),
            domain_suffix: "@contoso.com".to_string(),
        }
    }

    fn task(id: i64) -> SourceItem {
        SourceItem {
            id,
            work_item_type: "Task".to_string(),
            title: format!("Task {id}"),
            state: "Active".to_string(),
            assigned_to: "Not Yet Assigned".to_string(),
            ..SourceItem::default()
        }
    }

    #[tokio::test]
    async fn one_bad_item_does_not_stop_the_run() {
        let mut unknowable = task(2);
        unknowable.work_item_type = "Workitem".to_string();
        unknowable.classification = "Epic".to_string();

        let source = MockSource::new()
            .with_query("q-1", "Items To Move")
            .with_item(task(1))
            .with_item(unknowable)
            .with_item(task(3));
        let dest = MockDest::new(standard_types());

        let stats = run(&config(), &source, &dest).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.migrated, 2);
        assert_eq!(stats.failed, 1);

        // Both good items landed: two saves each (assignee + backlink).
        assert_eq!(dest.saved().len(), 4);
    }

    #[tokio::test]
    async fn distinct_items_get_distinct_destination_ids() {
        let source = MockSource::new()
            .with_query("q-1", "Items To Move")
            .with_item(task(1))
            .with_item(task(2));
        let dest = MockDest::new(standard_types());

        run(&config(), &source, &dest).await.unwrap();
        let saves = dest.saved();
        let first = saves.first().unwrap().id;
        let last = saves.last().unwrap().id;
        assert_ne!(first, last);
    }

    #[tokio::test]
    async fn query_errors_stop_the_run() {
        let source = MockSource::new().with_query("q-1", "Wrong Name");
        let dest = MockDest::new(standard_types());

        let err = run(&config(), &source, &dest).await.unwrap_err();
        assert!(matches!(err, MigrateError::QueryNameMismatch { .. }));
    }
}
