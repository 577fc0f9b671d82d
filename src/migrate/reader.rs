use tracing::info;

use crate::backend::SourceClient;
use crate::error::MigrateError;
use crate::model::work_item::SourceItem;

/// Look up the saved query, verify it is the one the operator meant, and
/// run it. The name check guards against pasting the wrong query ID.
pub async fn read_query_items(
    source: &dyn SourceClient,
    query_id: &str,
    expected_name: &str,
) -> Result<Vec<SourceItem>, MigrateError> {
    let query = source
        .query_definition(query_id)
        .await?
        .ok_or_else(|| MigrateError::QueryNotFound(query_id.to_string()))?;

    if query.name != expected_name {
        return Err(MigrateError::QueryNameMismatch {
            id: query_id.to_string(),
            actual: query.name,
            expected: expected_name.to_string(),
        });
    }

    info!("Found query '{}'", query.name);
    let items = source.run_query(&query).await?;
    info!("Query run: {}", query.wiql);
    info!("Ran work item query and retrieved results: {}", items.len());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::MockSource;

    #[tokio::test]
    async fn missing_query_is_an_error() {
        let source = MockSource::new();
        let err = read_query_items(&source, "q-123", "Items To Move")
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::QueryNotFound(id) if id == "q-123"));
    }

    #[tokio::test]
    async fn name_mismatch_is_an_error() {
        let source = MockSource::new().with_query("q-123", "Someone Elses Query");
        let err = read_query_items(&source, "q-123", "Items To Move")
            .await
            .unwrap_err();
        match err {
            MigrateError::QueryNameMismatch { id, actual, expected } => {
                assert_eq!(id, "q-123");
                assert_eq!(actual, "Someone Elses Query");
                assert_eq!(expected, "Items To Move");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn matching_query_returns_its_items() {
        let source = MockSource::new()
            .with_query("q-123", "Items To Move")
            .with_item(SourceItem {
                id: 42,
                work_item_type: "Task".to_string(),
                ..SourceItem::default()
            });
        let items = read_query_items(&source, "q-123", "Items To Move")
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 42);
    }
}
