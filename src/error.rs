use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("query {0} does not exist on the source collection")]
    QueryNotFound(String),

    #[error("query {id} is named '{actual}', expected '{expected}'")]
    QueryNameMismatch {
        id: String,
        actual: String,
        expected: String,
    },

    #[error("no source identity found for display name '{0}'")]
    IdentityNotFound(String),

    #[error("destination project '{project}' has no work item type '{type_name}'")]
    UnknownDestinationType { type_name: String, project: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
