/// Identity aliases from the source collection get this suffix appended to
/// form the mail address looked up on the destination directory. Override
/// with `WORKLIFT_AAD_DOMAIN` when the tenant uses a different domain.
pub const DEFAULT_DOMAIN_SUFFIX: &str = "@contoso.com";

/// Everything one run needs, captured up front from the command line.
/// Passed by reference to each phase; nothing reads process state after
/// startup.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Source collection URL (on-prem, ambient auth).
    pub source_url: String,
    /// Destination collection URL (hosted, basic auth).
    pub dest_url: String,
    /// Saved-query ID on the source collection selecting the items to copy.
    pub query_id: String,
    /// Expected name of that query; a mismatch aborts the run.
    pub query_name: String,
    /// Sync area and iteration paths before migrating items.
    pub sync_paths: bool,
    /// Copy the query's work items.
    pub migrate_items: bool,
    pub source_project: String,
    pub dest_project: String,
    pub dest_user: String,
    pub dest_password: String,
    /// Mail domain appended to source aliases for destination identity lookup.
    pub domain_suffix: String,
}

pub fn domain_suffix() -> String {
    std::env::var("WORKLIFT_AAD_DOMAIN").unwrap_or_else(|_| DEFAULT_DOMAIN_SUFFIX.to_string())
}
