/// Directory entry on the source collection, keyed by display name.
#[derive(Debug, Clone)]
pub struct SourceIdentity {
    pub display_name: String,
    /// `DOMAIN\alias` form; the alias derives the destination mail address.
    pub unique_name: String,
    pub mail: Option<String>,
}

/// Directory entry on the destination collection, keyed by mail address.
#[derive(Debug, Clone)]
pub struct DestIdentity {
    pub display_name: String,
}
