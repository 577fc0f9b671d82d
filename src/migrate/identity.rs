use tracing::info;

use crate::backend::{DestClient, SourceClient};
use crate::error::MigrateError;

/// Placeholder assignee some source templates use instead of an empty
/// field. Matched by substring because the source decorates it with the
/// project name.
const UNASSIGNED_SENTINEL: &str = "Not Yet Assigned";

/// Maps a source display name to the display name the destination
/// directory knows, going through the account alias and mail address.
pub struct IdentityResolver<'a> {
    source: &'a dyn SourceClient,
    dest: &'a dyn DestClient,
    domain_suffix: &'a str,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(
        source: &'a dyn SourceClient,
        dest: &'a dyn DestClient,
        domain_suffix: &'a str,
    ) -> Self {
        Self {
            source,
            dest,
            domain_suffix,
        }
    }

    /// Resolve a display name. The sentinel resolves to the empty string
    /// without touching either directory. A destination match wins; with
    /// none, the source's own display name is kept.
    pub async fn resolve(&self, display_name: &str) -> Result<String, MigrateError> {
        if display_name.contains(UNASSIGNED_SENTINEL) {
            return Ok(String::new());
        }

        let identity = self
            .source
            .identity_by_display_name(display_name)
            .await?
            .ok_or_else(|| MigrateError::IdentityNotFound(display_name.to_string()))?;

        let alias = alias_of(&identity.unique_name);
        let mail = format!("{alias}{}", self.domain_suffix);
        let dest_identity = self.dest.identity_by_mail(&mail).await?;

        info!(
            "User {display_name} resolved to email address: {mail}, directory mail: {}, source: {}, destination: {}",
            identity.mail.as_deref().unwrap_or("(none)"),
            identity.display_name,
            dest_identity
                .as_ref()
                .map_or("(no mail-based match)", |i| i.display_name.as_str()),
        );

        Ok(dest_identity
            .map(|i| i.display_name)
            .unwrap_or(identity.display_name))
    }
}

/// Account alias from a `DOMAIN\alias` unique name. Leading separators are
/// trimmed; a name without a separator is used whole.
fn alias_of(unique_name: &str) -> &str {
    match unique_name.find('\\') {
        Some(idx) => unique_name[idx..].trim_start_matches('\\'),
        None => unique_name,
    }
}
