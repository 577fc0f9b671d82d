use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{DestClient, SaveOutcome};
use crate::model::draft::{Draft, TypeDef};
use crate::model::identity::DestIdentity;

const API_VERSION: &str = "5.1";
const PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Work item tracking client for the hosted destination collection.
/// Authenticates every request with the alternate credentials the operator
/// passed on the command line.
pub struct AzdoClient {
    base_url: String,
    project: String,
    auth_header: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ProjectList {
    count: u32,
}

#[derive(Deserialize)]
struct TypeList {
    #[serde(default)]
    value: Vec<TypeRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeRow {
    name: String,
    #[serde(default)]
    field_instances: Vec<FieldInstanceRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldInstanceRow {
    reference_name: String,
    name: String,
}

#[derive(Deserialize)]
struct SavedRow {
    id: i64,
}

#[derive(Deserialize)]
struct IdentityList {
    #[serde(default)]
    value: Vec<IdentityRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRow {
    provider_display_name: Option<String>,
    custom_display_name: Option<String>,
}

impl AzdoClient {
    /// Connect with basic credentials and verify they are accepted before
    /// any phase starts.
    pub async fn connect(base_url: &str, project: &str, user: &str, password: &str) -> Result<Self> {
        let creds = format!("{user}:{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
        };
        let url = format!(
            "{}/_apis/projects?api-version={API_VERSION}",
            client.base_url
        );
        let projects: ProjectList = client
            .client
            .get(&url)
            .header("Authorization", &client.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Destination collection request failed")?
            .error_for_status()
            .context("Destination rejected the credentials")?
            .json()
            .await
            .context("Failed to parse destination project list")?;
        info!(
            "Connected to destination collection ({} projects visible)",
            projects.count
        );
        Ok(client)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        self.client
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Destination request failed: {what}"))?
            .error_for_status()
            .with_context(|| format!("Destination rejected request: {what}"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse destination response: {what}"))
    }

    /// Create one area or iteration node under its (already created)
    /// parent. A node that already exists is left alone; iteration dates
    /// are only written on creation.
    pub async fn ensure_node(
        &self,
        group: &str,
        relative_path: &str,
        start: Option<DateTime<Utc>>,
        finish: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let segments: Vec<&str> = relative_path.split('\\').collect();
        let (name, parents) = segments
            .split_last()
            .context("Empty classification node path")?;

        let probe_path: String = segments
            .iter()
            .map(|s| format!("/{}", urlencoding::encode(s)))
            .collect();
        let probe_url = format!(
            "{}/{}/_apis/wit/classificationnodes/{group}{probe_path}?api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(&self.project)
        );
        let probe = self
            .client
            .get(&probe_url)
            .header("Authorization", &self.auth_header)
            .send()
            .await
            .context("Destination node probe failed")?;
        if probe.status().is_success() {
            return Ok(());
        }

        let parent_path: String = parents
            .iter()
            .map(|s| format!("/{}", urlencoding::encode(s)))
            .collect();
        let url = format!(
            "{}/{}/_apis/wit/classificationnodes/{group}{parent_path}?api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(&self.project)
        );

        let mut body = json!({ "name": name });
        if let (Some(start), Some(finish)) = (start, finish) {
            body["attributes"] = json!({
                "startDate": start.to_rfc3339(),
                "finishDate": finish.to_rfc3339(),
            });
        }

        self.client
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("Destination node create failed")?
            .error_for_status()
            .with_context(|| format!("Destination refused to create node '{relative_path}'"))?;
        Ok(())
    }
}

#[async_trait]
impl DestClient for AzdoClient {
    async fn work_item_types(&self) -> Result<Vec<TypeDef>> {
        let url = format!(
            "{}/{}/_apis/wit/workitemtypes?api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(&self.project)
        );
        let list: TypeList = self.get_json(&url, "work item types").await?;
        let types = list
            .value
            .into_iter()
            .map(|row| {
                let mut def = TypeDef::new(row.name);
                for field in row.field_instances {
                    def.add_field(&field.reference_name, &field.name);
                }
                def
            })
            .collect();
        Ok(types)
    }

    async fn save(&self, draft: &Draft) -> Result<SaveOutcome> {
        let ops = patch_ops(draft);

        let request = match draft.id() {
            // First save creates the item under its type; the `$` prefix is
            // part of the route.
            None => self.client.post(format!(
                "{}/{}/_apis/wit/workitems/${}?api-version={API_VERSION}",
                self.base_url,
                urlencoding::encode(&self.project),
                urlencoding::encode(draft.type_name())
            )),
            Some(id) => self.client.patch(format!(
                "{}/_apis/wit/workitems/{id}?api-version={API_VERSION}",
                self.base_url
            )),
        };

        let saved: SavedRow = request
            .header("Authorization", &self.auth_header)
            .header("Content-Type", PATCH_CONTENT_TYPE)
            .header("Accept", "application/json")
            .body(serde_json::to_vec(&ops).context("Failed to encode save")?)
            .send()
            .await
            .context("Destination save request failed")?
            .error_for_status()
            .context("Destination rejected the save")?
            .json()
            .await
            .context("Failed to parse save response")?;
        Ok(SaveOutcome { id: saved.id })
    }

    async fn identity_by_mail(&self, mail: &str) -> Result<Option<DestIdentity>> {
        let url = format!(
            "{}/_apis/identities?searchFilter=MailAddress&filterValue={}&api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(mail)
        );
        let list: IdentityList = self.get_json(&url, "identity lookup").await?;
        Ok(list.value.into_iter().next().map(|row| DestIdentity {
            display_name: row
                .custom_display_name
                .or(row.provider_display_name)
                .unwrap_or_default(),
        }))
    }
}

/// JSON Patch document for one save: every accumulated field, then the
/// state override and pending history comment when present.
fn patch_ops(draft: &Draft) -> Vec<serde_json::Value> {
    let mut ops = Vec::new();
    for (reference, value) in draft.fields() {
        ops.push(json!({
            "op": "add",
            "path": format!("/fields/{reference}"),
            "value": value,
        }));
    }
    if let Some(state) = draft.state() {
        ops.push(json!({
            "op": "add",
            "path": "/fields/System.State",
            "value": state,
        }));
    }
    if let Some(comment) = draft.comment() {
        ops.push(json!({
            "op": "add",
            "path": "/fields/System.History",
            "value": comment,
        }));
    }
    ops
}
