use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{QueryDefinition, SourceClient};
use crate::model::identity::SourceIdentity;
use crate::model::work_item::{HistoryEntry, LinkEntry, LinkKind, SourceItem};
use crate::paths::PathNode;

const API_VERSION: &str = "4.1";
/// The batch read endpoint caps how many IDs one request may carry.
const READ_BATCH: usize = 200;

/// Work item tracking client for the on-prem source collection. Requests
/// ride the ambient network credentials; no header auth is sent.
pub struct TfsClient {
    base_url: String,
    project: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ProjectList {
    count: u32,
}

#[derive(Deserialize)]
struct QueryRow {
    id: String,
    name: String,
    wiql: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResponse {
    #[serde(default)]
    work_items: Vec<WiqlRef>,
}

#[derive(Deserialize)]
struct WiqlRef {
    id: i64,
}

#[derive(Deserialize)]
struct WorkItemBatch {
    #[serde(default)]
    value: Vec<WorkItemRow>,
}

#[derive(Deserialize)]
struct WorkItemRow {
    id: i64,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    relations: Vec<RelationRow>,
}

#[derive(Deserialize)]
struct RelationRow {
    rel: String,
    url: String,
}

#[derive(Deserialize)]
struct RevisionList {
    #[serde(default)]
    value: Vec<RevisionRow>,
}

#[derive(Deserialize)]
struct RevisionRow {
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
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
    #[serde(default)]
    properties: serde_json::Value,
}

impl TfsClient {
    /// Connect and verify the collection answers before any phase starts.
    pub async fn connect(base_url: &str, project: &str) -> Result<Self> {
        let client = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            client: reqwest::Client::new(),
        };
        let url = format!(
            "{}/_apis/projects?api-version={API_VERSION}",
            client.base_url
        );
        let projects: ProjectList = client
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Source collection request failed")?
            .error_for_status()
            .context("Source collection rejected the connection")?
            .json()
            .await
            .context("Failed to parse source project list")?;
        info!(
            "Connected to source collection ({} projects visible)",
            projects.count
        );
        Ok(client)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        self.client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Source request failed: {what}"))?
            .error_for_status()
            .with_context(|| format!("Source rejected request: {what}"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse source response: {what}"))
    }

    /// Area or iteration tree of the source project, fully expanded.
    pub async fn classification_tree(&self, group: &str) -> Result<PathNode> {
        let url = format!(
            "{}/{}/_apis/wit/classificationnodes/{group}?$depth=100&api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(&self.project)
        );
        self.get_json(&url, "classification nodes").await
    }

    async fn read_batch(&self, ids: &[i64]) -> Result<Vec<WorkItemRow>> {
        let joined = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/_apis/wit/workitems?ids={joined}&api-version={API_VERSION}",
            self.base_url
        );
        let batch: WorkItemBatch = self.get_json(&url, "work item fields").await?;
        Ok(batch.value)
    }
}

#[async_trait]
impl SourceClient for TfsClient {
    async fn query_definition(&self, query_id: &str) -> Result<Option<QueryDefinition>> {
        let url = format!(
            "{}/{}/_apis/wit/queries/{}?$expand=wiql&api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(&self.project),
            urlencoding::encode(query_id)
        );
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Source query lookup failed")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let row: QueryRow = resp
            .error_for_status()
            .context("Source rejected the query lookup")?
            .json()
            .await
            .context("Failed to parse query definition")?;
        Ok(Some(QueryDefinition {
            id: row.id,
            name: row.name,
            wiql: row.wiql.unwrap_or_default(),
            project: self.project.clone(),
        }))
    }

    async fn run_query(&self, query: &QueryDefinition) -> Result<Vec<SourceItem>> {
        let url = format!(
            "{}/{}/_apis/wit/wiql?api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(&query.project)
        );
        let result: WiqlResponse = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&json!({ "query": query.wiql }))
            .send()
            .await
            .context("Source query run failed")?
            .error_for_status()
            .context("Source rejected the query run")?
            .json()
            .await
            .context("Failed to parse query results")?;

        let ids: Vec<i64> = result.work_items.iter().map(|r| r.id).collect();
        let mut by_id = std::collections::HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(READ_BATCH) {
            for row in self.read_batch(chunk).await? {
                by_id.insert(row.id, source_item_from_row(row));
            }
        }

        // Batch reads may reorder; the query's own order is the contract.
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(&id) {
                Some(item) => {
                    info!("=========== Read work item: {id} ===========");
                    items.push(item);
                }
                None => warn!("Query returned work item {id} but the field read lost it"),
            }
        }
        Ok(items)
    }

    async fn tags(&self, item_id: i64) -> Result<String> {
        let url = format!(
            "{}/_apis/wit/workitems/{item_id}?fields=System.Tags&api-version={API_VERSION}",
            self.base_url
        );
        let row: WorkItemRow = self.get_json(&url, "work item tags").await?;
        Ok(read_field(&row.fields, "System.Tags"))
    }

    async fn history(&self, item_id: i64) -> Result<Vec<HistoryEntry>> {
        let url = format!(
            "{}/_apis/wit/workitems/{item_id}/revisions?api-version={API_VERSION}",
            self.base_url
        );
        let revisions: RevisionList = self.get_json(&url, "work item revisions").await?;
        let entries = revisions
            .value
            .iter()
            .filter_map(|rev| {
                let comment = read_field(&rev.fields, "System.History");
                if comment.is_empty() {
                    return None;
                }
                let changed_by = read_field(&rev.fields, "System.ChangedBy");
                let changed_date = read_field(&rev.fields, "System.ChangedDate");
                Some(HistoryEntry {
                    tag_line: format!("{changed_by} on {changed_date}"),
                    comment,
                })
            })
            .collect();
        Ok(entries)
    }

    async fn links(&self, item_id: i64) -> Result<Vec<LinkEntry>> {
        let url = format!(
            "{}/_apis/wit/workitems/{item_id}?$expand=relations&api-version={API_VERSION}",
            self.base_url
        );
        let row: WorkItemRow = self.get_json(&url, "work item relations").await?;
        let links = row
            .relations
            .iter()
            .filter_map(|relation| {
                let kind = LinkKind::from_name(link_kind_name(&relation.rel)?)?;
                let target = relation.url.rsplit('/').next()?.parse().ok()?;
                Some(LinkEntry { kind, target })
            })
            .collect();
        Ok(links)
    }

    async fn identity_by_display_name(
        &self,
        display_name: &str,
    ) -> Result<Option<SourceIdentity>> {
        let url = format!(
            "{}/_apis/identities?searchFilter=DisplayName&filterValue={}&api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(display_name)
        );
        let list: IdentityList = self.get_json(&url, "identity lookup").await?;
        let Some(row) = list.value.into_iter().next() else {
            return Ok(None);
        };

        let domain = identity_prop(&row.properties, "Domain");
        let account = identity_prop(&row.properties, "Account");
        let unique_name = match (&domain, &account) {
            (Some(domain), Some(account)) => format!("{domain}\\{account}"),
            (None, Some(account)) => account.clone(),
            _ => String::new(),
        };
        Ok(Some(SourceIdentity {
            display_name: row
                .custom_display_name
                .or(row.provider_display_name)
                .unwrap_or_else(|| display_name.to_string()),
            unique_name,
            mail: identity_prop(&row.properties, "Mail"),
        }))
    }

    fn editor_url(&self, item_id: i64) -> String {
        format!("{}/web/wi.aspx?id={item_id}", self.base_url)
    }
}

fn link_kind_name(rel: &str) -> Option<&'static str> {
    match rel {
        "System.LinkTypes.Hierarchy-Reverse" => Some("Parent"),
        "System.LinkTypes.Hierarchy-Forward" => Some("Child"),
        "System.LinkTypes.Related" => Some("Related"),
        _ => None,
    }
}

/// Field values arrive as strings or numbers; everything narrows to the
/// string the copy stage works with. Missing fields read as empty,
/// matching how optional fields behave across type schemas.
fn read_field(fields: &serde_json::Map<String, serde_json::Value>, name: &str) -> String {
    let Some(value) = fields.get(name) else {
        debug!("Field does not exist: {name}");
        return String::new();
    };
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Identity fields come as `Display Name <DOMAIN\alias>` strings on older
/// collections and as identity objects on newer ones; either way only the
/// display name is wanted.
fn read_identity_field(fields: &serde_json::Map<String, serde_json::Value>, name: &str) -> String {
    let Some(value) = fields.get(name) else {
        debug!("Field does not exist: {name}");
        return String::new();
    };
    match value {
        serde_json::Value::String(text) => display_name_of(text).to_string(),
        serde_json::Value::Object(map) => map
            .get("displayName")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn display_name_of(raw: &str) -> &str {
    if raw.ends_with('>') {
        if let Some(idx) = raw.rfind(" <") {
            return &raw[..idx];
        }
    }
    raw
}

fn identity_prop(properties: &serde_json::Value, key: &str) -> Option<String> {
    properties
        .get(key)?
        .get("$value")?
        .as_str()
        .map(str::to_owned)
}

fn source_item_from_row(row: WorkItemRow) -> SourceItem {
    let fields = &row.fields;
    SourceItem {
        id: row.id,
        work_item_type: read_field(fields, "System.WorkItemType"),
        title: read_field(fields, "System.Title"),
        area_path: read_field(fields, "System.AreaPath"),
        iteration_path: read_field(fields, "System.IterationPath"),
        created_by: read_identity_field(fields, "System.CreatedBy"),
        description: read_field(fields, "System.Description"),
        assigned_to: read_identity_field(fields, "System.AssignedTo"),
        priority: read_field(fields, "Microsoft.VSTS.Common.Priority"),
        classification: read_field(fields, "RandomField1"),
        repro_steps: read_field(fields, "Microsoft.VSTS.TCM.ReproSteps"),
        state: read_field(fields, "System.State"),
        remaining_work: read_field(fields, "Microsoft.VSTS.Scheduling.RemainingWork"),
        completed_work: read_field(fields, "Microsoft.VSTS.Scheduling.CompletedWork"),
        original_estimate: read_field(fields, "Microsoft.VSTS.Scheduling.OriginalEstimate"),
        stack_rank: read_field(fields, "Microsoft.VSTS.Common.StackRank"),
        automation_status: read_field(fields, "Microsoft.VSTS.TCM.AutomationStatus"),
        steps: read_field(fields, "Microsoft.VSTS.TCM.Steps"),
        custom2: read_field(fields, "RandomField2"),
        custom3: read_field(fields, "RandomField3"),
        custom4: read_field(fields, "RandomField4"),
    }
}
