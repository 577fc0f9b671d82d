use tracing::{info, warn};

use crate::backend::{DestClient, SourceClient};
use crate::error::MigrateError;
use crate::migrate::fields::set_string;
use crate::migrate::identity::IdentityResolver;
use crate::model::draft::Draft;
use crate::model::work_item::{HistoryEntry, LinkEntry, SourceItem, TagList};

/// What a replay left behind: the destination ID (if any save landed) and
/// how many saves landed.
#[derive(Debug, Clone, Copy)]
pub struct ReplaySummary {
    pub dest_id: Option<i64>,
    pub saves: u32,
}

/// Repair ladder for the final save. Each rung mutates the assignee and
/// retries; a rung whose mutation itself fails is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssigneeFallback {
    AsIs,
    Reresolve,
    Blank,
}

const FINAL_SAVE_LADDER: [AssigneeFallback; 3] = [
    AssigneeFallback::AsIs,
    AssigneeFallback::Reresolve,
    AssigneeFallback::Blank,
];

/// Tracks successful saves of one item and decides when the state
/// correction happens. The correction is applied to the draft right after
/// the first successful save and never again; a dedicated save commits it
/// at the end if it was applied.
#[derive(Debug)]
pub struct CorrectionGate {
    save_count: u32,
    needed: bool,
    corrected: bool,
}

impl CorrectionGate {
    /// Items whose source state is the type's birth state need no follow-up
    /// move; everything else does.
    pub fn new(type_name: &str, state: &str) -> Self {
        let needed = if type_name == "Test Case" {
            state != "Design"
        } else {
            state != "Active"
        };
        Self {
            save_count: 0,
            needed,
            corrected: false,
        }
    }

    /// Count a successful save. True exactly when it was the first one and
    /// a correction is due; the caller then rewrites the draft.
    fn on_saved(&mut self) -> bool {
        self.save_count += 1;
        self.save_count == 1 && self.needed
    }

    fn mark_corrected(&mut self) {
        self.corrected = true;
    }

    pub fn save_count(&self) -> u32 {
        self.save_count
    }

    /// Whether the dedicated final save still has something to commit.
    pub fn commit_due(&self) -> bool {
        self.corrected
    }
}

/// Source states worth carrying over, per destination type. The plain
/// create leaves the type's birth state; these pairs move the item to
/// where the source had it. A resolved task has no Resolved state on the
/// destination's task workflow, so it closes instead. Returns the state to
/// write and whether the assignee is rewritten with it.
fn state_correction(type_name: &str, state: &str) -> Option<(String, bool)> {
    match (type_name, state) {
        ("Test Case", "Ready") => Some((state.to_owned(), true)),
        ("Bug", "Resolved") | ("User Story", "Resolved") => Some((state.to_owned(), true)),
        ("Task", "Resolved") => Some(("Closed".to_owned(), false)),
        _ => None,
    }
}

fn format_history(entry: &HistoryEntry) -> String {
    format!("[{}]: {}", entry.tag_line, entry.comment)
}

fn format_link(item_id: i64, link: &LinkEntry, url: &str) -> String {
    format!(
        "The source work item  {item_id}  was linked ({}) to source work item  <a target='_blank' href='{url}'>{}</a>",
        link.kind, link.target
    )
}

fn format_backlink(item_id: i64, url: &str) -> String {
    format!("The source work item is   <a target='_blank' href='{url}'>{item_id}</a>")
}

/// Replays one source item against the destination: tags and fields ride
/// the first save, then history entries and links each get a save of their
/// own, then the assignee, the backlink and any pending state correction.
pub struct ReplayEngine<'a> {
    source: &'a dyn SourceClient,
    dest: &'a dyn DestClient,
    resolver: &'a IdentityResolver<'a>,
}

impl<'a> ReplayEngine<'a> {
    pub fn new(
        source: &'a dyn SourceClient,
        dest: &'a dyn DestClient,
        resolver: &'a IdentityResolver<'a>,
    ) -> Self {
        Self {
            source,
            dest,
            resolver,
        }
    }

    pub async fn run(
        &self,
        item: &SourceItem,
        mut draft: Draft,
    ) -> Result<ReplaySummary, MigrateError> {
        let mut gate = CorrectionGate::new(draft.type_name(), &item.state);

        let raw_tags = self.source.tags(item.id).await?;
        set_string(&mut draft, item.id, "Tags", &TagList::parse(&raw_tags).join());
        info!("Work item field reading complete");

        let history = self.source.history(item.id).await?;
        for (index, entry) in history.iter().enumerate() {
            info!(
                "Processing work item history item {} of {}",
                index + 1,
                history.len()
            );
            draft.set_comment(format_history(entry));
            if let Err(err) = self.try_save(&mut draft, &mut gate, item).await {
                warn!("Failed saving work item history: {err:#}");
            }
        }
        info!("Work item history processing complete");

        let links = self.source.links(item.id).await?;
        for (index, link) in links.iter().enumerate() {
            info!("Processing work item links {} of {}", index + 1, links.len());
            let url = self.source.editor_url(link.target);
            draft.set_comment(format_link(item.id, link, &url));
            if let Err(err) = self.try_save(&mut draft, &mut gate, item).await {
                warn!("Failed saving work item links: {err:#}");
            }
        }
        info!("Linked work item processing complete");

        // The assignee gets a save of its own so a rejected identity
        // cannot take the backlink down with it.
        match self.resolver.resolve(&item.assigned_to).await {
            Ok(name) => set_string(&mut draft, item.id, "System.AssignedTo", &name),
            Err(err) => {
                warn!(
                    "Failed to set field: AssignedTo for work item: {} ({err:#})",
                    item.id
                );
                set_string(&mut draft, item.id, "System.AssignedTo", "");
            }
        }
        if let Err(err) = self.try_save(&mut draft, &mut gate, item).await {
            warn!("Failed saving work item assignee: {err:#}");
        }

        let url = self.source.editor_url(item.id);
        draft.set_comment(format_backlink(item.id, &url));
        if !self.save_with_fallbacks(&mut draft, &mut gate, item).await {
            warn!(
                "Failed saving work item assigned to and source link, abandoning work item {}",
                item.id
            );
            return Ok(ReplaySummary {
                dest_id: draft.id(),
                saves: gate.save_count(),
            });
        }
        info!("Assigned to and source work item link saved");

        if gate.commit_due() {
            if let Err(err) = self.try_save(&mut draft, &mut gate, item).await {
                warn!("Failed saving work item state move: {err:#}");
            }
        }

        Ok(ReplaySummary {
            dest_id: draft.id(),
            saves: gate.save_count(),
        })
    }

    /// One save attempt. On success the draft is marked saved and, if this
    /// was the first successful save, the state correction is applied for a
    /// later save to commit.
    async fn try_save(
        &self,
        draft: &mut Draft,
        gate: &mut CorrectionGate,
        item: &SourceItem,
    ) -> Result<(), MigrateError> {
        let outcome = self.dest.save(draft).await?;
        draft.mark_saved(outcome.id);
        if gate.on_saved() {
            self.apply_correction(draft, gate, item).await;
        }
        Ok(())
    }

    async fn apply_correction(&self, draft: &mut Draft, gate: &mut CorrectionGate, item: &SourceItem) {
        let Some((state, rewrite_assignee)) = state_correction(draft.type_name(), &item.state)
        else {
            return;
        };
        draft.set_state(state);
        if rewrite_assignee {
            match self.resolver.resolve(&item.assigned_to).await {
                Ok(name) => set_string(draft, item.id, "Assigned To", &name),
                Err(err) => {
                    warn!(
                        "Failed to resolve assignee during state move for work item: {} ({err:#})",
                        item.id
                    );
                    set_string(draft, item.id, "Assigned To", "");
                }
            }
        }
        gate.mark_corrected();
    }

    /// Climb the repair ladder until one save lands. False means every rung
    /// failed and the item is left as its last successful save put it.
    async fn save_with_fallbacks(
        &self,
        draft: &mut Draft,
        gate: &mut CorrectionGate,
        item: &SourceItem,
    ) -> bool {
        for rung in FINAL_SAVE_LADDER {
            match rung {
                AssigneeFallback::AsIs => {}
                AssigneeFallback::Reresolve => {
                    let current = draft
                        .field("System.AssignedTo")
                        .unwrap_or_default()
                        .to_owned();
                    match self.resolver.resolve(&current).await {
                        Ok(name) => set_string(draft, item.id, "System.AssignedTo", &name),
                        Err(err) => {
                            warn!(
                                "Assignee re-resolution failed for work item: {} ({err:#})",
                                item.id
                            );
                            continue;
                        }
                    }
                }
                AssigneeFallback::Blank => set_string(draft, item.id, "System.AssignedTo", ""),
            }
            match self.try_save(draft, gate, item).await {
                Ok(()) => return true,
                Err(err) => warn!(
                    "Final save ({rung:?}) failed for work item: {} ({err:#})",
                    item.id
                ),
            }
        }
        false
    }
}
