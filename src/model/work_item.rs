use std::fmt;

/// One row of source work item data, every field already read as a string.
/// Fields the source type does not define arrive as empty strings; copy
/// decisions happen later, against the destination type's schema.
#[derive(Debug, Clone, Default)]
pub struct SourceItem {
    pub id: i64,
    pub work_item_type: String,
    pub title: String,
    pub area_path: String,
    pub iteration_path: String,
    pub created_by: String,
    pub description: String,
    pub assigned_to: String,
    pub priority: String,
    /// Disambiguates the source's generic type into a concrete one.
    pub classification: String,
    pub repro_steps: String,
    pub state: String,
    pub remaining_work: String,
    pub completed_work: String,
    pub original_estimate: String,
    pub stack_rank: String,
    pub automation_status: String,
    pub steps: String,
    pub custom2: String,
    pub custom3: String,
    pub custom4: String,
}

/// One revision's history comment, paired with the attribution line the
/// source renders for that revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub tag_line: String,
    pub comment: String,
}

/// The only relationship kinds that get replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Parent,
    Child,
    Related,
}

impl LinkKind {
    /// Other link kinds (Predecessor, Successor, Duplicate, ...) are dropped.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Parent" => Some(Self::Parent),
            "Child" => Some(Self::Child),
            "Related" => Some(Self::Related),
            _ => None,
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parent => "Parent",
            Self::Child => "Child",
            Self::Related => "Related",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub kind: LinkKind,
    pub target: i64,
}

/// Tag lists travel as a single `;`-delimited string. Splitting does not
/// trim, so a string that was never edited joins back to itself exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList(pub Vec<String>);

impl TagList {
    pub fn parse(raw: &str) -> Self {
        Self(raw.split(';').map(str::to_owned).collect())
    }

    pub fn join(&self) -> String {
        self.0.join(";")
    }
}
