use std::collections::BTreeMap;

/// Field schema of one destination work item type. Each field is reachable
/// by its reference name and by its friendly name; both resolve to the
/// reference name, so writes through either alias land on the same slot.
#[derive(Debug, Clone)]
pub struct TypeDef {
    name: String,
    aliases: BTreeMap<String, String>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn add_field(&mut self, reference: &str, friendly: &str) {
        self.aliases
            .insert(reference.to_owned(), reference.to_owned());
        self.aliases
            .insert(friendly.to_owned(), reference.to_owned());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }
}

/// Work item types of one destination project, fetched once per run.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: BTreeMap<String, TypeDef>,
}

impl TypeCatalog {
    pub fn new(types: Vec<TypeDef>) -> Self {
        Self {
            types: types
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDef> {
        self.types.get(type_name)
    }
}

/// Outcome of a draft field write. A field the destination type does not
/// define is reported, not silently dropped and not an error.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWrite {
    Applied,
    Unavailable,
}

/// In-memory destination work item under construction. Accumulates field
/// values, an optional state override and a pending history comment; each
/// successful save flushes the comment and (first time) pins the ID.
#[derive(Debug, Clone)]
pub struct Draft {
    schema: TypeDef,
    id: Option<i64>,
    fields: BTreeMap<String, String>,
    state: Option<String>,
    comment: Option<String>,
}

impl Draft {
    pub fn new(schema: TypeDef) -> Self {
        Self {
            schema,
            id: None,
            fields: BTreeMap::new(),
            state: None,
            comment: None,
        }
    }

    pub fn type_name(&self) -> &str {
        self.schema.name()
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Write a field by reference or friendly name.
    pub fn set(&mut self, alias: &str, value: impl Into<String>) -> FieldWrite {
        match self.schema.resolve(alias) {
            Some(reference) => {
                self.fields.insert(reference.to_owned(), value.into());
                FieldWrite::Applied
            }
            None => FieldWrite::Unavailable,
        }
    }

    pub fn field(&self, alias: &str) -> Option<&str> {
        let reference = self.schema.resolve(alias)?;
        self.fields.get(reference).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Override the state the next save writes. New items otherwise keep the
    /// destination type's default state.
    pub fn set_state(&mut self, state: impl Into<String>) {
        self.state = Some(state.into());
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Queue a history comment for the next save.
    pub fn set_comment(&mut self, text: impl Into<String>) {
        self.comment = Some(text.into());
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Record a successful save: pin the destination ID on first save and
    /// drop the flushed comment so it is not written twice.
    pub fn mark_saved(&mut self, id: i64) {
        self.id.get_or_insert(id);
        self.comment = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_type() -> TypeDef {
        let mut def = TypeDef::new("Task");
        def.add_field("System.Title", "Title");
        def.add_field("System.AssignedTo", "Assigned To");
        def.add_field("Microsoft.VSTS.Common.Priority", "Priority");
        def
    }

    #[test]
    fn friendly_and_reference_writes_share_a_slot() {
        let mut draft = Draft::new(task_type());
        assert_eq!(draft.set("Assigned To", "Ada Lovelace"), FieldWrite::Applied);
        assert_eq!(draft.field("System.AssignedTo"), Some("Ada Lovelace"));

        assert_eq!(draft.set("System.AssignedTo", ""), FieldWrite::Applied);
        assert_eq!(draft.field("Assigned To"), Some(""));
        assert_eq!(draft.fields().count(), 1);
    }

    #[test]
    fn unknown_field_reports_unavailable() {
        let mut draft = Draft::new(task_type());
        assert_eq!(
            draft.set("Microsoft.VSTS.TCM.ReproSteps", "steps"),
            FieldWrite::Unavailable
        );
        assert_eq!(draft.field("Microsoft.VSTS.TCM.ReproSteps"), None);
    }

    #[test]
    fn mark_saved_pins_first_id_and_flushes_comment() {
        let mut draft = Draft::new(task_type());
        draft.set_comment("first entry");
        draft.mark_saved(501);
        assert_eq!(draft.id(), Some(501));
        assert_eq!(draft.comment(), None);

        draft.set_comment("second entry");
        draft.mark_saved(999);
        assert_eq!(draft.id(), Some(501));
        assert_eq!(draft.comment(), None);
    }

    #[test]
    fn state_is_default_until_overridden() {
        let mut draft = Draft::new(task_type());
        assert_eq!(draft.state(), None);
        draft.set_state("Closed");
        assert_eq!(draft.state(), Some("Closed"));
    }
}
