use tracing::warn;

use crate::error::MigrateError;
use crate::model::draft::{Draft, FieldWrite, TypeCatalog};
use crate::model::work_item::SourceItem;

/// Legacy source template collapses several types into this one; the
/// classification field tells them apart.
pub const GENERIC_TYPE: &str = "Workitem";

/// Destination type name for a source item. Items of the generic type map
/// through their classification; anything else passes through unchanged.
/// An unrecognized classification keeps the generic name and fails later
/// against the destination catalog.
pub fn classify(item: &SourceItem) -> &str {
    if item.work_item_type != GENERIC_TYPE {
        return &item.work_item_type;
    }
    match item.classification.as_str() {
        "Task" => "Task",
        "Bug" => "Bug",
        "User Story" => "User Story",
        _ => GENERIC_TYPE,
    }
}

/// Build the destination draft for one source item: pick the type, then
/// copy every migrated field. Fields the destination type does not define
/// are logged and skipped, never fatal.
pub fn build_draft(
    item: &SourceItem,
    catalog: &TypeCatalog,
    source_project: &str,
    dest_project: &str,
) -> Result<Draft, MigrateError> {
    let type_name = classify(item);
    let schema = catalog
        .get(type_name)
        .ok_or_else(|| MigrateError::UnknownDestinationType {
            type_name: type_name.to_string(),
            project: dest_project.to_string(),
        })?;
    let mut draft = Draft::new(schema.clone());

    set_string(&mut draft, item.id, "System.Title", &item.title);
    set_string(
        &mut draft,
        item.id,
        "System.AreaPath",
        &item.area_path.replace(source_project, dest_project),
    );
    set_string(
        &mut draft,
        item.id,
        "System.IterationPath",
        &item.iteration_path.replace(source_project, dest_project),
    );
    set_string(&mut draft, item.id, "System.Description", &item.description);

    set_decimal(&mut draft, item.id, "Priority", &item.priority, 2);

    set_string(&mut draft, item.id, "Random Field 4 name in VSTS", &item.custom4);
    set_string(&mut draft, item.id, "Original Created By", &item.created_by);
    set_string(&mut draft, item.id, "Automation status", &item.automation_status);
    set_string(&mut draft, item.id, "Steps", &item.steps);
    set_string(&mut draft, item.id, "RandomField2", &item.custom2);
    set_string(&mut draft, item.id, "RandomField3", &item.custom3);

    // Bugs keep repro steps in their own field; every other type takes
    // them as the description, replacing whatever was copied above.
    if type_name == "Bug" {
        set_string(
            &mut draft,
            item.id,
            "Microsoft.VSTS.TCM.ReproSteps",
            &item.repro_steps,
        );
    } else {
        set_string(&mut draft, item.id, "System.Description", &item.repro_steps);
    }

    set_decimal(&mut draft, item.id, "Remaining Work", &item.remaining_work, 0);
    set_decimal(
        &mut draft,
        item.id,
        "Original Estimate",
        &item.original_estimate,
        0,
    );
    set_decimal(&mut draft, item.id, "Completed Work", &item.completed_work, 0);
    set_decimal(&mut draft, item.id, "Stack Rank", &item.stack_rank, 0);

    Ok(draft)
}

/// Write a text field, logging when the destination type lacks it.
pub fn set_string(draft: &mut Draft, item_id: i64, field: &str, value: &str) {
    if draft.set(field, value) == FieldWrite::Unavailable {
        warn!(
            "Failed to set field: {field} for work item: {item_id} type: {}",
            draft.type_name()
        );
    }
}

/// Write a numeric field carried as text. Blank values take the default;
/// parseable values are written verbatim, keeping the source's formatting;
/// anything else takes the default with a warning.
pub fn set_decimal(draft: &mut Draft, item_id: i64, field: &str, raw: &str, default: i64) {
    let value = if raw.is_empty() {
        default.to_string()
    } else if raw.parse::<f64>().is_ok() {
        raw.to_owned()
    } else {
        warn!(
            "Non-numeric value '{raw}' in field: {field} for work item: {item_id}, using {default}"
        );
        default.to_string()
    };
    if draft.set(field, value) == FieldWrite::Unavailable {
        warn!(
            "Failed to set field: {field} for work item: {item_id} type: {}",
            draft.type_name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::standard_types;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new(standard_types())
    }

    fn generic_item(classification: &str) -> SourceItem {
        SourceItem {
            id: 11,
            work_item_type: GENERIC_TYPE.to_string(),
            classification: classification.to_string(),
            title: "Sample".to_string(),
            ..SourceItem::default()
        }
    }

    #[test]
    fn generic_type_maps_through_classification() {
        assert_eq!(classify(&generic_item("Task")), "Task");
        assert_eq!(classify(&generic_item("Bug")), "Bug");
        assert_eq!(classify(&generic_item("User Story")), "User Story");
        assert_eq!(classify(&generic_item("Epic")), GENERIC_TYPE);
        assert_eq!(classify(&generic_item("")), GENERIC_TYPE);
    }

    #[test]
    fn concrete_types_pass_through() {
        let item = SourceItem {
            work_item_type: "Test Case".to_string(),
            classification: "Bug".to_string(),
            ..SourceItem::default()
        };
        assert_eq!(classify(&item), "Test Case");
    }

    #[test]
    fn unclassifiable_item_is_an_unknown_type() {
        let err = build_draft(&generic_item("Epic"), &catalog(), "Src", "Dst").unwrap_err();
        match err {
            MigrateError::UnknownDestinationType { type_name, project } => {
                assert_eq!(type_name, GENERIC_TYPE);
                assert_eq!(project, "Dst");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn paths_swap_the_project_name() {
        let item = SourceItem {
            work_item_type: "Task".to_string(),
            area_path: "Contoso-Project\\Team A".to_string(),
            iteration_path: "Contoso-Project\\2015\\Sprint 3".to_string(),
            ..SourceItem::default()
        };
        let draft = build_draft(&item, &catalog(), "Contoso-Project", "Contoso").unwrap();
        assert_eq!(draft.field("System.AreaPath"), Some("Contoso\\Team A"));
        assert_eq!(
            draft.field("System.IterationPath"),
            Some("Contoso\\2015\\Sprint 3")
        );
    }

    #[test]
    fn bug_repro_steps_stay_separate_from_description() {
        let item = SourceItem {
            work_item_type: "Bug".to_string(),
            description: "the description".to_string(),
            repro_steps: "click the thing".to_string(),
            ..SourceItem::default()
        };
        let draft = build_draft(&item, &catalog(), "Src", "Dst").unwrap();
        assert_eq!(
            draft.field("Microsoft.VSTS.TCM.ReproSteps"),
            Some("click the thing")
        );
        assert_eq!(draft.field("System.Description"), Some("the description"));
    }

    #[test]
    fn non_bug_repro_steps_replace_the_description() {
        let item = SourceItem {
            work_item_type: "Task".to_string(),
            description: "the description".to_string(),
            repro_steps: "how it happened".to_string(),
            ..SourceItem::default()
        };
        let draft = build_draft(&item, &catalog(), "Src", "Dst").unwrap();
        assert_eq!(draft.field("System.Description"), Some("how it happened"));
    }

    #[test]
    fn blank_priority_defaults_to_two() {
        let item = SourceItem {
            work_item_type: "Task".to_string(),
            ..SourceItem::default()
        };
        let draft = build_draft(&item, &catalog(), "Src", "Dst").unwrap();
        assert_eq!(draft.field("Priority"), Some("2"));
        assert_eq!(draft.field("Remaining Work"), Some("0"));
    }

    #[test]
    fn numeric_text_is_kept_verbatim() {
        let mut draft = Draft::new(standard_types().remove(0));
        set_decimal(&mut draft, 1, "Remaining Work", "3.50", 0);
        assert_eq!(draft.field("Remaining Work"), Some("3.50"));
    }

    #[test]
    fn non_numeric_text_takes_the_default() {
        let mut draft = Draft::new(standard_types().remove(0));
        set_decimal(&mut draft, 1, "Priority", "high", 2);
        assert_eq!(draft.field("Priority"), Some("2"));
    }

    #[test]
    fn missing_destination_field_is_skipped_quietly() {
        let item = SourceItem {
            work_item_type: "Task".to_string(),
            custom4: "passthrough".to_string(),
            title: "still here".to_string(),
            ..SourceItem::default()
        };
        let draft = build_draft(&item, &catalog(), "Src", "Dst").unwrap();
        assert_eq!(draft.field("Random Field 4 name in VSTS"), None);
        assert_eq!(draft.field("System.Title"), Some("still here"));
    }
}
