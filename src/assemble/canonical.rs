use indexmap::IndexSet;

use crate::error::{AssembleError, Result};
use crate::types::Questionnaire;

/// Collects, in document order, the sub-questionnaire canonicals referenced
/// by the direct children of the form body.
///
/// Fails when the questionnaire has no form body, or when a canonical was
/// already visited in this assembly (or appears twice on this level).
pub fn extract_canonicals(
    questionnaire: &Questionnaire,
    visited: &IndexSet<String>,
) -> Result<Vec<String>> {
    let form = questionnaire
        .form_body()
        .ok_or(AssembleError::InvalidStructure)?;

    let mut canonicals: Vec<String> = Vec::new();
    for canonical in form
        .children()
        .iter()
        .filter_map(|child| child.sub_questionnaire_canonical())
    {
        if visited.contains(canonical) || canonicals.iter().any(|c| c == canonical) {
            return Err(AssembleError::CircularDependency {
                questionnaire: questionnaire.label().to_string(),
                canonical: canonical.to_string(),
            });
        }
        canonicals.push(canonical.to_string());
    }

    Ok(canonicals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Extension, QuestionnaireItem};

    fn modular(children: Vec<QuestionnaireItem>) -> Questionnaire {
        let form = children
            .into_iter()
            .fold(QuestionnaireItem::new("root", "group"), |form, child| form.with_item(child));
        Questionnaire::new().with_id("parent-questionnaire").with_item(form)
    }

    #[test]
    fn collects_references_in_document_order() {
        let questionnaire = modular(vec![
            QuestionnaireItem::sub_questionnaire_ref("a", "http://example.com/sub-questionnaire-1|1.0.0"),
            QuestionnaireItem::new("plain", "string"),
            QuestionnaireItem::sub_questionnaire_ref("b", "http://example.com/sub-questionnaire-2"),
        ]);

        let canonicals = extract_canonicals(&questionnaire, &IndexSet::new()).unwrap();
        assert_eq!(
            canonicals,
            vec![
                "http://example.com/sub-questionnaire-1|1.0.0",
                "http://example.com/sub-questionnaire-2"
            ]
        );
    }

    #[test]
    fn ignores_other_extensions_and_empty_canonicals() {
        let mut no_value = QuestionnaireItem::new("c", "display");
        no_value.extension = Some(vec![Extension::new(crate::types::urls::SUB_QUESTIONNAIRE)]);

        let questionnaire = modular(vec![
            QuestionnaireItem::new("a", "string").with_extension(Extension::variable("x", "1")),
            no_value,
        ]);

        assert!(extract_canonicals(&questionnaire, &IndexSet::new()).unwrap().is_empty());
    }

    #[test]
    fn visited_canonical_is_a_circular_dependency() {
        let questionnaire = modular(vec![QuestionnaireItem::sub_questionnaire_ref(
            "a",
            "http://example.com/sub-questionnaire-1|1.0.0",
        )]);
        let visited = IndexSet::from(["http://example.com/sub-questionnaire-1|1.0.0".to_string()]);

        let error = extract_canonicals(&questionnaire, &visited).unwrap_err();
        assert_eq!(
            error.to_string(),
            "parent-questionnaire contains a circular dependency on the questionnaire http://example.com/sub-questionnaire-1|1.0.0"
        );
    }

    #[test]
    fn repeated_canonical_on_one_level_is_rejected() {
        let questionnaire = modular(vec![
            QuestionnaireItem::sub_questionnaire_ref("a", "http://x/A|1"),
            QuestionnaireItem::sub_questionnaire_ref("b", "http://x/A|1"),
        ]);

        assert!(matches!(
            extract_canonicals(&questionnaire, &IndexSet::new()),
            Err(AssembleError::CircularDependency { .. })
        ));
    }

    #[test]
    fn missing_form_body_is_invalid_structure() {
        let empty = Questionnaire::new();
        assert!(matches!(
            extract_canonicals(&empty, &IndexSet::new()),
            Err(AssembleError::InvalidStructure)
        ));

        let childless = Questionnaire::new().with_item(QuestionnaireItem::new("root", "group"));
        let error = extract_canonicals(&childless, &IndexSet::new()).unwrap_err();
        assert_eq!(error.to_string(), "Root questionnaire does not have a valid item.");
    }
}
