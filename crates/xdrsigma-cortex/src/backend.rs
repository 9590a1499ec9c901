//! XQL query rendering for transformed rules.
//!
//! The backend runs each rule through the Cortex XDR pipeline with a fresh
//! state, renders its detection tree into an XQL filter expression, prefixes
//! the dataset or preset stage recorded in pipeline state and finally runs
//! the query post-processors.

use xdrsigma_pipeline::{Pipeline, PipelineError, PipelineState, Query, Result};
use xdrsigma_rule::{
    ConditionExpr, Detection, DetectionItem, Modifier, Quantifier, SigmaCollection, SigmaRule,
    SigmaValue,
};

use crate::pipeline::cortexxdr_pipeline;

/// Sigma-to-XQL conversion backend for Cortex XDR.
#[derive(Debug)]
pub struct XqlBackend {
    pipeline: Pipeline,
}

impl Default for XqlBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of converting a batch: queries for accepted rules, per-rule
/// errors for rejected ones. A rejected rule never aborts the batch.
#[derive(Debug, Default)]
pub struct ConversionResult {
    pub queries: Vec<String>,
    pub errors: Vec<(String, PipelineError)>,
}

impl XqlBackend {
    pub fn new() -> Self {
        XqlBackend {
            pipeline: cortexxdr_pipeline(),
        }
    }

    /// Convert a single rule into an XQL query string.
    pub fn convert_rule(&self, rule: &SigmaRule) -> Result<String> {
        let mut rule = rule.clone();
        let mut state = PipelineState::new();
        self.pipeline.apply(&mut rule, &mut state)?;

        let filter = render_conditions(&rule)?;
        let rendered = match state.get("dataset_preset").and_then(|v| v.as_str()) {
            Some(index) => match index.split_once("::") {
                Some((kind, name)) => format!("{kind} = {name} | filter {filter}"),
                None => format!("dataset = {index} | filter {filter}"),
            },
            None => filter,
        };

        let query = self.pipeline.postprocess(&rule, Query::Text(rendered))?;
        Ok(query.to_string())
    }

    /// Convert a parsed collection, collecting per-rule errors.
    pub fn convert_collection(&self, collection: &SigmaCollection) -> ConversionResult {
        let mut result = ConversionResult::default();
        for rule in &collection.rules {
            match self.convert_rule(rule) {
                Ok(query) => result.queries.push(query),
                Err(err) => result.errors.push((rule.title.clone(), err)),
            }
        }
        result
    }
}

// =============================================================================
// Condition rendering
// =============================================================================

fn render_conditions(rule: &SigmaRule) -> Result<String> {
    let rendered: Vec<String> = rule
        .detection
        .conditions
        .iter()
        .map(|cond| render_condition(cond, rule))
        .collect::<Result<_>>()?;

    match rendered.len() {
        0 => Err(PipelineError::Conversion(format!(
            "rule \"{}\" has no condition",
            rule.title
        ))),
        1 => Ok(rendered.into_iter().next().unwrap_or_default()),
        _ => Ok(format!("({})", rendered.join(" or "))),
    }
}

fn render_condition(expr: &ConditionExpr, rule: &SigmaRule) -> Result<String> {
    match expr {
        ConditionExpr::Identifier(name) => {
            let detection = rule.detection.named.get(name).ok_or_else(|| {
                PipelineError::Conversion(format!("condition references unknown detection {name}"))
            })?;
            render_detection(detection)
        }

        ConditionExpr::And(parts) => render_parts(parts, rule, " and "),
        ConditionExpr::Or(parts) => render_parts(parts, rule, " or "),

        ConditionExpr::Not(inner) => Ok(format!("not ({})", render_condition(inner, rule)?)),

        ConditionExpr::Selector {
            quantifier,
            pattern,
        } => {
            let mut names: Vec<&String> = rule
                .detection
                .named
                .keys()
                .filter(|name| pattern.matches(name))
                .collect();
            names.sort();

            if names.is_empty() {
                return Err(PipelineError::Conversion(
                    "condition selector matched no detections".to_string(),
                ));
            }

            let parts: Vec<ConditionExpr> = names
                .into_iter()
                .map(|name| ConditionExpr::Identifier(name.clone()))
                .collect();

            match quantifier {
                Quantifier::Any => render_parts(&parts, rule, " or "),
                Quantifier::All => render_parts(&parts, rule, " and "),
                Quantifier::Count(n) => Err(PipelineError::Conversion(format!(
                    "counted selectors ({n} of ...) are not supported by the XQL backend"
                ))),
            }
        }
    }
}

fn render_parts(parts: &[ConditionExpr], rule: &SigmaRule, sep: &str) -> Result<String> {
    let rendered: Vec<String> = parts
        .iter()
        .map(|part| render_condition(part, rule))
        .collect::<Result<_>>()?;
    if rendered.len() == 1 {
        Ok(rendered.into_iter().next().unwrap_or_default())
    } else {
        Ok(format!("({})", rendered.join(sep)))
    }
}

// =============================================================================
// Detection rendering
// =============================================================================

fn render_detection(detection: &Detection) -> Result<String> {
    match detection {
        Detection::Item(item) => render_item(item),
        Detection::AllOf(subs) => render_subs(subs, " and "),
        Detection::AnyOf(subs) => render_subs(subs, " or "),
        Detection::Keywords(_) => Err(PipelineError::Conversion(
            "keyword detections are not supported by the XQL backend".to_string(),
        )),
    }
}

fn render_subs(subs: &[Detection], sep: &str) -> Result<String> {
    let rendered: Vec<String> = subs.iter().map(render_detection).collect::<Result<_>>()?;
    if rendered.len() == 1 {
        Ok(rendered.into_iter().next().unwrap_or_default())
    } else {
        Ok(format!("({})", rendered.join(sep)))
    }
}

fn render_item(item: &DetectionItem) -> Result<String> {
    let field = item.field.as_deref().ok_or_else(|| {
        PipelineError::Conversion("detection item without a field name".to_string())
    })?;

    if item.modifiers.contains(&Modifier::Exists) {
        return Ok(format!("{field} != null"));
    }

    if item.values.is_empty() {
        return Err(PipelineError::Conversion(format!(
            "detection item for field {field} has no values"
        )));
    }

    // Plain equality over several values collapses to a membership test.
    if item.values.len() > 1 && !item.values_linked_all() && comparison_op(item).is_none() {
        let values: Vec<String> = item.values.iter().map(render_value).collect();
        return Ok(format!("{field} in ({})", values.join(", ")));
    }

    let sep = if item.values_linked_all() { " and " } else { " or " };
    let rendered: Vec<String> = item
        .values
        .iter()
        .map(|value| render_comparison(field, item, value))
        .collect();
    if rendered.len() == 1 {
        Ok(rendered.into_iter().next().unwrap_or_default())
    } else {
        Ok(format!("({})", rendered.join(sep)))
    }
}

fn comparison_op(item: &DetectionItem) -> Option<&'static str> {
    for modifier in &item.modifiers {
        let op = match modifier {
            Modifier::Gt => "gt",
            Modifier::Gte => "gte",
            Modifier::Lt => "lt",
            Modifier::Lte => "lte",
            Modifier::Contains => "contains",
            Modifier::Re => "~=",
            Modifier::StartsWith | Modifier::EndsWith => "=",
            _ => continue,
        };
        return Some(op);
    }
    None
}

fn render_comparison(field: &str, item: &DetectionItem, value: &SigmaValue) -> String {
    if value.is_null() {
        return format!("{field} = null");
    }

    if item.modifiers.contains(&Modifier::StartsWith) {
        return format!("{field} = \"{}*\"", escape_string(&value.to_string()));
    }
    if item.modifiers.contains(&Modifier::EndsWith) {
        return format!("{field} = \"*{}\"", escape_string(&value.to_string()));
    }

    let op = comparison_op(item).unwrap_or("=");
    match op {
        "contains" | "~=" => {
            format!("{field} {op} \"{}\"", escape_string(&value.to_string()))
        }
        _ => format!("{field} {op} {}", render_value(value)),
    }
}

fn render_value(value: &SigmaValue) -> String {
    match value {
        SigmaValue::String(s) => format!("\"{}\"", escape_string(s)),
        SigmaValue::Integer(i) => i.to_string(),
        SigmaValue::Float(x) => x.to_string(),
        SigmaValue::Bool(b) => b.to_string(),
        SigmaValue::Null => "null".to_string(),
    }
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(field: &str, modifiers: Vec<Modifier>, values: Vec<SigmaValue>) -> DetectionItem {
        DetectionItem {
            field: Some(field.to_string()),
            modifiers,
            values,
        }
    }

    #[test]
    fn test_render_plain_equality() {
        let rendered = render_item(&item(
            "action_process_image_path",
            vec![],
            vec![SigmaValue::String("C:\\Windows\\cmd.exe".to_string())],
        ))
        .unwrap();
        assert_eq!(
            rendered,
            r#"action_process_image_path = "C:\\Windows\\cmd.exe""#
        );
    }

    #[test]
    fn test_render_membership() {
        let rendered = render_item(&item(
            "action_process_integrity_level",
            vec![],
            vec![
                SigmaValue::String("LOW".to_string()),
                SigmaValue::String("HIGH".to_string()),
            ],
        ))
        .unwrap();
        assert_eq!(
            rendered,
            r#"action_process_integrity_level in ("LOW", "HIGH")"#
        );
    }

    #[test]
    fn test_render_contains_all() {
        let rendered = render_item(&item(
            "action_process_image_command_line",
            vec![Modifier::Contains, Modifier::All],
            vec![
                SigmaValue::String("-enc".to_string()),
                SigmaValue::String("-nop".to_string()),
            ],
        ))
        .unwrap();
        assert_eq!(
            rendered,
            r#"(action_process_image_command_line contains "-enc" and action_process_image_command_line contains "-nop")"#
        );
    }

    #[test]
    fn test_render_endswith_and_comparisons() {
        let rendered = render_item(&item(
            "action_process_image_path",
            vec![Modifier::EndsWith],
            vec![SigmaValue::String("\\whoami.exe".to_string())],
        ))
        .unwrap();
        assert_eq!(rendered, r#"action_process_image_path = "*\\whoami.exe""#);

        let rendered = render_item(&item(
            "action_local_port",
            vec![Modifier::Gte],
            vec![SigmaValue::Integer(49152)],
        ))
        .unwrap();
        assert_eq!(rendered, "action_local_port gte 49152");
    }

    #[test]
    fn test_render_exists_and_null() {
        let rendered = render_item(&item(
            "action_registry_data",
            vec![Modifier::Exists],
            vec![SigmaValue::Bool(true)],
        ))
        .unwrap();
        assert_eq!(rendered, "action_registry_data != null");

        let rendered = render_item(&item(
            "action_registry_data",
            vec![],
            vec![SigmaValue::Null],
        ))
        .unwrap();
        assert_eq!(rendered, "action_registry_data = null");
    }

    #[test]
    fn test_keywords_rejected() {
        let err = render_detection(&Detection::Keywords(vec![SigmaValue::String(
            "mimikatz".to_string(),
        )]))
        .unwrap_err();
        assert!(matches!(err, PipelineError::Conversion(_)));
    }
}
