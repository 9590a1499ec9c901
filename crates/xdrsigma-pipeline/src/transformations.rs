//! Transformations that mutate `SigmaRule` AST nodes.
//!
//! Each variant carries its configuration and is applied via
//! [`Transformation::apply`]. Guard variants (`RuleFailure`,
//! `DetectionItemFailure`) reject the rule instead of transforming it.

use std::collections::HashMap;

use xdrsigma_rule::{ConditionExpr, Detection, DetectionItem, SigmaRule, SigmaValue};

use crate::conditions::{FieldNameCondition, field_conditions_match};
use crate::error::{PipelineError, Result};
use crate::state::PipelineState;

/// All supported transformation types.
#[derive(Debug, Clone)]
pub enum Transformation {
    /// Map field names via a lookup table. A field mapped to several target
    /// names expands into a disjunction over all targets with the original
    /// value preserved.
    FieldMapping {
        mapping: HashMap<String, Vec<String>>,
    },

    /// AND additional field=value conditions onto the rule's detection.
    /// Conditions are ordered so rendered queries stay deterministic.
    AddCondition {
        conditions: Vec<(String, SigmaValue)>,
        negated: bool,
    },

    /// Replace logsource fields.
    ChangeLogsource {
        category: Option<String>,
        product: Option<String>,
        service: Option<String>,
    },

    /// Set a key-value pair in pipeline state.
    SetState {
        key: String,
        value: serde_json::Value,
    },

    /// Reject the rule with the given message.
    RuleFailure { message: String },

    /// Reject the rule if any detection item's field matches the processing
    /// item's field name conditions; the error names the offending field.
    DetectionItemFailure { message: String },
}

impl Transformation {
    /// Apply this transformation to a rule, mutating it in place.
    ///
    /// Returns `Ok(true)` if the transformation was applied, `Ok(false)` if
    /// it did not touch the rule.
    pub fn apply(
        &self,
        rule: &mut SigmaRule,
        state: &mut PipelineState,
        field_name_conditions: &[FieldNameCondition],
        field_name_cond_negation: bool,
    ) -> Result<bool> {
        match self {
            Transformation::FieldMapping { mapping } => {
                apply_field_mapping(rule, mapping, field_name_conditions, field_name_cond_negation);
                Ok(true)
            }

            Transformation::AddCondition {
                conditions,
                negated,
            } => {
                add_conditions(rule, conditions, *negated);
                Ok(true)
            }

            Transformation::ChangeLogsource {
                category,
                product,
                service,
            } => {
                if let Some(cat) = category {
                    rule.logsource.category = Some(cat.clone());
                }
                if let Some(prod) = product {
                    rule.logsource.product = Some(prod.clone());
                }
                if let Some(svc) = service {
                    rule.logsource.service = Some(svc.clone());
                }
                Ok(true)
            }

            Transformation::SetState { key, value } => {
                state.set(key.clone(), value.clone());
                Ok(true)
            }

            Transformation::RuleFailure { message } => {
                Err(PipelineError::RuleFailure(message.clone()))
            }

            Transformation::DetectionItemFailure { message } => {
                match find_matching_field(rule, field_name_conditions, field_name_cond_negation) {
                    Some(field) => Err(PipelineError::UnsupportedField {
                        field,
                        message: message.clone(),
                    }),
                    None => Ok(false),
                }
            }
        }
    }
}

// =============================================================================
// Field mapping
// =============================================================================

fn apply_field_mapping(
    rule: &mut SigmaRule,
    mapping: &HashMap<String, Vec<String>>,
    field_name_conditions: &[FieldNameCondition],
    negate: bool,
) {
    for detection in rule.detection.named.values_mut() {
        detection.map_items(&mut |item| {
            let targets = item
                .field
                .as_deref()
                .filter(|name| field_conditions_match(name, field_name_conditions, negate))
                .and_then(|name| mapping.get(name));

            match targets {
                Some(targets) if targets.len() == 1 => {
                    let mut renamed = item;
                    renamed.field = Some(targets[0].clone());
                    Detection::Item(renamed)
                }
                Some(targets) => Detection::AnyOf(
                    targets
                        .iter()
                        .map(|target| {
                            let mut cloned = item.clone();
                            cloned.field = Some(target.clone());
                            Detection::Item(cloned)
                        })
                        .collect(),
                ),
                None => Detection::Item(item),
            }
        });
    }
}

// =============================================================================
// Add conditions
// =============================================================================

fn add_conditions(rule: &mut SigmaRule, conditions: &[(String, SigmaValue)], negated: bool) {
    let items: Vec<Detection> = conditions
        .iter()
        .map(|(field, value)| {
            Detection::Item(DetectionItem::new(field.clone(), vec![value.clone()]))
        })
        .collect();

    let det_name = format!("__pipeline_cond_{}", rule.detection.named.len());
    rule.detection
        .named
        .insert(det_name.clone(), Detection::AllOf(items));

    // AND (or AND NOT if negated) onto every existing top-level condition.
    let cond_ref = ConditionExpr::Identifier(det_name);
    let cond_expr = if negated {
        ConditionExpr::Not(Box::new(cond_ref))
    } else {
        cond_ref
    };

    rule.detection.conditions = rule
        .detection
        .conditions
        .iter()
        .map(|existing| ConditionExpr::And(vec![existing.clone(), cond_expr.clone()]))
        .collect();
}

// =============================================================================
// Field validity guard
// =============================================================================

fn find_matching_field(
    rule: &SigmaRule,
    field_name_conditions: &[FieldNameCondition],
    negate: bool,
) -> Option<String> {
    // Walk detections in name order so the reported field is stable.
    let mut names: Vec<&String> = rule.detection.named.keys().collect();
    names.sort();

    let mut found = None;
    for name in names {
        if let Some(detection) = rule.detection.named.get(name) {
            detection.for_each_item(&mut |item| {
                if found.is_some() {
                    return;
                }
                if let Some(field) = &item.field {
                    if field_conditions_match(field, field_name_conditions, negate) {
                        found = Some(field.clone());
                    }
                }
            });
        }
        if found.is_some() {
            break;
        }
    }
    found
}

// =============================================================================
// Tests
// =============================================================================
