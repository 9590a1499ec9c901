//! Assembly of the Cortex XDR processing pipeline.
//!
//! Item order is load-bearing: the field validity guard runs before any
//! mapping so error messages name the rule's original field names, dataset
//! state and filter injection run before field mappings, and the logsource
//! relabel must precede the final unsupported-rule guard keyed off its
//! applied marker.

use xdrsigma_pipeline::{
    ConditionLinking, FieldNameCondition, Pipeline, ProcessingItem, RuleCondition, Transformation,
};
use xdrsigma_rule::SigmaValue;

use crate::postprocessing::IntegrityLevelRewriter;
use crate::tables::{
    ACTIVITY_TYPES, EVENT_TYPE_TAGS, OS_TYPE_FIELD, OS_TYPE_TAGS, supported_categories,
    supported_fields,
};

/// Build the Cortex XDR processing pipeline.
pub fn cortexxdr_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::new("CortexXDR pipeline", 50);

    pipeline.items.extend(unsupported_field_guard());
    pipeline.items.extend(dataset_preset_items());
    pipeline.items.extend(os_filter_items());
    pipeline.items.extend(event_type_items());
    pipeline.items.extend(field_mapping_items());
    pipeline.items.push(logsource_item());
    pipeline.items.push(unsupported_rule_guard());

    pipeline
        .postprocessors
        .push(Box::new(IntegrityLevelRewriter::new()));

    pipeline
}

/// Reject rules referencing any field outside the supported set.
fn unsupported_field_guard() -> Vec<ProcessingItem> {
    let supported = supported_fields();
    let message = format!(
        "This pipeline only supports the following fields:\n{{{}}}",
        supported.join("}, {")
    );

    vec![
        ProcessingItem::new(Transformation::DetectionItemFailure { message })
            .with_identifier("cortex_fail_field_not_supported")
            .with_field_name_conditions(vec![FieldNameCondition::ExcludeFields {
                fields: supported.iter().map(|f| (*f).to_string()).collect(),
            }]),
    ]
}

/// Record which dataset or preset serves each matched rule.
fn dataset_preset_items() -> Vec<ProcessingItem> {
    ACTIVITY_TYPES
        .iter()
        .map(|at| {
            ProcessingItem::new(Transformation::SetState {
                key: "dataset_preset".to_string(),
                value: serde_json::Value::String(at.index.state_value()),
            })
            .with_identifier(format!("cortex_dataset_preset_{}_config", at.name))
            .with_rule_conditions(
                ConditionLinking::Any,
                at.categories
                    .iter()
                    .map(|c| RuleCondition::category(*c))
                    .collect(),
            )
        })
        .collect()
}

/// Inject the per-product agent OS filter.
fn os_filter_items() -> Vec<ProcessingItem> {
    OS_TYPE_TAGS
        .iter()
        .map(|(product, tag)| {
            ProcessingItem::new(Transformation::AddCondition {
                conditions: vec![(
                    OS_TYPE_FIELD.to_string(),
                    SigmaValue::String((*tag).to_string()),
                )],
                negated: false,
            })
            .with_identifier(format!("cortexxdr_{product}_os"))
            .with_rule_conditions(
                ConditionLinking::Any,
                vec![RuleCondition::product(*product)],
            )
        })
        .collect()
}

/// Inject the per-category event type filter.
fn event_type_items() -> Vec<ProcessingItem> {
    EVENT_TYPE_TAGS
        .iter()
        .map(|(category, tags)| {
            ProcessingItem::new(Transformation::AddCondition {
                conditions: tags
                    .iter()
                    .map(|(field, value)| {
                        ((*field).to_string(), SigmaValue::String((*value).to_string()))
                    })
                    .collect(),
                negated: false,
            })
            .with_identifier(format!("cortex_{category}_eventtype"))
            .with_rule_conditions(ConditionLinking::Any, vec![RuleCondition::category(*category)])
        })
        .collect()
}

/// Rename generic Sigma fields to XDR schema fields, per activity type.
fn field_mapping_items() -> Vec<ProcessingItem> {
    ACTIVITY_TYPES
        .iter()
        .map(|at| {
            let mapping = at
                .fields
                .iter()
                .map(|(source, targets)| {
                    (
                        (*source).to_string(),
                        targets.iter().map(|t| (*t).to_string()).collect(),
                    )
                })
                .collect();

            ProcessingItem::new(Transformation::FieldMapping { mapping })
                .with_identifier(format!("cortex_{}_fieldmapping", at.name))
                .with_rule_conditions(
                    ConditionLinking::Any,
                    at.categories
                        .iter()
                        .map(|c| RuleCondition::category(*c))
                        .collect(),
                )
        })
        .collect()
}

/// Relabel matched rules to the `cortex` service. Its applied marker is what
/// the final guard keys off.
fn logsource_item() -> ProcessingItem {
    ProcessingItem::new(Transformation::ChangeLogsource {
        category: None,
        product: None,
        service: Some("cortex".to_string()),
    })
    .with_identifier("cortex_logsource")
    .with_rule_conditions(
        ConditionLinking::Any,
        supported_categories()
            .into_iter()
            .map(RuleCondition::category)
            .collect(),
    )
}

/// Reject any rule the logsource relabel did not reach.
fn unsupported_rule_guard() -> ProcessingItem {
    ProcessingItem::new(Transformation::RuleFailure {
        message: "Rule type not yet supported by the Cortex XDR Sigma backend".to_string(),
    })
    .with_identifier("cortex_fail_rule_not_supported")
    .with_rule_conditions(
        ConditionLinking::Any,
        vec![RuleCondition::ProcessingItemApplied {
            processing_item_id: "cortex_logsource".to_string(),
        }],
    )
    .negate_rule_conditions()
}
