//! Conditions that gate when processing items fire.
//!
//! Two levels of conditions:
//! - **Rule conditions**: evaluated against the whole `SigmaRule`
//! - **Field name conditions**: evaluated against field names in detection
//!   items

use xdrsigma_rule::{LogSource, SigmaRule};

use crate::state::PipelineState;

// =============================================================================
// Rule Conditions
// =============================================================================

/// How the rule conditions of one processing item are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionLinking {
    /// All conditions must match.
    #[default]
    All,
    /// Any one matching condition is sufficient.
    Any,
}

/// A condition evaluated against a `SigmaRule`.
#[derive(Debug, Clone)]
pub enum RuleCondition {
    /// Match logsource fields (category, product, service). `None` = any.
    Logsource {
        category: Option<String>,
        product: Option<String>,
        service: Option<String>,
    },

    /// A specific processing item was applied to this rule earlier.
    ProcessingItemApplied { processing_item_id: String },

    /// Check pipeline state key-value.
    ProcessingState { key: String, val: String },
}

impl RuleCondition {
    /// Shorthand for a category-only logsource condition.
    pub fn category(category: impl Into<String>) -> Self {
        RuleCondition::Logsource {
            category: Some(category.into()),
            product: None,
            service: None,
        }
    }

    /// Shorthand for a product-only logsource condition.
    pub fn product(product: impl Into<String>) -> Self {
        RuleCondition::Logsource {
            category: None,
            product: Some(product.into()),
            service: None,
        }
    }

    /// Check if this condition matches a rule.
    pub fn matches_rule(&self, rule: &SigmaRule, state: &PipelineState) -> bool {
        match self {
            RuleCondition::Logsource {
                category,
                product,
                service,
            } => logsource_matches(&rule.logsource, category, product, service),

            RuleCondition::ProcessingItemApplied { processing_item_id } => {
                state.was_applied(processing_item_id)
            }

            RuleCondition::ProcessingState { key, val } => state.matches(key, val),
        }
    }
}

fn logsource_matches(
    ls: &LogSource,
    category: &Option<String>,
    product: &Option<String>,
    service: &Option<String>,
) -> bool {
    if let Some(cat) = category {
        match &ls.category {
            Some(lc) if lc.eq_ignore_ascii_case(cat) => {}
            _ => return false,
        }
    }
    if let Some(prod) = product {
        match &ls.product {
            Some(lp) if lp.eq_ignore_ascii_case(prod) => {}
            _ => return false,
        }
    }
    if let Some(svc) = service {
        match &ls.service {
            Some(lsvc) if lsvc.eq_ignore_ascii_case(svc) => {}
            _ => return false,
        }
    }
    true
}

// =============================================================================
// Field Name Conditions
// =============================================================================

/// A condition evaluated against field names in detection items.
#[derive(Debug, Clone)]
pub enum FieldNameCondition {
    /// Field name must be in the include list.
    IncludeFields { fields: Vec<String> },

    /// Field name must NOT be in the exclude list.
    ExcludeFields { fields: Vec<String> },
}

impl FieldNameCondition {
    /// Check if this condition matches a field name.
    pub fn matches_field_name(&self, field_name: &str) -> bool {
        match self {
            FieldNameCondition::IncludeFields { fields } => {
                fields.iter().any(|f| f == field_name)
            }
            FieldNameCondition::ExcludeFields { fields } => {
                !fields.iter().any(|f| f == field_name)
            }
        }
    }
}

/// Check a field name against all conditions, honoring the negation flag.
///
/// An empty condition list matches every field.
pub fn field_conditions_match(
    field_name: &str,
    conditions: &[FieldNameCondition],
    negate: bool,
) -> bool {
    if conditions.is_empty() {
        return true;
    }
    let all_match = conditions.iter().all(|c| c.matches_field_name(field_name));
    if negate { !all_match } else { all_match }
}
