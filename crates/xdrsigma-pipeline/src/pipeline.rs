//! Pipeline assembly and application.
//!
//! A [`Pipeline`] is an ordered list of [`ProcessingItem`]s applied to one
//! rule at a time, followed by an ordered list of query post-processors.
//! Item order is significant and fixed at construction; a guard item that
//! fails stops processing of that rule and surfaces a per-rule error.

use xdrsigma_rule::SigmaRule;

use crate::conditions::{ConditionLinking, FieldNameCondition, RuleCondition};
use crate::error::Result;
use crate::postprocessing::{Query, QueryPostprocessor};
use crate::state::PipelineState;
use crate::transformations::Transformation;

/// A single transformation with its gating conditions.
#[derive(Debug, Clone)]
pub struct ProcessingItem {
    /// Optional identifier for applied-marker tracking.
    pub identifier: Option<String>,
    /// The transformation to apply.
    pub transformation: Transformation,
    /// Rule-level conditions gating the transformation.
    pub rule_conditions: Vec<RuleCondition>,
    /// How the rule conditions combine (AND / OR).
    pub rule_condition_linking: ConditionLinking,
    /// If true, the combined rule-condition result is negated.
    pub rule_condition_negation: bool,
    /// Field-name-level conditions scoping the transformation.
    pub field_name_conditions: Vec<FieldNameCondition>,
    /// If true, negate the field name conditions.
    pub field_name_condition_negation: bool,
}

impl ProcessingItem {
    pub fn new(transformation: Transformation) -> Self {
        ProcessingItem {
            identifier: None,
            transformation,
            rule_conditions: Vec::new(),
            rule_condition_linking: ConditionLinking::All,
            rule_condition_negation: false,
            field_name_conditions: Vec::new(),
            field_name_condition_negation: false,
        }
    }

    pub fn with_identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = Some(id.into());
        self
    }

    pub fn with_rule_conditions(
        mut self,
        linking: ConditionLinking,
        conditions: Vec<RuleCondition>,
    ) -> Self {
        self.rule_condition_linking = linking;
        self.rule_conditions = conditions;
        self
    }

    pub fn negate_rule_conditions(mut self) -> Self {
        self.rule_condition_negation = true;
        self
    }

    pub fn with_field_name_conditions(mut self, conditions: Vec<FieldNameCondition>) -> Self {
        self.field_name_conditions = conditions;
        self
    }

    /// Evaluate this item's rule conditions against a rule.
    ///
    /// An empty condition list matches (before negation is applied), which
    /// lets unconditional items and negated "was anything applied" guards
    /// share one code path.
    pub fn rule_conditions_match(&self, rule: &SigmaRule, state: &PipelineState) -> bool {
        let matched = if self.rule_conditions.is_empty() {
            true
        } else {
            match self.rule_condition_linking {
                ConditionLinking::All => self
                    .rule_conditions
                    .iter()
                    .all(|c| c.matches_rule(rule, state)),
                ConditionLinking::Any => self
                    .rule_conditions
                    .iter()
                    .any(|c| c.matches_rule(rule, state)),
            }
        };
        if self.rule_condition_negation {
            !matched
        } else {
            matched
        }
    }
}

/// A processing pipeline: ordered items plus query post-processors.
#[derive(Debug)]
pub struct Pipeline {
    /// Pipeline name.
    pub name: String,
    /// Priority (lower runs first) relative to other pipelines.
    pub priority: i32,
    /// Ordered list of processing items.
    pub items: Vec<ProcessingItem>,
    /// Ordered list of query post-processors.
    pub postprocessors: Vec<Box<dyn QueryPostprocessor>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Pipeline {
            name: name.into(),
            priority,
            items: Vec::new(),
            postprocessors: Vec::new(),
        }
    }

    /// Apply this pipeline to a single rule, mutating it in place.
    ///
    /// Items run in list order; items whose rule conditions do not hold are
    /// skipped. The first failing guard stops processing and its error is
    /// returned for this rule only.
    pub fn apply(&self, rule: &mut SigmaRule, state: &mut PipelineState) -> Result<()> {
        state.reset_rule();

        for item in &self.items {
            if !item.rule_conditions_match(rule, state) {
                continue;
            }

            let applied = item.transformation.apply(
                rule,
                state,
                &item.field_name_conditions,
                item.field_name_condition_negation,
            )?;

            if applied {
                if let Some(id) = &item.identifier {
                    state.mark_applied(id);
                }
            }
        }

        Ok(())
    }

    /// Run all post-processors over a rendered query, in order.
    pub fn postprocess(&self, rule: &SigmaRule, query: Query) -> Result<Query> {
        let mut current = query;
        for step in &self.postprocessors {
            let (next, _applied) = step.apply(rule, current)?;
            current = next;
        }
        Ok(current)
    }
}

// =============================================================================
// Tests
// =============================================================================
