//! # xdrsigma-pipeline
//!
//! Processing pipeline framework for transforming Sigma rules before query
//! conversion, modelled on pySigma's processing pipeline.
//!
//! # Architecture
//!
//! 1. A backend builds a [`Pipeline`]: an ordered list of
//!    [`ProcessingItem`]s, each pairing a [`Transformation`] with rule-level
//!    and field-name-level conditions.
//! 2. For each rule, the pipeline applies its items in order against a
//!    fresh [`PipelineState`], mutating the rule in place. Guard items
//!    reject unsupported rules with per-rule errors.
//! 3. After the backend renders the transformed rule into a [`Query`], the
//!    pipeline's [`QueryPostprocessor`]s rewrite the rendered output.
//!
//! Rules are independent: no state is shared between rules, so a batch may
//! be processed in any order.
//!
//! # Example
//!
//! ```rust
//! use xdrsigma_pipeline::{
//!     ConditionLinking, Pipeline, PipelineState, ProcessingItem, RuleCondition, Transformation,
//! };
//! use xdrsigma_rule::parse_sigma_yaml;
//!
//! let mut pipeline = Pipeline::new("Example pipeline", 50);
//! pipeline.items.push(
//!     ProcessingItem::new(Transformation::ChangeLogsource {
//!         category: None,
//!         product: None,
//!         service: Some("example".to_string()),
//!     })
//!     .with_rule_conditions(
//!         ConditionLinking::Any,
//!         vec![RuleCondition::category("process_creation")],
//!     ),
//! );
//!
//! let yaml = r#"
//! title: Test
//! logsource:
//!     category: process_creation
//! detection:
//!     selection:
//!         Image|endswith: '\whoami.exe'
//!     condition: selection
//! "#;
//! let mut rule = parse_sigma_yaml(yaml).unwrap().rules.remove(0);
//! let mut state = PipelineState::new();
//! pipeline.apply(&mut rule, &mut state).unwrap();
//! assert_eq!(rule.logsource.service.as_deref(), Some("example"));
//! ```

pub mod conditions;
pub mod error;
pub mod pipeline;
pub mod postprocessing;
pub mod state;
pub mod transformations;

// Re-export the most commonly used types at crate root
pub use conditions::{ConditionLinking, FieldNameCondition, RuleCondition};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, ProcessingItem};
pub use postprocessing::{Query, QueryPostprocessor};
pub use state::PipelineState;
pub use transformations::Transformation;
