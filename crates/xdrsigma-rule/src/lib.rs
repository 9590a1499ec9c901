//! # xdrsigma-rule
//!
//! Rule model and parser for the xdrsigma conversion pipeline.
//!
//! This crate parses Sigma YAML rules into a strongly-typed AST that
//! conversion pipelines mutate in place:
//!
//! - **Detection rules**: logsource metadata, named detections, field
//!   modifiers, boolean condition expressions
//! - **Condition expressions**: `and`, `or`, `not`, `1 of`, `all of` and
//!   parenthesized groups, parsed with a pest PEG grammar and a Pratt
//!   parser for correct operator precedence (`NOT` > `AND` > `OR`)
//! - **Detection trees**: recursive `Item` / `AllOf` / `AnyOf` / `Keywords`
//!   nodes supporting in-place field rename and one-field→many expansion
//!
//! ## Quick Start
//!
//! ```rust
//! use xdrsigma_rule::parse_sigma_yaml;
//!
//! let yaml = r#"
//! title: Detect Whoami
//! logsource:
//!     product: windows
//!     category: process_creation
//! detection:
//!     selection:
//!         CommandLine|contains: 'whoami'
//!     condition: selection
//! level: medium
//! "#;
//!
//! let collection = parse_sigma_yaml(yaml).unwrap();
//! assert_eq!(collection.rules.len(), 1);
//! assert_eq!(collection.rules[0].title, "Detect Whoami");
//! ```

pub mod ast;
pub mod condition;
pub mod error;
pub mod parser;
pub mod value;

// Re-export the most commonly used types and functions at crate root
pub use ast::{
    ConditionExpr, Detection, DetectionItem, Detections, Level, LogSource, Modifier, Quantifier,
    SelectorPattern, SigmaCollection, SigmaRule, Status,
};
pub use condition::parse_condition;
pub use error::{Result, RuleError};
pub use parser::{parse_field_spec, parse_rule, parse_sigma_file, parse_sigma_yaml};
pub use value::SigmaValue;
