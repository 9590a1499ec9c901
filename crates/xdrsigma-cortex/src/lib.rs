//! # xdrsigma-cortex
//!
//! Cortex XDR backend for Sigma rules: a processing pipeline mapping generic
//! Sigma taxonomy onto the XDR schema, an XQL query renderer and a
//! post-processing step translating symbolic integrity levels into numeric
//! range filters.
//!
//! # Example
//!
//! ```rust
//! use xdrsigma_cortex::XqlBackend;
//! use xdrsigma_rule::parse_sigma_yaml;
//!
//! let yaml = r#"
//! title: Suspicious Recon
//! logsource:
//!     product: windows
//!     category: process_creation
//! detection:
//!     selection:
//!         CommandLine|contains: whoami
//!     condition: selection
//! "#;
//! let collection = parse_sigma_yaml(yaml).unwrap();
//! let backend = XqlBackend::new();
//! let query = backend.convert_rule(&collection.rules[0]).unwrap();
//! assert!(query.starts_with("preset = xdr_process | filter "));
//! assert!(query.contains(r#"action_process_image_command_line contains "whoami""#));
//! ```

pub mod backend;
pub mod pipeline;
pub mod postprocessing;
pub mod tables;

pub use backend::{ConversionResult, XqlBackend};
pub use pipeline::cortexxdr_pipeline;
pub use postprocessing::IntegrityLevelRewriter;
