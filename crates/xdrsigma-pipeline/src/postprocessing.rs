//! Query post-processing applied after a rule has been rendered.
//!
//! Post-processors receive the rendered query either as plain text or as a
//! structured (JSON) object and must return it in the same representation.
//! The tagged [`Query`] variant keeps that contract explicit and testable.

use std::fmt;

use xdrsigma_rule::SigmaRule;

use crate::error::Result;

/// A rendered query in one of the two supported representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Plain query text.
    Text(String),
    /// Structured query object (for backends emitting JSON request bodies).
    Structured(serde_json::Value),
}

impl Query {
    /// Borrow the query text, if this is a text query.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Query::Text(s) => Some(s),
            Query::Structured(_) => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Query::Structured(_))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Text(s) => write!(f, "{s}"),
            Query::Structured(v) => write!(f, "{v}"),
        }
    }
}

/// A post-processing step applied once per rule after query rendering.
///
/// Implementations must preserve the input representation: a `Text` query
/// comes back as `Text`, a `Structured` query as `Structured`. The boolean
/// in the return value signals whether the step was applied.
pub trait QueryPostprocessor: fmt::Debug + Send + Sync {
    /// Stable identifier for this step.
    fn identifier(&self) -> &str;

    /// Transform the rendered query.
    fn apply(&self, rule: &SigmaRule, query: Query) -> Result<(Query, bool)>;
}
