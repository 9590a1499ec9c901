//! AST types for Sigma rules as consumed by conversion pipelines.
//!
//! Reference: Sigma specification V2.0.0 (2024-08-08)

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::value::SigmaValue;

// =============================================================================
// Enumerations
// =============================================================================

/// Rule maturity status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Stable,
    Test,
    Experimental,
    Deprecated,
    Unsupported,
}

impl Status {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stable" => Some(Status::Stable),
            "test" => Some(Status::Test),
            "experimental" => Some(Status::Experimental),
            "deprecated" => Some(Status::Deprecated),
            "unsupported" => Some(Status::Unsupported),
            _ => None,
        }
    }
}

/// Severity level of a triggered rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl Level {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "informational" => Some(Level::Informational),
            "low" => Some(Level::Low),
            "medium" => Some(Level::Medium),
            "high" => Some(Level::High),
            "critical" => Some(Level::Critical),
            _ => None,
        }
    }
}

// =============================================================================
// Field Modifiers
// =============================================================================

/// Field modifiers relevant to query conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Contains,
    StartsWith,
    EndsWith,
    All,
    Re,
    Cased,
    Exists,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Modifier {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "contains" => Some(Modifier::Contains),
            "startswith" => Some(Modifier::StartsWith),
            "endswith" => Some(Modifier::EndsWith),
            "all" => Some(Modifier::All),
            "re" => Some(Modifier::Re),
            "cased" => Some(Modifier::Cased),
            "exists" => Some(Modifier::Exists),
            "gt" => Some(Modifier::Gt),
            "gte" => Some(Modifier::Gte),
            "lt" => Some(Modifier::Lt),
            "lte" => Some(Modifier::Lte),
            _ => None,
        }
    }
}

// =============================================================================
// Log source
// =============================================================================

/// The `logsource:` section of a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogSource {
    pub category: Option<String>,
    pub product: Option<String>,
    pub service: Option<String>,
    pub definition: Option<String>,
}

// =============================================================================
// Detections
// =============================================================================

/// A single field/value leaf: `Image|endswith: '\cmd.exe'`.
///
/// Multiple values on one field are OR-linked unless the `all` modifier is
/// present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionItem {
    pub field: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub values: Vec<SigmaValue>,
}

impl DetectionItem {
    pub fn new(field: impl Into<String>, values: Vec<SigmaValue>) -> Self {
        DetectionItem {
            field: Some(field.into()),
            modifiers: Vec::new(),
            values,
        }
    }

    /// True when the values of this item are AND-linked (`|all`).
    pub fn values_linked_all(&self) -> bool {
        self.modifiers.contains(&Modifier::All)
    }
}

/// One named detection: a boolean tree over field/value leaves.
///
/// The tree is recursive so that pipeline transformations can replace a
/// single leaf with a disjunction over several target fields without
/// restructuring its parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Detection {
    /// A single field/value leaf.
    Item(DetectionItem),
    /// Conjunction of sub-detections (YAML mapping).
    AllOf(Vec<Detection>),
    /// Disjunction of sub-detections (YAML list of mappings).
    AnyOf(Vec<Detection>),
    /// Unbound keyword values (YAML list of scalars).
    Keywords(Vec<SigmaValue>),
}

impl Detection {
    /// Visit every leaf item in the tree.
    pub fn for_each_item<F>(&self, f: &mut F)
    where
        F: FnMut(&DetectionItem),
    {
        match self {
            Detection::Item(item) => f(item),
            Detection::AllOf(subs) | Detection::AnyOf(subs) => {
                for sub in subs {
                    sub.for_each_item(f);
                }
            }
            Detection::Keywords(_) => {}
        }
    }

    /// Visit every leaf item mutably.
    pub fn for_each_item_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut DetectionItem),
    {
        match self {
            Detection::Item(item) => f(item),
            Detection::AllOf(subs) | Detection::AnyOf(subs) => {
                for sub in subs.iter_mut() {
                    sub.for_each_item_mut(f);
                }
            }
            Detection::Keywords(_) => {}
        }
    }

    /// Rewrite every leaf node through `f`, replacing it with the returned
    /// detection. This is what lets a field mapped to several target names
    /// expand into an `AnyOf` in place.
    pub fn map_items<F>(&mut self, f: &mut F)
    where
        F: FnMut(DetectionItem) -> Detection,
    {
        match self {
            Detection::Item(_) => {
                // Swap out to take ownership of the leaf.
                let old = std::mem::replace(self, Detection::AllOf(Vec::new()));
                if let Detection::Item(item) = old {
                    *self = f(item);
                }
            }
            Detection::AllOf(subs) | Detection::AnyOf(subs) => {
                for sub in subs.iter_mut() {
                    sub.map_items(f);
                }
            }
            Detection::Keywords(_) => {}
        }
    }
}

/// The full `detection:` section: named detections plus condition expressions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Detections {
    pub named: HashMap<String, Detection>,
    pub conditions: Vec<ConditionExpr>,
    pub condition_strings: Vec<String>,
}

// =============================================================================
// Condition expressions
// =============================================================================

/// Quantifier in a `N of pattern` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quantifier {
    Any,
    All,
    Count(u64),
}

/// Target of a selector: `them` or a wildcard identifier pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SelectorPattern {
    Them,
    Pattern(String),
}

impl SelectorPattern {
    /// Check whether a detection name matches this selector target.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            SelectorPattern::Them => true,
            SelectorPattern::Pattern(p) => wildcard_match(p, name),
        }
    }
}

fn wildcard_match(pattern: &str, name: &str) -> bool {
    // Only `*` wildcards occur in condition selectors.
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }
    let mut rest = name;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 && !pattern.ends_with('*') {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// A parsed `condition:` expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConditionExpr {
    Identifier(String),
    And(Vec<ConditionExpr>),
    Or(Vec<ConditionExpr>),
    Not(Box<ConditionExpr>),
    Selector {
        quantifier: Quantifier,
        pattern: SelectorPattern,
    },
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionExpr::Identifier(id) => write!(f, "{id}"),
            ConditionExpr::And(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", rendered.join(" and "))
            }
            ConditionExpr::Or(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", rendered.join(" or "))
            }
            ConditionExpr::Not(inner) => write!(f, "not {inner}"),
            ConditionExpr::Selector {
                quantifier,
                pattern,
            } => {
                let q = match quantifier {
                    Quantifier::Any => "1".to_string(),
                    Quantifier::All => "all".to_string(),
                    Quantifier::Count(n) => n.to_string(),
                };
                let p = match pattern {
                    SelectorPattern::Them => "them".to_string(),
                    SelectorPattern::Pattern(s) => s.clone(),
                };
                write!(f, "{q} of {p}")
            }
        }
    }
}

// =============================================================================
// Rules and collections
// =============================================================================

/// A single Sigma detection rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SigmaRule {
    pub title: String,
    pub id: Option<String>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub references: Vec<String>,
    pub date: Option<String>,
    pub modified: Option<String>,
    pub logsource: LogSource,
    pub detection: Detections,
    pub falsepositives: Vec<String>,
    pub level: Option<Level>,
    pub tags: Vec<String>,
}

impl SigmaRule {
    /// Collect the distinct field names referenced by this rule's detection
    /// items, in first-seen order.
    pub fn field_names(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for detection in self.detection.named.values() {
            detection.for_each_item(&mut |item| {
                if let Some(name) = &item.field {
                    if !seen.iter().any(|s| s == name) {
                        seen.push(name.clone());
                    }
                }
            });
        }
        seen
    }
}

/// A batch of parsed rules plus per-document parse errors.
#[derive(Debug, Clone, Default)]
pub struct SigmaCollection {
    pub rules: Vec<SigmaRule>,
    pub errors: Vec<String>,
}

impl SigmaCollection {
    pub fn new() -> Self {
        Self::default()
    }
}
