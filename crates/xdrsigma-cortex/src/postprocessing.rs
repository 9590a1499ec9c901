//! Rewrites symbolic integrity level comparisons into numeric range filters.
//!
//! XDR stores `action_process_integrity_level` as a number, but Sigma rules
//! compare it against the symbolic Windows levels (`UNTRUSTED` .. `SYSTEM`).
//! This step runs over the rendered query text and replaces equality and
//! membership tests on the symbolic names with the equivalent numeric range
//! expressions.

use regex::Regex;

use xdrsigma_pipeline::{PipelineError, Query, QueryPostprocessor, Result};
use xdrsigma_rule::SigmaRule;

use crate::tables::{INTEGRITY_LEVEL_FIELD, INTEGRITY_LEVEL_RANGES};

/// Post-processor translating symbolic integrity levels to numeric ranges.
///
/// Operates on query text; structured queries are rewritten through their
/// JSON serialization and re-parsed, so the output representation always
/// matches the input. The quote patterns tolerate JSON escaping.
#[derive(Debug, Default)]
pub struct IntegrityLevelRewriter;

impl IntegrityLevelRewriter {
    pub fn new() -> Self {
        IntegrityLevelRewriter
    }

    fn rewrite(&self, mut query: String) -> Result<String> {
        let field = INTEGRITY_LEVEL_FIELD;
        let levels: Vec<&str> = INTEGRITY_LEVEL_RANGES
            .iter()
            .map(|(level, _, _)| *level)
            .collect();
        let alternation = levels.join("|");

        // Equality tests: one substitution per known level.
        let single = compile(&format!(r#"(?i){field} = \\?"({alternation})\\?""#))?;
        if single.is_match(&query) {
            for (level, lower, upper) in INTEGRITY_LEVEL_RANGES {
                let pattern = compile(&format!(r#"(?i){field} = \\?"{level}\\?""#))?;
                let replacement = range_expr(field, *lower, *upper);
                query = pattern.replace_all(&query, replacement.as_str()).into_owned();
            }
        }

        // Membership tests: the whole list must consist of known levels.
        // Each iteration removes one full match, so the loop terminates.
        let multi = compile(&format!(
            r#"(?i){field} in \(((\\?"({alternation})\\?")((, )*))+\)"#
        ))?;
        while let Some(found) = multi.find(&query) {
            let target = found.as_str().to_string();
            let replacement = rewrite_membership(field, &target);
            query = query.replacen(&target, &replacement, 1);
        }

        Ok(query)
    }
}

impl QueryPostprocessor for IntegrityLevelRewriter {
    fn identifier(&self) -> &str {
        "replace_integrity_level"
    }

    fn apply(&self, _rule: &SigmaRule, query: Query) -> Result<(Query, bool)> {
        match query {
            Query::Text(text) => Ok((Query::Text(self.rewrite(text)?), true)),
            Query::Structured(value) => {
                let text = serde_json::to_string(&value)
                    .map_err(|e| PipelineError::Postprocessing(e.to_string()))?;
                let rewritten = self.rewrite(text)?;
                let value = serde_json::from_str(&rewritten)
                    .map_err(|e| PipelineError::Postprocessing(e.to_string()))?;
                Ok((Query::Structured(value), true))
            }
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PipelineError::Postprocessing(e.to_string()))
}

/// Numeric range expression for one symbolic level.
fn range_expr(field: &str, lower: Option<i64>, upper: Option<i64>) -> String {
    match (lower, upper) {
        (Some(lo), Some(hi)) => format!("({field} gte {lo} and {field} lt {hi})"),
        (Some(lo), None) => format!("{field} gte {lo}"),
        (None, Some(hi)) => format!("{field} lt {hi}"),
        (None, None) => field.to_string(),
    }
}

/// Rewrite one matched `field in (...)` clause into a disjunction of range
/// expressions. List entries that do not name a known level are dropped.
fn rewrite_membership(field: &str, clause: &str) -> String {
    let inner = clause
        .find('(')
        .and_then(|start| clause.rfind(')').map(|end| &clause[start + 1..end]))
        .unwrap_or("");

    let ranges: Vec<String> = inner
        .split(',')
        .map(|value| value.trim().trim_matches(|c| c == '"' || c == '\\'))
        .filter_map(|value| {
            let upper = value.to_ascii_uppercase();
            INTEGRITY_LEVEL_RANGES
                .iter()
                .find(|(level, _, _)| *level == upper)
                .map(|(_, lo, hi)| range_expr(field, *lo, *hi))
        })
        .collect();

    format!("({})", ranges.join(" or "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdrsigma_rule::parse_sigma_yaml;

    fn dummy_rule() -> SigmaRule {
        let yaml = r#"
title: Dummy
logsource:
    category: process_creation
detection:
    selection:
        IntegrityLevel: HIGH
    condition: selection
"#;
        parse_sigma_yaml(yaml).unwrap().rules.remove(0)
    }

    fn rewrite_text(input: &str) -> String {
        let rewriter = IntegrityLevelRewriter::new();
        let (query, applied) = rewriter
            .apply(&dummy_rule(), Query::Text(input.to_string()))
            .unwrap();
        assert!(applied);
        match query {
            Query::Text(s) => s,
            other => panic!("expected text query, got {other:?}"),
        }
    }

    #[test]
    fn test_single_high() {
        let out = rewrite_text(r#"action_process_integrity_level = "HIGH""#);
        assert_eq!(
            out,
            "(action_process_integrity_level gte 12288 and action_process_integrity_level lt 16384)"
        );
    }

    #[test]
    fn test_single_untrusted_and_system_are_open_ended() {
        assert_eq!(
            rewrite_text(r#"action_process_integrity_level = "UNTRUSTED""#),
            "action_process_integrity_level lt 4096"
        );
        assert_eq!(
            rewrite_text(r#"action_process_integrity_level = "SYSTEM""#),
            "action_process_integrity_level gte 16384"
        );
    }

    #[test]
    fn test_single_is_case_insensitive() {
        let out = rewrite_text(r#"action_process_integrity_level = "medium""#);
        assert_eq!(
            out,
            "(action_process_integrity_level gte 8192 and action_process_integrity_level lt 12288)"
        );
    }

    #[test]
    fn test_multi_value_membership() {
        let out = rewrite_text(r#"action_process_integrity_level in ("LOW", "HIGH")"#);
        assert_eq!(
            out,
            "((action_process_integrity_level gte 4096 and action_process_integrity_level lt 8192) \
             or (action_process_integrity_level gte 12288 and action_process_integrity_level lt 16384))"
        );
        assert!(!out.contains("in ("));
    }

    #[test]
    fn test_multiple_membership_clauses_all_rewritten() {
        let input = r#"a in ("x") and action_process_integrity_level in ("SYSTEM") or action_process_integrity_level in ("LOW")"#;
        let out = rewrite_text(input);
        assert!(out.contains("gte 16384"));
        assert!(out.contains("gte 4096"));
        assert!(!out.contains("action_process_integrity_level in"));
        // Unrelated membership clauses stay put.
        assert!(out.contains(r#"a in ("x")"#));
    }

    #[test]
    fn test_mixed_membership_with_unknown_value_left_alone() {
        // A list containing an unknown literal never fully matches the
        // membership pattern, so the clause survives unchanged.
        let input = r#"action_process_integrity_level in ("LOW", "NOPE")"#;
        assert_eq!(rewrite_text(input), input);
    }

    #[test]
    fn test_trailing_separator_segment_is_dropped() {
        let out = rewrite_text(r#"action_process_integrity_level in ("SYSTEM", )"#);
        assert_eq!(out, "(action_process_integrity_level gte 16384)");
    }

    #[test]
    fn test_idempotent_on_rewritten_output() {
        let once = rewrite_text(r#"action_process_integrity_level = "HIGH""#);
        let twice = rewrite_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unrelated_query_untouched() {
        let input = r#"preset = xdr_process | filter action_process_image_path = "C:\\cmd.exe""#;
        assert_eq!(rewrite_text(input), input);
    }

    #[test]
    fn test_embedded_in_full_query() {
        let input = r#"preset = xdr_process | filter (action_process_image_command_line contains "whoami" and action_process_integrity_level = "HIGH")"#;
        let out = rewrite_text(input);
        assert_eq!(
            out,
            r#"preset = xdr_process | filter (action_process_image_command_line contains "whoami" and (action_process_integrity_level gte 12288 and action_process_integrity_level lt 16384))"#
        );
    }

    #[test]
    fn test_structured_query_round_trips() {
        let rewriter = IntegrityLevelRewriter::new();
        let value = serde_json::json!({
            "query": r#"action_process_integrity_level = "HIGH""#,
            "tenant": "t1",
        });
        let (query, applied) = rewriter
            .apply(&dummy_rule(), Query::Structured(value))
            .unwrap();
        assert!(applied);
        match query {
            Query::Structured(v) => {
                assert_eq!(v["tenant"], "t1");
                assert_eq!(
                    v["query"],
                    "(action_process_integrity_level gte 12288 and action_process_integrity_level lt 16384)"
                );
            }
            other => panic!("expected structured query, got {other:?}"),
        }
    }
}
