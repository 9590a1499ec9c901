//! Condition expression parser using pest PEG grammar + Pratt parser.
//!
//! Parses Sigma condition strings like:
//! - `"selection and not filter"`
//! - `"1 of selection_* and not 1 of filter_*"`
//! - `"all of them"`

use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::ast::{ConditionExpr, Quantifier, SelectorPattern};
use crate::error::{Result, RuleError};

#[derive(Parser)]
#[grammar = "src/sigma.pest"]
struct ConditionParser;

/// Parse a Sigma condition expression string into an AST.
///
/// # Examples
///
/// ```
/// use xdrsigma_rule::parse_condition;
///
/// let expr = parse_condition("selection and not filter").unwrap();
/// println!("{expr}");
/// ```
pub fn parse_condition(input: &str) -> Result<ConditionExpr> {
    let pairs = ConditionParser::parse(Rule::condition, input)
        .map_err(|e| RuleError::Condition(e.to_string()))?;

    let pratt = PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::prefix(Rule::not_op));

    // condition = { SOI ~ expr ~ EOI }
    let condition_pair = pairs
        .into_iter()
        .next()
        .ok_or_else(|| RuleError::Condition("empty condition".to_string()))?;
    let expr_pair = condition_pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| RuleError::Condition("empty condition".to_string()))?;

    Ok(parse_expr(expr_pair, &pratt))
}

fn parse_expr(pair: Pair<'_, Rule>, pratt: &PrattParser<Rule>) -> ConditionExpr {
    pratt
        .map_primary(|primary| match primary.as_rule() {
            Rule::ident => ConditionExpr::Identifier(primary.as_str().to_string()),
            Rule::selector => parse_selector(primary),
            Rule::expr => parse_expr(primary, pratt),
            other => unreachable!("unexpected primary rule: {other:?}"),
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::not_op => ConditionExpr::Not(Box::new(rhs)),
            other => unreachable!("unexpected prefix rule: {other:?}"),
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::and_op => merge_binary(ConditionExpr::And, lhs, rhs),
            Rule::or_op => merge_binary(ConditionExpr::Or, lhs, rhs),
            other => unreachable!("unexpected infix rule: {other:?}"),
        })
        .parse(pair.into_inner())
}

/// Flatten nested binary operators of the same kind:
/// `a AND (b AND c)` becomes `AND(a, b, c)` instead of `AND(a, AND(b, c))`.
fn merge_binary(
    ctor: fn(Vec<ConditionExpr>) -> ConditionExpr,
    lhs: ConditionExpr,
    rhs: ConditionExpr,
) -> ConditionExpr {
    let is_same = |expr: &ConditionExpr| -> bool {
        matches!(
            (&ctor(vec![]), expr),
            (ConditionExpr::And(_), ConditionExpr::And(_))
                | (ConditionExpr::Or(_), ConditionExpr::Or(_))
        )
    };

    let mut args = Vec::new();

    for side in [lhs, rhs] {
        if is_same(&side) {
            match side {
                ConditionExpr::And(children) | ConditionExpr::Or(children) => {
                    args.extend(children);
                }
                _ => unreachable!(),
            }
        } else {
            args.push(side);
        }
    }

    ctor(args)
}

fn parse_selector(pair: Pair<'_, Rule>) -> ConditionExpr {
    // Skip the of_kw pair: atomic rules cannot be silent in pest, so it
    // leaks into the parse tree.
    let mut quantifier_pair = None;
    let mut target_pair = None;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::quantifier => quantifier_pair = Some(p),
            Rule::selector_target => target_pair = Some(p),
            _ => {}
        }
    }

    let quantifier = parse_quantifier(quantifier_pair.expect("selector must have quantifier"));
    let pattern = parse_selector_target(target_pair.expect("selector must have target"));

    ConditionExpr::Selector {
        quantifier,
        pattern,
    }
}

fn parse_quantifier(pair: Pair<'_, Rule>) -> Quantifier {
    let inner = pair
        .into_inner()
        .next()
        .expect("quantifier must have child");
    match inner.as_rule() {
        Rule::all_kw => Quantifier::All,
        Rule::any_kw => Quantifier::Any,
        Rule::uint => {
            let n: u64 = inner.as_str().parse().unwrap_or(u64::MAX);
            if n == 1 { Quantifier::Any } else { Quantifier::Count(n) }
        }
        other => unreachable!("unexpected quantifier rule: {other:?}"),
    }
}

fn parse_selector_target(pair: Pair<'_, Rule>) -> SelectorPattern {
    let inner = pair.into_inner().next().expect("target must have child");
    match inner.as_rule() {
        Rule::them_kw => SelectorPattern::Them,
        Rule::ident_pattern => SelectorPattern::Pattern(inner.as_str().to_string()),
        other => unreachable!("unexpected selector target rule: {other:?}"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_identifier() {
        let expr = parse_condition("selection").unwrap();
        assert_eq!(expr, ConditionExpr::Identifier("selection".to_string()));
    }

    #[test]
    fn test_and_not() {
        let expr = parse_condition("selection and not filter").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::And(vec![
                ConditionExpr::Identifier("selection".to_string()),
                ConditionExpr::Not(Box::new(ConditionExpr::Identifier("filter".to_string()))),
            ])
        );
    }

    #[test]
    fn test_precedence_not_and_or() {
        // "a or not b and c" parses as "a or ((not b) and c)"
        let expr = parse_condition("a or not b and c").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::Or(vec![
                ConditionExpr::Identifier("a".to_string()),
                ConditionExpr::And(vec![
                    ConditionExpr::Not(Box::new(ConditionExpr::Identifier("b".to_string()))),
                    ConditionExpr::Identifier("c".to_string()),
                ]),
            ])
        );
    }

    #[test]
    fn test_parentheses() {
        let expr = parse_condition("(a or b) and c").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::And(vec![
                ConditionExpr::Or(vec![
                    ConditionExpr::Identifier("a".to_string()),
                    ConditionExpr::Identifier("b".to_string()),
                ]),
                ConditionExpr::Identifier("c".to_string()),
            ])
        );
    }

    #[test]
    fn test_selector_1_of_pattern() {
        let expr = parse_condition("1 of selection_*").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::Selector {
                quantifier: Quantifier::Any,
                pattern: SelectorPattern::Pattern("selection_*".to_string()),
            }
        );
    }

    #[test]
    fn test_selector_all_of_them() {
        let expr = parse_condition("all of them").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::Selector {
                quantifier: Quantifier::All,
                pattern: SelectorPattern::Them,
            }
        );
    }

    #[test]
    fn test_identifier_with_keyword_substring() {
        // "and_filter" is an identifier, not "and" + "filter"
        let expr = parse_condition("selection_and_filter").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::Identifier("selection_and_filter".to_string())
        );
    }

    #[test]
    fn test_triple_and_flattened() {
        let expr = parse_condition("a and b and c").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::And(vec![
                ConditionExpr::Identifier("a".to_string()),
                ConditionExpr::Identifier("b".to_string()),
                ConditionExpr::Identifier("c".to_string()),
            ])
        );
    }

    #[test]
    fn test_not_1_of_filter() {
        let expr = parse_condition("selection and not 1 of filter*").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::And(vec![
                ConditionExpr::Identifier("selection".to_string()),
                ConditionExpr::Not(Box::new(ConditionExpr::Selector {
                    quantifier: Quantifier::Any,
                    pattern: SelectorPattern::Pattern("filter*".to_string()),
                })),
            ])
        );
    }

    #[test]
    fn test_count_of() {
        let expr = parse_condition("3 of selection_*").unwrap();
        assert_eq!(
            expr,
            ConditionExpr::Selector {
                quantifier: Quantifier::Count(3),
                pattern: SelectorPattern::Pattern("selection_*".to_string()),
            }
        );
    }

    #[test]
    fn test_invalid_condition_errors() {
        assert!(parse_condition("and and").is_err());
        assert!(parse_condition("").is_err());
    }
}
