//! PEP 508 environment marker evaluation against a user-supplied, possibly
//! multi-valued environment (C2).
//!
//! The AST (`Value`, `Op`, `Expr`) mirrors the shape of the njsmith/posy
//! `marker` module this crate's teacher vendors, but the evaluator itself is
//! new: instead of a single string-keyed `Env` trait returning `Option<&str>`,
//! a marker variable here is `Absent | Empty | Values(Vec<String>)`, and
//! absent variables get a witness value synthesized from the marker text
//! itself rather than causing an evaluation error.

use std::collections::HashMap;
use std::fmt::Display;

use crate::specifier::CompareOp;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Variable(String),
    Literal(String),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Variable(var) => write!(f, "{var}"),
            Value::Literal(lit) => write!(f, "\"{lit}\""),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    Compare(CompareOp),
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Operator { op: Op, lhs: Value, rhs: Value },
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::And(l, r) => write!(f, "({l} and {r})"),
            Expr::Or(l, r) => write!(f, "({l} or {r})"),
            Expr::Operator { op, lhs, rhs } => {
                let op_str = match op {
                    Op::Compare(c) => c.to_string(),
                    Op::In => "in".to_owned(),
                    Op::NotIn => "not in".to_owned(),
                };
                write!(f, "{lhs} {op_str} {rhs}")
            }
        }
    }
}

/// What the user's configured environment knows about one marker variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarBinding {
    Absent,
    Empty,
    Values(Vec<String>),
}

pub type Environment = HashMap<String, VarBinding>;

const IMPOSSIBLE_VALUE: &str = "____impossible_value____";

pub fn parse(marker: &str) -> Result<Expr, crate::error::Error> {
    crate::reqparse::marker(marker.trim())
        .map_err(|e| crate::error::Error::MarkerParseError(format!("{marker:?}: {e}")))
}

/// Evaluate `expr` against `env`. `env = None` means "no environment was
/// supplied at all" and the marker is trivially true.
pub fn evaluate(expr: &Expr, env: Option<&Environment>) -> bool {
    let Some(env) = env else {
        return true;
    };

    let mut vars = Vec::new();
    collect_vars(expr, &mut vars);
    vars.sort();
    vars.dedup();

    let mut candidates: Vec<(String, Vec<String>)> = Vec::with_capacity(vars.len());
    for var in vars {
        let values = match env.get(&var) {
            None | Some(VarBinding::Absent) => {
                vec![witness_for(expr, &var).unwrap_or_default()]
            }
            Some(VarBinding::Empty) => vec![IMPOSSIBLE_VALUE.to_owned()],
            Some(VarBinding::Values(values)) if values.is_empty() => {
                vec![IMPOSSIBLE_VALUE.to_owned()]
            }
            Some(VarBinding::Values(values)) => values.clone(),
        };
        candidates.push((var, values));
    }

    for assignment in cartesian_product(&candidates) {
        if !eval_concrete(expr, &assignment) {
            return false;
        }
    }
    true
}

fn collect_vars(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::And(l, r) | Expr::Or(l, r) => {
            collect_vars(l, out);
            collect_vars(r, out);
        }
        Expr::Operator { lhs, rhs, .. } => {
            if let Value::Variable(v) = lhs {
                out.push(v.clone());
            }
            if let Value::Variable(v) = rhs {
                out.push(v.clone());
            }
        }
    }
}

/// Mines the first comparison in `expr` (left-to-right, depth-first) that
/// involves `var`, and derives a witness value that makes that one
/// comparison true. See SPEC_FULL.md §4.2 "witness rules".
fn witness_for(expr: &Expr, var: &str) -> Option<String> {
    match expr {
        Expr::And(l, r) | Expr::Or(l, r) => witness_for(l, var).or_else(|| witness_for(r, var)),
        Expr::Operator { op, lhs, rhs } => {
            if let Value::Variable(v) = lhs {
                if v == var {
                    if let Value::Literal(lit) = rhs {
                        return Some(witness_for_op(*op, lit, true));
                    }
                }
            }
            if let Value::Variable(v) = rhs {
                if v == var {
                    if let Value::Literal(lit) = lhs {
                        return Some(witness_for_op(*op, lit, false));
                    }
                }
            }
            None
        }
    }
}

fn witness_for_op(op: Op, literal: &str, var_is_lhs: bool) -> String {
    use CompareOp::*;
    let effective = match op {
        Op::Compare(c) if var_is_lhs => c,
        Op::Compare(c) => flip(c),
        Op::In | Op::NotIn => Equal,
    };
    match effective {
        Equal | GreaterThanEqual | LessThanEqual | Compatible => literal.to_owned(),
        StrictlyGreaterThan => bump_last_numeral(literal, 1),
        StrictlyLessThan => bump_last_numeral(literal, -1),
        NotEqual => format!("{literal}.9999"),
    }
}

fn flip(op: CompareOp) -> CompareOp {
    use CompareOp::*;
    match op {
        LessThanEqual => GreaterThanEqual,
        StrictlyLessThan => StrictlyGreaterThan,
        GreaterThanEqual => LessThanEqual,
        StrictlyGreaterThan => StrictlyLessThan,
        other => other,
    }
}

fn bump_last_numeral(literal: &str, delta: i64) -> String {
    let mut parts: Vec<String> = literal.split('.').map(str::to_owned).collect();
    if let Some(last) = parts.last_mut() {
        if let Ok(n) = last.parse::<i64>() {
            *last = (n + delta).to_string();
            return parts.join(".");
        }
    }
    literal.to_owned()
}

fn cartesian_product(vars: &[(String, Vec<String>)]) -> Vec<HashMap<String, String>> {
    let mut result = vec![HashMap::new()];
    for (name, values) in vars {
        let mut next = Vec::with_capacity(result.len() * values.len().max(1));
        for partial in &result {
            for value in values {
                let mut assignment = partial.clone();
                assignment.insert(name.clone(), value.clone());
                next.push(assignment);
            }
        }
        result = next;
    }
    result
}

fn eval_concrete(expr: &Expr, assignment: &HashMap<String, String>) -> bool {
    match expr {
        Expr::And(l, r) => eval_concrete(l, assignment) && eval_concrete(r, assignment),
        Expr::Or(l, r) => eval_concrete(l, assignment) || eval_concrete(r, assignment),
        Expr::Operator { op, lhs, rhs } => {
            let lhs_val = resolve(lhs, assignment);
            let rhs_val = resolve(rhs, assignment);
            match op {
                Op::In => rhs_val.contains(lhs_val.as_str()),
                Op::NotIn => !rhs_val.contains(lhs_val.as_str()),
                Op::Compare(op) => {
                    if let Some(lhs_ver) = crate::specifier::parse_version(&lhs_val) {
                        if let Ok(ranges) = op.ranges(&rhs_val) {
                            return ranges.into_iter().any(|r| r.contains(&lhs_ver));
                        }
                    }
                    use CompareOp::*;
                    match op {
                        LessThanEqual => lhs_val <= rhs_val,
                        StrictlyLessThan => lhs_val < rhs_val,
                        NotEqual => lhs_val != rhs_val,
                        Equal => lhs_val == rhs_val,
                        GreaterThanEqual => lhs_val >= rhs_val,
                        StrictlyGreaterThan => lhs_val > rhs_val,
                        Compatible => false,
                    }
                }
            }
        }
    }
}

fn resolve(value: &Value, assignment: &HashMap<String, String>) -> String {
    match value {
        Value::Variable(name) => assignment.get(name).cloned().unwrap_or_default(),
        Value::Literal(lit) => lit.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn env(pairs: &[(&str, VarBinding)]) -> Environment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn empty_extra_fails_equality() {
        let expr = parse("extra == \"test\"").unwrap();
        let e = env(&[("extra", VarBinding::Empty)]);
        assert!(!evaluate(&expr, Some(&e)));
    }

    #[test]
    fn absent_variable_is_trivially_satisfied() {
        let expr = parse("python_version < \"3.0\"").unwrap();
        let e = env(&[("extra", VarBinding::Empty)]);
        assert!(evaluate(&expr, Some(&e)));
    }

    #[test]
    fn bound_single_value_comparisons() {
        let e = env(&[(
            "python_version",
            VarBinding::Values(vec!["2.7".to_owned()]),
        )]);
        assert!(!evaluate(&parse("python_version > \"2.7\"").unwrap(), Some(&e)));
        assert!(evaluate(&parse("python_version >= \"2.7\"").unwrap(), Some(&e)));
        assert!(evaluate(&parse("python_version == \"2.7\"").unwrap(), Some(&e)));
    }

    #[test]
    fn universally_quantified_over_list() {
        let e = env(&[(
            "python_version",
            VarBinding::Values(vec!["2.7".to_owned(), "3.8".to_owned()]),
        )]);
        // Not true for every element of the list.
        assert!(!evaluate(&parse("python_version >= \"3.0\"").unwrap(), Some(&e)));
    }

    #[test]
    fn no_env_means_true() {
        let expr = parse("os_name == \"posix\" and sys_platform == \"linux\"").unwrap();
        assert!(evaluate(&expr, None));
    }

    #[test]
    fn unbound_marker_equals_empty_environment_evaluation() {
        let expr = parse("os_name == \"posix\"").unwrap();
        let empty_env: Environment = HashMap::new();
        assert_eq!(
            evaluate(&expr, Some(&empty_env)),
            evaluate(&expr, Some(&HashMap::new()))
        );
    }

    #[test]
    fn and_or_precedence() {
        let expr = parse(
            "os_name == 'a' and os_name == 'b' and os_name == 'c' or os_name == 'd' or os_name == 'e'",
        )
        .unwrap();
        let e = env(&[("os_name", VarBinding::Values(vec!["d".to_owned()]))]);
        assert!(evaluate(&expr, Some(&e)));
    }
}
