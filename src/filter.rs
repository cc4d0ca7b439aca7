use std::fmt;

use serde::Serialize;

use crate::matcher::{CandidateMatch, ControlKind};
use crate::syntax::node_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRule {
    /// Only add, sub, mul and div (and their compound forms) are mutated
    UnsupportedOperator,
    /// Nothing inside the test of an `if`
    ConditionBoundary,
    /// Only the innermost link of a same-operator chain is a starting point
    ChainTail,
    /// Both operands must have source text
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    UnsupportedOperator { operator: String },
    InCondition,
    InsideChain { operator: String },
    EmptyOperand,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnsupportedOperator { operator } => write!(f, "unsupported operator '{operator}'"),
            Rejection::InCondition => f.write_str("inside an if condition"),
            Rejection::InsideChain { operator } => write!(f, "inside a '{operator}' chain"),
            Rejection::EmptyOperand => f.write_str("empty operand"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl FilterRule {
    fn check(self, candidate: &CandidateMatch<'_>, source: &str) -> Option<Rejection> {
        match self {
            FilterRule::UnsupportedOperator => candidate.op.arith().is_none().then(|| {
                Rejection::UnsupportedOperator {
                    operator: candidate.op.symbol().to_string(),
                }
            }),
            FilterRule::ConditionBoundary => {
                let control = candidate.control?;
                let end = control.condition_end?;
                (control.kind == ControlKind::If && candidate.node.start_byte() < end)
                    .then_some(Rejection::InCondition)
            }
            FilterRule::ChainTail => {
                let op = candidate.op;
                [&candidate.lhs, &candidate.rhs]
                    .iter()
                    .any(|operand| operand.stripped_operator() == Some(op))
                    .then(|| Rejection::InsideChain { operator: op.symbol().to_string() })
            }
            FilterRule::EmptyText => {
                let empty = [candidate.lhs.node, candidate.rhs.node]
                    .iter()
                    .any(|n| node_text(*n, source).trim().is_empty());
                empty.then_some(Rejection::EmptyOperand)
            }
        }
    }
}

/// Run `rules` in order; the first rejection wins.
pub fn evaluate(rules: &[FilterRule], candidate: &CandidateMatch<'_>, source: &str) -> Verdict {
    for rule in rules {
        if let Some(rejection) = rule.check(candidate, source) {
            log::debug!("rejected line {}: {rejection}", candidate.line());
            return Verdict::Reject(rejection);
        }
    }
    Verdict::Accept
}
