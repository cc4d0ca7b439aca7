use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, TreeCursor};

use crate::classify::OperandNode;
use crate::error::{Error, Result};
use crate::syntax::{self, BinaryOp, SyntaxTree};
use crate::types::{Numeric, TypeEnv};

/// An ancestor context that disqualifies an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exclusion {
    /// Anywhere inside a function call expression
    CallArgument,
    /// Anywhere inside an array subscript
    Subscript,
    /// Inside any node of the named grammar kind
    AncestorKind(String),
}

impl Exclusion {
    pub fn defaults() -> Vec<Exclusion> {
        vec![Exclusion::CallArgument, Exclusion::Subscript]
    }

    fn excludes(&self, ancestor: Node<'_>) -> bool {
        match self {
            Exclusion::CallArgument => ancestor.kind() == "call_expression",
            Exclusion::Subscript => ancestor.kind() == "subscript_expression",
            Exclusion::AncestorKind(kind) => ancestor.kind() == kind,
        }
    }
}

impl FromStr for Exclusion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("empty exclusion".to_string()),
            "call" => Ok(Exclusion::CallArgument),
            "subscript" => Ok(Exclusion::Subscript),
            kind if kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                Ok(Exclusion::AncestorKind(kind.to_string()))
            }
            other => Err(format!("invalid exclusion '{other}'")),
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::CallArgument => f.write_str("call"),
            Exclusion::Subscript => f.write_str("subscript"),
            Exclusion::AncestorKind(kind) => f.write_str(kind),
        }
    }
}

/// Declarative description of the expressions a strategy wants to see.
#[derive(Debug, Clone)]
pub struct MatchRule {
    /// Accepted operators; `None` accepts every binary and assignment operator
    pub operators: Option<Vec<BinaryOp>>,
    /// Accepted operation types
    pub types: Vec<Numeric>,
    pub exclusions: Vec<Exclusion>,
    /// Attach the nearest enclosing `=` assignment
    pub attach_assignment: bool,
    /// Attach the nearest enclosing loop or `if`
    pub attach_control: bool,
}

impl MatchRule {
    fn accepts_operator(&self, op: BinaryOp) -> bool {
        self.operators.as_ref().is_none_or(|ops| ops.contains(&op))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    For,
    While,
    Do,
    If,
}

impl ControlKind {
    fn of(node: Node<'_>) -> Option<ControlKind> {
        match node.kind() {
            "for_statement" | "for_range_loop" => Some(ControlKind::For),
            "while_statement" => Some(ControlKind::While),
            "do_statement" => Some(ControlKind::Do),
            "if_statement" => Some(ControlKind::If),
            _ => None,
        }
    }
}

/// The nearest loop or `if` around a match.
#[derive(Debug, Clone, Copy)]
pub struct Control<'t> {
    pub kind: ControlKind,
    pub node: Node<'t>,
    /// End byte of the test expression, when the construct has one
    pub condition_end: Option<usize>,
}

/// An expression that structurally fits a rule, pending semantic filtering.
#[derive(Debug, Clone, Copy)]
pub struct CandidateMatch<'t> {
    pub node: Node<'t>,
    pub op: BinaryOp,
    pub op_type: Numeric,
    pub lhs: OperandNode<'t>,
    pub rhs: OperandNode<'t>,
    pub function: Node<'t>,
    pub assignment: Option<Node<'t>>,
    pub control: Option<Control<'t>>,
}

impl<'t> CandidateMatch<'t> {
    pub fn line(&self) -> usize {
        syntax::line_of(self.node)
    }
}

/// Lazy post-order walk over a tree yielding candidate matches: every
/// operation comes after the operations nested inside it.
pub struct Matches<'t, 'r> {
    tree: &'t SyntaxTree,
    rule: &'r MatchRule,
    types: TypeEnv<'t>,
    cursor: TreeCursor<'t>,
    scope: Node<'t>,
    descend: bool,
    finished: bool,
}

impl<'t, 'r> Matches<'t, 'r> {
    pub fn new(tree: &'t SyntaxTree, rule: &'r MatchRule) -> Self {
        Self::within(tree, rule, tree.root())
    }

    /// Only visit expressions under `scope`, e.g. a single function.
    pub fn within(tree: &'t SyntaxTree, rule: &'r MatchRule, scope: Node<'t>) -> Self {
        Matches {
            tree,
            rule,
            types: TypeEnv::new(tree.root(), tree.source()),
            cursor: scope.walk(),
            scope,
            descend: true,
            finished: false,
        }
    }

    fn next_node(&mut self) -> Option<Node<'t>> {
        if self.finished {
            return None;
        }
        if self.descend {
            while self.cursor.goto_first_child() {}
            self.descend = false;
        }
        let node = self.cursor.node();
        if node == self.scope {
            self.finished = true;
        } else if self.cursor.goto_next_sibling() {
            self.descend = true;
        } else if !self.cursor.goto_parent() {
            self.finished = true;
        }
        Some(node)
    }

    fn candidate(&self, node: Node<'t>) -> Option<Result<CandidateMatch<'t>>> {
        if !matches!(node.kind(), "binary_expression" | "assignment_expression") {
            return None;
        }
        let op = syntax::operator_of(node)?;
        if !self.rule.accepts_operator(op) {
            return None;
        }
        let function = syntax::enclosing_function(node)?;
        if self.is_excluded(node, function) {
            log::debug!("excluded {} at line {}", op.symbol(), syntax::line_of(node));
            return None;
        }

        let line = syntax::line_of(node);
        let (left, right) = match (operand_binding(node, "left"), operand_binding(node, "right")) {
            (Ok(left), Ok(right)) => (left, right),
            (Err(e), _) | (_, Err(e)) => return Some(Err(e)),
        };

        let op_type = self.operation_type(op, left, right)?;
        if !self.rule.types.contains(&op_type) {
            return None;
        }

        let assignment = if self.rule.attach_assignment {
            syntax::ancestors(node)
                .take_while(|a| *a != function)
                .find(|a| a.kind() == "assignment_expression" && syntax::operator_of(*a) == Some(BinaryOp::Assign))
        } else {
            None
        };
        let control = if self.rule.attach_control {
            enclosing_control(node, function)
        } else {
            None
        };

        log::debug!("candidate {} ({}) at line {line}", op.symbol(), op_type);
        Some(Ok(CandidateMatch {
            node,
            op,
            op_type,
            lhs: OperandNode::classify(left),
            rhs: OperandNode::classify(right),
            function,
            assignment,
            control,
        }))
    }

    fn is_excluded(&self, node: Node<'t>, function: Node<'t>) -> bool {
        syntax::ancestors(node)
            .take_while(|a| *a != function)
            .any(|a| self.rule.exclusions.iter().any(|e| e.excludes(a)))
    }

    /// Type the operation is computed in. For compound assignments the
    /// target must already have the computation type; a plain assignment
    /// takes the type of its target.
    fn operation_type(&self, op: BinaryOp, left: Node<'t>, right: Node<'t>) -> Option<Numeric> {
        let lhs = self.types.numeric_type_of(left)?;
        match op {
            BinaryOp::Assign => Some(lhs),
            op if op.is_compound_assignment() => {
                let rhs = self.types.numeric_type_of(right)?;
                (Numeric::common(lhs, rhs) == lhs).then_some(lhs)
            }
            _ => {
                let rhs = self.types.numeric_type_of(right)?;
                Some(Numeric::common(lhs, rhs))
            }
        }
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }
}

impl<'t> Iterator for Matches<'t, '_> {
    type Item = Result<CandidateMatch<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.next_node() {
            if let Some(candidate) = self.candidate(node) {
                return Some(candidate);
            }
        }
        None
    }
}

fn enclosing_control<'t>(node: Node<'t>, function: Node<'t>) -> Option<Control<'t>> {
    syntax::ancestors(node)
        .take_while(|a| *a != function)
        .find_map(|a| {
            let kind = ControlKind::of(a)?;
            let condition_end = a.child_by_field_name("condition").map(|c| c.end_byte());
            Some(Control { kind, node: a, condition_end })
        })
}

/// The `left` or `right` operand of a binary or assignment node.
pub(crate) fn operand_binding<'t>(node: Node<'t>, field: &'static str) -> Result<Node<'t>> {
    let binding = if field == "left" { "lhs" } else { "rhs" };
    node.child_by_field_name(field)
        .ok_or_else(|| Error::MissingBinding { binding, line: syntax::line_of(node) })
}
