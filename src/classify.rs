use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::syntax::{self, ArithOp, BinaryOp, node_text};

/// Whether an operand is itself a mutable arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
    NotAnOperation,
    Operation(ArithOp),
}

impl OperandKind {
    pub fn is_operation(self) -> bool {
        matches!(self, OperandKind::Operation(_))
    }
}

/// One side of a candidate operation.
#[derive(Debug, Clone, Copy)]
pub struct OperandNode<'t> {
    /// The operand exactly as it appears under the operator
    pub node: Node<'t>,
    /// The operand without explicit casts; this is the range that is
    /// wrapped or spliced into generated code
    pub target: Node<'t>,
    /// The operand without parentheses, looking through one explicit cast
    pub internal: Node<'t>,
    pub kind: OperandKind,
}

impl<'t> OperandNode<'t> {
    pub fn classify(node: Node<'t>) -> Self {
        let internal = internal_operand(node);
        let kind = match syntax::operator_of(internal) {
            Some(op) if internal.kind() == "binary_expression" => {
                op.arith().map_or(OperandKind::NotAnOperation, OperandKind::Operation)
            }
            _ => OperandKind::NotAnOperation,
        };
        OperandNode {
            node,
            target: syntax::strip_casts(node),
            internal,
            kind,
        }
    }

    pub fn is_compound(&self) -> bool {
        self.kind.is_operation()
    }

    /// Operator of the operand once casts and parentheses are gone, if it
    /// is a binary expression.
    pub fn stripped_operator(&self) -> Option<BinaryOp> {
        let stripped = syntax::strip_casts_and_parens(self.node);
        if stripped.kind() == "binary_expression" {
            syntax::operator_of(stripped)
        } else {
            None
        }
    }
}

/// Strip parentheses, then look inside one explicit cast and strip again.
pub fn internal_operand(node: Node<'_>) -> Node<'_> {
    let unparenthesized = syntax::strip_parens(node);
    if unparenthesized.kind() == "cast_expression" {
        if let Some(value) = unparenthesized.child_by_field_name("value") {
            return syntax::strip_parens(value);
        }
    }
    unparenthesized
}

/// Source text with newlines collapsed and all whitespace removed, the
/// form operand texts are compared in.
pub fn normalized_text(node: Node<'_>, source: &str) -> String {
    normalize(node_text(node, source))
}

pub fn normalize(text: &str) -> String {
    text.replace('\n', " ")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Dialect, SyntaxTree};

    fn operands(source: &str) -> (SyntaxTree, usize) {
        let tree = SyntaxTree::parse(source, Dialect::C).unwrap();
        let start = source.find("return").unwrap() + "return ".len();
        (tree, start)
    }

    #[test]
    fn normalize_strips_all_whitespace() {
        assert_eq!(normalize(" a *\n  (b + c) "), "a*(b+c)");
    }

    #[test]
    fn classify_looks_through_parens_and_one_cast() {
        let (tree, start) = operands("float f(float a, float b, float c) { return (float)((a * b)) + c; }");
        let sum = tree
            .root()
            .descendant_for_byte_range(start, start + 1)
            .and_then(|n| syntax::ancestors(n).find(|a| a.kind() == "binary_expression" && syntax::operator_of(*a) == Some(BinaryOp::Add)))
            .unwrap();
        let left = OperandNode::classify(sum.child_by_field_name("left").unwrap());
        let right = OperandNode::classify(sum.child_by_field_name("right").unwrap());
        assert_eq!(left.kind, OperandKind::Operation(ArithOp::Mul));
        assert_eq!(tree.text(left.internal), "a * b");
        assert_eq!(tree.text(left.target), "((a * b))");
        assert_eq!(right.kind, OperandKind::NotAnOperation);
        assert_eq!(left.stripped_operator(), Some(BinaryOp::Mul));
    }

    #[test]
    fn comparisons_are_not_operations() {
        let (tree, start) = operands("int f(int a, int b) { return (a < b) + 1; }");
        let sum = tree
            .root()
            .descendant_for_byte_range(start, start + 1)
            .and_then(|n| syntax::ancestors(n).find(|a| syntax::operator_of(*a) == Some(BinaryOp::Add)))
            .unwrap();
        let left = OperandNode::classify(sum.child_by_field_name("left").unwrap());
        assert_eq!(left.kind, OperandKind::NotAnOperation);
        assert!(!left.is_compound());
    }
}
