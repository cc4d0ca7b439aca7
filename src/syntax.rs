use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser, Tree};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    C,
    Cpp,
}

impl Dialect {
    fn language(self) -> tree_sitter::Language {
        match self {
            Dialect::C => tree_sitter_c::LANGUAGE.into(),
            Dialect::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }
}

/// A parsed translation unit together with the source it was parsed from.
pub struct SyntaxTree {
    source: String,
    tree: Tree,
    dialect: Dialect,
}

impl SyntaxTree {
    pub fn parse(source: &str, dialect: Dialect) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&dialect.language())
            .map_err(|e| Error::Parse(format!("failed to load {dialect:?} grammar: {e}")))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| Error::Parse("parser returned no tree".to_string()))?;
        if tree.root_node().has_error() {
            log::warn!("source contains syntax errors; affected expressions may be skipped");
        }
        Ok(SyntaxTree {
            source: source.to_string(),
            tree,
            dialect,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        node_text(node, &self.source)
    }
}

pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// 1-based line of the node's first byte.
pub fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// The four operators both strategies know how to mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    /// Name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "ADD",
            ArithOp::Sub => "SUB",
            ArithOp::Mul => "MUL",
            ArithOp::Div => "DIV",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            ArithOp::Add => '+',
            ArithOp::Sub => '-',
            ArithOp::Mul => '*',
            ArithOp::Div => '/',
        }
    }
}

/// Operator of a binary or assignment expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    OrAssign,
    XorAssign,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "&&" | "and" => BinaryOp::LogicalAnd,
            "||" | "or" => BinaryOp::LogicalOr,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "=" => BinaryOp::Assign,
            "+=" => BinaryOp::AddAssign,
            "-=" => BinaryOp::SubAssign,
            "*=" => BinaryOp::MulAssign,
            "/=" => BinaryOp::DivAssign,
            "%=" => BinaryOp::RemAssign,
            "<<=" => BinaryOp::ShlAssign,
            ">>=" => BinaryOp::ShrAssign,
            "&=" => BinaryOp::AndAssign,
            "|=" => BinaryOp::OrAssign,
            "^=" => BinaryOp::XorAssign,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::RemAssign => "%=",
            BinaryOp::ShlAssign => "<<=",
            BinaryOp::ShrAssign => ">>=",
            BinaryOp::AndAssign => "&=",
            BinaryOp::OrAssign => "|=",
            BinaryOp::XorAssign => "^=",
        }
    }

    /// Maps add/sub/mul/div and their compound-assignment forms.
    pub fn arith(self) -> Option<ArithOp> {
        match self {
            BinaryOp::Add | BinaryOp::AddAssign => Some(ArithOp::Add),
            BinaryOp::Sub | BinaryOp::SubAssign => Some(ArithOp::Sub),
            BinaryOp::Mul | BinaryOp::MulAssign => Some(ArithOp::Mul),
            BinaryOp::Div | BinaryOp::DivAssign => Some(ArithOp::Div),
            _ => None,
        }
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::RemAssign
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
                | BinaryOp::AndAssign
                | BinaryOp::OrAssign
                | BinaryOp::XorAssign
        )
    }

    pub fn is_compound_assignment(self) -> bool {
        self.is_assignment() && self != BinaryOp::Assign
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::LogicalAnd
                | BinaryOp::LogicalOr
        )
    }
}

/// Operator of a `binary_expression` or `assignment_expression` node.
pub fn operator_of(node: Node<'_>) -> Option<BinaryOp> {
    match node.kind() {
        "binary_expression" | "assignment_expression" => {
            let op = node.child_by_field_name("operator")?;
            BinaryOp::from_token(op.kind())
        }
        _ => None,
    }
}

/// What a node is, as far as walking up an operation chain is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A binary expression with the given operator
    Operation(BinaryOp),
    /// Parentheses around a single expression
    Grouping,
    /// A variable, field, parameter or function declaration
    DeclBoundary,
    /// A plain `=` assignment
    Assignment,
    Other,
}

impl Shape {
    pub fn of(node: Node<'_>) -> Shape {
        match node.kind() {
            "binary_expression" => operator_of(node).map_or(Shape::Other, Shape::Operation),
            "assignment_expression" => match operator_of(node) {
                Some(BinaryOp::Assign) => Shape::Assignment,
                _ => Shape::Other,
            },
            "parenthesized_expression" => Shape::Grouping,
            "init_declarator" | "declaration" | "field_declaration" | "parameter_declaration"
            | "function_definition" => Shape::DeclBoundary,
            _ => Shape::Other,
        }
    }
}

/// Ancestors of `node`, nearest first.
pub fn ancestors(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    std::iter::successors(node.parent(), |n| n.parent())
}

/// Nearest ancestor whose kind is one of `kinds`.
pub fn enclosing<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    ancestors(node).find(|n| kinds.contains(&n.kind()))
}

pub fn enclosing_function(node: Node<'_>) -> Option<Node<'_>> {
    enclosing(node, &["function_definition"])
}

/// The node per-operation declarations are inserted before: the function,
/// or the `template<...>` declaration wrapping it.
pub fn declaration_anchor(function: Node<'_>) -> Node<'_> {
    match function.parent() {
        Some(parent) if parent.kind() == "template_declaration" => parent,
        _ => function,
    }
}

/// Name introduced by a declarator, descending through pointer, array,
/// function, reference and init declarators.
pub fn declared_name<'a>(declarator: Node<'_>, source: &'a str) -> Option<&'a str> {
    let mut current = declarator;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "qualified_identifier"
            | "destructor_name" | "operator_name" => return Some(node_text(current, source)),
            _ => {}
        }
        current = match current.child_by_field_name("declarator") {
            Some(inner) => inner,
            None => current.named_child(0)?,
        };
    }
}

pub fn function_name<'a>(function: Node<'_>, source: &'a str) -> Option<&'a str> {
    let declarator = function.child_by_field_name("declarator")?;
    declared_name(declarator, source)
}

pub fn find_function<'t>(node: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    if node.kind() == "function_definition" && function_name(node, source) == Some(name) {
        return Some(node);
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            if let Some(found) = find_function(child, name, source) {
                return Some(found);
            }
        }
    }
    None
}

/// List all function definition names in the tree.
pub fn list_functions(tree: &SyntaxTree) -> Vec<String> {
    let mut names = Vec::new();
    collect_function_names(tree.root(), tree.source(), &mut names);
    names
}

fn collect_function_names(node: Node<'_>, source: &str, names: &mut Vec<String>) {
    if node.kind() == "function_definition" {
        if let Some(name) = function_name(node, source) {
            names.push(name.to_string());
        }
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            collect_function_names(child, source, names);
        }
    }
}

/// Strip any number of enclosing parentheses.
pub fn strip_parens(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while current.kind() == "parenthesized_expression" {
        match current.named_child(0) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

/// Strip explicit C-style casts (but not parentheses).
pub fn strip_casts(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while current.kind() == "cast_expression" {
        match current.child_by_field_name("value") {
            Some(value) => current = value,
            None => break,
        }
    }
    current
}

/// Strip casts and parentheses in any interleaving.
pub fn strip_casts_and_parens(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    loop {
        let next = strip_casts(strip_parens(current));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Name of a simple variable reference, ignoring parentheses.
pub fn simple_name<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    let inner = strip_parens(node);
    (inner.kind() == "identifier").then(|| node_text(inner, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        children.into_iter().find_map(|c| first_of_kind(c, kind))
    }

    #[test]
    fn operator_tokens_roundtrip_through_symbol() {
        for token in ["+", "-", "*", "/", "+=", "/=", "=", "<", "&&"] {
            assert_eq!(BinaryOp::from_token(token).unwrap().symbol(), token);
        }
    }

    #[test]
    fn compound_assignments_map_to_arith() {
        assert_eq!(BinaryOp::AddAssign.arith(), Some(ArithOp::Add));
        assert_eq!(BinaryOp::DivAssign.arith(), Some(ArithOp::Div));
        assert_eq!(BinaryOp::Rem.arith(), None);
        assert!(BinaryOp::MulAssign.is_compound_assignment());
        assert!(!BinaryOp::Assign.is_compound_assignment());
    }

    #[test]
    fn shape_of_parent_nodes() {
        let tree = SyntaxTree::parse("int f(int a, int b) { int r; r = (a + b) + 1; return r; }", Dialect::C).unwrap();
        let assign = first_of_kind(tree.root(), "assignment_expression").unwrap();
        assert_eq!(Shape::of(assign), Shape::Assignment);
        let paren = first_of_kind(tree.root(), "parenthesized_expression").unwrap();
        assert_eq!(Shape::of(paren), Shape::Grouping);
        assert_eq!(Shape::of(paren.parent().unwrap()), Shape::Operation(BinaryOp::Add));
        let decl = first_of_kind(tree.root(), "declaration").unwrap();
        assert_eq!(Shape::of(decl), Shape::DeclBoundary);
    }

    #[test]
    fn strips_nested_parens_and_casts() {
        let tree = SyntaxTree::parse("float f(float a) { return ((float)((a))); }", Dialect::C).unwrap();
        let ret = first_of_kind(tree.root(), "return_statement").unwrap();
        let expr = ret.named_child(0).unwrap();
        let inner = strip_casts_and_parens(expr);
        assert_eq!(tree.text(inner), "a");
    }

    #[test]
    fn function_names_through_pointer_declarators() {
        let tree = SyntaxTree::parse("float *make(void) { return 0; }\nint main() { return 0; }", Dialect::C).unwrap();
        assert_eq!(list_functions(&tree), vec!["make", "main"]);
    }
}
