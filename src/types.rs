use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::syntax::{self, BinaryOp, node_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Numeric {
    Bool,
    Char,
    Short,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
}

const IGNORED_WORDS: &[&str] = &[
    "const", "volatile", "static", "extern", "register", "inline", "restrict", "auto",
    "constexpr", "mutable", "thread_local",
];

impl Numeric {
    /// Canonical spelling, as a type descriptor.
    pub fn name(self) -> &'static str {
        match self {
            Numeric::Bool => "_Bool",
            Numeric::Char => "char",
            Numeric::Short => "short",
            Numeric::Int => "int",
            Numeric::UInt => "unsigned int",
            Numeric::Long => "long",
            Numeric::ULong => "unsigned long",
            Numeric::LongLong => "long long",
            Numeric::ULongLong => "unsigned long long",
            Numeric::Float => "float",
            Numeric::Double => "double",
            Numeric::LongDouble => "long double",
        }
    }

    /// Upper-case name used in report columns (`FLOAT`, `DOUBLE`, `INT`).
    pub fn report_name(self) -> String {
        self.name().to_uppercase().replace(' ', "_")
    }

    /// Parse a type specifier such as `unsigned long int` or `const float`.
    pub fn from_specifier(text: &str) -> Option<Numeric> {
        let words: Vec<&str> = text
            .split_whitespace()
            .filter(|w| !IGNORED_WORDS.contains(w))
            .collect();
        if let [single] = words.as_slice() {
            if let Some(fixed) = Self::fixed_width(single) {
                return Some(fixed);
            }
        }
        let unsigned = words.contains(&"unsigned");
        let longs = words.iter().filter(|w| **w == "long").count();
        if words.contains(&"float") {
            return Some(Numeric::Float);
        }
        if words.contains(&"double") {
            return Some(if longs > 0 { Numeric::LongDouble } else { Numeric::Double });
        }
        if words.contains(&"bool") || words.contains(&"_Bool") {
            return Some(Numeric::Bool);
        }
        if words.contains(&"char") {
            return Some(Numeric::Char);
        }
        if words.contains(&"short") {
            return Some(Numeric::Short);
        }
        let integral = words.contains(&"int") || words.contains(&"signed") || unsigned || longs > 0;
        if !integral {
            return None;
        }
        Some(match (longs, unsigned) {
            (0, false) => Numeric::Int,
            (0, true) => Numeric::UInt,
            (1, false) => Numeric::Long,
            (1, true) => Numeric::ULong,
            (_, false) => Numeric::LongLong,
            (_, true) => Numeric::ULongLong,
        })
    }

    fn fixed_width(name: &str) -> Option<Numeric> {
        let ty = match name {
            "int8_t" | "uint8_t" => Numeric::Char,
            "int16_t" | "uint16_t" => Numeric::Short,
            "int32_t" => Numeric::Int,
            "uint32_t" => Numeric::UInt,
            "int64_t" | "ptrdiff_t" | "ssize_t" | "intptr_t" => Numeric::Long,
            "uint64_t" | "size_t" | "uintptr_t" => Numeric::ULong,
            _ => return None,
        };
        Some(ty)
    }

    /// Type of a numeric literal, from its spelling and suffix.
    pub fn of_literal(text: &str) -> Numeric {
        let t = text.to_ascii_lowercase().replace('\'', "");
        let hex = t.starts_with("0x");
        let floating = if hex { t.contains('p') } else { t.contains('.') || t.contains('e') };
        if floating {
            return if t.ends_with('f') {
                Numeric::Float
            } else if t.ends_with('l') {
                Numeric::LongDouble
            } else {
                Numeric::Double
            };
        }
        let suffix: String = t.chars().rev().take_while(|c| *c == 'u' || *c == 'l').collect();
        let unsigned = suffix.contains('u');
        match (suffix.matches('l').count(), unsigned) {
            (0, false) => Numeric::Int,
            (0, true) => Numeric::UInt,
            (1, false) => Numeric::Long,
            (1, true) => Numeric::ULong,
            (_, false) => Numeric::LongLong,
            (_, true) => Numeric::ULongLong,
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Numeric::Float | Numeric::Double | Numeric::LongDouble)
    }

    fn is_unsigned(self) -> bool {
        matches!(self, Numeric::UInt | Numeric::ULong | Numeric::ULongLong)
    }

    /// Integer promotion.
    pub fn promote(self) -> Numeric {
        match self {
            Numeric::Bool | Numeric::Char | Numeric::Short => Numeric::Int,
            other => other,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Numeric::Long | Numeric::ULong => 2,
            Numeric::LongLong | Numeric::ULongLong => 3,
            _ => 1,
        }
    }

    fn width(self) -> u8 {
        match self {
            Numeric::Long | Numeric::ULong | Numeric::LongLong | Numeric::ULongLong => 64,
            _ => 32,
        }
    }

    fn to_unsigned(self) -> Numeric {
        match self {
            Numeric::Long => Numeric::ULong,
            Numeric::LongLong => Numeric::ULongLong,
            Numeric::Int => Numeric::UInt,
            other => other,
        }
    }

    /// Usual arithmetic conversions (LP64 widths).
    pub fn common(a: Numeric, b: Numeric) -> Numeric {
        for floating in [Numeric::LongDouble, Numeric::Double, Numeric::Float] {
            if a == floating || b == floating {
                return floating;
            }
        }
        let (a, b) = (a.promote(), b.promote());
        if a == b {
            return a;
        }
        if a.is_unsigned() == b.is_unsigned() {
            return if a.rank() >= b.rank() { a } else { b };
        }
        let (unsigned, signed) = if a.is_unsigned() { (a, b) } else { (b, a) };
        if unsigned.rank() >= signed.rank() {
            unsigned
        } else if signed.width() > unsigned.width() {
            signed
        } else {
            signed.to_unsigned()
        }
    }
}

impl std::fmt::Display for Numeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    Numeric(Numeric),
    /// Pointer or array of the inner type
    Pointer(Box<CType>),
    Other(String),
}

impl CType {
    pub fn numeric(&self) -> Option<Numeric> {
        match self {
            CType::Numeric(n) => Some(*n),
            _ => None,
        }
    }
}

const MAX_TYPEDEF_DEPTH: usize = 8;

/// Type queries over one parsed translation unit.
pub struct TypeEnv<'t> {
    root: Node<'t>,
    source: &'t str,
}

impl<'t> TypeEnv<'t> {
    pub fn new(root: Node<'t>, source: &'t str) -> Self {
        TypeEnv { root, source }
    }

    pub fn numeric_type_of(&self, expr: Node<'t>) -> Option<Numeric> {
        self.type_of(expr)?.numeric()
    }

    pub fn type_of(&self, expr: Node<'t>) -> Option<CType> {
        match expr.kind() {
            "number_literal" => Some(CType::Numeric(Numeric::of_literal(node_text(expr, self.source)))),
            "char_literal" => Some(CType::Numeric(Numeric::Char)),
            "true" | "false" => Some(CType::Numeric(Numeric::Bool)),
            "identifier" => self.lookup_variable(expr),
            "parenthesized_expression" => self.type_of(expr.named_child(0)?),
            "cast_expression" => self.descriptor_type(expr.child_by_field_name("type")?),
            "assignment_expression" => self.type_of(expr.child_by_field_name("left")?),
            "update_expression" => self.type_of(expr.child_by_field_name("argument")?),
            "comma_expression" => self.type_of(expr.child_by_field_name("right")?),
            "sizeof_expression" | "alignof_expression" => Some(CType::Numeric(Numeric::ULong)),
            "binary_expression" => self.binary_type(expr),
            "unary_expression" => {
                let op = expr.child_by_field_name("operator")?;
                if op.kind() == "!" || op.kind() == "not" {
                    return Some(CType::Numeric(Numeric::Int));
                }
                let inner = self.numeric_type_of(expr.child_by_field_name("argument")?)?;
                Some(CType::Numeric(inner.promote()))
            }
            "conditional_expression" => {
                let a = self.numeric_type_of(expr.child_by_field_name("consequence")?)?;
                let b = self.numeric_type_of(expr.child_by_field_name("alternative")?)?;
                Some(CType::Numeric(Numeric::common(a, b)))
            }
            "subscript_expression" => match self.type_of(expr.child_by_field_name("argument")?)? {
                CType::Pointer(inner) => Some(*inner),
                _ => None,
            },
            "pointer_expression" => {
                let op = expr.child_by_field_name("operator")?;
                let inner = self.type_of(expr.child_by_field_name("argument")?)?;
                match (op.kind(), inner) {
                    ("*", CType::Pointer(target)) => Some(*target),
                    ("&", ty) => Some(CType::Pointer(Box::new(ty))),
                    _ => None,
                }
            }
            "call_expression" => {
                let callee = expr.child_by_field_name("function")?;
                (callee.kind() == "identifier")
                    .then(|| self.lookup_function(node_text(callee, self.source)))
                    .flatten()
            }
            "field_expression" => {
                let field = expr.child_by_field_name("field")?;
                self.lookup_field(node_text(field, self.source))
            }
            _ => None,
        }
    }

    fn binary_type(&self, expr: Node<'t>) -> Option<CType> {
        let op = syntax::operator_of(expr)?;
        if op.is_comparison() {
            return Some(CType::Numeric(Numeric::Int));
        }
        let left = self.type_of(expr.child_by_field_name("left")?)?;
        let right = self.type_of(expr.child_by_field_name("right")?)?;
        match (left, right) {
            (CType::Numeric(l), CType::Numeric(r)) => match op {
                BinaryOp::Shl | BinaryOp::Shr => Some(CType::Numeric(l.promote())),
                _ => Some(CType::Numeric(Numeric::common(l, r))),
            },
            (CType::Pointer(p), CType::Numeric(_)) | (CType::Numeric(_), CType::Pointer(p))
                if matches!(op, BinaryOp::Add | BinaryOp::Sub) =>
            {
                Some(CType::Pointer(p))
            }
            (CType::Pointer(_), CType::Pointer(_)) if op == BinaryOp::Sub => {
                Some(CType::Numeric(Numeric::Long))
            }
            _ => None,
        }
    }

    /// Resolve a variable reference through the enclosing scopes, nearest
    /// first, considering only declarations that precede the use.
    fn lookup_variable(&self, ident: Node<'t>) -> Option<CType> {
        let name = node_text(ident, self.source);
        let use_at = ident.start_byte();
        for scope in syntax::ancestors(ident) {
            let found = match scope.kind() {
                "function_definition" => self.lookup_parameter(scope, name),
                "compound_statement" | "translation_unit" | "declaration_list" | "for_statement"
                | "for_range_loop" => self.lookup_in_scope(scope, name, use_at),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn lookup_in_scope(&self, scope: Node<'t>, name: &str, before: usize) -> Option<CType> {
        let mut found = None;
        let mut cursor = scope.walk();
        for child in scope.children(&mut cursor) {
            if child.start_byte() >= before {
                break;
            }
            if child.kind() == "declaration" {
                if let Some(ty) = self.declared_type_in(child, name) {
                    found = Some(ty);
                }
            }
        }
        found
    }

    fn lookup_parameter(&self, function: Node<'t>, name: &str) -> Option<CType> {
        let mut declarator = function.child_by_field_name("declarator")?;
        while declarator.kind() != "function_declarator" {
            declarator = declarator
                .child_by_field_name("declarator")
                .or_else(|| declarator.named_child(0))?;
        }
        let params = declarator.child_by_field_name("parameters")?;
        let mut cursor = params.walk();
        let found = params
            .named_children(&mut cursor)
            .filter(|p| matches!(p.kind(), "parameter_declaration" | "optional_parameter_declaration"))
            .find_map(|p| self.declared_type_in(p, name));
        found
    }

    /// Type given to `name` by one of the declarators of `decl`, if any.
    fn declared_type_in(&self, decl: Node<'t>, name: &str) -> Option<CType> {
        let base = self.specifier_type(decl.child_by_field_name("type")?, 0);
        let mut cursor = decl.walk();
        let declarators: Vec<Node<'t>> = decl.children_by_field_name("declarator", &mut cursor).collect();
        declarators.into_iter().find_map(|declarator| {
            (syntax::declared_name(declarator, self.source) == Some(name))
                .then(|| wrap_declarator(base.clone(), declarator))
        })
    }

    fn specifier_type(&self, spec: Node<'t>, depth: usize) -> CType {
        let text = node_text(spec, self.source);
        match spec.kind() {
            "primitive_type" | "sized_type_specifier" => Numeric::from_specifier(text)
                .map_or_else(|| CType::Other(text.to_string()), CType::Numeric),
            "type_identifier" => {
                if let Some(fixed) = Numeric::from_specifier(text) {
                    return CType::Numeric(fixed);
                }
                if depth < MAX_TYPEDEF_DEPTH {
                    if let Some(resolved) = self.resolve_typedef(text, depth) {
                        return resolved;
                    }
                }
                CType::Other(text.to_string())
            }
            _ => CType::Other(text.to_string()),
        }
    }

    fn descriptor_type(&self, descriptor: Node<'t>) -> Option<CType> {
        let base = self.specifier_type(descriptor.child_by_field_name("type")?, 0);
        match descriptor.child_by_field_name("declarator") {
            Some(abstract_decl) if abstract_decl.kind().contains("pointer") => {
                Some(CType::Pointer(Box::new(base)))
            }
            _ => Some(base),
        }
    }

    fn resolve_typedef(&self, name: &str, depth: usize) -> Option<CType> {
        let def = find_descendant(self.root, &|n: Node<'t>| {
            n.kind() == "type_definition"
                && declarators_of(n).any(|d| syntax::declared_name(d, self.source) == Some(name))
        })?;
        let base = self.specifier_type(def.child_by_field_name("type")?, depth + 1);
        let declarator = declarators_of(def).find(|d| syntax::declared_name(*d, self.source) == Some(name))?;
        Some(wrap_declarator(base, declarator))
    }

    fn lookup_function(&self, name: &str) -> Option<CType> {
        let mut cursor = self.root.walk();
        let children: Vec<Node<'t>> = self.root.named_children(&mut cursor).collect();
        children.into_iter().find_map(|item| match item.kind() {
            "function_definition" | "declaration" => {
                let declarator = item.child_by_field_name("declarator")?;
                if syntax::declared_name(declarator, self.source) != Some(name) {
                    return None;
                }
                let base = self.specifier_type(item.child_by_field_name("type")?, 0);
                Some(wrap_declarator(base, declarator))
            }
            _ => None,
        })
    }

    fn lookup_field(&self, field: &str) -> Option<CType> {
        let decl = find_descendant(self.root, &|n: Node<'t>| {
            n.kind() == "field_declaration"
                && declarators_of(n).any(|d| syntax::declared_name(d, self.source) == Some(field))
        })?;
        self.declared_type_in(decl, field)
    }
}

fn declarators_of<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    let mut cursor = node.walk();
    let found: Vec<Node<'t>> = node.children_by_field_name("declarator", &mut cursor).collect();
    found.into_iter()
}

fn find_descendant<'t>(node: Node<'t>, pred: &dyn Fn(Node<'t>) -> bool) -> Option<Node<'t>> {
    if pred(node) {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(|child| find_descendant(child, pred))
}

/// Apply the pointer and array layers of a declarator to its base type.
fn wrap_declarator(base: CType, declarator: Node<'_>) -> CType {
    let mut ty = base;
    let mut current = Some(declarator);
    while let Some(node) = current {
        match node.kind() {
            "pointer_declarator" | "array_declarator" => ty = CType::Pointer(Box::new(ty)),
            "init_declarator" | "parenthesized_declarator" | "reference_declarator"
            | "function_declarator" => {}
            _ => break,
        }
        current = node
            .child_by_field_name("declarator")
            .or_else(|| node.named_child(0));
    }
    ty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specifiers_canonicalize() {
        assert_eq!(Numeric::from_specifier("float"), Some(Numeric::Float));
        assert_eq!(Numeric::from_specifier("const double"), Some(Numeric::Double));
        assert_eq!(Numeric::from_specifier("long double"), Some(Numeric::LongDouble));
        assert_eq!(Numeric::from_specifier("unsigned"), Some(Numeric::UInt));
        assert_eq!(Numeric::from_specifier("long long int"), Some(Numeric::LongLong));
        assert_eq!(Numeric::from_specifier("signed"), Some(Numeric::Int));
        assert_eq!(Numeric::from_specifier("uint64_t"), Some(Numeric::ULong));
        assert_eq!(Numeric::from_specifier("struct point"), None);
    }

    #[test]
    fn literal_suffixes() {
        assert_eq!(Numeric::of_literal("1"), Numeric::Int);
        assert_eq!(Numeric::of_literal("1u"), Numeric::UInt);
        assert_eq!(Numeric::of_literal("10UL"), Numeric::ULong);
        assert_eq!(Numeric::of_literal("2.5"), Numeric::Double);
        assert_eq!(Numeric::of_literal("2.5f"), Numeric::Float);
        assert_eq!(Numeric::of_literal("1e3"), Numeric::Double);
        assert_eq!(Numeric::of_literal("0xff"), Numeric::Int);
    }

    #[test]
    fn usual_arithmetic_conversions() {
        assert_eq!(Numeric::common(Numeric::Float, Numeric::Int), Numeric::Float);
        assert_eq!(Numeric::common(Numeric::Float, Numeric::Double), Numeric::Double);
        assert_eq!(Numeric::common(Numeric::Char, Numeric::Short), Numeric::Int);
        assert_eq!(Numeric::common(Numeric::Int, Numeric::UInt), Numeric::UInt);
        assert_eq!(Numeric::common(Numeric::UInt, Numeric::Long), Numeric::Long);
        assert_eq!(Numeric::common(Numeric::ULong, Numeric::LongLong), Numeric::ULongLong);
    }

    #[test]
    fn report_names_are_upper_case() {
        assert_eq!(Numeric::Float.report_name(), "FLOAT");
        assert_eq!(Numeric::LongDouble.report_name(), "LONG_DOUBLE");
    }
}
