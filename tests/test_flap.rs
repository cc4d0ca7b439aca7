use approx_mutator::classify::OperandKind;
use approx_mutator::flap::Flap;
use approx_mutator::lineage;
use approx_mutator::matcher::Matches;
use approx_mutator::record::MutantContext;
use approx_mutator::record::OperationId;
use approx_mutator::report::{self, Columns};
use approx_mutator::runner::{self, Mutant};
use approx_mutator::syntax::ArithOp;
use approx_mutator::types::Numeric;
use approx_mutator::syntax::BinaryOp;
use approx_mutator::{Dialect, Error, Strategy, SyntaxTree};

fn mutate(source: &str) -> Mutant {
    let tree = SyntaxTree::parse(source, Dialect::C).unwrap();
    runner::generate_mutant(&tree, &Flap::default(), None).unwrap()
}

#[test]
fn plain_operands_are_both_wrapped() {
    let source = "float scale(float a, float b) {\n    float r;\n    r = a + b;\n    return r;\n}\n";
    let mutant = mutate(source);
    assert_eq!(
        mutant.mutated,
        "::fap::FloatPrecTy OP_0(8,23);\n\
         float scale(float a, float b) {\n    float r;\n    \
         r = (float)(::fap::FloatingPointType((float) a, OP_0)) + (float)(::fap::FloatingPointType((float) b, OP_0));\n    \
         return r;\n}\n"
    );
    assert_eq!(mutant.records.len(), 1);
    let record = &mutant.records[0];
    assert_eq!(record.id, OperationId::new("OP_0"));
    assert_eq!(record.line, 3);
    assert_eq!(record.result_type, Numeric::Float);
    assert_eq!(record.operator, ArithOp::Add);
    assert_eq!(record.operands[0].text, "a");
    assert_eq!(record.operands[1].text, "b");
    assert_eq!(record.assigned_to.as_deref(), Some("r"));
    // `r = ...` is matched structurally but is not an arithmetic operator
    assert_eq!(mutant.rejected, 1);
    assert_eq!(
        report::render_line(record, Columns::Full),
        "OP_0,3,FLOAT,ADD,\"a\",\"b\",\"r\""
    );
}

#[test]
fn double_operations_get_double_precision() {
    let mutant = mutate("double f(double x, double y) { return x * y; }");
    assert!(mutant.mutated.starts_with("::fap::FloatPrecTy OP_0(11,52);\n"));
    assert!(mutant.mutated.contains("(double)(::fap::FloatingPointType((double) x, OP_0))"));
    assert_eq!(mutant.records[0].result_type, Numeric::Double);
    assert_eq!(mutant.records[0].assigned_to, None);
}

#[test]
fn both_compound_operands_are_wrapped_and_linked() {
    let source = "double f(double a, double b, double c, double d) { return (a * b) + (c * d); }";
    let mutant = mutate(source);
    let w = |v: &str, id: &str| format!("(double)(::fap::FloatingPointType((double) {v}, {id}))");
    let expected = format!(
        "return {} + {};",
        w(&format!("({} * {})", w("a", "OP_0"), w("b", "OP_0")), "OP_2"),
        w(&format!("({} * {})", w("c", "OP_1"), w("d", "OP_1")), "OP_2"),
    );
    assert!(mutant.mutated.contains(&expected), "{}", mutant.mutated);
    assert!(mutant.mutated.starts_with(
        "::fap::FloatPrecTy OP_0(11,52);\n::fap::FloatPrecTy OP_1(11,52);\n::fap::FloatPrecTy OP_2(11,52);\n"
    ));

    let sum = &mutant.records[2];
    assert_eq!(sum.operands[0].kind, OperandKind::Operation(ArithOp::Mul));
    assert_eq!(sum.operands[0].text, "a*b");
    let resolved = lineage::resolve(&mutant.records);
    assert_eq!(resolved[2].operands[0].text, "OP_0");
    assert_eq!(resolved[2].operands[1].text, "OP_1");
}

#[test]
fn unmutated_operand_is_not_linked_to_another_function() {
    let source = "float g(float a, float b) { return a + b; }\n\
                  float f(float x, int a, int b) { return x * (a + b); }\n";
    let mutant = mutate(source);
    assert_eq!(mutant.records.len(), 2);

    let product = &mutant.records[1];
    assert_eq!(product.operands[1].kind, OperandKind::Operation(ArithOp::Add));
    assert_eq!(product.operands[1].origin, None);
    let resolved = lineage::resolve(&mutant.records);
    assert_eq!(resolved[1].operands[0].text, "x");
    assert_eq!(resolved[1].operands[1].text, "a+b");
}

#[test]
fn one_compound_operand_wraps_only_the_other() {
    let mutant = mutate("float f(float a, float b, float c) { return a * b - c; }");
    assert!(mutant.mutated.contains(
        "return (float)(::fap::FloatingPointType((float) a, OP_0)) * (float)(::fap::FloatingPointType((float) b, OP_0)) - (float)(::fap::FloatingPointType((float) c, OP_1));"
    ), "{}", mutant.mutated);
}

#[test]
fn compound_assignment_is_desugared() {
    let source = "void acc(float *out, float x, float y) {\n    float s = 0;\n    s += x * y;\n    *out = s;\n}\n";
    let mutant = mutate(source);
    assert!(mutant.mutated.contains(
        "s = (float)(::fap::FloatingPointType((float) s, OP_1)) + (float)(::fap::FloatingPointType((float) x, OP_0)) * (float)(::fap::FloatingPointType((float) y, OP_0));"
    ), "{}", mutant.mutated);

    let records = lineage::resolve(&mutant.records);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].operator, ArithOp::Add);
    assert_eq!(records[1].assigned_to.as_deref(), Some("s"));
    assert_eq!(
        report::render_line(&records[1], Columns::Full),
        "OP_1,3,FLOAT,ADD,\"s\",\"OP_0\",\"s\""
    );
}

#[test]
fn if_condition_is_skipped_but_its_body_is_not() {
    let source = "void f(float x, float y, float p, float q) {\n    float z;\n    if (x + y > 0) { z = p + q; }\n}\n";
    let mutant = mutate(source);
    assert_eq!(mutant.records.len(), 1);
    assert_eq!(mutant.records[0].operands[0].text, "p");
    assert_eq!(mutant.records[0].assigned_to.as_deref(), Some("z"));
    assert!(mutant.mutated.contains("if (x + y > 0)"));
}

#[test]
fn loop_conditions_are_mutated() {
    let mutant = mutate("void f(float x, float y) { while (x + y < 10) { x = x * 2; } }");
    assert_eq!(mutant.records.len(), 2);
}

#[test]
fn integer_and_call_argument_operations_are_left_alone() {
    let source = "float g(float v);\nfloat f(float a, float b, int i, int j) { int k = i + j; return g(a + b); }";
    let mutant = mutate(source);
    assert!(mutant.records.is_empty());
    assert_eq!(mutant.mutated, source);
}

#[test]
fn identifiers_are_unique_within_a_mutant() {
    let source = "float f(float a, float b) { float r = a + b; r = r * a - b / a; return r; }";
    let mutant = mutate(source);
    let mut ids: Vec<_> = mutant.records.iter().map(|r| r.id.to_string()).collect();
    let count = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), count);
    assert_eq!(count, 4);
}

#[test]
fn applying_a_non_arithmetic_operator_is_an_error() {
    let tree = SyntaxTree::parse("void f(float a, float b) {\n    a = b;\n}\n", Dialect::C).unwrap();
    let flap = Flap::default();
    let assign = Matches::new(&tree, flap.rule())
        .map(|m| m.unwrap())
        .find(|m| m.op == BinaryOp::Assign)
        .unwrap();

    let mut ctx = MutantContext::new(tree.source());
    let err = flap.apply(&assign, &mut ctx).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperator { operator: "=", line: 2 }), "{err}");
    assert!(ctx.records().is_empty());
    assert_eq!(ctx.buffer().rewritten_text(0..tree.source().len()), tree.source());
}
