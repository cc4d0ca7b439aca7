use tree_sitter::Node;

use crate::classify::{OperandNode, normalized_text};
use crate::error::Result;
use crate::filter::FilterRule;
use crate::matcher::{self, CandidateMatch, Exclusion, MatchRule};
use crate::record::{MutantContext, MutationRecord, RecordedOperand};
use crate::report::{Columns, ReportFormat, ReportMode};
use crate::rewrite::Segment;
use crate::strategy::{Strategy, StrategyOptions};
use crate::syntax::{self, ArithOp, BinaryOp, Shape};
use crate::types::Numeric;

pub const REPORT_NAME: &str = "inax1_report.csv";
const ID_PREFIX: &str = "nab_";

const FILTERS: &[FilterRule] = &[FilterRule::ChainTail, FilterRule::EmptyText];

pub struct InAx1 {
    rule: MatchRule,
    report: ReportFormat,
}

impl Default for InAx1 {
    fn default() -> Self {
        Self::with_options(&StrategyOptions::default())
    }
}

impl InAx1 {
    pub fn with_options(options: &StrategyOptions) -> Self {
        InAx1 {
            rule: MatchRule {
                operators: Some(vec![BinaryOp::Add]),
                types: vec![Numeric::Int],
                exclusions: options.exclusions.clone().unwrap_or_else(Exclusion::defaults),
                attach_assignment: false,
                attach_control: false,
            },
            report: ReportFormat {
                file_name: options.report_name.clone().unwrap_or_else(|| REPORT_NAME.to_string()),
                mode: options.report_mode.unwrap_or(ReportMode::Append),
                columns: Columns::Compact,
            },
        }
    }
}

/// Where the walk goes after a link has been rewritten.
#[derive(Debug, PartialEq)]
enum Step<'t> {
    /// The next link up the chain
    Continue(Node<'t>),
    /// The chain result is assigned to a variable (if it is a simple name)
    Assigned(Option<String>),
    Stop,
}

fn next_step<'t>(link: Node<'t>, op: BinaryOp, source: &str) -> Step<'t> {
    let Some(parent) = link.parent() else {
        return Step::Stop;
    };
    match Shape::of(parent) {
        Shape::Operation(parent_op) if parent_op == op => Step::Continue(parent),
        Shape::Grouping => {
            let outer = syntax::ancestors(parent).find(|a| Shape::of(*a) != Shape::Grouping);
            match outer {
                Some(outer) => match Shape::of(outer) {
                    Shape::Operation(outer_op) if outer_op == op => Step::Continue(outer),
                    Shape::Assignment => Step::Assigned(assignment_name(outer, source)),
                    shape => {
                        log::debug!("chain ends at parenthesized {shape:?}");
                        Step::Stop
                    }
                },
                None => Step::Stop,
            }
        }
        Shape::Assignment => Step::Assigned(assignment_name(parent, source)),
        Shape::DeclBoundary => Step::Stop,
        shape => {
            log::debug!("chain ends at {shape:?} ({})", parent.kind());
            Step::Stop
        }
    }
}

fn assignment_name(assignment: Node<'_>, source: &str) -> Option<String> {
    let left = assignment.child_by_field_name("left")?;
    syntax::simple_name(left, source).map(str::to_string)
}

fn operand<'t>(link: Node<'t>, field: &'static str) -> Result<OperandNode<'t>> {
    matcher::operand_binding(link, field).map(OperandNode::classify)
}

impl Strategy for InAx1 {
    fn name(&self) -> &'static str {
        "inax1"
    }

    fn rule(&self) -> &MatchRule {
        &self.rule
    }

    fn filter_rules(&self) -> &[FilterRule] {
        FILTERS
    }

    fn report_format(&self) -> &ReportFormat {
        &self.report
    }

    fn apply(&self, candidate: &CandidateMatch<'_>, ctx: &mut MutantContext) -> Result<()> {
        let source = ctx.buffer().original().to_string();
        let anchor = syntax::declaration_anchor(candidate.function);
        let mut link = candidate.node;
        let (mut lhs, mut rhs) = (candidate.lhs, candidate.rhs);

        loop {
            if ctx.buffer().is_replaced(&link.byte_range()) {
                log::debug!("link at line {} already rewritten", syntax::line_of(link));
                break;
            }
            let id = ctx.mint(ID_PREFIX);
            ctx.buffer_mut().insert_after(anchor.start_byte(), format!("int {id} = 0;\n"));
            ctx.buffer_mut().replace(
                link.byte_range(),
                vec![
                    Segment::text(format!("InAx1_adder({id}, ")),
                    Segment::Source(lhs.node.byte_range()),
                    Segment::text(", "),
                    Segment::Source(rhs.node.byte_range()),
                    Segment::text(")"),
                ],
            );

            let step = next_step(link, candidate.op, &source);
            let operands = [recorded(&lhs, ctx, &source), recorded(&rhs, ctx, &source)];
            ctx.mark_produced(link.byte_range(), id.clone());
            ctx.push(MutationRecord {
                id,
                line: syntax::line_of(link),
                result_type: candidate.op_type,
                operator: ArithOp::Add,
                operands,
                assigned_to: match &step {
                    Step::Assigned(name) => name.clone(),
                    _ => None,
                },
                span: Some(link.byte_range()),
                scope: Some(candidate.function.byte_range()),
            });

            match step {
                Step::Continue(parent) => {
                    link = parent;
                    lhs = operand(link, "left")?;
                    rhs = operand(link, "right")?;
                }
                Step::Assigned(_) | Step::Stop => break,
            }
        }
        Ok(())
    }
}

fn recorded(operand: &OperandNode<'_>, ctx: &MutantContext, source: &str) -> RecordedOperand {
    let mut recorded = RecordedOperand::new(normalized_text(operand.internal, source), operand.kind).at(operand.internal);
    if operand.is_compound() {
        recorded.origin = ctx.origin_of(operand.internal);
    }
    recorded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::syntax::{Dialect, SyntaxTree};

    fn innermost_add(tree: &SyntaxTree) -> Node<'_> {
        let source = tree.source();
        let at = source.find("a + b").unwrap();
        let leaf = tree.root().descendant_for_byte_range(at, at + 1).unwrap();
        syntax::ancestors(leaf).find(|n| n.kind() == "binary_expression").unwrap()
    }

    #[test]
    fn step_climbs_through_parens_into_same_operator() {
        let tree = SyntaxTree::parse("int f(int a, int b, int c) { return (a + b) + c; }", Dialect::C).unwrap();
        let link = innermost_add(&tree);
        match next_step(link, BinaryOp::Add, tree.source()) {
            Step::Continue(parent) => assert_eq!(tree.text(parent), "(a + b) + c"),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn step_records_assignment_through_parens() {
        let tree = SyntaxTree::parse("void f(int a, int b) { int r; r = ((a + b)); }", Dialect::C).unwrap();
        let link = innermost_add(&tree);
        assert_eq!(next_step(link, BinaryOp::Add, tree.source()), Step::Assigned(Some("r".to_string())));
    }

    #[test]
    fn operands_of_a_non_operation_are_missing() {
        let tree = SyntaxTree::parse("int f(int a, int b) { return a + b; }", Dialect::C).unwrap();
        let link = innermost_add(&tree);
        assert_eq!(tree.text(operand(link, "right").unwrap().node), "b");

        let leaf = link.child_by_field_name("left").unwrap();
        let err = operand(leaf, "left").unwrap_err();
        assert!(matches!(err, Error::MissingBinding { binding: "lhs", line: 1 }), "{err}");
    }

    #[test]
    fn step_stops_at_declarations_and_other_operators() {
        let tree = SyntaxTree::parse("void f(int a, int b) { int r = a + b; int s = (a + b) * 2; }", Dialect::C).unwrap();
        let link = innermost_add(&tree);
        assert_eq!(next_step(link, BinaryOp::Add, tree.source()), Step::Stop);
    }
}
