use tree_sitter::Node;

use crate::classify::{OperandNode, normalized_text};
use crate::error::{Error, Result};
use crate::filter::FilterRule;
use crate::matcher::{CandidateMatch, Exclusion, MatchRule};
use crate::record::{MutantContext, MutationRecord, OperationId, RecordedOperand};
use crate::report::{Columns, ReportFormat, ReportMode};
use crate::rewrite::Segment;
use crate::strategy::{Strategy, StrategyOptions};
use crate::syntax;
use crate::types::Numeric;

pub const REPORT_NAME: &str = "flap_float_report.csv";
const ID_PREFIX: &str = "OP_";

const FILTERS: &[FilterRule] = &[
    FilterRule::UnsupportedOperator,
    FilterRule::ConditionBoundary,
    FilterRule::EmptyText,
];

pub struct Flap {
    rule: MatchRule,
    report: ReportFormat,
}

impl Default for Flap {
    fn default() -> Self {
        Self::with_options(&StrategyOptions::default())
    }
}

impl Flap {
    pub fn with_options(options: &StrategyOptions) -> Self {
        Flap {
            rule: MatchRule {
                operators: None,
                types: vec![Numeric::Float, Numeric::Double],
                exclusions: options.exclusions.clone().unwrap_or_else(Exclusion::defaults),
                attach_assignment: true,
                attach_control: true,
            },
            report: ReportFormat {
                file_name: options.report_name.clone().unwrap_or_else(|| REPORT_NAME.to_string()),
                mode: options.report_mode.unwrap_or(ReportMode::Replace),
                columns: Columns::Full,
            },
        }
    }
}

/// Exponent and mantissa widths of the IEEE format behind `ty`.
fn precision(ty: Numeric) -> (u32, u32) {
    match ty {
        Numeric::Float => (8, 23),
        _ => (11, 52),
    }
}

struct Wrap {
    open: String,
    close: String,
}

impl Wrap {
    fn new(ty: Numeric, id: &OperationId) -> Self {
        let ty = ty.name();
        Wrap {
            open: format!("({ty})(::fap::FloatingPointType(({ty}) "),
            close: format!(", {id}))"),
        }
    }

    fn around(&self, ctx: &mut MutantContext, node: Node<'_>) {
        let buffer = ctx.buffer_mut();
        buffer.insert_before(node.start_byte(), self.open.clone());
        buffer.insert_after(node.end_byte(), self.close.clone());
    }

    /// Template pieces for an operand spliced into a replacement, keeping
    /// any explicit cast in front of the wrapped value.
    fn segments(&self, operand: &OperandNode<'_>) -> Vec<Segment> {
        let mut segments = Vec::new();
        if operand.node.start_byte() < operand.target.start_byte() {
            segments.push(Segment::Source(operand.node.start_byte()..operand.target.start_byte()));
        }
        segments.push(Segment::text(self.open.clone()));
        segments.push(Segment::Source(operand.target.byte_range()));
        segments.push(Segment::text(self.close.clone()));
        segments
    }
}

impl Strategy for Flap {
    fn name(&self) -> &'static str {
        "flap"
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
        let operator = candidate.op.arith().ok_or_else(|| Error::UnsupportedOperator {
            operator: candidate.op.symbol(),
            line: candidate.line(),
        })?;
        let source = ctx.buffer().original().to_string();
        let id = ctx.mint(ID_PREFIX);
        let (exp, mant) = precision(candidate.op_type);

        let anchor = syntax::declaration_anchor(candidate.function);
        ctx.buffer_mut()
            .insert_after(anchor.start_byte(), format!("::fap::FloatPrecTy {id}({exp},{mant});\n"));

        let wrap = Wrap::new(candidate.op_type, &id);
        let (lhs, rhs) = (&candidate.lhs, &candidate.rhs);
        // Both operands are wrapped unless exactly one of them is itself an
        // arithmetic operation, in which case only the other one is.
        let both = lhs.is_compound() == rhs.is_compound();
        let wrap_lhs = both || !lhs.is_compound();
        let wrap_rhs = both || !rhs.is_compound();

        let assigned_to = if candidate.op.is_compound_assignment() {
            let mut template = vec![Segment::Source(lhs.node.byte_range()), Segment::text(" = ")];
            if wrap_lhs {
                template.extend(wrap.segments(lhs));
            } else {
                template.push(Segment::Source(lhs.node.byte_range()));
            }
            template.push(Segment::text(format!(" {} ", operator.symbol())));
            if wrap_rhs {
                template.extend(wrap.segments(rhs));
            } else {
                template.push(Segment::Source(rhs.node.byte_range()));
            }
            ctx.buffer_mut().replace(candidate.node.byte_range(), template);
            syntax::simple_name(lhs.node, &source).map(str::to_string)
        } else {
            if wrap_lhs {
                wrap.around(ctx, lhs.target);
            }
            if wrap_rhs {
                wrap.around(ctx, rhs.target);
            }
            assignment_target(candidate, &source)
        };

        let operands = [recorded(lhs, ctx, &source), recorded(rhs, ctx, &source)];
        ctx.mark_produced(candidate.node.byte_range(), id.clone());
        ctx.push(MutationRecord {
            id,
            line: candidate.line(),
            result_type: candidate.op_type,
            operator,
            operands,
            assigned_to,
            span: Some(candidate.node.byte_range()),
            scope: Some(candidate.function.byte_range()),
        });
        Ok(())
    }
}

/// Left side of the enclosing `=` whose right side is exactly this match.
fn assignment_target(candidate: &CandidateMatch<'_>, source: &str) -> Option<String> {
    let assignment = candidate.assignment?;
    let right = assignment.child_by_field_name("right")?;
    if syntax::strip_casts_and_parens(right) != candidate.node {
        return None;
    }
    let left = assignment.child_by_field_name("left")?;
    syntax::simple_name(left, source).map(str::to_string)
}

fn recorded(operand: &OperandNode<'_>, ctx: &MutantContext, source: &str) -> RecordedOperand {
    let mut recorded = RecordedOperand::new(normalized_text(operand.internal, source), operand.kind).at(operand.internal);
    if operand.is_compound() {
        recorded.origin = ctx.origin_of(operand.internal);
    }
    recorded
}
