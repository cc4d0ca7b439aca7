use std::ops::Range;

use crate::classify::OperandKind;
use crate::record::{MutationRecord, OperationId, RecordedOperand};
use crate::syntax::ArithOp;

/// Replace operand texts that denote another recorded operation with that
/// operation's identifier. Matching reads the original texts; only the
/// returned copy is changed.
pub fn resolve(records: &[MutationRecord]) -> Vec<MutationRecord> {
    let mut resolved = records.to_vec();
    for (index, record) in records.iter().enumerate() {
        for (slot, operand) in record.operands.iter().enumerate() {
            let source = match operand.kind {
                OperandKind::Operation(op) => operand
                    .origin
                    .clone()
                    .or_else(|| sub_operation(records, index, op, operand)),
                OperandKind::NotAnOperation => prior_result(records, index, &operand.text),
            };
            if let Some(id) = source {
                log::debug!("{} operand {} -> {id}", record.id, slot + 1);
                resolved[index].operands[slot].text = id.to_string();
            }
        }
    }
    resolved
}

/// First other record with operator `op` that lies inside the operand and
/// whose operands appear, in order and around its operator symbol, in the
/// operand text. Without source positions the record only has to come from
/// the same function.
fn sub_operation(
    records: &[MutationRecord],
    index: usize,
    op: ArithOp,
    operand: &RecordedOperand,
) -> Option<OperationId> {
    let owner = &records[index];
    records
        .iter()
        .enumerate()
        .filter(|(j, q)| *j != index && q.operator == op)
        .filter(|(_, q)| match (&operand.span, &q.span) {
            (Some(outer), Some(inner)) => contains(outer, inner),
            _ => q.scope == owner.scope,
        })
        .find(|(_, q)| occurs_in(q, &operand.text))
        .map(|(_, q)| q.id.clone())
}

fn contains(outer: &Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

fn occurs_in(record: &MutationRecord, text: &str) -> bool {
    let [first, second] = [&record.operands[0].text, &record.operands[1].text];
    if first.is_empty() || second.is_empty() {
        return false;
    }
    let Some(at) = text.find(first.as_str()) else {
        return false;
    };
    let rest = &text[at + first.len()..];
    let symbol = record.operator.symbol();
    match rest.find(symbol) {
        Some(sym) => rest[sym + symbol.len_utf8()..].contains(second.as_str()),
        None => false,
    }
}

/// Nearest earlier record in the same function assigning to `text`.
fn prior_result(records: &[MutationRecord], index: usize, text: &str) -> Option<OperationId> {
    let scope = &records[index].scope;
    records[..index]
        .iter()
        .rev()
        .find(|q| q.scope == *scope && q.assigned_to.as_deref() == Some(text))
        .map(|q| q.id.clone())
}
