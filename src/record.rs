use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::classify::OperandKind;
use crate::rewrite::RewriteBuffer;
use crate::syntax::ArithOp;
use crate::types::Numeric;

/// Identifier of one rewrite, e.g. `OP_3` or `nab_0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        OperationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedOperand {
    /// Original operand text with whitespace removed
    pub text: String,
    pub kind: OperandKind,
    /// Operation that produced this operand, when known at rewrite time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OperationId>,
    /// Byte range of the operand in the original source
    #[serde(skip)]
    pub span: Option<Range<usize>>,
}

impl RecordedOperand {
    pub fn new(text: impl Into<String>, kind: OperandKind) -> Self {
        RecordedOperand {
            text: text.into(),
            kind,
            origin: None,
            span: None,
        }
    }

    pub fn at(mut self, node: Node<'_>) -> Self {
        self.span = Some(node.byte_range());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub id: OperationId,
    pub line: usize,
    pub result_type: Numeric,
    pub operator: ArithOp,
    pub operands: [RecordedOperand; 2],
    pub assigned_to: Option<String>,
    /// Byte range of the rewritten expression in the original source
    #[serde(skip)]
    pub span: Option<Range<usize>>,
    /// Byte range of the enclosing function
    #[serde(skip)]
    pub scope: Option<Range<usize>>,
}

/// Everything one mutant accumulates while matches are applied.
///
/// A context is created per mutant and consumed when the mutant is
/// finalized, so identifiers restart at 0 for every mutant.
#[derive(Debug)]
pub struct MutantContext {
    counter: usize,
    records: Vec<MutationRecord>,
    buffer: RewriteBuffer,
    produced: HashMap<Range<usize>, OperationId>,
}

impl MutantContext {
    pub fn new(source: &str) -> Self {
        MutantContext {
            counter: 0,
            records: Vec::new(),
            buffer: RewriteBuffer::new(source),
            produced: HashMap::new(),
        }
    }

    pub fn mint(&mut self, prefix: &str) -> OperationId {
        let id = OperationId(format!("{prefix}{}", self.counter));
        self.counter += 1;
        id
    }

    pub fn buffer(&self) -> &RewriteBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut RewriteBuffer {
        &mut self.buffer
    }

    pub fn records(&self) -> &[MutationRecord] {
        &self.records
    }

    pub fn push(&mut self, record: MutationRecord) {
        log::debug!("recorded {} at line {}", record.id, record.line);
        self.records.push(record);
    }

    pub fn mark_produced(&mut self, range: Range<usize>, id: OperationId) {
        self.produced.insert(range, id);
    }

    /// The operation rewritten at exactly this node's range, if any.
    pub fn origin_of(&self, node: Node<'_>) -> Option<OperationId> {
        self.produced.get(&node.byte_range()).cloned()
    }

    /// Hand back the buffer and the records. Operands rewritten by a later
    /// match (after their own record was pushed) get their origin here.
    pub fn into_parts(mut self) -> (RewriteBuffer, Vec<MutationRecord>) {
        for record in &mut self.records {
            for operand in &mut record.operands {
                if operand.origin.is_none() && matches!(operand.kind, OperandKind::Operation(_)) {
                    operand.origin = operand.span.as_ref().and_then(|span| self.produced.get(span)).cloned();
                }
            }
        }
        (self.buffer, self.records)
    }
}
