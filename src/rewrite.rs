use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// The current rewritten text of an original range
    Source(Range<usize>),
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Segment {
        Segment::Text(text.into())
    }
}

#[derive(Debug, Clone)]
struct Insert {
    seq: u64,
    text: String,
}

#[derive(Debug, Clone)]
struct Replacement {
    seq: u64,
    range: Range<usize>,
    template: Vec<Segment>,
}

/// Replacements whose template is being rendered, innermost last.
#[derive(Debug, Default, Clone)]
struct Scope {
    ancestors: Vec<usize>,
}

/// Edits against offsets of an immutable original, materialized on read.
///
/// An insertion on the edge of a replaced range renders inside the
/// replacement if it was made before it, and around it if made after.
#[derive(Debug, Clone)]
pub struct RewriteBuffer {
    source: String,
    inserts: BTreeMap<usize, Vec<Insert>>,
    replacements: Vec<Replacement>,
    next_seq: u64,
}

impl RewriteBuffer {
    pub fn new(source: &str) -> Self {
        RewriteBuffer {
            source: source.to_string(),
            inserts: BTreeMap::new(),
            replacements: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn original(&self) -> &str {
        &self.source
    }

    pub fn original_text(&self, range: Range<usize>) -> &str {
        &self.source[range]
    }

    fn seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Insert `text` at `offset`, before anything already inserted there.
    pub fn insert_before(&mut self, offset: usize, text: impl Into<String>) {
        let insert = Insert { seq: self.seq(), text: text.into() };
        self.inserts.entry(offset).or_default().insert(0, insert);
    }

    /// Insert `text` at `offset`, after anything already inserted there.
    pub fn insert_after(&mut self, offset: usize, text: impl Into<String>) {
        let insert = Insert { seq: self.seq(), text: text.into() };
        self.inserts.entry(offset).or_default().push(insert);
    }

    /// Replace the text spanning `range` with `template`.
    pub fn replace(&mut self, range: Range<usize>, template: Vec<Segment>) {
        if range.is_empty() {
            log::debug!("empty replacement range {range:?} turned into an insertion");
            let rendered = self.render_template(&template, &Scope::default());
            self.insert_after(range.start, rendered);
            return;
        }
        let seq = self.seq();
        self.replacements.push(Replacement { seq, range, template });
    }

    pub fn replace_text(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.replace(range, vec![Segment::Text(text.into())]);
    }

    /// Whether some replacement covers exactly `range`.
    pub fn is_replaced(&self, range: &Range<usize>) -> bool {
        self.replacements.iter().any(|r| r.range == *range)
    }

    /// The current text of an original range, including every edit made
    /// inside it and the insertions at its edges.
    pub fn rewritten_text(&self, range: Range<usize>) -> String {
        let mut out = String::new();
        self.render(range, &Scope::default(), &mut out);
        out
    }

    /// The whole rewritten source.
    pub fn finish(&self) -> String {
        self.rewritten_text(0..self.source.len())
    }

    fn render_template(&self, template: &[Segment], scope: &Scope) -> String {
        let mut out = String::new();
        for segment in template {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Source(range) => self.render(range.clone(), scope, &mut out),
            }
        }
        out
    }

    fn render(&self, range: Range<usize>, scope: &Scope, out: &mut String) {
        let outer = self.outermost_within(&range, scope);
        let mut pos = range.start;
        let mut previous: Option<usize> = None;
        for &index in &outer {
            let replacement = &self.replacements[index];
            if replacement.range.start < pos {
                continue;
            }
            let neighbours = [previous, Some(index)];
            self.copy_original(pos..replacement.range.start, scope, &neighbours, out);
            let mut inner = scope.clone();
            inner.ancestors.push(index);
            out.push_str(&self.render_template(&replacement.template, &inner));
            pos = replacement.range.end;
            previous = Some(index);
        }
        self.copy_original(pos..range.end, scope, &[previous, None], out);
    }

    /// Original text of `span` plus the visible insertions at every offset
    /// in `span.start..=span.end`.
    fn copy_original(
        &self,
        span: Range<usize>,
        scope: &Scope,
        neighbours: &[Option<usize>],
        out: &mut String,
    ) {
        let mut cursor = span.start;
        for (&offset, inserts) in self.inserts.range(span.start..=span.end) {
            out.push_str(&self.source[cursor..offset]);
            cursor = offset;
            for insert in inserts {
                if self.visible(offset, insert.seq, scope, neighbours) {
                    out.push_str(&insert.text);
                }
            }
        }
        out.push_str(&self.source[cursor..span.end]);
    }

    fn visible(&self, offset: usize, seq: u64, scope: &Scope, neighbours: &[Option<usize>]) -> bool {
        let on_edge = |r: &Replacement| r.range.start == offset || r.range.end == offset;
        let inside_ancestors = scope
            .ancestors
            .iter()
            .map(|&i| &self.replacements[i])
            .filter(|r| on_edge(r))
            .all(|r| seq < r.seq);
        let outside_neighbours = neighbours
            .iter()
            .flatten()
            .map(|&i| &self.replacements[i])
            .filter(|r| on_edge(r))
            .all(|r| seq > r.seq);
        inside_ancestors && outside_neighbours
    }

    /// Indices of the replacements inside `range` that no other applicable
    /// replacement inside `range` encloses, ordered by start offset. For
    /// identical ranges the most recent replacement wins.
    fn outermost_within(&self, range: &Range<usize>, scope: &Scope) -> Vec<usize> {
        let applicable: Vec<usize> = (0..self.replacements.len())
            .filter(|i| !scope.ancestors.contains(i))
            .filter(|&i| {
                let r = &self.replacements[i].range;
                r.start >= range.start && r.end <= range.end
            })
            .collect();
        let mut outer: Vec<usize> = applicable
            .iter()
            .copied()
            .filter(|&i| {
                let r = &self.replacements[i].range;
                !applicable.iter().any(|&j| {
                    let other = &self.replacements[j].range;
                    j != i
                        && other.start <= r.start
                        && other.end >= r.end
                        && (other != r || j > i)
                })
            })
            .collect();
        outer.sort_by_key(|&i| self.replacements[i].range.start);
        outer
    }
}
