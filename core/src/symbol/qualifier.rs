//! file: core/src/symbol/qualifier.rs
//! description: hierarchical namespace paths used to prefix every name.
//!
//! A `Qualifier` is the ordered list of enclosing scope segments
//! (module, type, function, block). Qualifiers are immutable values;
//! `child` appends one segment and returns a new qualifier. The
//! lowering engine tracks the active path with a `QualifierStack`, which
//! enforces strict push/pop nesting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator of the fully qualified display form.
pub const QUALIFIED_SEPARATOR: &str = "::";
/// Separator of the short display form.
pub const SHORT_SEPARATOR: &str = ".";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Qualifier {
    segments: Vec<String>,
}

impl Qualifier {
    pub fn root() -> Self {
        Qualifier { segments: Vec::new() }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Qualifier { segments: segments.into_iter().map(Into::into).collect() }
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Qualifier { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// True when `self` equals `other` or is one of its ancestors.
    pub fn encloses(&self, other: &Qualifier) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Length-prefixed encoding of the segments, safe for use inside VM
    /// identifiers. Distinct qualifiers always produce distinct encodings.
    pub fn mangled(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            let clean = sanitize(seg);
            out.push_str(&clean.len().to_string());
            out.push_str(&clean);
        }
        out
    }

    /// `a::b::c` form.
    pub fn qualified(&self) -> String {
        self.segments.join(QUALIFIED_SEPARATOR)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(SHORT_SEPARATOR))
    }
}

/// Map a raw segment to VM-identifier characters. Every byte outside
/// `[A-Za-z0-9]` is hex escaped behind `_`, and `_` itself is escaped, so
/// the mapping is injective.
pub(crate) fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{:02x}", b));
        }
    }
    out
}

/// Stack of active qualifiers. `pop` must be given the qualifier that the
/// matching `push` produced; anything else is a broken nesting contract.
#[derive(Debug, Clone)]
pub struct QualifierStack {
    stack: Vec<Qualifier>,
}

impl QualifierStack {
    pub fn new(base: Qualifier) -> Self {
        QualifierStack { stack: vec![base] }
    }

    pub fn current(&self) -> &Qualifier {
        // the base entry is never popped
        &self.stack[self.stack.len() - 1]
    }

    pub fn push_segment(&mut self, segment: impl Into<String>) -> Qualifier {
        let next = self.current().child(segment);
        self.stack.push(next.clone());
        next
    }

    pub fn push(&mut self, qualifier: Qualifier) {
        assert!(
            self.current().encloses(&qualifier),
            "qualifier `{}` is not nested inside `{}`",
            qualifier.qualified(),
            self.current().qualified()
        );
        self.stack.push(qualifier);
    }

    pub fn pop(&mut self, expected: &Qualifier) -> &Qualifier {
        assert!(self.stack.len() > 1, "qualifier stack underflow popping `{}`", expected.qualified());
        let top = self.stack.pop();
        assert_eq!(
            top.as_ref(),
            Some(expected),
            "qualifier stack popped out of order"
        );
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_restores_exact_parent() {
        let base = Qualifier::from_segments(["Main"]);
        let mut qs = QualifierStack::new(base.clone());
        let f = qs.push_segment("update");
        let b = qs.push_segment("block0");
        assert_eq!(b.segments(), &["Main", "update", "block0"]);
        assert_eq!(qs.pop(&b), &f);
        assert_eq!(qs.pop(&f), &base);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn popping_the_wrong_qualifier_panics() {
        let mut qs = QualifierStack::new(Qualifier::root());
        let a = qs.push_segment("a");
        let _b = qs.push_segment("b");
        qs.pop(&a);
    }

    #[test]
    fn mangling_is_injective_for_separator_lookalikes() {
        let a = Qualifier::from_segments(["a_b"]);
        let b = Qualifier::from_segments(["a", "b"]);
        assert_ne!(a.mangled(), b.mangled());
        let c = Qualifier::from_segments(["ab", "c"]);
        let d = Qualifier::from_segments(["a", "bc"]);
        assert_ne!(c.mangled(), d.mangled());
    }

    #[test]
    fn short_and_qualified_forms_use_distinct_separators() {
        let q = Qualifier::from_segments(["Main", "update"]);
        assert_eq!(q.to_string(), "Main.update");
        assert_eq!(q.qualified(), "Main::update");
    }
}
