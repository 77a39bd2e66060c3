//! Attribute paths: append-only trails of steps that localize a value (or an
//! error) inside a nested structure.
//!
//! Each descent creates a new path that shares its prefix with the parent via
//! `Arc`, so building paths during a recursive conversion never copies the
//! already-walked prefix.

use std::fmt;
use std::sync::Arc;

use crate::value::TypedValue;

#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    /// Named attribute of an object.
    Attribute(String),
    /// Position inside a list or tuple.
    Index(usize),
    /// String key of a map entry.
    Key(String),
    /// Set element, addressed by its own value.
    Value(TypedValue),
}

#[derive(Debug)]
struct Segment {
    parent: Option<Arc<Segment>>,
    step: PathStep,
    len: usize,
}

#[derive(Clone, Default)]
pub struct AttributePath {
    last: Option<Arc<Segment>>,
}

impl AttributePath {
    pub fn root() -> Self { Self::default() }

    pub fn is_root(&self) -> bool { self.last.is_none() }

    pub fn len(&self) -> usize { self.last.as_ref().map_or(0, |s| s.len) }

    pub fn is_empty(&self) -> bool { self.is_root() }

    /// New path extended by `step`; `self` is left untouched.
    pub fn with(&self, step: PathStep) -> Self {
        let len = self.len() + 1;
        Self { last: Some(Arc::new(Segment { parent: self.last.clone(), step, len })) }
    }

    pub fn with_attribute(&self, name: impl Into<String>) -> Self {
        self.with(PathStep::Attribute(name.into()))
    }

    pub fn with_index(&self, index: usize) -> Self { self.with(PathStep::Index(index)) }

    pub fn with_key(&self, key: impl Into<String>) -> Self { self.with(PathStep::Key(key.into())) }

    pub fn with_value(&self, value: TypedValue) -> Self { self.with(PathStep::Value(value)) }

    pub fn last_step(&self) -> Option<&PathStep> { self.last.as_ref().map(|s| &s.step) }

    pub fn parent(&self) -> Option<Self> {
        self.last.as_ref().map(|s| Self { last: s.parent.clone() })
    }

    /// This path with `step` spliced in after its first `depth` steps.
    /// Rebuilds the path; meant for error paths, not for descent.
    pub fn inserted_at(&self, depth: usize, step: PathStep) -> Self {
        let steps = self.steps();
        let (head, tail) = steps.split_at(depth.min(steps.len()));
        head.iter()
            .map(|s| (*s).clone())
            .chain(std::iter::once(step))
            .chain(tail.iter().map(|s| (*s).clone()))
            .collect()
    }

    /// Steps from the root outwards.
    pub fn steps(&self) -> Vec<&PathStep> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.last.as_deref();
        while let Some(seg) = cursor {
            out.push(&seg.step);
            cursor = seg.parent.as_deref();
        }
        out.reverse();
        out
    }
}

impl FromIterator<PathStep> for AttributePath {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        iter.into_iter().fold(Self::root(), |path, step| path.with(step))
    }
}

impl PartialEq for AttributePath {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.steps() == other.steps()
    }
}

/// Dotted/bracketed rendering, e.g. `spec.containers[0].env["PATH"]`.
impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        for (i, step) in self.steps().into_iter().enumerate() {
            match step {
                PathStep::Attribute(name) if i == 0 => f.write_str(name)?,
                PathStep::Attribute(name) => write!(f, ".{name}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
                PathStep::Key(key) => write!(f, "[{key:?}]")?,
                PathStep::Value(value) => write!(f, "[{value}]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributePath({self})")
    }
}

// ------------------------------- Tests ------------------------------------ //
