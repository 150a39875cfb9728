//! Glob breakpoints.
//!
//! A unit matches when any armed pattern matches its text with surrounding
//! whitespace (including the line terminator) trimmed. Patterns use shell
//! glob syntax: `*`, `?`, `[...]`. A pattern that fails to compile is kept
//! in the set so the operator can see it, but it never matches.

use crate::unit::Unit;
use globset::{Glob, GlobMatcher};

/// Stateless check of `value` against `patterns`. Compiles on every call.
pub fn matches<P: AsRef<str>>(value: &[u8], patterns: &[P]) -> bool {
    let candidate = candidate_text(value);
    patterns
        .iter()
        .any(|p| Breakpoint::new(p.as_ref()).matches_text(&candidate))
}

fn candidate_text(value: &[u8]) -> String {
    String::from_utf8_lossy(value.trim_ascii()).into_owned()
}

#[derive(Debug, Clone)]
pub struct Breakpoint {
    pattern: String,
    matcher: Option<GlobMatcher>,
}

impl Breakpoint {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let matcher = match Glob::new(&pattern) {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(e) => {
                tracing::warn!(%pattern, error = %e, "invalid breakpoint pattern; it will never match");
                None
            }
        };
        Self { pattern, matcher }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_valid(&self) -> bool {
        self.matcher.is_some()
    }

    fn matches_text(&self, text: &str) -> bool {
        match &self.matcher {
            Some(m) => m.is_match(text),
            None => false,
        }
    }
}

/// Ordered, append/clear-only set of armed breakpoints.
#[derive(Debug, Clone, Default)]
pub struct BreakpointSet {
    breakpoints: Vec<Breakpoint>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, pattern: impl Into<String>) -> &Breakpoint {
        let bp = Breakpoint::new(pattern);
        self.breakpoints.push(bp);
        &self.breakpoints[self.breakpoints.len() - 1]
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    pub fn patterns(&self) -> Vec<String> {
        self.breakpoints.iter().map(|b| b.pattern.clone()).collect()
    }

    /// First armed breakpoint matching `unit`, in arming order.
    pub fn first_match(&self, unit: &Unit) -> Option<&Breakpoint> {
        if self.breakpoints.is_empty() {
            return None;
        }
        let text = candidate_text(unit.as_bytes());
        self.breakpoints.iter().find(|b| b.matches_text(&text))
    }
}
