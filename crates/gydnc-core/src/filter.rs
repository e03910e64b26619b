//! Tag-filter engine: compile and apply tag-query expressions.
//!
//! An expression is a whitespace-separated token list. A bare token is an
//! include constraint, `-tag` or `NOT tag` an exclude constraint. Tokens
//! support a small wildcard vocabulary: `*` alone (any non-empty tag set),
//! a trailing `*` (prefix match, covering the `ns:*` namespace form), and a
//! leading `*` (suffix match). Compilation can fail on malformed tokens;
//! evaluation is total.

use tracing::warn;

use crate::{Error, Result};

/// A single compiled tag pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TagPattern {
    /// `*`: matches any tag, so the constraint holds for any non-empty set.
    Any,
    /// `prefix*` or `ns:*`: matches tags starting with the prefix.
    Prefix(String),
    /// `*suffix`: matches tags ending with the suffix.
    Suffix(String),
    /// Exact, case-sensitive match.
    Exact(String),
}

impl TagPattern {
    fn compile(token: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::Filter("empty tag pattern".into()));
        }
        if token == "*" {
            return Ok(Self::Any);
        }
        if let Some(prefix) = token.strip_suffix('*') {
            return Ok(Self::Prefix(prefix.to_string()));
        }
        if let Some(suffix) = token.strip_prefix('*') {
            return Ok(Self::Suffix(suffix.to_string()));
        }
        Ok(Self::Exact(token.to_string()))
    }

    fn matches(&self, tag: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => tag.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => tag.ends_with(suffix.as_str()),
            Self::Exact(exact) => tag == exact,
        }
    }
}

/// A compiled tag-filter expression.
///
/// `matches` holds iff every include constraint is satisfied by at least
/// one tag and no exclude constraint is satisfied by any tag. An empty
/// expression matches every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    includes: Vec<TagPattern>,
    excludes: Vec<TagPattern>,
}

impl TagFilter {
    /// Compile a filter expression.
    ///
    /// A trailing `NOT` with no operand is undefined in the grammar; it is
    /// treated as a no-op and logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filter`] for malformed tokens such as a bare `-`.
    pub fn parse(expr: &str) -> Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();

        let mut tokens = expr.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "NOT" {
                match tokens.next() {
                    Some(next) => excludes.push(TagPattern::compile(next)?),
                    None => warn!("trailing NOT in tag filter has no operand; ignoring"),
                }
            } else if let Some(rest) = token.strip_prefix('-') {
                if rest.is_empty() {
                    return Err(Error::Filter("'-' with no tag to exclude".into()));
                }
                excludes.push(TagPattern::compile(rest)?);
            } else {
                includes.push(TagPattern::compile(token)?);
            }
        }

        Ok(Self { includes, excludes })
    }

    /// True when the expression carries no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Evaluate the filter against an entity's tag set. Total: never fails.
    #[must_use]
    pub fn matches(&self, tags: &[String]) -> bool {
        let includes_hold = self
            .includes
            .iter()
            .all(|pattern| tags.iter().any(|tag| pattern.matches(tag)));
        let excludes_hold = self
            .excludes
            .iter()
            .all(|pattern| !tags.iter().any(|tag| pattern.matches(tag)));
        includes_hold && excludes_hold
    }
}
