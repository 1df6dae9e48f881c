//! Page-range expressions: `"1-5, 8, 10-12"` → `[1, 2, 3, 4, 5, 8, 10, 11, 12]`.
//!
//! Parsing is forgiving. A token containing `-` is an interval: it is split
//! on every `-`, only the first two parts count, and an empty part reads as
//! `0` (so `"-3"` is `1-3` and `"1-2-3"` is `1-2`). Any other token must be a
//! single integer. A token whose parts are not integers is dropped, never
//! reported, so a typo in one token cannot sink the rest of the expression.
//! The caller is expected to treat an empty resolution as a user-facing
//! validation error.
//!
//! Intervals are clamped to `[1, bound]` before they are expanded, which also
//! keeps `"1-999999999"` cheap on a short document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Resolve a range expression against a document with `bound` pages.
///
/// Returns 1-indexed page numbers, strictly increasing, each in `[1, bound]`.
/// A blank expression selects every page.
///
/// ```rust
/// use edgequake_pdf2img::range::resolve;
///
/// assert_eq!(resolve("2-5,4,9", 6), vec![2, 3, 4, 5]);
/// assert_eq!(resolve("", 3), vec![1, 2, 3]);
/// assert!(resolve("10-20", 5).is_empty());
/// ```
pub fn resolve(expression: &str, bound: usize) -> Vec<usize> {
    PageRange::parse(expression).resolve(bound)
}

/// One well-formed token of a range expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    /// A single page number, e.g. `8`.
    Page(i64),
    /// An inclusive interval, e.g. `10-12`. `start > end` is allowed and
    /// selects nothing.
    Span(i64, i64),
}

impl RangeToken {
    fn parse(token: &str) -> Option<Self> {
        if !token.contains('-') {
            return token.parse().ok().map(RangeToken::Page);
        }
        let mut bounds = token.split('-').map(parse_bound);
        let start = bounds.next().flatten()?;
        let end = bounds.next().flatten()?;
        Some(RangeToken::Span(start, end))
    }

    fn collect_into(self, bound: usize, pages: &mut BTreeSet<usize>) {
        let bound = i64::try_from(bound).unwrap_or(i64::MAX);
        match self {
            RangeToken::Page(p) => {
                if (1..=bound).contains(&p) {
                    pages.insert(p as usize);
                }
            }
            RangeToken::Span(start, end) => {
                let lo = start.max(1);
                let hi = end.min(bound);
                pages.extend((lo..=hi).map(|p| p as usize));
            }
        }
    }
}

/// One side of an interval. Blank reads as `0`.
fn parse_bound(part: &str) -> Option<i64> {
    let part = part.trim();
    if part.is_empty() {
        return Some(0);
    }
    part.parse().ok()
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeToken::Page(p) => write!(f, "{p}"),
            RangeToken::Span(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

/// A parsed range expression.
///
/// Parsing never fails; malformed tokens are discarded and can be counted
/// through [`PageRange::dropped`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PageRange {
    expression: String,
    tokens: Vec<RangeToken>,
    all: bool,
    dropped: usize,
}

impl PageRange {
    /// Every page of the document.
    pub fn all() -> Self {
        Self {
            expression: String::new(),
            tokens: Vec::new(),
            all: true,
            dropped: 0,
        }
    }

    /// Parse an expression such as `"1-3, 7"`. Blank input means all pages.
    pub fn parse(expression: &str) -> Self {
        if expression.trim().is_empty() {
            return Self::all();
        }

        let mut tokens = Vec::new();
        let mut dropped = 0;
        for raw in expression.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match RangeToken::parse(raw) {
                Some(token) => tokens.push(token),
                None => dropped += 1,
            }
        }

        Self {
            expression: expression.to_string(),
            tokens,
            all: false,
            dropped,
        }
    }

    /// The expression as it was entered.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// `true` when the expression was blank.
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// The well-formed tokens, in input order.
    pub fn tokens(&self) -> &[RangeToken] {
        &self.tokens
    }

    /// Number of non-empty tokens that were discarded as malformed.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Expand against a document with `bound` pages.
    pub fn resolve(&self, bound: usize) -> Vec<usize> {
        if self.all {
            return (1..=bound).collect();
        }
        let mut pages = BTreeSet::new();
        for token in &self.tokens {
            token.collect_into(bound, &mut pages);
        }
        pages.into_iter().collect()
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for PageRange {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for PageRange {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<PageRange> for String {
    fn from(r: PageRange) -> Self {
        r.expression
    }
}

/// Canonical form: well-formed tokens joined by `", "`; empty for all pages.
impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}
