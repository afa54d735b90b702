//! Complexity module - heuristic asymptotic complexity estimation
//!
//! This module scans submitted source text for algorithmic idioms and folds
//! the hits into a time and a space complexity class:
//! - `structure`: comment/literal stripping and loop/recursion scanners
//! - `matcher`: the `Matcher` strategy used by every rule
//! - `rules`: the generic and per-language rule registry
//! - `estimator`: running the rules and merging their signals
//!
//! The complexity module does NOT:
//! - Parse the program or build any syntax tree
//! - Guarantee a correct answer; the estimate lists the signals it relied on

pub mod estimator;
pub mod matcher;
pub mod rules;
pub mod structure;

use serde::Serialize;
use std::fmt;

pub use estimator::ComplexityEstimator;

/// Asymptotic complexity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplexityClass {
    Constant,
    Logarithmic,
    Linear,
    Linearithmic,
    Quadratic,
    Cubic,
    /// Recursion without an identifiable divide-and-conquer shape
    IndeterminateRecursive,
}

impl ComplexityClass {
    /// Position in the growth order; `None` for classes outside the order
    pub fn rank(self) -> Option<u8> {
        match self {
            ComplexityClass::Constant => Some(0),
            ComplexityClass::Logarithmic => Some(1),
            ComplexityClass::Linear => Some(2),
            ComplexityClass::Linearithmic => Some(3),
            ComplexityClass::Quadratic => Some(4),
            ComplexityClass::Cubic => Some(5),
            ComplexityClass::IndeterminateRecursive => None,
        }
    }

    /// The higher-ranked of two classes; unranked classes never win
    pub fn max_ranked(self, other: ComplexityClass) -> ComplexityClass {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) if b > a => other,
            (None, Some(_)) => other,
            _ => self,
        }
    }
}

impl fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComplexityClass::Constant => "constant",
            ComplexityClass::Logarithmic => "logarithmic",
            ComplexityClass::Linear => "linear",
            ComplexityClass::Linearithmic => "linearithmic",
            ComplexityClass::Quadratic => "quadratic",
            ComplexityClass::Cubic => "cubic",
            ComplexityClass::IndeterminateRecursive => "indeterminate-recursive",
        };
        write!(f, "{}", s)
    }
}

/// A rule that fired on the source, with how often it fired
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityMatch {
    pub pattern_key: &'static str,
    pub complexity_class: ComplexityClass,
    pub description: &'static str,
    pub occurrence_count: usize,
}

/// Time/space verdict plus the signals that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityEstimate {
    pub time_complexity: ComplexityClass,
    pub space_complexity: ComplexityClass,
    pub matches: Vec<ComplexityMatch>,
}

impl ComplexityEstimate {
    /// Estimate with no signals at all
    pub fn empty() -> Self {
        Self {
            time_complexity: ComplexityClass::Constant,
            space_complexity: ComplexityClass::Constant,
            matches: Vec::new(),
        }
    }
}
