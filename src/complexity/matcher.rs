//! Occurrence matchers used by complexity rules
//!
//! Every rule owns one `Matcher`. Today they are regular expressions and a few
//! structural scanners; a tokenizer-based matcher can replace them without
//! touching the merge logic in `estimator`.

use regex::Regex;
use std::fmt;
use std::ops::RangeInclusive;

use super::structure::{loop_depths, recursive_function_count};
use crate::languages::BlockStyle;

/// Counts occurrences of one construct in (comment-stripped) source text
pub trait Matcher: Send + Sync + fmt::Debug {
    fn count(&self, text: &str) -> usize;
}

/// Non-overlapping matches of a regular expression
#[derive(Debug)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl Matcher for RegexMatcher {
    fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

/// Loop headers whose nesting depth falls within a range
#[derive(Debug)]
pub struct LoopDepthMatcher {
    style: BlockStyle,
    depths: RangeInclusive<usize>,
}

impl LoopDepthMatcher {
    pub fn new(style: BlockStyle, depths: RangeInclusive<usize>) -> Self {
        Self { style, depths }
    }
}

impl Matcher for LoopDepthMatcher {
    fn count(&self, text: &str) -> usize {
        loop_depths(text, self.style)
            .into_iter()
            .filter(|depth| self.depths.contains(depth))
            .count()
    }
}

/// Functions that call themselves from their own body
#[derive(Debug)]
pub struct RecursionMatcher {
    style: BlockStyle,
}

impl RecursionMatcher {
    pub fn new(style: BlockStyle) -> Self {
        Self { style }
    }
}

impl Matcher for RecursionMatcher {
    fn count(&self, text: &str) -> usize {
        recursive_function_count(text, self.style)
    }
}
