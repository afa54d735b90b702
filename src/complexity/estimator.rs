//! Complexity estimator - runs the rule registry and merges the hits

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::rules::{self, PatternRule, Role};
use super::structure::strip_comments_and_literals;
use super::{ComplexityClass, ComplexityEstimate, ComplexityMatch};
use crate::languages::{BlockStyle, LanguageRegistry};

/// Rules applied to one language, with the block style used to read it
#[derive(Debug)]
struct LanguageRules {
    style: BlockStyle,
    rules: Vec<PatternRule>,
}

/// Heuristic time/space complexity classifier.
///
/// Built once at startup from the language registry; estimating is pure and
/// synchronous, so one instance is shared by every request.
#[derive(Debug)]
pub struct ComplexityEstimator {
    braces: Vec<PatternRule>,
    indentation: Vec<PatternRule>,
    languages: HashMap<String, LanguageRules>,
}

/// What the fired time rules say, reduced for the verdict table
#[derive(Debug, Clone, Copy)]
struct Signals {
    recursion: bool,
    halving: bool,
    /// Highest time class among fired rules that are not halving idioms
    highest_other: Option<ComplexityClass>,
}

type TimeVerdict = (fn(&Signals) -> bool, ComplexityClass);

fn recursion_without_halving(s: &Signals) -> bool {
    s.recursion && !s.halving
}

fn halving_recursion_with_linear_combine(s: &Signals) -> bool {
    s.recursion && s.halving && s.highest_other == Some(ComplexityClass::Linear)
}

/// Ordered verdicts, first match wins; otherwise the highest fired class
const TIME_VERDICTS: &[TimeVerdict] = &[
    (recursion_without_halving, ComplexityClass::IndeterminateRecursive),
    (halving_recursion_with_linear_combine, ComplexityClass::Linearithmic),
];

impl ComplexityEstimator {
    pub fn new(registry: &LanguageRegistry) -> Self {
        let languages = registry
            .profiles()
            .map(|profile| {
                (
                    profile.id.clone(),
                    LanguageRules {
                        style: profile.block_style,
                        rules: rules::language_rules(&profile.id),
                    },
                )
            })
            .collect();

        Self {
            braces: rules::generic_rules(BlockStyle::Braces),
            indentation: rules::generic_rules(BlockStyle::Indentation),
            languages,
        }
    }

    /// Estimate the complexity of `source`.
    ///
    /// Unknown languages fall back to brace syntax and the generic rules.
    pub fn estimate(&self, source: &str, language: &str) -> ComplexityEstimate {
        if source.trim().is_empty() {
            return ComplexityEstimate::empty();
        }

        let (style, language_rules) = match self.languages.get(&language.trim().to_lowercase()) {
            Some(entry) => (entry.style, entry.rules.as_slice()),
            None => (BlockStyle::Braces, &[][..]),
        };

        let text = strip_comments_and_literals(source, style);
        if text.trim().is_empty() {
            return ComplexityEstimate::empty();
        }

        let generic = match style {
            BlockStyle::Braces => &self.braces,
            BlockStyle::Indentation => &self.indentation,
        };

        let hits: Vec<(&PatternRule, usize)> = generic
            .iter()
            .chain(language_rules)
            .filter_map(|rule| {
                let count = rule.matcher.count(&text);
                (count > 0).then_some((rule, count))
            })
            .collect();

        // Nested loops take over from the single-loop rule
        let fired_keys: HashSet<&str> = hits.iter().map(|(rule, _)| rule.key).collect();
        let hits: Vec<(&PatternRule, usize)> = hits
            .into_iter()
            .filter(|(rule, _)| !rule.superseded_by.iter().any(|key| fired_keys.contains(key)))
            .collect();

        for (rule, count) in &hits {
            debug!(
                "Rule '{}' ({:?}) matched {} time(s)",
                rule.key, rule.scope, count
            );
        }

        let estimate = ComplexityEstimate {
            time_complexity: time_verdict(&hits),
            space_complexity: highest(&hits, Role::Space).unwrap_or(ComplexityClass::Constant),
            matches: hits
                .iter()
                .map(|(rule, count)| ComplexityMatch {
                    pattern_key: rule.key,
                    complexity_class: rule.class,
                    description: rule.description,
                    occurrence_count: *count,
                })
                .collect(),
        };

        debug!(
            "Estimated {} source: time={}, space={}, {} signal(s)",
            language,
            estimate.time_complexity,
            estimate.space_complexity,
            estimate.matches.len()
        );

        estimate
    }
}

fn time_verdict(hits: &[(&PatternRule, usize)]) -> ComplexityClass {
    let signals = Signals {
        recursion: hits.iter().any(|(rule, _)| rule.role == Role::Recursion),
        halving: hits.iter().any(|(rule, _)| rule.divide_and_conquer),
        highest_other: hits
            .iter()
            .filter(|(rule, _)| rule.role == Role::Time && !rule.divide_and_conquer)
            .map(|(rule, _)| rule.class)
            .reduce(ComplexityClass::max_ranked),
    };

    TIME_VERDICTS
        .iter()
        .find(|(applies, _)| applies(&signals))
        .map(|(_, class)| *class)
        .or_else(|| highest(hits, Role::Time))
        .unwrap_or(ComplexityClass::Constant)
}

fn highest(hits: &[(&PatternRule, usize)], role: Role) -> Option<ComplexityClass> {
    hits.iter()
        .filter(|(rule, _)| rule.role == role)
        .map(|(rule, _)| rule.class)
        .reduce(ComplexityClass::max_ranked)
}
