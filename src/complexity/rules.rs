//! Complexity rule registry
//!
//! Generic rules apply to every language; language rules add secondary
//! signals for built-in library calls. Keys are unique within a scope and a
//! generic key is never reused by a language rule. Patterns are kept disjoint
//! so one construct is attributed to one rule only.

use tracing::warn;

use super::matcher::{LoopDepthMatcher, Matcher, RecursionMatcher, RegexMatcher};
use super::ComplexityClass;
use crate::languages::BlockStyle;

pub const TRIPLE_NESTED_LOOP: &str = "triple-nested-loop";
pub const NESTED_LOOP: &str = "nested-loop";
pub const SINGLE_LOOP: &str = "single-loop";
pub const RECURSION: &str = "recursive-function";
pub const MIDPOINT_HALVING: &str = "midpoint-halving";

/// What a fired rule contributes to the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Raises the time complexity to the rule's class
    Time,
    /// Raises the space complexity to the rule's class
    Space,
    /// Reported only
    Note,
    /// Self-referential function; decided by the recursion verdicts
    Recursion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Generic,
    /// Language id the rule belongs to
    Language(String),
}

/// A registered heuristic
#[derive(Debug)]
pub struct PatternRule {
    pub key: &'static str,
    pub matcher: Box<dyn Matcher>,
    pub class: ComplexityClass,
    pub description: &'static str,
    pub scope: Scope,
    pub role: Role,
    /// Divide-and-conquer signal (halving a search space)
    pub divide_and_conquer: bool,
    /// Rules that, when fired, make this rule's hits redundant
    pub superseded_by: &'static [&'static str],
}

/// Static description of a regex-backed rule
#[derive(Debug)]
pub struct RegexRule {
    pub key: &'static str,
    pub pattern: &'static str,
    pub class: ComplexityClass,
    pub role: Role,
    pub description: &'static str,
    pub divide_and_conquer: bool,
}

const fn regex_rule(
    key: &'static str,
    pattern: &'static str,
    class: ComplexityClass,
    role: Role,
    description: &'static str,
) -> RegexRule {
    RegexRule {
        key,
        pattern,
        class,
        role,
        description,
        divide_and_conquer: false,
    }
}

const fn halving_rule(
    key: &'static str,
    pattern: &'static str,
    description: &'static str,
) -> RegexRule {
    RegexRule {
        key,
        pattern,
        class: ComplexityClass::Logarithmic,
        role: Role::Time,
        description,
        divide_and_conquer: true,
    }
}

use ComplexityClass::{Constant, Linear, Linearithmic, Logarithmic, Quadratic};

pub const GENERIC_REGEX_RULES: &[RegexRule] = &[
    halving_rule(
        MIDPOINT_HALVING,
        r"\(\s*\w+\s*\+\s*\w+\s*\)\s*(?:/\s*2|>>\s*1|//\s*2)|\w+\s*\+\s*\(\s*\w+\s*-\s*\w+\s*\)\s*(?:/\s*2|>>\s*1|//\s*2)|>>>\s*1|len\(\s*\w+\s*\)\s*//\s*2|\.(?:length|size\(\s*\))\s*(?:/\s*2|>>\s*1)",
        "Midpoint computation halving the search range, O(log n)",
    ),
    halving_rule(
        "binary-search-call",
        r"(?:^|[^.\w])(?:binary_?search|binarySearch|bsearch)\s*\(",
        "Binary search routine, O(log n)",
    ),
    regex_rule(
        "sort-routine",
        r"(?:^|[^.\w])(?:merge_?[sS]ort|quick_?[sS]ort|heap_?[sS]ort|mergesort|quicksort|heapsort)\s*\(",
        Linearithmic,
        Role::Time,
        "Sort or merge routine, O(n log n)",
    ),
    regex_rule(
        "hash-container",
        r"(?:^|[^.\w])(?:std::)?(?:unordered_map|unordered_set)\s*<|\b(?:HashMap|HashSet|LinkedHashMap|LinkedHashSet|Hashtable)\s*<|\bnew\s+(?:Map|Set|WeakMap|WeakSet)\s*[<(]|(?:^|[^.\w])(?:dict|set|defaultdict|Counter|OrderedDict)\s*\(|=\s*\{\s*\}",
        Constant,
        Role::Note,
        "Hash-based container, O(1) average lookup",
    ),
    regex_rule(
        "dynamic-allocation",
        r"\b(?:malloc|calloc|realloc)\s*\(|\bnew\s+[A-Za-z_][\w:]*\s*\[[^\]\[]*\]\s*(?:[^\[\s]|$)",
        Linear,
        Role::Space,
        "Dynamically sized allocation, O(n) space",
    ),
    regex_rule(
        "array-declaration",
        r"\b(?:int|long|short|char|bool|double|float|unsigned)\s+\w+\s*\[\s*\w+\s*\]\s*(?:[^\[\s]|$)",
        Linear,
        Role::Space,
        "Array declaration, O(n) space",
    ),
    regex_rule(
        "matrix-allocation",
        r"\b(?:int|long|short|char|bool|boolean|double|float|byte)\s*(?:\w+\s*)?\[\s*\w*\s*\]\s*\[\s*\w*\s*\]",
        Quadratic,
        Role::Space,
        "Two-dimensional array, O(n^2) space",
    ),
];

pub const PYTHON_RULES: &[RegexRule] = &[
    regex_rule(
        "py-sorted",
        r"(?:^|[^.\w])sorted\s*\(|\.sort\s*\(",
        Linearithmic,
        Role::Time,
        "Built-in sort, O(n log n)",
    ),
    halving_rule(
        "py-bisect",
        r"\b(?:bisect|insort)(?:_left|_right)?\s*\(",
        "bisect module search, O(log n)",
    ),
    regex_rule(
        "py-heapq",
        r"\bheapq\.(?:heappush|heappop|heappushpop|heapreplace)\s*\(|(?:^|[^.\w])(?:heappush|heappop)\s*\(",
        Logarithmic,
        Role::Time,
        "Heap operation, O(log n) each",
    ),
    regex_rule(
        "py-comprehension",
        r"[\[{(][^\[\]{}()\n]*\bfor\s+\w+(?:\s*,\s*\w+)*\s+in\b",
        Linear,
        Role::Time,
        "Comprehension or generator, O(n)",
    ),
    regex_rule(
        "py-list-alloc",
        r"(?:^|[=(,:]|\breturn)\s*\[[^\[\]\n]*\]\s*\*\s*\w+|(?:^|[^.\w])list\s*\(|\.append\s*\(",
        Linear,
        Role::Space,
        "List built from the input, O(n) space",
    ),
    regex_rule(
        "py-matrix",
        r"\[\s*\[[^\[\]\n]*\]\s*\*\s*\w+\s+for\b",
        Quadratic,
        Role::Space,
        "Nested list grid, O(n^2) space",
    ),
];

pub const JS_RULES: &[RegexRule] = &[
    regex_rule(
        "js-sort",
        r"\.sort\s*\(",
        Linearithmic,
        Role::Time,
        "Array.prototype.sort, O(n log n)",
    ),
    regex_rule(
        "js-iteration",
        r"\.(?:map|filter|reduce|forEach|some|every|find|findIndex|flatMap)\s*\(",
        Linear,
        Role::Time,
        "Array iteration method, O(n)",
    ),
    regex_rule(
        "js-linear-search",
        r"\.(?:indexOf|lastIndexOf|includes)\s*\(",
        Linear,
        Role::Time,
        "Linear scan for a value, O(n)",
    ),
    regex_rule(
        "js-array-alloc",
        r"\bnew\s+Array\s*\(|\bArray\.from\s*\(|\.push\s*\(|\[\s*\.\.\.",
        Linear,
        Role::Space,
        "Array grown from the input, O(n) space",
    ),
];

pub const JAVA_RULES: &[RegexRule] = &[
    regex_rule(
        "java-sort",
        r"\.sort\s*\(|\.sorted\s*\(",
        Linearithmic,
        Role::Time,
        "Library sort, O(n log n)",
    ),
    halving_rule(
        "java-binary-search",
        r"\b(?:Arrays|Collections)\.binarySearch\s*\(",
        "Library binary search, O(log n)",
    ),
    regex_rule(
        "java-priority-queue",
        r"\bnew\s+PriorityQueue\s*[<(]",
        Logarithmic,
        Role::Time,
        "PriorityQueue, O(log n) per operation",
    ),
    regex_rule(
        "java-tree-collection",
        r"\bnew\s+(?:TreeMap|TreeSet)\s*[<(]",
        Logarithmic,
        Role::Time,
        "Balanced tree collection, O(log n) per operation",
    ),
    regex_rule(
        "java-stream",
        r"\.stream\s*\(\s*\)|\bIntStream\.range(?:Closed)?\s*\(",
        Linear,
        Role::Time,
        "Stream pipeline, O(n)",
    ),
    regex_rule(
        "java-collection-alloc",
        r"\bnew\s+(?:ArrayList|LinkedList|ArrayDeque|Vector|StringBuilder)\s*[<(]",
        Linear,
        Role::Space,
        "Growable collection, O(n) space",
    ),
];

pub const CPP_RULES: &[RegexRule] = &[
    regex_rule(
        "cpp-sort",
        r"(?:^|[^.\w:])(?:std::)?(?:sort|stable_sort|partial_sort)\s*\(",
        Linearithmic,
        Role::Time,
        "std::sort, O(n log n)",
    ),
    halving_rule(
        "cpp-bound-search",
        r"(?:^|[^.\w:])(?:std::)?(?:lower_bound|upper_bound|equal_range)\s*\(",
        "Bound search on sorted range, O(log n)",
    ),
    regex_rule(
        "cpp-priority-queue",
        r"\bpriority_queue\s*<",
        Logarithmic,
        Role::Time,
        "priority_queue, O(log n) per operation",
    ),
    regex_rule(
        "cpp-ordered-container",
        r"(?:^|[^.\w:])(?:std::)?(?:map|set|multimap|multiset)\s*<",
        Logarithmic,
        Role::Time,
        "Ordered tree container, O(log n) per operation",
    ),
    regex_rule(
        "cpp-vector",
        r"(?:^|[^<\w:])(?:std::)?vector\s*<",
        Linear,
        Role::Space,
        "std::vector, O(n) space",
    ),
];

pub const C_RULES: &[RegexRule] = &[regex_rule(
    "c-qsort",
    r"\bqsort\s*\(",
    Linearithmic,
    Role::Time,
    "qsort, O(n log n)",
)];

/// Language-specific rule table for a language id
pub fn language_rule_table(language: &str) -> &'static [RegexRule] {
    match language {
        "python" => PYTHON_RULES,
        "javascript" | "typescript" => JS_RULES,
        "java" => JAVA_RULES,
        "cpp" => CPP_RULES,
        "c" => C_RULES,
        _ => &[],
    }
}

/// Generic rules for a block syntax family, in evaluation order
pub fn generic_rules(style: BlockStyle) -> Vec<PatternRule> {
    let mut rules = vec![
        PatternRule {
            key: TRIPLE_NESTED_LOOP,
            matcher: Box::new(LoopDepthMatcher::new(style, 3..=usize::MAX)),
            class: ComplexityClass::Cubic,
            description: "Three or more nested loops, O(n^3)",
            scope: Scope::Generic,
            role: Role::Time,
            divide_and_conquer: false,
            superseded_by: &[],
        },
        PatternRule {
            key: NESTED_LOOP,
            matcher: Box::new(LoopDepthMatcher::new(style, 2..=2)),
            class: ComplexityClass::Quadratic,
            description: "Two nested loops, O(n^2)",
            scope: Scope::Generic,
            role: Role::Time,
            divide_and_conquer: false,
            superseded_by: &[],
        },
        PatternRule {
            key: SINGLE_LOOP,
            matcher: Box::new(LoopDepthMatcher::new(style, 1..=usize::MAX)),
            class: ComplexityClass::Linear,
            description: "Loop over the input, O(n)",
            scope: Scope::Generic,
            role: Role::Time,
            divide_and_conquer: false,
            superseded_by: &[TRIPLE_NESTED_LOOP, NESTED_LOOP],
        },
        PatternRule {
            key: RECURSION,
            matcher: Box::new(RecursionMatcher::new(style)),
            class: ComplexityClass::IndeterminateRecursive,
            description: "Recursive function, complexity depends on the recurrence",
            scope: Scope::Generic,
            role: Role::Recursion,
            divide_and_conquer: false,
            superseded_by: &[],
        },
    ];
    rules.extend(compile(GENERIC_REGEX_RULES, Scope::Generic));
    rules
}

/// Language-specific rules for a language id
pub fn language_rules(language: &str) -> Vec<PatternRule> {
    compile(
        language_rule_table(language),
        Scope::Language(language.to_string()),
    )
}

/// Compile regex rules, skipping any whose pattern is invalid
fn compile(table: &'static [RegexRule], scope: Scope) -> Vec<PatternRule> {
    table
        .iter()
        .filter_map(|rule| match RegexMatcher::new(rule.pattern) {
            Ok(matcher) => Some(PatternRule {
                key: rule.key,
                matcher: Box::new(matcher),
                class: rule.class,
                description: rule.description,
                scope: scope.clone(),
                role: rule.role,
                divide_and_conquer: rule.divide_and_conquer,
                superseded_by: &[],
            }),
            Err(e) => {
                warn!("Failed to compile complexity rule '{}': {}", rule.key, e);
                None
            }
        })
        .collect()
}
