//! Lightweight structural scanning of source text
//!
//! These helpers only look at characters and indentation. They track enough
//! structure (blocks, loop headers, function bodies) for the complexity rules
//! without understanding the grammar of any language.

use regex::Regex;
use std::sync::LazyLock;

use crate::languages::BlockStyle;

/// Blank out comments and the contents of string/char literals.
///
/// Newlines are kept so line and indentation structure survive; literal
/// delimiters are kept so the text still reads as an expression.
pub fn strip_comments_and_literals(source: &str, style: BlockStyle) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match (style, c) {
            (BlockStyle::Braces, '/') if next == Some('/') => {
                i = skip_line(&chars, i);
            }
            (BlockStyle::Braces, '/') if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        out.push('\n');
                    }
                    i += 1;
                }
                i += 2;
            }
            (BlockStyle::Indentation, '#') => {
                i = skip_line(&chars, i);
            }
            (_, '"') | (_, '\'') | (BlockStyle::Braces, '`') => {
                let triple = style == BlockStyle::Indentation
                    && next == Some(c)
                    && chars.get(i + 2) == Some(&c);
                let delimiter_len = if triple { 3 } else { 1 };
                let multiline = triple || c == '`';

                for _ in 0..delimiter_len {
                    out.push(c);
                }
                i += delimiter_len;

                while i < chars.len() {
                    if chars[i] == '\\' {
                        i += 2;
                        continue;
                    }
                    if chars[i] == '\n' {
                        if !multiline {
                            break;
                        }
                        out.push('\n');
                    }
                    if chars[i] == c
                        && (!triple || (chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c)))
                    {
                        for _ in 0..delimiter_len {
                            out.push(c);
                        }
                        i += delimiter_len;
                        break;
                    }
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Index of the newline ending the current line (kept for the caller)
fn skip_line(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '\n' {
        i += 1;
    }
    i
}

/// Nesting depth of every loop header, in source order.
///
/// A loop at the top level has depth 1, a loop inside one enclosing loop has
/// depth 2, and so on. Expects text from `strip_comments_and_literals`.
pub fn loop_depths(text: &str, style: BlockStyle) -> Vec<usize> {
    match style {
        BlockStyle::Braces => brace_loop_depths(text),
        BlockStyle::Indentation => indented_loop_depths(text),
    }
}

#[derive(Debug, Clone, Copy)]
struct Block {
    /// Loops whose body is this block
    loops: usize,
    /// Opened by `do`, so a trailing `while` belongs to it
    is_do: bool,
}

fn brace_loop_depths(text: &str) -> Vec<usize> {
    let mut depths = Vec::new();
    let mut blocks: Vec<Block> = Vec::new();
    // Loop headers seen since the last block opened or statement ended;
    // covers brace-less bodies such as `for (..) for (..) x++;`
    let mut pending_loops = 0usize;
    let mut pending_do = false;
    let mut paren_depth = 0usize;
    let mut after_do_block = false;

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let closes_do = std::mem::take(&mut after_do_block);

        if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match word.as_str() {
                "while" if closes_do => {}
                "for" | "while" | "do" => {
                    let enclosing: usize = blocks.iter().map(|b| b.loops).sum();
                    depths.push(enclosing + pending_loops + 1);
                    pending_loops += 1;
                    pending_do |= word == "do";
                }
                _ => {}
            }
            continue;
        }

        match c {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '{' => {
                blocks.push(Block {
                    loops: pending_loops,
                    is_do: pending_do,
                });
                pending_loops = 0;
                pending_do = false;
            }
            '}' => {
                if let Some(block) = blocks.pop() {
                    after_do_block = block.is_do;
                }
                pending_loops = 0;
                pending_do = false;
            }
            ';' if paren_depth == 0 => {
                pending_loops = 0;
                pending_do = false;
            }
            _ => {}
        }
        i += 1;
    }

    depths
}

fn indented_loop_depths(text: &str) -> Vec<usize> {
    let mut depths = Vec::new();
    // (indent, is_loop) of enclosing block headers
    let mut stack: Vec<(usize, bool)> = Vec::new();
    let mut open_brackets = 0usize;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }

        // Continuation lines inside (), [] or {} are not statements
        let continuation = open_brackets > 0;
        open_brackets = bracket_balance(trimmed, open_brackets);
        if continuation {
            continue;
        }

        let indent = indent_width(line);
        while stack.last().is_some_and(|(i, _)| *i >= indent) {
            stack.pop();
        }

        let is_loop = starts_with_keyword(trimmed, "for")
            || starts_with_keyword(trimmed, "while")
            || trimmed
                .strip_prefix("async")
                .is_some_and(|rest| starts_with_keyword(rest.trim_start(), "for"));
        if is_loop {
            depths.push(stack.iter().filter(|(_, l)| *l).count() + 1);
        }

        if trimmed.trim_end().ends_with(':') {
            stack.push((indent, is_loop));
        }
    }

    depths
}

fn bracket_balance(line: &str, mut open: usize) -> usize {
    for c in line.chars() {
        match c {
            '(' | '[' | '{' => open += 1,
            ')' | ']' | '}' => open = open.saturating_sub(1),
            _ => {}
        }
    }
    open
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.strip_prefix(keyword)
        .is_some_and(|rest| !rest.starts_with(is_ident_char))
}

static BRACE_FUNCTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b([A-Za-z_$][\w$]*)\s*\([^()]*\)\s*(?:const\s*)?(?:throws\s+[\w.,\s]+?)?(?::\s*[\w<>\[\]|.,\s]+?)?\s*\{",
    )
    .ok()
});

static ARROW_FUNCTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s*)?(?:function\s*)?\([^()]*\)\s*(?::\s*[\w<>\[\]|.,\s]+?)?\s*(?:=>)?\s*\{",
    )
    .ok()
});

static PYTHON_FUNCTION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(").ok());

/// Words that look like `name(...) {` but never declare a function
const NOT_FUNCTIONS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "sizeof", "synchronized", "else", "do",
    "function", "try", "with",
];

/// Number of functions whose body calls the function's own name
pub fn recursive_function_count(text: &str, style: BlockStyle) -> usize {
    match style {
        BlockStyle::Braces => brace_recursive_count(text),
        BlockStyle::Indentation => indented_recursive_count(text),
    }
}

fn brace_recursive_count(text: &str) -> usize {
    let mut recursive = Vec::new();

    for regex in [&*BRACE_FUNCTION, &*ARROW_FUNCTION].into_iter().flatten() {
        for caps in regex.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            if NOT_FUNCTIONS.contains(&name) || recursive.contains(&name) {
                continue;
            }
            // The match ends right after the opening brace
            let body = block_body(text, whole.end());
            if calls_name(body, name) {
                recursive.push(name);
            }
        }
    }

    recursive.len()
}

/// Text of a `{ ... }` block whose opening brace ends at `start`
fn block_body(text: &str, start: usize) -> &str {
    let mut depth = 1usize;
    for (offset, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &text[start..start + offset];
                }
            }
            _ => {}
        }
    }
    &text[start..]
}

fn indented_recursive_count(text: &str) -> usize {
    let Some(regex) = PYTHON_FUNCTION.as_ref() else {
        return 0;
    };

    let mut recursive = Vec::new();
    for caps in regex.captures_iter(text) {
        let (Some(whole), Some(indent), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let def_indent = indent_width(indent.as_str());
        let name = name.as_str();

        // Body: following lines indented deeper than the `def`
        let rest = &text[whole.end()..];
        let mut lines = rest.lines();
        // Anything after the header's final `:` is a one-line body
        let mut body = lines
            .next()
            .and_then(|header| header.rsplit_once(':'))
            .map(|(_, inline)| inline.to_string())
            .unwrap_or_default();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            if indent_width(line) <= def_indent {
                break;
            }
            body.push('\n');
            body.push_str(line);
        }

        if calls_name(&body, name) && !recursive.contains(&name) {
            recursive.push(name);
        }
    }

    recursive.len()
}

/// Whether `name` appears as an identifier directly followed by `(`
fn calls_name(body: &str, name: &str) -> bool {
    body.match_indices(name).any(|(idx, _)| {
        let before_ok = body[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !is_ident_char(c));
        let after = &body[idx + name.len()..];
        before_ok && after.trim_start().starts_with('(')
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}
