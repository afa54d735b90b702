//! Source preparation before dispatch
//!
//! Some executors need a full program with an entry point. Users of the
//! learning platform frequently submit a bare list of statements instead, so
//! those are wrapped into the language's boilerplate. Code that already
//! declares an entry point is passed through untouched.

use std::borrow::Cow;

use crate::complexity::structure::strip_comments_and_literals;
use crate::languages::{BlockStyle, LanguageProfile, Wrapper};

const BODY_INDENT_C: &str = "    ";
const BODY_INDENT_JAVA: &str = "        ";

/// Return code ready for submission to the remote executor
pub fn prepare<'a>(profile: &LanguageProfile, code: &'a str) -> Cow<'a, str> {
    match profile.wrapper {
        Wrapper::None => Cow::Borrowed(code),
        Wrapper::JavaMain if declares_class(code) => Cow::Borrowed(code),
        Wrapper::JavaMain => Cow::Owned(wrap_java(code)),
        Wrapper::CMain | Wrapper::CppMain if calls_word(code, "main") => Cow::Borrowed(code),
        Wrapper::CMain => Cow::Owned(wrap_c_family(code, &["#include <stdio.h>"])),
        Wrapper::CppMain => Cow::Owned(wrap_c_family(
            code,
            &["#include <bits/stdc++.h>", "using namespace std;"],
        )),
    }
}

fn wrap_java(code: &str) -> String {
    let (header, body) = split_header(code, |line| {
        line.starts_with("import ") || line.starts_with("package ")
    });

    let mut out = String::new();
    for line in header {
        out.push_str(line);
        out.push('\n');
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str("public class Main {\n");
    out.push_str("    public static void main(String[] args) throws Exception {\n");
    push_indented(&mut out, &body, BODY_INDENT_JAVA);
    out.push_str("    }\n}\n");
    out
}

fn wrap_c_family(code: &str, defaults: &[&str]) -> String {
    let (header, body) = split_header(code, |line| {
        line.starts_with('#') || line.starts_with("using namespace")
    });

    let missing: Vec<&str> = defaults
        .iter()
        .copied()
        .filter(|default| !header.iter().any(|line| line == default))
        .collect();

    // Preprocessor lines must precede `using` directives
    let mut out = String::new();
    for line in missing.iter().filter(|l| l.starts_with('#')) {
        out.push_str(line);
        out.push('\n');
    }
    for line in &header {
        out.push_str(line);
        out.push('\n');
    }
    for line in missing.iter().filter(|l| !l.starts_with('#')) {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("\nint main() {\n");
    push_indented(&mut out, &body, BODY_INDENT_C);
    out.push_str(BODY_INDENT_C);
    out.push_str("return 0;\n}\n");
    out
}

/// Split leading-position header lines (includes, imports) from the body
fn split_header<'a>(code: &'a str, is_header: impl Fn(&str) -> bool) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut header = Vec::new();
    let mut body = Vec::new();
    for line in code.lines() {
        if is_header(line.trim_start()) {
            header.push(line.trim());
        } else {
            body.push(line);
        }
    }
    (header, body)
}

fn push_indented(out: &mut String, lines: &[&str], indent: &str) {
    for line in lines {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
        }
    }
}

/// A `class` keyword outside comments and literals, not a `Foo.class` literal
fn declares_class(code: &str) -> bool {
    let text = strip_comments_and_literals(code, BlockStyle::Braces);
    text.match_indices("class").any(|(idx, keyword)| {
        let before = &text[..idx];
        let after = &text[idx + keyword.len()..];
        let starts_word = before.chars().next_back().map_or(true, |c| !is_ident_char(c));
        let is_member = before.trim_end().ends_with('.');
        starts_word
            && !is_member
            && after.starts_with(char::is_whitespace)
            && after.trim_start().starts_with(is_ident_start)
    })
}

/// Whether `word` appears as an identifier directly followed by `(`
fn calls_word(code: &str, word: &str) -> bool {
    let bytes = code.as_bytes();
    code.match_indices(word).any(|(idx, _)| {
        let before_ok = idx == 0 || !is_ident_char(bytes[idx - 1] as char);
        let rest = code[idx + word.len()..].trim_start();
        before_ok && rest.starts_with('(')
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
