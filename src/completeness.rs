//! Statement-level completeness on top of the balance scan.
//!
//! Balanced text can still be waiting for more input: `x = 1 +`, `if (a)`,
//! `var net = require('net'),` all balance but the statement dangles. The
//! rules here only look at the last significant token (and, for a closing
//! paren, at what precedes its opener).

use crate::balance::{Scan, TokenKind, scan};

// Keywords that always expect something after them.
const OPEN_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "function", "switch", "try", "catch", "finally", "with", "var", "let", "const", "class", "extends",
    "new", "typeof", "void", "delete", "in", "instanceof", "throw", "case", "import", "export",
];

// Keywords whose parenthesized header must be followed by a body.
const HEADER_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "with"];

/// Returns true when `src` can be handed to the evaluator as-is, false when
/// the user is still typing a statement and another line should be read.
///
/// Text with unbalanced closers is reported executable so the evaluator
/// produces the syntax error.
pub fn can_execute(src: &str) -> bool {
    let scan = scan(src);
    if !scan.is_balanced() {
        return false;
    }
    if scan.stray_close {
        return true;
    }
    match scan.tokens.len().checked_sub(1) {
        Some(last) => !is_dangling(&scan, last),
        None => true,
    }
}

fn is_dangling(scan: &Scan<'_>, idx: usize) -> bool {
    let tok = &scan.tokens[idx];
    match tok.kind {
        TokenKind::Punct => !matches!(tok.text, ";" | "++" | "--"),
        TokenKind::Word => (OPEN_KEYWORDS.contains(&tok.text) && !is_property_name(scan, idx)) || in_class_header(scan, idx),
        TokenKind::Close { opener: Some(open) } if tok.text == ")" => awaits_body(scan, open),
        _ => false,
    }
}

/// Whether the paren group opened at `open` is a control-flow header or a
/// function parameter list with no body yet.
fn awaits_body(scan: &Scan<'_>, open: usize) -> bool {
    let Some(kw) = open.checked_sub(1) else {
        return false;
    };
    let prev = &scan.tokens[kw];
    if prev.kind != TokenKind::Word || is_property_name(scan, kw) {
        return false;
    }
    match prev.text {
        "while" => !ends_do_block(scan, kw),
        "function" => true,
        "await" => kw.checked_sub(1).is_some_and(|i| scan.tokens[i].is_word("for")),
        text if HEADER_KEYWORDS.contains(&text) => true,
        // `function name(...)` or `function* name(...)`
        _ => match kw.checked_sub(1).map(|i| (i, &scan.tokens[i])) {
            Some((_, t)) if t.is_word("function") => true,
            Some((i, t)) if t.is_punct("*") => i.checked_sub(1).is_some_and(|j| scan.tokens[j].is_word("function")),
            _ => false,
        },
    }
}

/// `class A` or `class A extends b.B` still waiting for its body: walk back
/// over the dotted name to the `class` or `extends` keyword.
fn in_class_header(scan: &Scan<'_>, idx: usize) -> bool {
    for (i, tok) in scan.tokens[..idx].iter().enumerate().rev() {
        match tok.kind {
            TokenKind::Word if matches!(tok.text, "class" | "extends") && !is_property_name(scan, i) => return true,
            TokenKind::Word => {}
            TokenKind::Punct if tok.text == "." => {}
            _ => return false,
        }
    }
    false
}

/// `do { ... } while (cond)` is a finished statement.
fn ends_do_block(scan: &Scan<'_>, while_idx: usize) -> bool {
    let Some(prev) = while_idx.checked_sub(1).map(|i| &scan.tokens[i]) else {
        return false;
    };
    match prev.kind {
        TokenKind::Close { opener: Some(brace) } if prev.text == "}" => {
            brace.checked_sub(1).is_some_and(|i| scan.tokens[i].is_word("do"))
        }
        _ => false,
    }
}

fn is_property_name(scan: &Scan<'_>, idx: usize) -> bool {
    idx.checked_sub(1)
        .is_some_and(|i| scan.tokens[i].is_punct(".") || scan.tokens[i].is_punct("?."))
}
