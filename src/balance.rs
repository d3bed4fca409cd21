//! Bracket, string and comment balance scanning for interactive input.
//!
//! `scan(input)` walks the text once and reports whether every bracket,
//! string, template literal, regex literal and block comment opened in it has
//! been closed. It is a tolerant lexer rather than a parser:
//! - brackets inside single/double-quoted strings, template text, regexes and
//!   `//` or `/* */` comments are ignored
//! - `${ ... }` inside template literals nests like a brace and may contain
//!   further template literals
//! - a `/` starts a regex literal only where an expression cannot have just
//!   ended (decided from the previous significant token)
//! - a closing bracket with nothing (or the wrong thing) to close stops the
//!   scan and the text is reported complete, so the evaluator surfaces the real
//!   syntax error
//!
//! Alongside the balance it records the significant tokens it saw, which the
//! completeness rules in [`crate::completeness`] inspect.

use std::iter::Peekable;
use std::str::CharIndices;

/// Outcome of a balance scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    Complete,
    /// A bracket, brace, paren or `${` is still open.
    IncompleteStatement,
    /// A string, template or regex literal is still open.
    IncompleteString,
    /// A `/* ... */` comment is still open.
    IncompleteComment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Number,
    StringLit,
    Template,
    Regex,
    Punct,
    Open,
    /// `opener` is the index of the matching open token, `None` for a stray closer.
    Close { opener: Option<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
}

impl Token<'_> {
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text == word
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }
}

#[derive(Debug, Clone)]
pub struct Scan<'a> {
    pub balance: Balance,
    pub tokens: Vec<Token<'a>>,
    /// Set when a closer had nothing to close; scanning stopped there.
    pub stray_close: bool,
    /// Open nesting levels left at end of input.
    pub depth: usize,
}

impl Scan<'_> {
    pub fn is_balanced(&self) -> bool {
        self.balance == Balance::Complete
    }
}

/// Scan `src` and classify its balance.
pub fn scan(src: &str) -> Scan<'_> {
    Scanner::new(src).run()
}

// Longest first so that prefix matching picks the longest punctuator.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==", "!=", "<=", ">=", "&&", "||", "??",
    "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<", ">>",
];

// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_AFTER_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do", "else", "yield", "await",
];

#[derive(Debug, Clone, Copy)]
enum Mode {
    Code,
    Quoted { quote: char, start: usize },
    Template { start: usize },
    Regex { start: usize, in_class: bool },
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Bracket { close: char, token: usize },
    TemplateExpr,
}

struct Scanner<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    mode: Mode,
    stack: Vec<Frame>,
    tokens: Vec<Token<'a>>,
    stray_close: bool,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner {
            src,
            chars: src.char_indices().peekable(),
            mode: Mode::Code,
            stack: Vec::new(),
            tokens: Vec::new(),
            stray_close: false,
        }
    }

    fn run(mut self) -> Scan<'a> {
        while let Some((pos, ch)) = self.chars.next() {
            match self.mode {
                Mode::Code => {
                    if !self.code_char(pos, ch) {
                        break;
                    }
                }
                Mode::LineComment => {
                    if ch == '\n' || ch == '\r' {
                        self.mode = Mode::Code;
                    }
                }
                Mode::BlockComment => {
                    if ch == '*' && self.eat('/') {
                        self.mode = Mode::Code;
                    }
                }
                Mode::Quoted { quote, start } => {
                    if ch == '\\' {
                        self.skip_escaped();
                    } else if ch == quote {
                        self.push(TokenKind::StringLit, start, pos + ch.len_utf8());
                        self.mode = Mode::Code;
                    } else if ch == '\n' || ch == '\r' {
                        // unterminated on this line; the evaluator reports it
                        self.push(TokenKind::StringLit, start, pos);
                        self.mode = Mode::Code;
                    }
                }
                Mode::Template { start } => {
                    if ch == '\\' {
                        self.skip_escaped();
                    } else if ch == '`' {
                        self.push(TokenKind::Template, start, pos + 1);
                        self.mode = Mode::Code;
                    } else if ch == '$' && self.eat('{') {
                        self.stack.push(Frame::TemplateExpr);
                        self.mode = Mode::Code;
                    }
                }
                Mode::Regex { start, in_class } => match ch {
                    '\\' => self.skip_escaped(),
                    '[' => self.mode = Mode::Regex { start, in_class: true },
                    ']' => self.mode = Mode::Regex { start, in_class: false },
                    '/' if !in_class => {
                        let end = self.consume_while(|c| c.is_ascii_alphabetic());
                        self.push(TokenKind::Regex, start, end);
                        self.mode = Mode::Code;
                    }
                    '\n' | '\r' => {
                        self.push(TokenKind::Regex, start, pos);
                        self.mode = Mode::Code;
                    }
                    _ => {}
                },
            }
        }

        let balance = match self.mode {
            _ if self.stray_close => Balance::Complete,
            Mode::Quoted { .. } | Mode::Template { .. } | Mode::Regex { .. } => Balance::IncompleteString,
            Mode::BlockComment => Balance::IncompleteComment,
            Mode::Code | Mode::LineComment if !self.stack.is_empty() => Balance::IncompleteStatement,
            Mode::Code | Mode::LineComment => Balance::Complete,
        };

        Scan {
            balance,
            depth: self.stack.len(),
            tokens: self.tokens,
            stray_close: self.stray_close,
        }
    }

    /// Handle one character outside any literal or comment. Returns false
    /// when scanning should stop.
    fn code_char(&mut self, pos: usize, ch: char) -> bool {
        match ch {
            c if c.is_whitespace() => {}
            '\'' | '"' => self.mode = Mode::Quoted { quote: ch, start: pos },
            '`' => self.mode = Mode::Template { start: pos },
            '/' => {
                if self.eat('/') {
                    self.mode = Mode::LineComment;
                } else if self.eat('*') {
                    self.mode = Mode::BlockComment;
                } else if self.regex_allowed() {
                    self.mode = Mode::Regex { start: pos, in_class: false };
                } else {
                    self.punct(pos);
                }
            }
            '(' | '[' | '{' => {
                let close = match ch {
                    '(' => ')',
                    '[' => ']',
                    _ => '}',
                };
                self.stack.push(Frame::Bracket {
                    close,
                    token: self.tokens.len(),
                });
                self.push(TokenKind::Open, pos, pos + 1);
            }
            ')' | ']' | '}' => match self.stack.last().copied() {
                Some(Frame::TemplateExpr) if ch == '}' => {
                    self.stack.pop();
                    self.mode = Mode::Template { start: pos };
                }
                Some(Frame::Bracket { close, token }) if close == ch => {
                    self.stack.pop();
                    self.push(TokenKind::Close { opener: Some(token) }, pos, pos + 1);
                }
                _ => {
                    // nothing matching to close: pass it through and let the
                    // evaluator report the syntax error
                    log::trace!("stray '{ch}' at byte {pos}");
                    self.push(TokenKind::Close { opener: None }, pos, pos + 1);
                    self.stray_close = true;
                    return false;
                }
            },
            c if is_ident_start(c) => {
                let end = self.consume_while(is_ident_part);
                self.push(TokenKind::Word, pos, end);
            }
            c if c.is_ascii_digit() => {
                let end = self.consume_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
                self.push(TokenKind::Number, pos, end);
            }
            '.' if self.chars.peek().is_some_and(|&(_, c)| c.is_ascii_digit()) => {
                let end = self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
                self.push(TokenKind::Number, pos, end);
            }
            _ => self.punct(pos),
        }
        true
    }

    fn punct(&mut self, pos: usize) {
        let src = self.src;
        let rest = &src[pos..];
        let mut text: &str = match PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            Some(p) => p,
            None => rest.chars().next().map_or("", |c| &rest[..c.len_utf8()]),
        };
        // `a ?.5 : b` is a conditional, not optional chaining
        if text == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
            text = "?";
        }
        for _ in 1..text.chars().count() {
            self.chars.next();
        }
        self.push(TokenKind::Punct, pos, pos + text.len());
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last() {
            None => true,
            Some(tok) => match tok.kind {
                TokenKind::Punct => !matches!(tok.text, "++" | "--"),
                TokenKind::Open => true,
                TokenKind::Close { .. } => tok.text == "}",
                TokenKind::Word => REGEX_AFTER_KEYWORDS.contains(&tok.text),
                _ => false,
            },
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let src = self.src;
        self.tokens.push(Token {
            kind,
            text: &src[start..end],
            start,
        });
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().is_some_and(|&(_, c)| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    /// Skip the character after a backslash; `\` followed by CRLF skips both.
    fn skip_escaped(&mut self) {
        if let Some((_, '\r')) = self.chars.next() {
            self.eat('\n');
        }
    }

    /// Consume characters while `pred` holds and return the byte offset just past them.
    fn consume_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while let Some(&(pos, c)) = self.chars.peek() {
            if !pred(c) {
                return pos;
            }
            self.chars.next();
        }
        self.src.len()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$' || c == '#'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(src: &str) -> Balance {
        scan(src).balance
    }

    #[test]
    fn test_balanced_simple() {
        assert_eq!(balance("1 + 1"), Balance::Complete);
        assert_eq!(balance("let a = 10;"), Balance::Complete);
        assert_eq!(balance(""), Balance::Complete);
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert_eq!(balance("(1 + 2"), Balance::IncompleteStatement);
        assert_eq!(balance("function f() {"), Balance::IncompleteStatement);
        assert_eq!(balance("[1, 2"), Balance::IncompleteStatement);
        assert_eq!(scan("{ [ (").depth, 3);
    }

    #[test]
    fn test_strings_and_comments() {
        assert_eq!(balance("let s = '\\'not a bracket\\'';"), Balance::Complete);
        assert_eq!(balance("// comment with { [ ( "), Balance::Complete);
        assert_eq!(balance("/* block comment with { [ ( */"), Balance::Complete);
        assert_eq!(balance("'a string with } inside'"), Balance::Complete);
        assert_eq!(balance("\"double ( quoted\""), Balance::Complete);
    }

    #[test]
    fn test_open_literals() {
        assert_eq!(balance("'abc"), Balance::IncompleteString);
        assert_eq!(balance("'abc \\\r\n"), Balance::IncompleteString);
        assert_eq!(balance("/* open"), Balance::IncompleteComment);
        assert_eq!(balance("x = 1; // trailing"), Balance::Complete);
    }

    #[test]
    fn test_line_break_ends_quoted_string() {
        assert_eq!(balance("'abc\r\nfoo"), Balance::Complete);
        assert_eq!(balance("('abc\r\n"), Balance::IncompleteStatement);
    }

    #[test]
    fn test_template_literals() {
        assert_eq!(balance("`unterminated template"), Balance::IncompleteString);
        assert_eq!(balance("`unterminated template`"), Balance::Complete);
        assert_eq!(balance("`a ${1 + 2} b`"), Balance::Complete);
        assert_eq!(balance("`x ${ { "), Balance::IncompleteStatement);
        // the trailing backtick opens a template inside the braces
        assert_eq!(balance("`x ${ {`"), Balance::IncompleteString);
        assert_eq!(balance("`outer ${ `inner ${x}` } done`"), Balance::Complete);
        assert_eq!(balance("`a ${ {b: 1}.b } c`"), Balance::Complete);
    }

    #[test]
    fn test_regex_handling() {
        assert_eq!(balance("/abc/.test('x')"), Balance::Complete);
        assert_eq!(balance("/([a-z]{2})/g"), Balance::Complete);
        assert_eq!(balance("x = /[/(]/"), Balance::Complete);
        assert_eq!(balance("(a / 1"), Balance::IncompleteStatement);
        assert_eq!(balance("x = /abc"), Balance::IncompleteString);
    }

    #[test]
    fn test_stray_closer_is_complete() {
        let s = scan("function f(\r\na) {\r\n}\r\n\r\n};");
        assert_eq!(s.balance, Balance::Complete);
        assert!(s.stray_close);

        let s = scan("(]");
        assert_eq!(s.balance, Balance::Complete);
        assert!(s.stray_close);
    }

    #[test]
    fn test_tokens_link_closers_to_openers() {
        let s = scan("if (a) { b(); }");
        let texts: Vec<&str> = s.tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, ["if", "(", "a", ")", "{", "b", "(", ")", ";", "}"]);
        assert_eq!(s.tokens[3].kind, TokenKind::Close { opener: Some(1) });
        assert_eq!(s.tokens[9].kind, TokenKind::Close { opener: Some(4) });
    }

    #[test]
    fn test_longest_punctuator_wins() {
        let s = scan("a >>>= b ?? c?.d");
        let puncts: Vec<&str> = s.tokens.iter().filter(|t| t.kind == TokenKind::Punct).map(|t| t.text).collect();
        assert_eq!(puncts, [">>>=", "??", "?."]);
        assert!(s.tokens[0].is_word("a"));
    }
}
