use super::{Formatter, LINE_TERMINATOR, to_display_newlines};
use crate::value::RemoteValue;

/// Renders values the way Node's classic `util.inspect` does.
///
/// Objects and arrays print on one line (`{ a: 1, b: [ 1, 2 ] }`) until the
/// summed length of their entries passes `break_length`, after which each
/// entry goes on its own line. Nesting deeper than `depth` prints as
/// `[Object]` / `[Array]`.
#[derive(Debug, Clone)]
pub struct NodeInspector {
    depth: i32,
    break_length: usize,
}

impl Default for NodeInspector {
    fn default() -> Self {
        NodeInspector { depth: 2, break_length: 60 }
    }
}

impl NodeInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_break_length(mut self, break_length: usize) -> Self {
        self.break_length = break_length;
        self
    }

    /// Inspect `value` with `\n` line breaks.
    pub fn inspect(&self, value: &RemoteValue) -> String {
        self.format_value(value, self.depth)
    }

    fn format_value(&self, value: &RemoteValue, recurse: i32) -> String {
        match value {
            RemoteValue::Undefined => "undefined".to_string(),
            RemoteValue::Null => "null".to_string(),
            RemoteValue::Boolean { value } => value.to_string(),
            RemoteValue::Number { text } => text.clone(),
            RemoteValue::BigInt { text } => format!("{text}n"),
            RemoteValue::String { value } => quote_string(value),
            RemoteValue::Symbol { description } => format!("Symbol({description})"),
            RemoteValue::Function { name, .. } => match name.as_deref() {
                Some(name) if !name.is_empty() => format!("[Function: {name}]"),
                _ => "[Function]".to_string(),
            },
            RemoteValue::Error { name, message } => format!("[{}]", error_text(name, message)),
            RemoteValue::Date { iso } => iso.clone(),
            RemoteValue::RegExp { source } => source.clone(),
            RemoteValue::Circular => "[Circular]".to_string(),
            RemoteValue::Truncated { array: true } => "[Array]".to_string(),
            RemoteValue::Truncated { array: false } => "[Object]".to_string(),
            RemoteValue::Array { items, more } => {
                if items.is_empty() && *more == 0 {
                    return "[]".to_string();
                }
                if recurse < 0 {
                    return "[Array]".to_string();
                }
                let mut parts: Vec<String> = items.iter().map(|item| self.format_entry(None, item, recurse - 1)).collect();
                if *more > 0 {
                    parts.push(format!("... {more} more items"));
                }
                self.reduce(&parts, '[', ']')
            }
            RemoteValue::Object { constructor, entries } => {
                let prefix = match constructor.as_deref() {
                    Some("Object") => String::new(),
                    Some(name) => format!("{name} "),
                    None => "[Object: null prototype] ".to_string(),
                };
                if entries.is_empty() {
                    return format!("{prefix}{{}}");
                }
                if recurse < 0 {
                    return "[Object]".to_string();
                }
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(key, item)| self.format_entry(Some(key), item, recurse - 1))
                    .collect();
                format!("{prefix}{}", self.reduce(&parts, '{', '}'))
            }
        }
    }

    /// One element of an array (`key` is `None`) or property of an object.
    fn format_entry(&self, key: Option<&str>, value: &RemoteValue, recurse: i32) -> String {
        let mut text = self.format_value(value, recurse);
        if text.contains('\n') {
            text = match key {
                // keep the first line in place, indent the rest under it
                None => indent_lines(&text, "  ")[2..].to_string(),
                // push the whole value below the key
                Some(_) => format!("\n{}", indent_lines(&text, "   ")),
            };
        }
        match key {
            None => text,
            Some(key) => format!("{}: {text}", format_key(key)),
        }
    }

    fn reduce(&self, parts: &[String], open: char, close: char) -> String {
        let length: usize = parts.iter().map(|p| p.encode_utf16().count() + 1).sum();
        if length > self.break_length {
            format!("{open} {} {close}", parts.join(",\n  "))
        } else {
            format!("{open} {} {close}", parts.join(", "))
        }
    }
}

impl Formatter for NodeInspector {
    fn format_result(&self, value: &RemoteValue) -> String {
        to_display_newlines(&self.inspect(value))
    }

    fn format_thrown(&self, value: &RemoteValue, text: &str) -> String {
        match value {
            RemoteValue::Error { name, message } => to_display_newlines(&error_text(name, message)),
            _ => to_display_newlines(text),
        }
    }

    fn format_console(&self, args: &[RemoteValue]) -> String {
        let line = args
            .iter()
            .map(|arg| match arg {
                RemoteValue::String { value } => value.clone(),
                other => self.inspect(other),
            })
            .collect::<Vec<_>>()
            .join(" ");
        let mut text = to_display_newlines(&line);
        text.push_str(LINE_TERMINATOR);
        text
    }
}

fn error_text(name: &str, message: &str) -> String {
    if message.is_empty() { name.to_string() } else { format!("{name}: {message}") }
}

fn indent_lines(text: &str, indent: &str) -> String {
    text.split('\n').map(|line| format!("{indent}{line}")).collect::<Vec<_>>().join("\n")
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn format_key(key: &str) -> String {
    if is_identifier(key) { key.to_string() } else { quote_string(key) }
}

/// Single-quote a string with JSON escapes, `'` escaped and `"` left bare.
pub(crate) fn quote_string(value: &str) -> String {
    let json = serde_json::Value::String(value.to_string()).to_string();
    let inner = &json[1..json.len() - 1];
    format!("'{}'", inner.replace('\'', "\\'").replace("\\\"", "\""))
}
