use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A value as described by the execution engine.
///
/// The engine walks its own object graph and sends this tree; nothing here
/// refers back into the engine, so values outlive the session that produced
/// them. Object entries keep the engine's enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteValue {
    Undefined,
    Null,
    Boolean {
        value: bool,
    },
    /// Decimal text as produced by the engine (`42`, `-0`, `NaN`, `1e+21`).
    Number {
        text: String,
    },
    /// Digits without the `n` suffix.
    BigInt {
        text: String,
    },
    String {
        value: String,
    },
    Symbol {
        description: String,
    },
    Function {
        name: Option<String>,
        #[serde(default)]
        class: bool,
    },
    Array {
        items: Vec<RemoteValue>,
        /// Elements the engine left out.
        #[serde(default)]
        more: usize,
    },
    Object {
        #[serde(default)]
        constructor: Option<String>,
        entries: IndexMap<String, RemoteValue>,
    },
    Error {
        name: String,
        message: String,
    },
    Date {
        iso: String,
    },
    RegExp {
        source: String,
    },
    /// A reference back to an object already being described.
    Circular,
    /// Nesting the engine did not descend into.
    Truncated {
        #[serde(default)]
        array: bool,
    },
}

impl RemoteValue {
    pub fn number(n: impl ToString) -> Self {
        RemoteValue::Number { text: n.to_string() }
    }

    pub fn string(s: impl Into<String>) -> Self {
        RemoteValue::String { value: s.into() }
    }

    pub fn boolean(value: bool) -> Self {
        RemoteValue::Boolean { value }
    }

    pub fn function(name: Option<&str>) -> Self {
        RemoteValue::Function {
            name: name.map(str::to_string),
            class: false,
        }
    }

    pub fn array(items: impl IntoIterator<Item = RemoteValue>) -> Self {
        RemoteValue::Array {
            items: items.into_iter().collect(),
            more: 0,
        }
    }

    /// A plain `Object` with the given entries in order.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, RemoteValue)>) -> Self {
        RemoteValue::Object {
            constructor: Some("Object".to_string()),
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteValue::Error {
            name: name.into(),
            message: message.into(),
        }
    }
}
