//! Literal value representation

use std::fmt;

/// Datatype for a literal
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Plain literal (no datatype)
    Plain,
    /// Language-tagged literal
    Language(String),
    /// Typed literal with datatype IRI
    Typed(String),
}

/// An RDF literal value
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    value: String,
    datatype: Datatype,
}

impl Literal {
    /// Create a plain literal
    pub fn plain(value: impl Into<String>) -> Self {
        Literal { value: value.into(), datatype: Datatype::Plain }
    }

    /// Create a typed literal
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Literal { value: value.into(), datatype: Datatype::Typed(datatype.into()) }
    }

    /// Create a language-tagged literal
    pub fn with_language(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Literal {
            value: value.into(),
            datatype: Datatype::Language(lang.into().to_lowercase()),
        }
    }

    /// Get the lexical value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the datatype
    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    /// Check if this is a plain literal
    pub fn is_plain(&self) -> bool {
        matches!(self.datatype, Datatype::Plain)
    }

    /// Get the language tag if present
    pub fn language(&self) -> Option<&str> {
        match &self.datatype {
            Datatype::Language(lang) => Some(lang),
            _ => None,
        }
    }

    /// Get the datatype IRI if present
    pub fn datatype_iri(&self) -> Option<&str> {
        match &self.datatype {
            Datatype::Typed(iri) => Some(iri),
            _ => None,
        }
    }

    /// Try to parse as an integer
    pub fn as_integer(&self) -> Option<i64> {
        self.value.parse().ok()
    }
}

/// Escape a literal's lexical form for Turtle and N-Triples output
pub fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = escape_literal(&self.value);
        match &self.datatype {
            Datatype::Plain => write!(f, "\"{}\"", value),
            Datatype::Language(lang) => write!(f, "\"{}\"@{}", value, lang),
            Datatype::Typed(dt) => write!(f, "\"{}\"^^<{}>", value, dt),
        }
    }
}
