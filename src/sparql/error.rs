//! Query errors

/// Longest fragment quoted back in a syntax error
const MAX_FRAGMENT: usize = 48;

/// Error returned while parsing or validating a query
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Unparseable query text or a malformed nested clause
    #[error("{message} near '{fragment}'")]
    Syntax { message: String, fragment: String },

    /// Recognised but unimplemented feature
    #[error("unsupported query feature: {feature}")]
    Unsupported { feature: String },
}

impl QueryError {
    pub fn syntax(message: impl Into<String>, fragment: &str) -> Self {
        QueryError::Syntax { message: message.into(), fragment: clip(fragment) }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        QueryError::Unsupported { feature: feature.into() }
    }

    /// The offending query text, for syntax errors
    pub fn fragment(&self) -> Option<&str> {
        match self {
            QueryError::Syntax { fragment, .. } => Some(fragment),
            QueryError::Unsupported { .. } => None,
        }
    }
}

fn clip(fragment: &str) -> String {
    let fragment = fragment.trim_start();
    match fragment.char_indices().nth(MAX_FRAGMENT) {
        Some((end, _)) => format!("{}...", &fragment[..end]),
        None if fragment.is_empty() => "<end of input>".to_string(),
        None => fragment.to_string(),
    }
}
