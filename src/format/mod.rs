//! Triple serializers and the Turtle / N-Triples reader
//!
//! All writers work from the shared [`Triple`] model. A term that cannot be
//! written (a variable in object position, a malformed IRI) is a
//! [`SerializationError`]; it means something upstream broke an invariant.

pub mod jsonld;
pub mod ntriples;
pub mod rdfxml;
pub mod reader;
pub mod turtle;
pub mod xml;

use std::fmt;
use std::str::FromStr;

use crate::namespace::NamespaceTable;
use crate::term::{Term, Triple};

/// Error raised when a term cannot be written out
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializationError {
    #[error("unbound variable ?{0} reached a serializer")]
    UnboundVariable(String),

    #[error("malformed IRI <{0}>")]
    InvalidIri(String),

    #[error("{result} results cannot be written as {format}")]
    IncompatibleResult {
        result: &'static str,
        format: &'static str,
    },

    #[error("write failed: {0}")]
    Write(String),
}

/// Triple-dump formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RdfFormat {
    #[default]
    Turtle,
    RdfXml,
    JsonLd,
    NTriples,
}

impl RdfFormat {
    pub const ALL: [RdfFormat; 4] = [RdfFormat::Turtle, RdfFormat::RdfXml, RdfFormat::JsonLd, RdfFormat::NTriples];

    /// Names accepted by [`RdfFormat::from_name`]
    pub const NAMES: &'static [&'static str] = &["turtle", "rdfxml", "jsonld", "ntriples"];

    pub fn name(&self) -> &'static str {
        match self {
            RdfFormat::Turtle => "turtle",
            RdfFormat::RdfXml => "rdfxml",
            RdfFormat::JsonLd => "jsonld",
            RdfFormat::NTriples => "ntriples",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RdfFormat::Turtle => "text/turtle",
            RdfFormat::RdfXml => "application/rdf+xml",
            RdfFormat::JsonLd => "application/ld+json",
            RdfFormat::NTriples => "application/n-triples",
        }
    }

    /// Parse a format name or common alias
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "turtle" | "ttl" => Some(RdfFormat::Turtle),
            "rdfxml" | "rdf/xml" | "rdf" | "xml" => Some(RdfFormat::RdfXml),
            "jsonld" | "json-ld" | "json" => Some(RdfFormat::JsonLd),
            "ntriples" | "n-triples" | "nt" => Some(RdfFormat::NTriples),
            _ => None,
        }
    }

    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type.split(';').next().unwrap_or_default().trim().to_lowercase();
        match essence.as_str() {
            "text/turtle" | "application/x-turtle" => Some(RdfFormat::Turtle),
            "application/rdf+xml" => Some(RdfFormat::RdfXml),
            "application/ld+json" => Some(RdfFormat::JsonLd),
            "application/n-triples" | "text/plain" => Some(RdfFormat::NTriples),
            _ => None,
        }
    }

    /// Pick a format from an `Accept` header.
    ///
    /// Returns `None` when nothing listed is known, including `*/*`, so the
    /// caller can fall back to its default.
    pub fn negotiate(accept: &str) -> Option<Self> {
        negotiate(accept, Self::from_media_type)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RdfFormat::Turtle => "ttl",
            RdfFormat::RdfXml => "rdf",
            RdfFormat::JsonLd => "jsonld",
            RdfFormat::NTriples => "nt",
        }
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RdfFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RdfFormat::from_name(s).ok_or_else(|| format!("Unknown RDF format: {}", s))
    }
}

/// Choose the highest-weighted media type `lookup` understands.
/// Ties keep header order.
pub(crate) fn negotiate<T>(accept: &str, lookup: impl Fn(&str) -> Option<T>) -> Option<T> {
    let mut best: Option<(f32, T)> = None;
    for entry in accept.split(',') {
        let mut parts = entry.split(';');
        let media_type = parts.next().unwrap_or_default().trim();
        let quality = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        if quality <= 0.0 {
            continue;
        }
        if let Some(found) = lookup(media_type) {
            if best.as_ref().map_or(true, |(q, _)| quality > *q) {
                best = Some((quality, found));
            }
        }
    }
    best.map(|(_, found)| found)
}

/// Serialize triples in the given format
pub fn serialize(triples: &[Triple], format: RdfFormat, namespaces: &NamespaceTable) -> Result<String, SerializationError> {
    match format {
        RdfFormat::Turtle => turtle::serialize(triples, namespaces),
        RdfFormat::NTriples => ntriples::serialize(triples),
        RdfFormat::RdfXml => rdfxml::serialize(triples, namespaces),
        RdfFormat::JsonLd => jsonld::serialize(triples, namespaces),
    }
}

/// Reject IRIs no writer can represent
pub fn check_iri(iri: &str) -> Result<(), SerializationError> {
    let bad_char = |c: char| {
        c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\')
    };
    if iri.is_empty() || !iri.contains(':') || iri.chars().any(bad_char) {
        return Err(SerializationError::InvalidIri(iri.to_string()));
    }
    Ok(())
}

/// Validate every term of a triple before writing it
pub fn check_triple(triple: &Triple) -> Result<(), SerializationError> {
    check_iri(triple.subject.as_str())?;
    check_iri(triple.predicate.as_str())?;
    check_object(&triple.object)
}

pub fn check_object(term: &Term) -> Result<(), SerializationError> {
    match term {
        Term::Iri(iri) => check_iri(iri.as_str()),
        Term::Literal(lit) => match lit.datatype_iri() {
            Some(dt) => check_iri(dt),
            None => Ok(()),
        },
        Term::Variable(name) => Err(SerializationError::UnboundVariable(name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Iri;

    #[test]
    fn test_format_names() {
        assert_eq!(RdfFormat::from_name("TTL"), Some(RdfFormat::Turtle));
        assert_eq!(RdfFormat::from_name("json-ld"), Some(RdfFormat::JsonLd));
        assert_eq!(RdfFormat::from_name("yaml"), None);
        assert_eq!("nt".parse::<RdfFormat>().unwrap(), RdfFormat::NTriples);
        assert_eq!(RdfFormat::default().content_type(), "text/turtle");
    }

    #[test]
    fn test_accept_negotiation() {
        assert_eq!(RdfFormat::negotiate("application/ld+json"), Some(RdfFormat::JsonLd));
        assert_eq!(
            RdfFormat::negotiate("text/html, application/rdf+xml;q=0.5, text/turtle;q=0.9"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(RdfFormat::negotiate("*/*"), None);
        assert_eq!(RdfFormat::negotiate("text/turtle;q=0"), None);
    }

    #[test]
    fn test_check_triple() {
        let ok = Triple::new(Iri::new("http://ex.org/a"), Iri::new("http://ex.org/p"), Term::literal("x"));
        assert!(check_triple(&ok).is_ok());

        let var = Triple::new(Iri::new("http://ex.org/a"), Iri::new("http://ex.org/p"), Term::variable("o"));
        assert_eq!(check_triple(&var), Err(SerializationError::UnboundVariable("o".into())));

        let bad = Triple::new(Iri::new("not an iri"), Iri::new("http://ex.org/p"), Term::literal("x"));
        assert!(matches!(check_triple(&bad), Err(SerializationError::InvalidIri(_))));
    }
}
