//! IRI representation

use std::fmt;
use std::sync::Arc;

/// An IRI reference
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri {
    value: Arc<str>,
}

impl Iri {
    /// Create a new IRI
    pub fn new(value: impl Into<String>) -> Self {
        Iri { value: Arc::from(value.into()) }
    }

    /// Get the IRI as a string slice
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Resolve a relative reference against this IRI used as a base
    pub fn resolve(&self, relative: &str) -> Iri {
        if has_scheme(relative) {
            return Iri::new(relative);
        }

        if relative.is_empty() {
            return self.clone();
        }

        if relative.starts_with('#') {
            let base = match self.value.find('#') {
                Some(pos) => &self.value[..pos],
                None => &self.value,
            };
            return Iri::new(format!("{}{}", base, relative));
        }

        if relative.starts_with('/') {
            if let Some(scheme_end) = self.value.find("://") {
                let authority_start = scheme_end + 3;
                let end = self.value[authority_start..]
                    .find('/')
                    .map(|p| authority_start + p)
                    .unwrap_or(self.value.len());
                return Iri::new(format!("{}{}", &self.value[..end], relative));
            }
        }

        // Relative path, resolved against the base directory
        let dir = match self.value.rfind('/') {
            Some(pos) => &self.value[..=pos],
            None => &self.value,
        };
        Iri::new(format!("{}{}", dir, relative))
    }

    /// Express this IRI relative to `base`, if it lies underneath it.
    ///
    /// Only a base ending in `/` qualifies: [`Iri::resolve`] reads relative
    /// paths against the base directory, so any other base would not
    /// resolve back to the same IRI.
    pub fn relative_to(&self, base: &str) -> Option<&str> {
        if !base.ends_with('/') {
            return None;
        }
        self.value
            .strip_prefix(base)
            .filter(|rest| !rest.is_empty() && !rest.starts_with('/') && !has_scheme(rest))
    }
}

fn has_scheme(s: &str) -> bool {
    match s.find(':') {
        Some(pos) if pos > 0 => {
            let scheme = &s[..pos];
            scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Split an IRI into namespace and local name at the last `#` or `/`
pub fn split_iri(iri: &str) -> (&str, &str) {
    if let Some(pos) = iri.rfind('#') {
        (&iri[..=pos], &iri[pos + 1..])
    } else if let Some(pos) = iri.rfind('/') {
        (&iri[..=pos], &iri[pos + 1..])
    } else {
        (iri, "")
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Iri::new(s)
    }
}

impl From<String> for Iri {
    fn from(s: String) -> Self {
        Iri::new(s)
    }
}

/// Well-known namespace IRIs
pub mod ns {
    use super::Iri;

    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
    pub const SCHEMA: &str = "http://schema.org/";
    pub const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
    pub const DCTERMS: &str = "http://purl.org/dc/terms/";
    pub const FOAF: &str = "http://xmlns.com/foaf/0.1/";
    pub const SD: &str = "http://www.w3.org/ns/sparql-service-description#";
    /// Vocabulary for race-specific properties and classes
    pub const RACE: &str = "http://racegraph.org/vocab#";

    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const XSD_POSITIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#positiveInteger";
    pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const XSD_GYEAR: &str = "http://www.w3.org/2001/XMLSchema#gYear";
    pub const XSD_DURATION: &str = "http://www.w3.org/2001/XMLSchema#duration";

    pub fn rdf_type() -> Iri { Iri::new(RDF_TYPE) }
    pub fn schema(local: &str) -> Iri { Iri::new(format!("{}{}", SCHEMA, local)) }
    pub fn race(local: &str) -> Iri { Iri::new(format!("{}{}", RACE, local)) }
    pub fn skos(local: &str) -> Iri { Iri::new(format!("{}{}", SKOS, local)) }
}
