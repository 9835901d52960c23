//! Prefix ↔ namespace IRI table
//!
//! The table is seeded with a fixed set of well-known prefixes and extended by
//! configuration or by `PREFIX` lines inside a query. Compaction and expansion
//! are exact inverses: `expand(compact(iri)) == iri` for every IRI that
//! compacts at all.

use indexmap::IndexMap;

use crate::term::iri::ns;
use crate::term::Iri;

/// The fixed prefixes every table starts from, in preamble order
pub const WELL_KNOWN: &[(&str, &str)] = &[
    ("rdf", ns::RDF),
    ("rdfs", ns::RDFS),
    ("xsd", ns::XSD),
    ("owl", ns::OWL),
    ("schema", ns::SCHEMA),
    ("skos", ns::SKOS),
    ("dcterms", ns::DCTERMS),
    ("foaf", ns::FOAF),
    ("race", ns::RACE),
];

/// Bidirectional prefix table with an optional base IRI
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    prefixes: IndexMap<String, String>,
    base: Option<Iri>,
}

impl NamespaceTable {
    /// Create an empty table (no prefixes, no base)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a table holding the well-known prefixes
    pub fn well_known() -> Self {
        let mut table = Self::default();
        for (prefix, namespace) in WELL_KNOWN {
            table.insert(*prefix, *namespace);
        }
        table
    }

    /// Builder form of [`NamespaceTable::set_base`]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.set_base(base);
        self
    }

    /// Add or replace a prefix
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Look up the namespace bound to a prefix
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Iterate `(prefix, namespace)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn base(&self) -> Option<&Iri> {
        self.base.as_ref()
    }

    pub fn set_base(&mut self, base: impl Into<String>) {
        self.base = Some(Iri::new(base));
    }

    /// Expand `prefix` + `local` into a full IRI
    pub fn expand(&self, prefix: &str, local: &str) -> Option<Iri> {
        self.get(prefix).map(|namespace| Iri::new(format!("{}{}", namespace, local)))
    }

    /// Expand a `prefix:local` string
    pub fn expand_prefixed(&self, pname: &str) -> Option<Iri> {
        let (prefix, local) = pname.split_once(':')?;
        self.expand(prefix, local)
    }

    /// Resolve a relative reference against the base IRI (if any)
    pub fn resolve(&self, reference: &str) -> Iri {
        match &self.base {
            Some(base) => base.resolve(reference),
            None => Iri::new(reference),
        }
    }

    /// Compact an IRI to `prefix:local` using the longest matching namespace.
    ///
    /// Returns `None` if no namespace matches or the remainder is not a valid
    /// local name.
    pub fn compact(&self, iri: &str) -> Option<String> {
        self.prefixes
            .iter()
            .filter_map(|(prefix, namespace)| {
                let local = iri.strip_prefix(namespace.as_str())?;
                is_valid_local_name(local).then_some((prefix, namespace.len(), local))
            })
            .max_by_key(|(_, len, _)| *len)
            .map(|(prefix, _, local)| format!("{}:{}", prefix, local))
    }

    /// Merge another table's prefixes into this one (later entries win)
    pub fn extend<'a>(&mut self, other: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (prefix, namespace) in other {
            self.insert(prefix, namespace);
        }
    }
}

/// Check if a string is usable as the local part of a prefixed name
pub fn is_valid_local_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_alphanumeric() && first != '_' {
        return false;
    }
    if s.ends_with('.') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Check if a string is usable as a prefix label
pub fn is_valid_prefix(s: &str) -> bool {
    s.is_empty()
        || (s.starts_with(|c: char| c.is_alphabetic())
            && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'))
}
