//! In-memory triple store
//!
//! A store is a plain list of triples. It is built fresh for every call and
//! dropped afterwards. Duplicates are kept so the store mirrors exactly what
//! the mapper emitted.

use crate::mapper::Mapper;
use crate::model::DataSource;
use crate::term::{Iri, Triple};

/// A request-scoped collection of triples
#[derive(Clone, Default, PartialEq)]
pub struct TripleStore {
    triples: Vec<Triple>,
}

impl TripleStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store by mapping every entity of a data source
    pub fn from_source(source: &dyn DataSource, mapper: &Mapper) -> Self {
        let store = TripleStore { triples: mapper.map_source(source) };
        tracing::debug!(triples = store.len(), "built triple store");
        store
    }

    /// Add a triple to the store
    pub fn add(&mut self, triple: Triple) {
        self.triples.push(triple);
    }

    /// Add multiple triples
    pub fn add_all(&mut self, triples: impl IntoIterator<Item = Triple>) {
        self.triples.extend(triples);
    }

    /// Check if the store contains a triple
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.iter().any(|t| t == triple)
    }

    /// Get all triples
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Get the number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Iterate over all triples
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Triples whose subject is `subject`, in store order
    pub fn about<'a>(&'a self, subject: &'a Iri) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| &t.subject == subject)
    }
}

impl From<Vec<Triple>> for TripleStore {
    fn from(triples: Vec<Triple>) -> Self {
        TripleStore { triples }
    }
}

impl FromIterator<Triple> for TripleStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        TripleStore { triples: iter.into_iter().collect() }
    }
}

impl std::fmt::Debug for TripleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TripleStore {{")?;
        for triple in &self.triples {
            writeln!(f, "  {:?}", triple)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, InMemorySource};
    use crate::term::iri::ns;
    use crate::term::Term;

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Iri::new(s), Iri::new(p), Term::literal(o))
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut store = TripleStore::new();
        store.add(triple("http://ex.org/a", "http://ex.org/p", "x"));
        store.add(triple("http://ex.org/a", "http://ex.org/p", "x"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_from_source() {
        let source = InMemorySource::new().with_event(Event {
            id: 1,
            title: Some("5K Classic".into()),
            ..Default::default()
        });
        let store = TripleStore::from_source(&source, &Mapper::new("https://example.org/"));

        assert_eq!(store.len(), 3);
        let subject = Iri::new("https://example.org/events/1");
        assert_eq!(store.about(&subject).count(), 3);
        assert!(store.contains(&Triple::new(subject, ns::schema("name"), Term::literal("5K Classic"))));
    }
}
