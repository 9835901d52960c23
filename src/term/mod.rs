//! RDF term representations
//!
//! This module defines the closed set of values every other component works on:
//! - IRIs (named nodes)
//! - Literals (with optional datatype or language tag)
//! - Variables (only inside query patterns and templates)
//!
//! Triples keep subject and predicate as [`Iri`] so a literal can never end up
//! in either position.

use std::fmt;

use indexmap::IndexMap;

pub mod iri;
mod literal;

pub use iri::Iri;
pub use literal::{escape_literal, Datatype, Literal};

/// A term in a triple or triple pattern
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// An IRI reference (named node)
    Iri(Iri),
    /// A literal value
    Literal(Literal),
    /// A query variable, stored without the leading `?`
    Variable(String),
}

impl Term {
    /// Create an IRI term
    pub fn iri(s: impl Into<String>) -> Self {
        Term::Iri(Iri::new(s))
    }

    /// Create a plain literal
    pub fn literal(s: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(s))
    }

    /// Create a typed literal
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal::typed(value, datatype))
    }

    /// Create a language-tagged literal
    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal(Literal::with_language(value, lang))
    }

    /// Create a variable
    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    /// Check if this term is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Get the IRI if this is an IRI term
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri(i) => Some(i),
            _ => None,
        }
    }

    /// Get the literal if this is a literal term
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// The plain string value used by filters, ordering and DISTINCT keys.
    ///
    /// IRIs yield the full IRI, literals their lexical form, variables their name.
    pub fn string_value(&self) -> &str {
        match self {
            Term::Iri(i) => i.as_str(),
            Term::Literal(l) => l.value(),
            Term::Variable(v) => v,
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Term::Iri(iri)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(i) => write!(f, "{:?}", i),
            Term::Literal(l) => write!(f, "{:?}", l),
            Term::Variable(v) => write!(f, "?{}", v),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(i) => write!(f, "{}", i),
            Term::Literal(l) => write!(f, "{}", l),
            Term::Variable(v) => write!(f, "?{}", v),
        }
    }
}

/// A triple (statement) in RDF
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Iri, predicate: Iri, object: impl Into<Term>) -> Self {
        Triple { subject, predicate, object: object.into() }
    }
}

impl fmt::Debug for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} {:?} .", self.subject, self.predicate, self.object)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A triple pattern where any slot may be a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        TriplePattern { subject, predicate, object }
    }

    /// Variables mentioned by this pattern, in subject/predicate/object order
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(|t| match t {
                Term::Variable(v) => Some(v.as_str()),
                _ => None,
            })
    }

    /// Substitute bound variables, leaving unbound ones in place
    pub fn substitute(&self, binding: &Binding) -> TriplePattern {
        TriplePattern {
            subject: substitute(&self.subject, binding),
            predicate: substitute(&self.predicate, binding),
            object: substitute(&self.object, binding),
        }
    }

    /// Instantiate into a ground triple.
    ///
    /// Returns `None` when a variable is unbound or a literal would land in
    /// subject or predicate position.
    pub fn instantiate(&self, binding: &Binding) -> Option<Triple> {
        let subject = match substitute(&self.subject, binding) {
            Term::Iri(i) => i,
            _ => return None,
        };
        let predicate = match substitute(&self.predicate, binding) {
            Term::Iri(i) => i,
            _ => return None,
        };
        let object = substitute(&self.object, binding);
        if object.is_variable() {
            return None;
        }
        Some(Triple::new(subject, predicate, object))
    }
}

/// Bindings from variable names to terms, in the order variables were bound
pub type Binding = IndexMap<String, Term>;

/// Apply a binding to a term, substituting a bound variable
pub fn substitute(term: &Term, binding: &Binding) -> Term {
    match term {
        Term::Variable(v) => binding.get(v).cloned().unwrap_or_else(|| term.clone()),
        _ => term.clone(),
    }
}
