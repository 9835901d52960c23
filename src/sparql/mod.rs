//! Query engine for a practical subset of SPARQL 1.1
//!
//! Supports:
//! - SELECT (with DISTINCT, `*` and explicit projections)
//! - CONSTRUCT (template and short `CONSTRUCT WHERE` forms)
//! - ASK
//! - DESCRIBE (IRIs and/or variables)
//! - OPTIONAL (sibling blocks, not nested)
//! - FILTER (comparisons, regex, string functions, bound, boolean logic)
//! - ORDER BY, LIMIT, OFFSET
//!
//! Text is tokenized by [`lexer`], parsed by [`parser`] into an [`ast`], matched
//! against a [`TripleStore`] by [`matcher`] and shaped by [`projector`].

pub mod ast;
pub mod error;
pub mod filter;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod projector;
pub mod results;

use std::time::Instant;

use indexmap::IndexSet;
use tracing::debug;

pub use ast::{ParsedQuery, QueryForm};
pub use error::QueryError;
pub use parser::{parse_query, SparqlParser, DEFAULT_MAX_LIMIT};
pub use results::{write_results, ResultsFormat};

use crate::store::TripleStore;
use crate::term::{Binding, Term, Triple};

/// Query results
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// SELECT rows, narrowed to the projected variables
    Solutions { variables: Vec<String>, bindings: Vec<Binding> },
    /// ASK
    Boolean(bool),
    /// CONSTRUCT and DESCRIBE
    Graph(Vec<Triple>),
}

impl QueryResult {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryResult::Solutions { .. } => "solutions",
            QueryResult::Boolean(_) => "boolean",
            QueryResult::Graph(_) => "graph",
        }
    }

    /// Number of rows or triples; 1 for a boolean
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Solutions { bindings, .. } => bindings.len(),
            QueryResult::Boolean(_) => 1,
            QueryResult::Graph(triples) => triples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Executes parsed queries against one store
pub struct SparqlEngine<'a> {
    store: &'a TripleStore,
}

impl<'a> SparqlEngine<'a> {
    pub fn new(store: &'a TripleStore) -> Self {
        SparqlEngine { store }
    }

    /// Execute a parsed query
    pub fn execute(&self, query: &ParsedQuery) -> QueryResult {
        let start = Instant::now();
        let bindings = matcher::evaluate(&query.where_clause, self.store);
        debug!(form = query.form.name(), matched = bindings.len(), elapsed = ?start.elapsed(), "matched WHERE clause");

        let result = match &query.form {
            QueryForm::Select { projection } => {
                let (variables, bindings) = projector::project(bindings, projection, &query.modifiers);
                QueryResult::Solutions { variables, bindings }
            }
            QueryForm::Ask => QueryResult::Boolean(!bindings.is_empty()),
            QueryForm::Construct { template } => {
                let bindings = self.modified(bindings, query);
                let mut graph = IndexSet::new();
                for binding in &bindings {
                    graph.extend(template.iter().filter_map(|pattern| pattern.instantiate(binding)));
                }
                QueryResult::Graph(graph.into_iter().collect())
            }
            QueryForm::Describe { resources } => {
                let bindings = self.modified(bindings, query);
                QueryResult::Graph(self.describe(resources, &bindings))
            }
        };

        debug!(kind = result.kind(), size = result.len(), elapsed = ?start.elapsed(), "executed query");
        result
    }

    /// Apply the solution modifiers over every bound variable
    fn modified(&self, bindings: Vec<Binding>, query: &ParsedQuery) -> Vec<Binding> {
        let variables = projector::resolve_variables(&ast::Projection::All, &bindings);
        projector::apply_modifiers(bindings, &variables, &query.modifiers)
    }

    /// Every triple about the described resources, without duplicates.
    ///
    /// IRIs are described directly. Variables are described through the
    /// IRIs they are bound to; `DESCRIBE *` uses every bound variable.
    fn describe(&self, resources: &[Term], bindings: &[Binding]) -> Vec<Triple> {
        let mut subjects = IndexSet::new();
        if resources.is_empty() {
            for binding in bindings {
                subjects.extend(binding.values().filter_map(Term::as_iri).cloned());
            }
        }
        for resource in resources {
            match resource {
                Term::Iri(iri) => {
                    subjects.insert(iri.clone());
                }
                Term::Variable(name) => {
                    subjects.extend(bindings.iter().filter_map(|b| b.get(name)).filter_map(Term::as_iri).cloned());
                }
                Term::Literal(_) => {}
            }
        }

        let mut graph = IndexSet::new();
        for subject in &subjects {
            graph.extend(self.store.about(subject).cloned());
        }
        graph.into_iter().collect()
    }
}

/// Parse and execute a query against a store
pub fn execute_sparql(store: &TripleStore, query: &str) -> Result<QueryResult, QueryError> {
    let start = Instant::now();
    let parsed = parse_query(query)?;
    debug!(form = parsed.form.name(), elapsed = ?start.elapsed(), "parsed query");
    Ok(SparqlEngine::new(store).execute(&parsed))
}
