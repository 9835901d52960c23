//! Per-call engine: entities → triples → store → query → serialized output
//!
//! A [`Pipeline`] holds read-only configuration only. Every call to
//! [`Pipeline::store`] maps the source again, so nothing loaded by one request
//! is visible to the next.

use std::time::Instant;

use tracing::debug;

use crate::config::RaceGraphConfig;
use crate::error::{RaceGraphError, RaceGraphResult};
use crate::format::{self, RdfFormat};
use crate::mapper::Mapper;
use crate::model::DataSource;
use crate::namespace::NamespaceTable;
use crate::sparql::{write_results, ParsedQuery, QueryResult, ResultsFormat, SparqlEngine, SparqlParser};
use crate::store::TripleStore;
use crate::term::Triple;

/// Serialized output with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: String,
}

/// Output formats for a query given one format name. The name may pick a
/// results document or a triple syntax; the other side keeps its default.
pub fn formats_by_name(name: &str) -> RaceGraphResult<(ResultsFormat, RdfFormat)> {
    let results = ResultsFormat::from_name(name);
    let rdf = RdfFormat::from_name(name);
    if results.is_none() && rdf.is_none() {
        let mut supported = ResultsFormat::NAMES.to_vec();
        supported.extend_from_slice(RdfFormat::NAMES);
        return Err(RaceGraphError::unknown_format(name, &supported));
    }
    Ok((results.unwrap_or_default(), rdf.unwrap_or_default()))
}

/// Wires a data source to the query engine and the writers
pub struct Pipeline<'a> {
    source: &'a dyn DataSource,
    mapper: Mapper,
    namespaces: NamespaceTable,
    max_limit: usize,
    /// Static triples added to every store, e.g. loaded from a Turtle file
    extra: Vec<Triple>,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn DataSource, config: &RaceGraphConfig) -> Self {
        Pipeline {
            source,
            mapper: Mapper::new(config.general.base_iri.as_str()),
            namespaces: config.namespaces(),
            max_limit: config.query.max_limit,
            extra: Vec::new(),
        }
    }

    pub fn with_triples(mut self, triples: impl IntoIterator<Item = Triple>) -> Self {
        self.extra.extend(triples);
        self
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Map the source into a fresh store
    pub fn store(&self) -> TripleStore {
        let start = Instant::now();
        let mut store = TripleStore::from_source(self.source, &self.mapper);
        store.add_all(self.extra.iter().cloned());
        debug!(triples = store.len(), elapsed = ?start.elapsed(), "mapped data source");
        store
    }

    /// Serialize every triple of a fresh store
    pub fn dump(&self, format: RdfFormat) -> RaceGraphResult<Rendered> {
        let store = self.store();
        let body = format::serialize(store.triples(), format, &self.namespaces)?;
        Ok(Rendered { content_type: format.content_type(), body })
    }

    /// Parse a query against the configured prefixes and limit
    pub fn parse(&self, query: &str) -> RaceGraphResult<ParsedQuery> {
        let start = Instant::now();
        let parsed = SparqlParser::new(query)
            .with_namespaces(self.namespaces.clone())
            .with_max_limit(self.max_limit)
            .parse()?;
        debug!(form = parsed.form.name(), elapsed = ?start.elapsed(), "parsed query");
        Ok(parsed)
    }

    /// Parse and execute a query against a fresh store
    pub fn query(&self, query: &str) -> RaceGraphResult<(ParsedQuery, QueryResult)> {
        let parsed = self.parse(query)?;
        let store = self.store();
        let result = SparqlEngine::new(&store).execute(&parsed);
        Ok((parsed, result))
    }

    /// Serialize a query result: graphs as triples, everything else as a results document
    pub fn render(
        &self,
        parsed: &ParsedQuery,
        result: &QueryResult,
        results_format: ResultsFormat,
        rdf_format: RdfFormat,
    ) -> RaceGraphResult<Rendered> {
        let rendered = match result {
            QueryResult::Graph(triples) => Rendered {
                content_type: rdf_format.content_type(),
                body: format::serialize(triples, rdf_format, &parsed.namespaces)?,
            },
            _ => Rendered { content_type: results_format.content_type(), body: write_results(result, results_format)? },
        };
        Ok(rendered)
    }

    /// Query and render in one call
    pub fn run(&self, query: &str, results_format: ResultsFormat, rdf_format: RdfFormat) -> RaceGraphResult<Rendered> {
        let (parsed, result) = self.query(query)?;
        self.render(&parsed, &result, results_format, rdf_format)
    }
}
