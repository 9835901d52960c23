//! racegraph - linked-data view of race events, athletes and results
//!
//! Domain records are mapped into RDF triples, held in a per-call in-memory
//! store and exposed through a SPARQL subset and several serializations.
//!
//! # Architecture
//!
//! - [`model`] - domain entities and the read-only [`DataSource`] interface
//! - [`mapper`] - fixed entity-to-triple mapping rules
//! - [`store`] - the request-scoped [`TripleStore`]
//! - [`sparql`] - tokenizer, parser, matcher, filters, projection and result writers
//! - [`format`] - Turtle, N-Triples, RDF/XML and JSON-LD writers plus a Turtle reader
//! - [`pipeline`] - wires the pieces together for one call
//! - [`server`] - axum HTTP surface
//!
//! # Example
//!
//! ```rust,ignore
//! use racegraph::{Event, InMemorySource, Pipeline, RaceGraphConfig, RdfFormat, ResultsFormat};
//!
//! let source = InMemorySource::new().with_event(Event {
//!     id: 1,
//!     title: Some("5K Classic".into()),
//!     ..Default::default()
//! });
//! let config = RaceGraphConfig::new();
//! let pipeline = Pipeline::new(&source, &config);
//!
//! let out = pipeline.run(
//!     "SELECT ?name WHERE { ?e a schema:SportsEvent ; schema:name ?name }",
//!     ResultsFormat::Json,
//!     RdfFormat::Turtle,
//! )?;
//! println!("{}", out.body);
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod namespace;
pub mod pipeline;
pub mod server;
pub mod sparql;
pub mod store;
pub mod term;

// Re-export term types
pub use term::{Binding, Datatype, Iri, Literal, Term, Triple, TriplePattern};

pub use namespace::NamespaceTable;

// Re-export domain types
pub use model::{Athlete, DataSource, Event, InMemorySource, RaceResult, ResultFilter};

pub use mapper::{Mappable, Mapper, MappingError};

pub use store::TripleStore;

// Re-export SPARQL types
pub use sparql::{
    execute_sparql, parse_query, write_results, ParsedQuery, QueryError, QueryResult, ResultsFormat, SparqlEngine,
    SparqlParser,
};

// Re-export serializers
pub use format::{serialize, RdfFormat, SerializationError};

pub use pipeline::{Pipeline, Rendered};

// Re-export async server types
pub use server::{create_router, run_server, AppState};

// Re-export configuration types
pub use config::{ConfigError, LogLevel, RaceGraphConfig};

// Re-export error types
pub use error::{ErrorCode, ErrorResponse, RaceGraphError, RaceGraphResult};
