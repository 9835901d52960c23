//! Async HTTP server
//!
//! # Routes
//!
//! - `GET /rdf` - full triple dump (`format` parameter or `Accept` header)
//! - `GET /sparql?query=...` - run a query; without `query`, the service description
//! - `POST /sparql` - run a query from an `application/sparql-query` body or a
//!   `query` form field
//! - `GET /health` - health check
//!
//! Every request maps the data source into a fresh store. Failures come back
//! as `{"error": "..."}` with the status of the underlying error code.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::RaceGraphConfig;
use crate::error::{ErrorCode, ErrorResponse, RaceGraphError, RaceGraphResult};
use crate::format::{self, RdfFormat};
use crate::model::DataSource;
use crate::pipeline::{formats_by_name, Pipeline, Rendered};
use crate::sparql::ResultsFormat;
use crate::term::iri::ns;
use crate::term::{Iri, Term, Triple};

/// Namespace of the W3C format identifiers used in the service description
const FORMATS_NS: &str = "http://www.w3.org/ns/formats/";

// ============================================================================
// Application State
// ============================================================================

/// Shared, read-only application state
pub struct AppState {
    pub source: Arc<dyn DataSource>,
    pub config: RaceGraphConfig,
    /// Static triples added to every store
    pub extra: Vec<Triple>,
}

impl AppState {
    pub fn new(source: Arc<dyn DataSource>, config: RaceGraphConfig) -> Self {
        Self { source, config, extra: Vec::new() }
    }

    pub fn with_triples(mut self, triples: Vec<Triple>) -> Self {
        self.extra = triples;
        self
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self.source.as_ref(), &self.config).with_triples(self.extra.iter().cloned())
    }
}

pub type SharedState = Arc<AppState>;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /rdf
#[derive(Debug, Deserialize)]
pub struct DumpParams {
    format: Option<String>,
}

/// Query parameters for GET /sparql
#[derive(Debug, Deserialize)]
pub struct SparqlQueryParams {
    query: Option<String>,
    format: Option<String>,
}

/// Form data for POST /sparql with application/x-www-form-urlencoded
#[derive(Debug, Deserialize)]
pub struct SparqlFormData {
    query: String,
    format: Option<String>,
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

impl IntoResponse for RaceGraphError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            warn!(code = self.code.code(), message = %self.message, "request failed");
        }
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::from(&self).to_json();
        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}

// ============================================================================
// Format Selection
// ============================================================================

fn accept_header(headers: &HeaderMap) -> &str {
    headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or("")
}

/// Triple-dump format: explicit parameter, then `Accept`, then Turtle
fn dump_format(param: Option<&str>, headers: &HeaderMap) -> RaceGraphResult<RdfFormat> {
    match param {
        Some(name) => {
            RdfFormat::from_name(name).ok_or_else(|| RaceGraphError::unknown_format(name, RdfFormat::NAMES))
        }
        None => Ok(RdfFormat::negotiate(accept_header(headers)).unwrap_or_default()),
    }
}

/// Formats for a query response: results documents for SELECT/ASK, triples
/// for CONSTRUCT/DESCRIBE. A `format` parameter naming either kind is enough,
/// the other side keeps its default.
fn query_formats(param: Option<&str>, headers: &HeaderMap) -> RaceGraphResult<(ResultsFormat, RdfFormat)> {
    match param {
        Some(name) => formats_by_name(name),
        None => {
            let accept = accept_header(headers);
            Ok((
                ResultsFormat::negotiate(accept).unwrap_or_default(),
                RdfFormat::negotiate(accept).unwrap_or_default(),
            ))
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Handle GET /rdf
async fn rdf_dump(
    State(state): State<SharedState>,
    Query(params): Query<DumpParams>,
    headers: HeaderMap,
) -> RaceGraphResult<Rendered> {
    let format = dump_format(params.format.as_deref(), &headers)?;
    state.pipeline().dump(format)
}

/// Handle GET /sparql?query=...
async fn sparql_get(
    State(state): State<SharedState>,
    Query(params): Query<SparqlQueryParams>,
    headers: HeaderMap,
) -> RaceGraphResult<Rendered> {
    match params.query {
        Some(query) => execute_query(&state, &query, params.format.as_deref(), &headers),
        None => service_description(&state.config),
    }
}

/// Handle POST /sparql with query in body
///
/// The body is read under the configured size limit, so an oversized request
/// is cut off while streaming rather than buffered in full.
async fn sparql_post(
    State(state): State<SharedState>,
    Query(params): Query<SparqlQueryParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> RaceGraphResult<Rendered> {
    let limit = state.config.server.max_body_size;
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RaceGraphError::input_too_large(limit)
        } else {
            RaceGraphError::new(ErrorCode::InvalidFormat, format!("Failed to read request body: {}", rejection.body_text()))
        }
    })?;
    let body = std::str::from_utf8(&body)
        .map_err(|e| RaceGraphError::new(ErrorCode::InvalidFormat, format!("Request body is not UTF-8: {}", e)))?;

    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");

    let (query, format) = if content_type.contains("application/x-www-form-urlencoded") {
        let form: SparqlFormData = serde_urlencoded::from_str(body).map_err(|e| {
            RaceGraphError::new(ErrorCode::InvalidFormat, format!("Invalid form data: {}", e))
                .with_hint("Send the query in a 'query' field")
        })?;
        (form.query, form.format.or(params.format))
    } else {
        // application/sparql-query, or a raw query with any other type
        (body.to_string(), params.format)
    };

    execute_query(&state, &query, format.as_deref(), &headers)
}

fn execute_query(state: &AppState, query: &str, format: Option<&str>, headers: &HeaderMap) -> RaceGraphResult<Rendered> {
    if query.trim().is_empty() {
        return Err(RaceGraphError::empty_input("Query"));
    }
    let (results_format, rdf_format) = query_formats(format, headers)?;
    state.pipeline().run(query, results_format, rdf_format)
}

/// SPARQL service description of this endpoint, in Turtle
fn service_description(config: &RaceGraphConfig) -> RaceGraphResult<Rendered> {
    let sd = |local: &str| Iri::new(format!("{}{}", ns::SD, local));
    let formats = |local: &str| Term::iri(format!("{}{}", FORMATS_NS, local));

    let base = Iri::new(config.general.base_iri.as_str());
    let endpoint = base.resolve("sparql");
    let mut triples = vec![
        Triple::new(endpoint.clone(), ns::rdf_type(), Term::Iri(sd("Service"))),
        Triple::new(endpoint.clone(), sd("endpoint"), Term::Iri(endpoint.clone())),
        Triple::new(endpoint.clone(), sd("supportedLanguage"), Term::Iri(sd("SPARQL11Query"))),
    ];
    for format in ["SPARQL_Results_JSON", "SPARQL_Results_XML", "SPARQL_Results_CSV", "SPARQL_Results_TSV"] {
        triples.push(Triple::new(endpoint.clone(), sd("resultFormat"), formats(format)));
    }
    for format in ["Turtle", "RDF_XML", "JSON-LD", "N-Triples"] {
        triples.push(Triple::new(endpoint.clone(), sd("resultFormat"), formats(format)));
    }

    let mut namespaces = config.namespaces();
    namespaces.insert("sd", ns::SD);
    namespaces.insert("formats", FORMATS_NS);

    let body = format::serialize(&triples, RdfFormat::Turtle, &namespaces)?;
    Ok(Rendered { content_type: RdfFormat::Turtle.content_type(), body })
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Server Setup
// ============================================================================

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let cors_enabled = state.config.server.cors_enabled;
    let max_body_size = state.config.server.max_body_size;

    let router = Router::new()
        .route("/rdf", get(rdf_dump))
        .route("/sparql", get(sparql_get).post(sparql_post))
        .route("/health", get(health_check))
        // Oversized bodies surface in the handler as a JSON 413
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http());

    let router = if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_origin(Any)
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
    } else {
        router
    };

    router.with_state(state)
}

/// Socket address from the configured host and port
pub fn socket_addr(config: &RaceGraphConfig) -> RaceGraphResult<SocketAddr> {
    format!("{}:{}", config.server.host, config.server.port).parse().map_err(|e| {
        RaceGraphError::config(format!("Invalid listen address {}:{}: {}", config.server.host, config.server.port, e))
    })
}

/// Run the HTTP server until Ctrl+C
pub async fn run_server(state: AppState) -> RaceGraphResult<()> {
    let addr = socket_addr(&state.config)?;
    let app = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "SPARQL endpoint listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, InMemorySource};
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn test_state() -> SharedState {
        let source = InMemorySource::new()
            .with_event(Event { id: 1, title: Some("5K Classic".into()), date: Some("2024-01-01".into()), ..Default::default() })
            .with_event(Event { id: 2, title: Some("10K Run".into()), date: Some("2023-06-01".into()), ..Default::default() });
        let mut config = RaceGraphConfig::new();
        config.general.base_iri = "https://example.org/".into();
        config.server.max_body_size = 256;
        Arc::new(AppState::new(Arc::new(source), config))
    }

    async fn send(request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = create_router(test_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).header("Origin", "http://client.example").body(Body::empty()).unwrap()
    }

    fn sparql_uri(query: &str) -> String {
        format!("/sparql?query={}", urlencoding::encode(query))
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, _, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_rdf_dump_negotiation() {
        let (status, headers, body) = send(get("/rdf")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/turtle");
        assert!(body.contains("<events/1> a schema:Event"));

        let request = Request::builder()
            .uri("/rdf")
            .header(header::ACCEPT, "application/ld+json")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = send(request).await;
        assert_eq!(headers[header::CONTENT_TYPE], "application/ld+json");

        let (_, headers, body) = send(get("/rdf?format=ntriples")).await;
        assert_eq!(headers[header::CONTENT_TYPE], "application/n-triples");
        assert!(body.contains("<https://example.org/events/2> <http://schema.org/name> \"10K Run\" ."));
    }

    #[tokio::test]
    async fn test_unknown_dump_format() {
        let (status, _, body) = send(get("/rdf?format=yaml")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("yaml"));
    }

    #[tokio::test]
    async fn test_sparql_get_json() {
        let uri = sparql_uri("SELECT ?name WHERE { ?e schema:name ?name } ORDER BY ?name");
        let (status, headers, body) = send(get(&uri)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/sparql-results+json");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["head"]["vars"][0], "name");
        assert_eq!(json["results"]["bindings"][0]["name"]["value"], "10K Run");
    }

    #[tokio::test]
    async fn test_sparql_format_param() {
        let uri = format!("{}&format=csv", sparql_uri("SELECT ?name WHERE { ?e schema:name ?name }"));
        let (_, headers, body) = send(get(&uri)).await;
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
        assert!(body.starts_with("name\r\n"));
    }

    #[tokio::test]
    async fn test_sparql_post_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/sparql")
            .header(header::CONTENT_TYPE, "application/sparql-query")
            .header(header::ACCEPT, "application/sparql-results+xml")
            .body(Body::from("ASK { ?e schema:name \"5K Classic\" }"))
            .unwrap();
        let (status, headers, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/sparql-results+xml");
        assert!(body.contains("<boolean>true</boolean>"));
    }

    #[tokio::test]
    async fn test_sparql_post_form() {
        let form = format!("query={}&format=tsv", urlencoding::encode("SELECT ?e WHERE { ?e a schema:Event }"));
        let request = Request::builder()
            .method("POST")
            .uri("/sparql")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let (status, headers, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/tab-separated-values");
        assert_eq!(body.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_construct_returns_triples() {
        let uri = sparql_uri("CONSTRUCT { ?e schema:name ?n } WHERE { ?e schema:name ?n }");
        let request = Request::builder().uri(&uri).header(header::ACCEPT, "application/n-triples").body(Body::empty()).unwrap();
        let (status, headers, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/n-triples");
        assert_eq!(body.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_syntax_error_is_json_400() {
        let (status, headers, body) = send(get(&sparql_uri("SELECT ?x WHERE { ?x"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["error"].is_string());
        assert_eq!(json["code"], "INVALID_SPARQL");
    }

    #[tokio::test]
    async fn test_unsupported_feature_is_400() {
        let (status, _, body) = send(get(&sparql_uri("SELECT ?x WHERE { ?x schema:a/schema:b ?y }"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("unsupported"));
    }

    #[tokio::test]
    async fn test_empty_and_oversized_bodies() {
        let empty = Request::builder().method("POST").uri("/sparql").body(Body::from("  ")).unwrap();
        let (status, _, _) = send(empty).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let large = Request::builder().method("POST").uri("/sparql").body(Body::from("x".repeat(1024))).unwrap();
        let (status, _, body) = send(large).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["code"], "INPUT_TOO_LARGE");
        assert!(json["error"].as_str().unwrap().contains("exceeds limit 256"));
    }

    #[tokio::test]
    async fn test_body_limit_applies_while_reading() {
        let huge = "x".repeat(8 * 1024 * 1024);
        let request = Request::builder().method("POST").uri("/sparql").body(Body::from(huge)).unwrap();
        let (status, _, body) = send(request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!body.contains("8388608"));
    }

    #[tokio::test]
    async fn test_sparql_post_body_honours_format_param() {
        let request = Request::builder()
            .method("POST")
            .uri("/sparql?format=csv")
            .header(header::CONTENT_TYPE, "application/sparql-query")
            .body(Body::from("SELECT ?name WHERE { ?e schema:name ?name }"))
            .unwrap();
        let (status, headers, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
        assert!(body.starts_with("name\r\n"));
    }

    #[tokio::test]
    async fn test_service_description() {
        let (status, headers, body) = send(get("/sparql")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/turtle");
        assert!(body.contains("@prefix sd: <http://www.w3.org/ns/sparql-service-description#> ."));
        assert!(body.contains("<sparql> a sd:Service ;"));
        assert!(body.contains("sd:supportedLanguage sd:SPARQL11Query"));
    }
}
