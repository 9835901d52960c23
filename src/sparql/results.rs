//! Query result writers: SPARQL JSON, SPARQL XML, CSV and TSV
//!
//! SELECT rows are written in projection order with unbound variables left
//! out (JSON/XML) or empty (CSV/TSV). ASK results use the boolean form of
//! each format. Graph results go through the triple writers instead.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use super::QueryResult;
use crate::format::xml::{document, XmlElement};
use crate::format::{check_object, negotiate, SerializationError};
use crate::term::{Binding, Datatype, Term};

const SPARQL_RESULTS_NS: &str = "http://www.w3.org/2005/sparql-results#";

/// Query-result formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultsFormat {
    #[default]
    Json,
    Xml,
    Csv,
    Tsv,
}

impl ResultsFormat {
    pub const NAMES: &'static [&'static str] = &["json", "xml", "csv", "tsv"];

    pub fn name(&self) -> &'static str {
        match self {
            ResultsFormat::Json => "json",
            ResultsFormat::Xml => "xml",
            ResultsFormat::Csv => "csv",
            ResultsFormat::Tsv => "tsv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ResultsFormat::Json => "application/sparql-results+json",
            ResultsFormat::Xml => "application/sparql-results+xml",
            ResultsFormat::Csv => "text/csv",
            ResultsFormat::Tsv => "text/tab-separated-values",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "json" | "srj" => Some(ResultsFormat::Json),
            "xml" | "srx" => Some(ResultsFormat::Xml),
            "csv" => Some(ResultsFormat::Csv),
            "tsv" => Some(ResultsFormat::Tsv),
            _ => None,
        }
    }

    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type.split(';').next().unwrap_or_default().trim().to_lowercase();
        match essence.as_str() {
            "application/sparql-results+json" | "application/json" => Some(ResultsFormat::Json),
            "application/sparql-results+xml" | "application/xml" | "text/xml" => Some(ResultsFormat::Xml),
            "text/csv" => Some(ResultsFormat::Csv),
            "text/tab-separated-values" => Some(ResultsFormat::Tsv),
            _ => None,
        }
    }

    /// Pick a format from an `Accept` header, `None` if nothing known is listed
    pub fn negotiate(accept: &str) -> Option<Self> {
        negotiate(accept, Self::from_media_type)
    }
}

impl fmt::Display for ResultsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResultsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultsFormat::from_name(s).ok_or_else(|| format!("Unknown results format: {}", s))
    }
}

/// Write a SELECT or ASK result
pub fn write_results(result: &QueryResult, format: ResultsFormat) -> Result<String, SerializationError> {
    if let QueryResult::Graph(_) = result {
        return Err(SerializationError::IncompatibleResult { result: "graph", format: format.name() });
    }
    match format {
        ResultsFormat::Json => write_json(result),
        ResultsFormat::Xml => write_xml(result),
        ResultsFormat::Csv => write_delimited(result, Delimited::Csv),
        ResultsFormat::Tsv => write_delimited(result, Delimited::Tsv),
    }
}

// ============================================================================
// JSON
// ============================================================================

fn term_json(term: &Term) -> Result<Value, SerializationError> {
    check_object(term)?;
    let value = match term {
        Term::Iri(iri) => json!({ "type": "uri", "value": iri.as_str() }),
        Term::Literal(lit) => match lit.datatype() {
            Datatype::Plain => json!({ "type": "literal", "value": lit.value() }),
            Datatype::Language(lang) => json!({ "type": "literal", "value": lit.value(), "xml:lang": lang }),
            Datatype::Typed(dt) => json!({ "type": "literal", "value": lit.value(), "datatype": dt }),
        },
        Term::Variable(v) => return Err(SerializationError::UnboundVariable(v.clone())),
    };
    Ok(value)
}

fn row_json(binding: &Binding, variables: &[String]) -> Result<Value, SerializationError> {
    let mut row = Map::new();
    for var in variables {
        if let Some(term) = binding.get(var) {
            row.insert(var.clone(), term_json(term)?);
        }
    }
    Ok(Value::Object(row))
}

/// Build the SPARQL JSON results document
pub fn to_json_value(result: &QueryResult) -> Result<Value, SerializationError> {
    match result {
        QueryResult::Solutions { variables, bindings } => {
            let rows = bindings.iter().map(|b| row_json(b, variables)).collect::<Result<Vec<_>, _>>()?;
            Ok(json!({
                "head": { "vars": variables },
                "results": { "bindings": rows },
            }))
        }
        QueryResult::Boolean(value) => Ok(json!({ "head": {}, "boolean": value })),
        QueryResult::Graph(_) => Err(SerializationError::IncompatibleResult { result: "graph", format: "json" }),
    }
}

fn write_json(result: &QueryResult) -> Result<String, SerializationError> {
    let value = to_json_value(result)?;
    let mut out = serde_json::to_string_pretty(&value).map_err(|e| SerializationError::Write(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

// ============================================================================
// XML
// ============================================================================

fn term_xml(term: &Term) -> Result<XmlElement, SerializationError> {
    check_object(term)?;
    let element = match term {
        Term::Iri(iri) => XmlElement::new("uri").text(iri.as_str()),
        Term::Literal(lit) => {
            let element = XmlElement::new("literal");
            let element = match lit.datatype() {
                Datatype::Plain => element,
                Datatype::Language(lang) => element.attr("xml:lang", lang.as_str()),
                Datatype::Typed(dt) => element.attr("datatype", dt.as_str()),
            };
            element.text(lit.value())
        }
        Term::Variable(v) => return Err(SerializationError::UnboundVariable(v.clone())),
    };
    Ok(element)
}

fn write_xml(result: &QueryResult) -> Result<String, SerializationError> {
    let mut root = XmlElement::new("sparql").attr("xmlns", SPARQL_RESULTS_NS);
    match result {
        QueryResult::Solutions { variables, bindings } => {
            let mut head = XmlElement::new("head");
            for var in variables {
                head.push(XmlElement::new("variable").attr("name", var.as_str()));
            }
            root.push(head);

            let mut results = XmlElement::new("results");
            for binding in bindings {
                let mut row = XmlElement::new("result");
                for var in variables {
                    if let Some(term) = binding.get(var) {
                        row.push(XmlElement::new("binding").attr("name", var.as_str()).child(term_xml(term)?));
                    }
                }
                results.push(row);
            }
            root.push(results);
        }
        QueryResult::Boolean(value) => {
            root.push(XmlElement::new("head"));
            root.push(XmlElement::new("boolean").text(value.to_string()));
        }
        QueryResult::Graph(_) => {
            return Err(SerializationError::IncompatibleResult { result: "graph", format: "xml" });
        }
    }
    Ok(document(&root))
}

// ============================================================================
// CSV / TSV
// ============================================================================

#[derive(Clone, Copy)]
enum Delimited {
    Csv,
    Tsv,
}

/// Plain cell value: the term's lexical form, empty when unbound
fn cell(term: Option<&Term>, style: Delimited) -> Result<String, SerializationError> {
    let Some(term) = term else {
        return Ok(String::new());
    };
    check_object(term)?;
    let value = term.string_value();
    Ok(match style {
        Delimited::Csv => value.to_string(),
        // TSV cells are never quoted, so the separators must be escaped
        Delimited::Tsv => value.replace('\\', "\\\\").replace('\t', "\\t").replace('\n', "\\n").replace('\r', "\\r"),
    })
}

fn write_delimited(result: &QueryResult, style: Delimited) -> Result<String, SerializationError> {
    let mut builder = csv::WriterBuilder::new();
    match style {
        Delimited::Csv => builder.terminator(csv::Terminator::CRLF),
        Delimited::Tsv => builder
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .terminator(csv::Terminator::Any(b'\n')),
    };
    let mut writer = builder.from_writer(Vec::new());
    let write_err = |e: csv::Error| SerializationError::Write(e.to_string());

    match result {
        QueryResult::Solutions { variables, bindings } => {
            writer.write_record(variables).map_err(write_err)?;
            for binding in bindings {
                let row = variables
                    .iter()
                    .map(|v| cell(binding.get(v), style))
                    .collect::<Result<Vec<_>, _>>()?;
                writer.write_record(&row).map_err(write_err)?;
            }
        }
        QueryResult::Boolean(value) => {
            writer.write_record(["boolean"]).map_err(write_err)?;
            writer.write_record([value.to_string()]).map_err(write_err)?;
        }
        QueryResult::Graph(_) => {
            return Err(SerializationError::IncompatibleResult { result: "graph", format: "csv" });
        }
    }

    let bytes = writer.into_inner().map_err(|e| SerializationError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SerializationError::Write(e.to_string()))
}
