//! Entity-to-triple mapping
//!
//! Every entity maps to a deterministic, ordered list of triples: `rdf:type`
//! first, then one triple per present scalar attribute, then the multi-valued
//! relations. Each relation value is followed by a definition triple for the
//! concept node it points at. Definitions repeat whenever two entities share a
//! concept; the store keeps those duplicates.
//!
//! A missing required attribute raises a [`MappingError`] for that one triple.
//! The error is logged and the rest of the entity (and every other entity)
//! still maps.

use tracing::warn;

use crate::model::{Athlete, DataSource, Event, RaceResult, ResultFilter};
use crate::term::iri::ns;
use crate::term::{Iri, Literal, Term, Triple};

/// Collection segment for events
pub const EVENTS: &str = "events";
/// Collection segment for athletes
pub const ATHLETES: &str = "athletes";
/// Collection segment for results
pub const RESULTS: &str = "results";

/// Error raised while mapping a single attribute
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("{entity} {id}: missing required field '{field}'")]
    MissingField {
        entity: &'static str,
        id: u64,
        field: &'static str,
    },

    #[error("{entity} {id}: field '{field}' is empty")]
    EmptyField {
        entity: &'static str,
        id: u64,
        field: &'static str,
    },

    #[error("{entity} {id}: invalid value for '{field}': {value}")]
    InvalidValue {
        entity: &'static str,
        id: u64,
        field: &'static str,
        value: String,
    },
}

/// Anything the mapper can turn into triples
pub trait Mappable {
    /// Append this entity's triples to `out`
    fn map_into(&self, mapper: &Mapper, out: &mut Vec<Triple>);
}

/// Converts domain entities into triples under a base IRI
#[derive(Debug, Clone)]
pub struct Mapper {
    base: String,
}

impl Mapper {
    /// Create a mapper. A trailing `/` is added to the base when missing.
    pub fn new(base_iri: impl Into<String>) -> Self {
        let mut base = base_iri.into();
        if !base.ends_with('/') && !base.ends_with('#') {
            base.push('/');
        }
        Mapper { base }
    }

    pub fn base_iri(&self) -> &str {
        &self.base
    }

    /// Canonical IRI: `base + collection + "/" + id`
    pub fn entity_iri(&self, collection: &str, id: u64) -> Iri {
        Iri::new(format!("{}{}/{}", self.base, collection, id))
    }

    /// IRI of a concept node such as an event type or club
    pub fn concept_iri(&self, kind: &str, label: &str) -> Iri {
        Iri::new(format!("{}{}/{}", self.base, kind, slug(label)))
    }

    /// Map a single entity
    pub fn map<E: Mappable + ?Sized>(&self, entity: &E) -> Vec<Triple> {
        let mut out = Vec::new();
        entity.map_into(self, &mut out);
        out
    }

    pub fn map_event(&self, event: &Event) -> Vec<Triple> {
        self.map(event)
    }

    pub fn map_athlete(&self, athlete: &Athlete) -> Vec<Triple> {
        self.map(athlete)
    }

    pub fn map_result(&self, result: &RaceResult) -> Vec<Triple> {
        self.map(result)
    }

    /// Map every entity a data source exposes: events, then athletes, then results
    pub fn map_source(&self, source: &dyn DataSource) -> Vec<Triple> {
        let mut out = Vec::new();
        for event in source.list_events() {
            event.map_into(self, &mut out);
        }
        for athlete in source.list_athletes() {
            athlete.map_into(self, &mut out);
        }
        for result in source.list_results(&ResultFilter::all()) {
            result.map_into(self, &mut out);
        }
        out
    }
}

/// Accumulates the triples of one subject and reports skipped attributes
struct SubjectWriter<'a> {
    subject: Iri,
    out: &'a mut Vec<Triple>,
}

impl<'a> SubjectWriter<'a> {
    fn new(subject: Iri, out: &'a mut Vec<Triple>) -> Self {
        SubjectWriter { subject, out }
    }

    fn emit(&mut self, predicate: Iri, object: impl Into<Term>) {
        self.out.push(Triple::new(self.subject.clone(), predicate, object));
    }

    fn emit_opt(&mut self, predicate: Iri, object: Option<impl Into<Term>>) {
        if let Some(object) = object {
            self.emit(predicate, object);
        }
    }

    fn emit_checked(&mut self, predicate: Iri, object: Result<Option<Term>, MappingError>) {
        match object {
            Ok(object) => self.emit_opt(predicate, object),
            Err(err) => warn!(subject = %self.subject.as_str(), "skipping triple: {}", err),
        }
    }

    /// Emit a link to a concept node followed by the node's label triple
    fn emit_concept(&mut self, predicate: Iri, concept: Iri, label_predicate: Iri, label: &str) {
        self.emit(predicate, concept.clone());
        self.out.push(Triple::new(concept, label_predicate, Literal::plain(label)));
    }
}

/// Present and non-blank text, or `None`
fn text(value: &Option<String>) -> Option<Literal> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Literal::plain)
}

impl Mappable for Event {
    fn map_into(&self, mapper: &Mapper, out: &mut Vec<Triple>) {
        let mut w = SubjectWriter::new(mapper.entity_iri(EVENTS, self.id), out);

        w.emit(ns::rdf_type(), ns::schema("Event"));
        w.emit(ns::rdf_type(), ns::schema("SportsEvent"));

        let title = match self.title.as_deref() {
            Some(t) if t.trim().is_empty() => Err(MappingError::EmptyField {
                entity: "event",
                id: self.id,
                field: "title",
            }),
            Some(t) => Ok(Some(Term::literal(t.trim()))),
            None => Ok(None),
        };
        w.emit_checked(ns::schema("name"), title);

        w.emit_opt(ns::schema("startDate"), date_literal(&self.date));
        w.emit_opt(ns::schema("endDate"), date_literal(&self.end_date));
        w.emit_opt(ns::schema("location"), text(&self.location));

        let distance = match self.distance_km {
            Some(km) if !km.is_finite() || km < 0.0 => Err(MappingError::InvalidValue {
                entity: "event",
                id: self.id,
                field: "distance_km",
                value: km.to_string(),
            }),
            Some(km) => Ok(Some(Term::typed_literal(format_decimal(km), ns::XSD_DECIMAL))),
            None => Ok(None),
        };
        w.emit_checked(ns::race("distanceKm"), distance);

        let url = match self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(u) if u.contains("://") => Ok(Some(Term::iri(u))),
            Some(u) => Err(MappingError::InvalidValue {
                entity: "event",
                id: self.id,
                field: "url",
                value: u.to_string(),
            }),
            None => Ok(None),
        };
        w.emit_checked(ns::schema("url"), url);
        w.emit_opt(ns::schema("description"), text(&self.description));

        for label in self.event_types.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let concept = mapper.concept_iri("event-types", label);
            w.emit_concept(ns::race("eventType"), concept, ns::skos("prefLabel"), label);
        }
        for label in self.divisions.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let concept = mapper.concept_iri("divisions", label);
            w.emit_concept(ns::race("division"), concept, ns::skos("prefLabel"), label);
        }
    }
}

impl Mappable for Athlete {
    fn map_into(&self, mapper: &Mapper, out: &mut Vec<Triple>) {
        let mut w = SubjectWriter::new(mapper.entity_iri(ATHLETES, self.id), out);

        w.emit(ns::rdf_type(), ns::schema("Person"));

        let given = text(&self.given_name);
        let family = text(&self.family_name);
        let full_name = match (&given, &family) {
            (Some(g), Some(f)) => Some(Literal::plain(format!("{} {}", g.value(), f.value()))),
            _ => None,
        };
        w.emit_opt(ns::schema("givenName"), given);
        w.emit_opt(ns::schema("familyName"), family);
        w.emit_opt(ns::schema("name"), full_name);
        w.emit_opt(ns::schema("gender"), text(&self.gender));
        w.emit_opt(
            ns::race("birthYear"),
            self.birth_year.map(|y| Literal::typed(format!("{:04}", y), ns::XSD_GYEAR)),
        );
        w.emit_opt(ns::schema("nationality"), text(&self.country));

        for club in self.clubs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let concept = mapper.concept_iri("clubs", club);
            w.emit_concept(ns::schema("memberOf"), concept, ns::schema("name"), club);
        }
    }
}

impl Mappable for RaceResult {
    fn map_into(&self, mapper: &Mapper, out: &mut Vec<Triple>) {
        let mut w = SubjectWriter::new(mapper.entity_iri(RESULTS, self.id), out);

        w.emit(ns::rdf_type(), ns::race("RaceResult"));

        let event = self
            .event_id
            .map(|id| Some(Term::from(mapper.entity_iri(EVENTS, id))))
            .ok_or(MappingError::MissingField { entity: "result", id: self.id, field: "event_id" });
        w.emit_checked(ns::race("event"), event);

        let athlete = self
            .athlete_id
            .map(|id| Some(Term::from(mapper.entity_iri(ATHLETES, id))))
            .ok_or(MappingError::MissingField { entity: "result", id: self.id, field: "athlete_id" });
        w.emit_checked(ns::race("athlete"), athlete);

        if let Some(secs) = self.time_seconds {
            w.emit(ns::race("timeSeconds"), Literal::typed(secs.to_string(), ns::XSD_INTEGER));
            w.emit(ns::race("time"), Literal::typed(format_duration(secs), ns::XSD_DURATION));
        }

        let place = match self.place {
            Some(0) => Err(MappingError::InvalidValue {
                entity: "result",
                id: self.id,
                field: "place",
                value: "0".into(),
            }),
            Some(p) => Ok(Some(Term::typed_literal(p.to_string(), ns::XSD_POSITIVE_INTEGER))),
            None => Ok(None),
        };
        w.emit_checked(ns::race("place"), place);
        w.emit_opt(ns::race("division"), text(&self.division));
        w.emit_opt(
            ns::race("age"),
            self.age.map(|a| Literal::typed(a.to_string(), ns::XSD_INTEGER)),
        );
        w.emit_opt(ns::race("bib"), text(&self.bib));
    }
}

fn date_literal(value: &Option<String>) -> Option<Literal> {
    text(value).map(|l| Literal::typed(l.value(), ns::XSD_DATE))
}

/// Lowercase, collapse runs of non-alphanumerics into `-`, trim dashes
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_dash = false;
    for c in label.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// `xsd:duration` for a whole number of seconds: `PT{h}H{m}M{s}S`, zero
/// components omitted, `PT0S` for zero
pub fn format_duration(total_seconds: u64) -> String {
    if total_seconds == 0 {
        return "PT0S".to_string();
    }
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    if seconds > 0 {
        out.push_str(&format!("{}S", seconds));
    }
    out
}

/// Decimal lexical form that always carries a fractional part
fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
