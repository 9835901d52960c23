//! Domain entities and the read-only data-access interface
//!
//! Storage, CRUD and importers live outside this crate. They hand over events,
//! athletes and results through [`DataSource`]; the mapper only depends on the
//! attribute sets defined here.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RaceGraphError};

/// A competition event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub id: u64,
    pub title: Option<String>,
    /// ISO-8601 calendar date (`YYYY-MM-DD`)
    pub date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub distance_km: Option<f64>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub event_types: Vec<String>,
    pub divisions: Vec<String>,
}

/// A registered athlete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Athlete {
    pub id: u64,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub gender: Option<String>,
    pub birth_year: Option<i32>,
    pub country: Option<String>,
    pub clubs: Vec<String>,
}

/// One athlete's finish in one event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceResult {
    pub id: u64,
    pub event_id: Option<u64>,
    pub athlete_id: Option<u64>,
    /// Finish time in whole seconds
    pub time_seconds: Option<u64>,
    pub place: Option<u32>,
    pub division: Option<String>,
    pub age: Option<u32>,
    pub bib: Option<String>,
}

/// Narrows [`DataSource::list_results`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultFilter {
    pub event_id: Option<u64>,
    pub athlete_id: Option<u64>,
}

impl ResultFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, result: &RaceResult) -> bool {
        self.event_id.map_or(true, |id| result.event_id == Some(id))
            && self.athlete_id.map_or(true, |id| result.athlete_id == Some(id))
    }
}

/// Read-only access to the entities the triple pipeline consumes
pub trait DataSource: Send + Sync {
    fn list_events(&self) -> Vec<Event>;
    fn list_athletes(&self) -> Vec<Athlete>;
    fn list_results(&self, filter: &ResultFilter) -> Vec<RaceResult>;
}

/// A [`DataSource`] backed by vectors, loadable from a JSON snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemorySource {
    pub events: Vec<Event>,
    pub athletes: Vec<Athlete>,
    pub results: Vec<RaceResult>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `{"events": [...], "athletes": [...], "results": [...]}` document
    pub fn from_json(json: &str) -> Result<Self, RaceGraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON snapshot from disk
    pub fn load(path: &Path) -> Result<Self, RaceGraphError> {
        let content = fs::read_to_string(path).map_err(|e| {
            RaceGraphError::new(ErrorCode::DataNotFound, e.to_string())
                .with_hint(format!("Check the data path {}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_athlete(mut self, athlete: Athlete) -> Self {
        self.athletes.push(athlete);
        self
    }

    pub fn with_result(mut self, result: RaceResult) -> Self {
        self.results.push(result);
        self
    }
}

impl DataSource for InMemorySource {
    fn list_events(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn list_athletes(&self) -> Vec<Athlete> {
        self.athletes.clone()
    }

    fn list_results(&self, filter: &ResultFilter) -> Vec<RaceResult> {
        self.results.iter().filter(|r| filter.matches(r)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_with_missing_fields() {
        let json = r#"{
            "events": [{"id": 1, "title": "5K Classic", "date": "2024-01-01", "event_types": ["5K"]}],
            "athletes": [{"id": 7, "given_name": "Ada"}],
            "results": [{"id": 3, "event_id": 1, "athlete_id": 7, "time_seconds": 1234}]
        }"#;

        let source = InMemorySource::from_json(json).unwrap();
        assert_eq!(source.list_events().len(), 1);
        assert_eq!(source.list_events()[0].location, None);
        assert_eq!(source.list_athletes()[0].clubs, Vec::<String>::new());
        assert_eq!(source.list_results(&ResultFilter::all())[0].time_seconds, Some(1234));
    }

    #[test]
    fn test_result_filter() {
        let source = InMemorySource::new()
            .with_result(RaceResult { id: 1, event_id: Some(1), athlete_id: Some(10), ..Default::default() })
            .with_result(RaceResult { id: 2, event_id: Some(2), athlete_id: Some(10), ..Default::default() })
            .with_result(RaceResult { id: 3, event_id: Some(2), athlete_id: Some(11), ..Default::default() });

        let by_event = source.list_results(&ResultFilter { event_id: Some(2), athlete_id: None });
        assert_eq!(by_event.len(), 2);

        let by_both = source.list_results(&ResultFilter { event_id: Some(2), athlete_id: Some(11) });
        assert_eq!(by_both.len(), 1);
        assert_eq!(by_both[0].id, 3);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = InMemorySource::from_json("{ not json").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }
}
