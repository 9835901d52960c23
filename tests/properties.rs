//! End-to-end behaviour of mapping, querying and serialization

use std::collections::HashMap;

use racegraph::format::reader::{read_ntriples, read_turtle};
use racegraph::format::{ntriples, turtle};
use racegraph::term::iri::ns;
use racegraph::{
    execute_sparql, serialize, Athlete, Binding, Event, InMemorySource, Iri, Mapper, NamespaceTable, Pipeline,
    QueryResult, RaceGraphConfig, RaceResult, RdfFormat, ResultsFormat, Term, Triple, TripleStore,
};

const BASE: &str = "https://races.example.org/";

fn events() -> InMemorySource {
    InMemorySource::new()
        .with_event(Event {
            id: 1,
            title: Some("5K Classic".into()),
            date: Some("2024-01-01".into()),
            distance_km: Some(5.0),
            event_types: vec!["Road".into()],
            ..Default::default()
        })
        .with_event(Event { id: 2, title: Some("10K Run".into()), date: Some("2023-06-01".into()), ..Default::default() })
}

fn full_source() -> InMemorySource {
    events()
        .with_athlete(Athlete {
            id: 7,
            given_name: Some("Ada".into()),
            family_name: Some("Runner".into()),
            birth_year: Some(1990),
            clubs: vec!["Harbour Harriers".into()],
            ..Default::default()
        })
        .with_result(RaceResult {
            id: 70,
            event_id: Some(1),
            athlete_id: Some(7),
            time_seconds: Some(1234),
            place: Some(3),
            bib: Some("A-17".into()),
            ..Default::default()
        })
}

fn solutions(result: QueryResult) -> Vec<Binding> {
    match result {
        QueryResult::Solutions { bindings, .. } => bindings,
        other => panic!("expected solutions, got {}", other.kind()),
    }
}

fn counts(triples: Vec<Triple>) -> HashMap<Triple, usize> {
    let mut map = HashMap::new();
    for triple in triples {
        *map.entry(triple).or_insert(0) += 1;
    }
    map
}

#[test]
fn type_pattern_finds_each_entity_once() {
    let mapper = Mapper::new(BASE);
    let source = full_source();

    let cases: Vec<(Vec<Triple>, Vec<Iri>, Iri)> = vec![
        (
            mapper.map_event(&source.events[0]),
            vec![ns::schema("Event"), ns::schema("SportsEvent")],
            mapper.entity_iri("events", 1),
        ),
        (mapper.map_athlete(&source.athletes[0]), vec![ns::schema("Person")], mapper.entity_iri("athletes", 7)),
        (mapper.map_result(&source.results[0]), vec![ns::race("RaceResult")], mapper.entity_iri("results", 70)),
    ];

    for (triples, types, expected) in cases {
        let mut store = TripleStore::new();
        store.add_all(triples);
        for ty in types {
            let query = format!("SELECT ?s WHERE {{ ?s a <{}> }}", ty.as_str());
            let bindings = solutions(execute_sparql(&store, &query).unwrap());
            assert_eq!(bindings.len(), 1, "{}", query);
            assert_eq!(bindings[0]["s"], Term::Iri(expected.clone()));
        }
    }
}

#[test]
fn turtle_and_ntriples_recover_the_same_triples() {
    let mapper = Mapper::new(BASE);
    let store = TripleStore::from_source(&full_source(), &mapper);
    let namespaces = NamespaceTable::well_known().with_base(BASE);

    let from_turtle = read_turtle(&turtle::serialize(store.triples(), &namespaces).unwrap()).unwrap();
    let from_ntriples = read_ntriples(&ntriples::serialize(store.triples()).unwrap()).unwrap();

    assert_eq!(counts(from_turtle), counts(from_ntriples.clone()));
    assert_eq!(counts(from_ntriples), counts(store.triples().to_vec()));
}

#[test]
fn optional_leaves_missing_values_unbound() {
    let mut store = TripleStore::new();
    store.add(Triple::new(Iri::new("http://example.org/e1"), ns::rdf_type(), ns::schema("Event")));

    let bindings = solutions(
        execute_sparql(&store, "SELECT ?s ?d WHERE { ?s a schema:Event . OPTIONAL { ?s schema:startDate ?d } }")
            .unwrap(),
    );

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0]["s"], Term::iri("http://example.org/e1"));
    assert!(!bindings[0].contains_key("d"));
}

#[test]
fn filter_on_unbound_variable_excludes_the_row() {
    let store = TripleStore::from_source(&events().with_event(Event { id: 3, ..Default::default() }), &Mapper::new(BASE));

    let bindings = solutions(
        execute_sparql(
            &store,
            r#"SELECT ?e WHERE { ?e a schema:Event . OPTIONAL { ?e schema:startDate ?d } FILTER(?d != "none") }"#,
        )
        .unwrap(),
    );
    assert_eq!(bindings.len(), 2);
    assert!(bindings.iter().all(|b| b["e"] != Term::iri(format!("{}events/3", BASE))));

    let never_bound = execute_sparql(&store, r#"SELECT ?e WHERE { ?e a schema:Event FILTER(?nope = "x") }"#).unwrap();
    assert!(never_bound.is_empty());
}

#[test]
fn modifiers_apply_distinct_order_offset_limit() {
    let mut store = TripleStore::new();
    for (i, name) in ["b", "a", "c", "a", "d"].iter().enumerate() {
        store.add(Triple::new(Iri::new(format!("http://example.org/s{}", i)), ns::schema("name"), Term::literal(*name)));
    }

    let bindings = solutions(
        execute_sparql(&store, "SELECT DISTINCT ?n WHERE { ?s schema:name ?n } ORDER BY ?n OFFSET 1 LIMIT 2").unwrap(),
    );
    let names: Vec<&str> = bindings.iter().map(|b| b["n"].string_value()).collect();
    assert_eq!(names, vec!["b", "c"]);
}

#[test]
fn ask_matches_select_emptiness() {
    let store = TripleStore::from_source(&full_source(), &Mapper::new(BASE));
    let wheres = [
        "{ ?e a schema:SportsEvent }",
        "{ ?r race:athlete ?a . ?a schema:name \"Ada Runner\" }",
        "{ ?e schema:name \"Marathon\" }",
        "{ ?e a schema:Person ; race:place ?p }",
    ];

    for clause in wheres {
        let select = execute_sparql(&store, &format!("SELECT * WHERE {}", clause)).unwrap();
        let ask = execute_sparql(&store, &format!("ASK {}", clause)).unwrap();
        assert_eq!(ask, QueryResult::Boolean(!select.is_empty()), "{}", clause);
    }
}

#[test]
fn latest_event_end_to_end() {
    let query = "SELECT ?name ?date WHERE { ?e a schema:SportsEvent ; schema:name ?name . \
                 OPTIONAL { ?e schema:startDate ?date } } ORDER BY DESC(?date) LIMIT 1";

    let store = TripleStore::from_source(&events(), &Mapper::new(BASE));
    let bindings = solutions(execute_sparql(&store, query).unwrap());
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0]["name"].string_value(), "5K Classic");
    assert_eq!(bindings[0]["date"].string_value(), "2024-01-01");

    let source = events();
    let config = RaceGraphConfig::new();
    let json = Pipeline::new(&source, &config).run(query, ResultsFormat::Json, RdfFormat::Turtle).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&json.body).unwrap();
    assert_eq!(doc["head"]["vars"], serde_json::json!(["name", "date"]));
    assert_eq!(doc["results"]["bindings"].as_array().unwrap().len(), 1);
    assert_eq!(doc["results"]["bindings"][0]["name"]["value"], "5K Classic");
    assert_eq!(doc["results"]["bindings"][0]["date"]["value"], "2024-01-01");
}

#[test]
fn schema_name_compacts_and_expands() {
    let triples = vec![Triple::new(Iri::new("http://example.org/e1"), ns::schema("name"), Term::literal("5K Classic"))];
    let namespaces = NamespaceTable::well_known();

    let ttl = serialize(&triples, RdfFormat::Turtle, &namespaces).unwrap();
    assert!(ttl.contains("schema:name \"5K Classic\""));

    let jsonld = serialize(&triples, RdfFormat::JsonLd, &namespaces).unwrap();
    assert!(jsonld.contains("\"schema:name\""));

    let nt = serialize(&triples, RdfFormat::NTriples, &namespaces).unwrap();
    assert!(nt.contains("<http://schema.org/name>"));

    assert_eq!(read_turtle(&ttl).unwrap(), triples);
    assert_eq!(read_ntriples(&nt).unwrap(), triples);
}
