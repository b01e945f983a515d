//! Integration tests for sessions, rule set persistence and end-to-end labeling

#[path = "../common/mod.rs"]
mod common;

use common::city_rule_set;
use distner_core::{
    DocumentKind, Error, LabelScheme, LoadState, RawFormat, RuleSet, Session, Settings,
    StoreFormat,
};

fn stored_settings(dir: &std::path::Path, format: StoreFormat) -> Settings {
    Settings::new().with_store(dir, format)
}

#[test]
fn test_rule_sets_survive_reopening() {
    for format in [StoreFormat::Json, StoreFormat::Binary] {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut session = Session::open(stored_settings(dir.path(), format)).unwrap();
            let key = session.add_rule_set(city_rule_set()).unwrap();
            session.set_label(key, "GPE").unwrap();
            assert_eq!(
                session.store().unwrap().list().unwrap(),
                vec!["en-GPE-P31-1"]
            );
        }

        let mut session = Session::open(stored_settings(dir.path(), format)).unwrap();
        let listed = session.rule_sets();
        assert_eq!(listed.len(), 1);
        let (key, rule_set, state) = listed[0];
        assert_eq!(rule_set.identifier(), "en-GPE-P31-1");
        assert_eq!(rule_set.label(), "GPE");
        assert_eq!(rule_set.num_extracts(), 0);
        assert_eq!(state, LoadState::Unloaded);

        session.load(key).unwrap();
        assert_eq!(session.load_state(key).unwrap(), LoadState::Loaded);
        assert_eq!(session.rule_set(key).unwrap().num_extracts(), 2);
        assert_eq!(session.rule_set(key).unwrap().aliases().len(), 1);
    }
}

#[test]
fn test_configuring_unloaded_rule_set_keeps_names() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::open(stored_settings(dir.path(), StoreFormat::Json)).unwrap();
    let key = session.add_rule_set(city_rule_set()).unwrap();

    session.unload(key).unwrap();
    session.configure(key, |config| config.priority = 3).unwrap();
    session.set_label(key, "GPE").unwrap();

    session.load(key).unwrap();
    let rule_set = session.rule_set(key).unwrap();
    assert_eq!(rule_set.identifier(), "en-GPE-P31-1");
    assert_eq!(rule_set.config().priority, 3);
    assert_eq!(rule_set.num_extracts(), 2);
}

#[test]
fn test_unloaded_rule_sets_do_not_match() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::open(stored_settings(dir.path(), StoreFormat::Json)).unwrap();
    let cities = session.add_rule_set(city_rule_set()).unwrap();
    session
        .add_rule_set(RuleSet::manual_list("en", "ORG", "Acme"))
        .unwrap();
    session.unload(cities).unwrap();

    session
        .load_document(DocumentKind::UnlabeledInput, "Acme moved to New York", RawFormat::SimpleText)
        .unwrap();
    let annotation = session.annotate(DocumentKind::UnlabeledInput, None).unwrap();
    assert_eq!(annotation.tags, vec!["B-ORG", "O", "O", "O", "O"]);
}

#[test]
fn test_loading_and_unloading_relabel_from_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::open(stored_settings(dir.path(), StoreFormat::Json)).unwrap();
    let cities = session.add_rule_set(city_rule_set()).unwrap();
    session
        .add_rule_set(RuleSet::manual_list("en", "ORG", "Acme"))
        .unwrap();
    session
        .load_document(DocumentKind::UnlabeledInput, "Acme moved to NYC", RawFormat::SimpleText)
        .unwrap();
    session.annotate(DocumentKind::UnlabeledInput, None).unwrap();
    let labeled = |session: &Session| {
        session
            .document(DocumentKind::UnlabeledInput)
            .unwrap()
            .predicted()
            .map(<[String]>::to_vec)
    };
    assert_eq!(
        labeled(&session).unwrap(),
        vec!["B-ORG", "O", "O", "O"]
    );

    session.unload(cities).unwrap();
    assert!(labeled(&session).is_none());

    session.annotate(DocumentKind::UnlabeledInput, None).unwrap();
    session.load(cities).unwrap();
    assert!(labeled(&session).is_none());
}

#[test]
fn test_removed_rule_set_leaves_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::open(stored_settings(dir.path(), StoreFormat::Json)).unwrap();
    let key = session.add_rule_set(city_rule_set()).unwrap();
    let removed = session.remove_rule_set(key).unwrap();
    assert_eq!(removed.identifier(), "en-LOC-P31-1");
    assert!(session.store().unwrap().list().unwrap().is_empty());
    assert!(matches!(session.load(key), Err(Error::NotFound(_))));
}

#[test]
fn test_partial_overlap_resolved_by_priority() {
    let mut session = Session::new(Settings::default());
    session.add_rule_set(RuleSet::manual_list("en", "LOC", "New York")).unwrap();
    let org = session
        .add_rule_set(RuleSet::manual_list("en", "ORG", "visited New"))
        .unwrap();
    session.configure(org, |config| config.priority = 10).unwrap();

    session
        .load_document(
            DocumentKind::UnlabeledInput,
            "I visited New York City",
            RawFormat::SimpleText,
        )
        .unwrap();
    let annotation = session.annotate(DocumentKind::UnlabeledInput, None).unwrap();
    assert_eq!(annotation.tags, vec!["O", "B-ORG", "I-ORG", "O", "O"]);
    assert_eq!(annotation.candidates.len(), 2);
}

#[test]
fn test_stopwords_suppress_entity_names() {
    let mut session = Session::new(Settings::default());
    session
        .add_rule_set(RuleSet::manual_list("en", "LOC", "Nice\nParis"))
        .unwrap();
    session
        .add_rule_set(RuleSet::stopwords("en", "Nice\nthe"))
        .unwrap();

    session
        .load_document(
            DocumentKind::UnlabeledInput,
            "Nice weather in Paris",
            RawFormat::SimpleText,
        )
        .unwrap();
    let annotation = session.annotate(DocumentKind::UnlabeledInput, None).unwrap();
    assert_eq!(annotation.tags, vec!["O", "O", "O", "B-LOC"]);
}

#[test]
fn test_aliases_and_io_scheme() {
    let mut session = Session::new(Settings::new().with_label_scheme(LabelScheme::Io));
    let key = session.add_rule_set(city_rule_set()).unwrap();
    let doc = "Flights to NYC and New York";

    session
        .load_document(DocumentKind::UnlabeledInput, doc, RawFormat::SimpleText)
        .unwrap();
    let tags = session
        .annotate(DocumentKind::UnlabeledInput, None)
        .unwrap()
        .tags
        .clone();
    assert_eq!(tags, vec!["O", "O", "O", "O", "LOC", "LOC"]);

    session.configure(key, |config| config.use_aliases = true).unwrap();
    let tags = session
        .annotate(DocumentKind::UnlabeledInput, None)
        .unwrap()
        .tags
        .clone();
    assert_eq!(tags, vec!["O", "O", "LOC", "O", "LOC", "LOC"]);
}

#[test]
fn test_development_document_evaluation() {
    let mut session = Session::new(Settings::default());
    session.add_rule_set(city_rule_set()).unwrap();
    session
        .load_document(
            DocumentKind::Development,
            "Paris B-LOC\nand O\nYork B-LOC\nor O\nYork B-ORG\n",
            RawFormat::ConllSpace,
        )
        .unwrap();
    session.annotate(DocumentKind::Development, None).unwrap();

    let report = session.evaluate(DocumentKind::Development).unwrap();
    assert_eq!(report.overall.gold, 3);
    assert_eq!(report.overall.predicted, 2);
    assert_eq!(report.overall.correct, 1);

    let errors = session.analyze_errors(DocumentKind::Development, 10).unwrap();
    assert_eq!(errors.recall_errors.len(), 1);
    assert_eq!(errors.recall_errors[0].token, "Paris");
    assert_eq!(errors.recall_errors[0].gold, "LOC");
    assert_eq!(errors.precision_errors.len(), 1);
    assert_eq!(errors.precision_errors[0].predicted, "LOC");
    assert_eq!(errors.precision_errors[0].gold, "ORG");
}
