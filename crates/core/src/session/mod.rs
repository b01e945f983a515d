//! Session context: rule sets, documents and settings
//!
//! A [`Session`] owns every rule set in an arena addressed by [`RuleSetKey`].
//! Keys stay valid when a rule set's identifier changes. Rule sets may be
//! unloaded to free their entity names while keeping their configuration.

pub mod document;
pub mod store;

pub use document::*;
pub use store::*;

use crate::dictionary::index::EntityDictionary;
use crate::dictionary::ruleset::{
    derive_identifier, RuleSet, RuleSetConfig, RuleSetKey, STOPWORDS_SOURCE,
};
use crate::error::{Error, Result};
use crate::evaluation::{ErrorAnalysis, ErrorAnalyzer, EvaluationReport, Evaluator};
use crate::labeling::conll::RawFormat;
use crate::pipeline::{Annotation, LabelingPipeline, PipelineConfig};
use crate::settings::Settings;
use distner_utils::progress::ProgressSink;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Whether a rule set's entity names are in memory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Only the configuration is in memory
    Unloaded,

    /// Names and aliases are in memory
    Loaded,
}

#[derive(Debug)]
struct Slot {
    rule_set: RuleSet,
    state: LoadState,
}

/// Explicit context object for a labeling session
pub struct Session {
    settings: Settings,
    slots: Vec<Option<Slot>>,
    store: Option<RuleSetStore>,
    documents: BTreeMap<DocumentKind, Document>,
}

impl Session {
    /// Create an in-memory session
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            slots: Vec::new(),
            store: None,
            documents: BTreeMap::new(),
        }
    }

    /// Open a session backed by the store configured in `settings`.
    ///
    /// Stored rule sets are registered unloaded.
    pub fn open(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let store = RuleSetStore::open(&settings.store_dir, settings.store_format)?;

        let mut session = Self::new(settings);
        for identifier in store.list()? {
            let mut rule_set = store.load(&identifier)?;
            rule_set.clear_entries();
            session.slots.push(Some(Slot {
                rule_set,
                state: LoadState::Unloaded,
            }));
        }
        tracing::info!(
            rule_sets = session.slots.len(),
            dir = %store.dir().display(),
            "Opened session"
        );
        session.store = Some(store);
        Ok(session)
    }

    /// Session settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings. Documents must be re-parsed afterwards.
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let entity_tokenizer_changed = settings.tokenizer != self.settings.tokenizer
            || settings.tokenize_entity_names != self.settings.tokenize_entity_names;
        self.settings = settings;
        if entity_tokenizer_changed {
            for slot in self.slots.iter_mut().flatten() {
                slot.rule_set.invalidate_tokens();
            }
        }
        self.invalidate_annotations();
        Ok(())
    }

    /// Drop every document's annotation; its spans no longer reflect the
    /// rule sets
    fn invalidate_annotations(&mut self) {
        let cleared = self
            .documents
            .values_mut()
            .map(Document::clear_annotation)
            .filter(|&cleared| cleared)
            .count();
        if cleared > 0 {
            tracing::debug!(documents = cleared, "Invalidated annotations");
        }
    }

    /// Backing store, if any
    pub fn store(&self) -> Option<&RuleSetStore> {
        self.store.as_ref()
    }

    /// Register a new rule set. Its identifier is derived from language,
    /// label and source with the smallest unused counter.
    pub fn add_rule_set(&mut self, mut rule_set: RuleSet) -> Result<RuleSetKey> {
        if !rule_set.identifier().is_empty() {
            return Err(Error::Validation(format!(
                "rule set '{}' is already registered",
                rule_set.identifier()
            )));
        }
        let identifier =
            self.next_identifier(rule_set.language_code(), rule_set.label(), rule_set.source());
        rule_set.set_identifier(identifier);
        self.register(rule_set)
    }

    /// Register a rule set exported from another session, keeping its
    /// identifier unless it is missing or already taken
    pub fn import_rule_set(&mut self, mut rule_set: RuleSet) -> Result<RuleSetKey> {
        let identifier = rule_set.identifier();
        if identifier.is_empty() || self.lookup(identifier).is_some() {
            let identifier = self.next_identifier(
                rule_set.language_code(),
                rule_set.label(),
                rule_set.source(),
            );
            rule_set.set_identifier(identifier);
        }
        rule_set.invalidate_tokens();
        self.register(rule_set)
    }

    fn register(&mut self, rule_set: RuleSet) -> Result<RuleSetKey> {
        if let Some(store) = &self.store {
            store.save(&rule_set)?;
        }

        let key = RuleSetKey(self.slots.len());
        tracing::info!(
            rule_set = %rule_set.identifier(),
            names = rule_set.num_extracts(),
            "Added rule set"
        );
        self.slots.push(Some(Slot {
            rule_set,
            state: LoadState::Loaded,
        }));
        self.invalidate_annotations();
        Ok(key)
    }

    fn next_identifier(&self, language_code: &str, label: &str, source: &str) -> String {
        let used: HashSet<&str> = self
            .slots
            .iter()
            .flatten()
            .map(|slot| slot.rule_set.identifier())
            .collect();
        (1..)
            .map(|n| derive_identifier(language_code, label, source, n))
            .find(|candidate| !used.contains(candidate.as_str()))
            .unwrap_or_default()
    }

    fn slot(&self, key: RuleSetKey) -> Result<&Slot> {
        self.slots
            .get(key.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::NotFound(format!("rule set {key}")))
    }

    fn slot_mut(&mut self, key: RuleSetKey) -> Result<&mut Slot> {
        self.slots
            .get_mut(key.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::NotFound(format!("rule set {key}")))
    }

    /// Rule set by key
    pub fn rule_set(&self, key: RuleSetKey) -> Result<&RuleSet> {
        Ok(&self.slot(key)?.rule_set)
    }

    /// Load state of a rule set
    pub fn load_state(&self, key: RuleSetKey) -> Result<LoadState> {
        Ok(self.slot(key)?.state)
    }

    /// Key of the rule set with this identifier
    pub fn lookup(&self, identifier: &str) -> Option<RuleSetKey> {
        self.slots.iter().enumerate().find_map(|(i, slot)| {
            slot.as_ref()
                .filter(|slot| slot.rule_set.identifier() == identifier)
                .map(|_| RuleSetKey(i))
        })
    }

    /// All rule sets, sorted by identifier
    pub fn rule_sets(&self) -> Vec<(RuleSetKey, &RuleSet, LoadState)> {
        let mut all: Vec<_> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref()
                    .map(|slot| (RuleSetKey(i), &slot.rule_set, slot.state))
            })
            .collect();
        all.sort_by(|a, b| a.1.identifier().cmp(b.1.identifier()));
        all
    }

    /// Change the label of a rule set, re-deriving its identifier and
    /// renaming its stored file
    pub fn set_label(&mut self, key: RuleSetKey, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        let (old, language_code, source) = {
            let rule_set = &self.slot(key)?.rule_set;
            if rule_set.label() == label {
                return Ok(());
            }
            (
                rule_set.identifier().to_string(),
                rule_set.language_code().to_string(),
                rule_set.source().to_string(),
            )
        };

        // Stopword identifiers carry no label.
        let new = if source == STOPWORDS_SOURCE {
            old.clone()
        } else {
            self.next_identifier(&language_code, &label, &source)
        };
        if new != old {
            if let Some(store) = &self.store {
                store.rename(&old, &new)?;
            }
        }

        let slot = self.slot_mut(key)?;
        slot.rule_set.set_label(label);
        slot.rule_set.set_identifier(new.clone());
        tracing::info!(from = %old, to = %new, "Relabeled rule set");
        self.invalidate_annotations();
        self.persist(key)
    }

    /// Change the configuration of a rule set
    pub fn configure(
        &mut self,
        key: RuleSetKey,
        update: impl FnOnce(&mut RuleSetConfig),
    ) -> Result<()> {
        self.slot_mut(key)?.rule_set.update_config(update);
        self.invalidate_annotations();
        self.persist(key)
    }

    /// Apply arbitrary changes to a loaded rule set, e.g. add names
    pub fn update_rule_set(
        &mut self,
        key: RuleSetKey,
        update: impl FnOnce(&mut RuleSet),
    ) -> Result<()> {
        let slot = self.slot_mut(key)?;
        if slot.state != LoadState::Loaded {
            return Err(Error::Validation(format!(
                "rule set '{}' is not loaded",
                slot.rule_set.identifier()
            )));
        }
        update(&mut slot.rule_set);
        self.invalidate_annotations();
        self.persist(key)
    }

    fn persist(&self, key: RuleSetKey) -> Result<()> {
        let slot = self.slot(key)?;
        match (&self.store, slot.state) {
            (Some(store), LoadState::Loaded) => store.save(&slot.rule_set),
            (Some(store), LoadState::Unloaded) => {
                // Names live only in the stored file.
                let mut full = slot.rule_set.clone();
                full.take_entries(store.read(slot.rule_set.identifier())?);
                store.save(&full)
            }
            (None, _) => Ok(()),
        }
    }

    /// Read a rule set's names from the store
    pub fn load(&mut self, key: RuleSetKey) -> Result<()> {
        let identifier = {
            let slot = self.slot(key)?;
            if slot.state == LoadState::Loaded {
                return Ok(());
            }
            slot.rule_set.identifier().to_string()
        };
        let store = self.store.as_ref().ok_or_else(|| {
            Error::Configuration("session has no rule set store to load from".to_string())
        })?;
        let stored = store.load(&identifier)?;

        let slot = self.slot_mut(key)?;
        slot.rule_set.take_entries(stored);
        slot.state = LoadState::Loaded;
        tracing::info!(rule_set = %identifier, names = slot.rule_set.num_extracts(), "Loaded rule set");
        self.invalidate_annotations();
        Ok(())
    }

    /// Drop a rule set's names from memory. Requires a store so the names
    /// can be loaded again.
    pub fn unload(&mut self, key: RuleSetKey) -> Result<()> {
        if self.store.is_none() {
            return Err(Error::Configuration(
                "session has no rule set store; unloading would lose the names".to_string(),
            ));
        }
        let slot = self.slot_mut(key)?;
        slot.rule_set.clear_entries();
        slot.state = LoadState::Unloaded;
        self.invalidate_annotations();
        Ok(())
    }

    /// Remove a rule set from the session and the store
    pub fn remove_rule_set(&mut self, key: RuleSetKey) -> Result<RuleSet> {
        let slot = self
            .slots
            .get_mut(key.0)
            .and_then(Option::take)
            .ok_or_else(|| Error::NotFound(format!("rule set {key}")))?;
        self.invalidate_annotations();
        if let Some(store) = &self.store {
            store.remove(slot.rule_set.identifier())?;
        }
        Ok(slot.rule_set)
    }

    /// Prepare every active, loaded rule set and index its names.
    ///
    /// Rule sets are tokenized in parallel; entries keep rule set order.
    pub fn build_dictionary(&mut self) -> Result<EntityDictionary> {
        let tokenizer = self.settings.entity_name_tokenizer();
        let tokenizer = tokenizer.as_ref();

        let mut participating: Vec<(RuleSetKey, &mut RuleSet)> = self
            .slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|slot| (RuleSetKey(i), slot)))
            .filter(|(_, slot)| slot.state == LoadState::Loaded && slot.rule_set.is_active())
            .map(|(key, slot)| (key, &mut slot.rule_set))
            .collect();

        participating
            .par_iter_mut()
            .try_for_each(|(_, rule_set)| rule_set.prepare(tokenizer))?;

        let mut prepared: Vec<(RuleSetKey, &RuleSet)> = participating
            .into_iter()
            .map(|(key, rule_set)| (key, &*rule_set))
            .collect();
        prepared.sort_by(|a, b| a.1.identifier().cmp(b.1.identifier()));

        EntityDictionary::from_rule_sets(&prepared, &self.settings.fuzzy_thresholds)
    }

    /// Parse and store a document, replacing one of the same kind
    pub fn load_document(
        &mut self,
        kind: DocumentKind,
        raw_text: impl Into<String>,
        raw_format: RawFormat,
    ) -> Result<&Document> {
        let tokenizer = self.settings.document_tokenizer();
        let options = DocumentOptions {
            remove_diacritics: self.settings.remove_diacritics,
            lemmatize: self.settings.lemmatize,
        };
        let document = Document::parse(kind, raw_text, raw_format, tokenizer.as_ref(), options)?;
        Ok(self.set_document(document))
    }

    /// Store a document, replacing one of the same kind
    pub fn set_document(&mut self, document: Document) -> &Document {
        let kind = document.kind();
        self.documents.insert(kind, document);
        &self.documents[&kind]
    }

    /// Document of a kind
    pub fn document(&self, kind: DocumentKind) -> Option<&Document> {
        self.documents.get(&kind)
    }

    fn require_document(&self, kind: DocumentKind) -> Result<&Document> {
        self.document(kind)
            .ok_or_else(|| Error::NotFound(format!("no {kind} document")))
    }

    fn require_document_mut(&mut self, kind: DocumentKind) -> Result<&mut Document> {
        self.documents
            .get_mut(&kind)
            .ok_or_else(|| Error::NotFound(format!("no {kind} document")))
    }

    /// Label a document with the active rule sets
    pub fn annotate(
        &mut self,
        kind: DocumentKind,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<&Annotation> {
        self.require_document(kind)?;
        let dictionary = Arc::new(self.build_dictionary()?);
        let pipeline = LabelingPipeline::new(PipelineConfig::from_settings(&self.settings));

        let document = self.require_document(kind)?;
        let annotation = match progress {
            Some(sink) => pipeline.run_with_progress(document.tokens(), &dictionary, sink)?,
            None => pipeline.run(document.tokens(), &dictionary)?,
        };

        let document = self.require_document_mut(kind)?;
        document.set_annotation(annotation, dictionary);
        document
            .annotation()
            .ok_or_else(|| Error::Invariant("annotation was not stored".to_string()))
    }

    /// Manually correct the predicted tag of one token
    pub fn change_label(
        &mut self,
        kind: DocumentKind,
        index: usize,
        label: impl Into<String>,
    ) -> Result<()> {
        self.require_document_mut(kind)?
            .set_predicted_label(index, label)
    }

    /// Manually retag every occurrence of the token at `index` that carries
    /// the same predicted tag. Returns the number of changed tokens.
    pub fn change_all_labels(
        &mut self,
        kind: DocumentKind,
        index: usize,
        label: impl Into<String>,
    ) -> Result<usize> {
        let label = label.into();
        let changed = self
            .require_document_mut(kind)?
            .relabel_token_occurrences(index, label.as_str())?;
        tracing::info!(document = %kind, index, label = %label, changed, "Relabeled token occurrences");
        Ok(changed)
    }

    fn labeled_pair(&self, kind: DocumentKind) -> Result<(&Document, &[String], &[String])> {
        let document = self.require_document(kind)?;
        let gold = document
            .gold()
            .ok_or_else(|| Error::Validation(format!("the {kind} document has no gold labels")))?;
        let predicted = document.predicted().ok_or_else(|| {
            Error::Validation(format!("the {kind} document has not been annotated yet"))
        })?;
        Ok((document, gold, predicted))
    }

    /// Score the latest annotation of a document against its gold labels
    pub fn evaluate(&self, kind: DocumentKind) -> Result<EvaluationReport> {
        let (_, gold, predicted) = self.labeled_pair(kind)?;
        Evaluator::new(self.settings.outside_label.clone()).evaluate(gold, predicted)
    }

    /// Most common errors of the latest annotation of a document
    pub fn analyze_errors(&self, kind: DocumentKind, top_n: usize) -> Result<ErrorAnalysis> {
        let (document, gold, predicted) = self.labeled_pair(kind)?;
        ErrorAnalyzer::new(self.settings.outside_label.clone()).analyze(
            document.tokens(),
            predicted,
            gold,
            top_n,
        )
    }
}
