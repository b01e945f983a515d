//! Labeling pipeline: match, resolve, encode
//!
//! ```text
//! tokens ──► Matcher ──► candidates ──► ConflictResolver ──► resolved ──► LabelEncoder ──► tags
//! ```

use crate::dictionary::index::EntityDictionary;
use crate::error::Result;
use crate::labeling::encoder::{LabelEncoder, LabelScheme, OUTSIDE_LABEL};
use crate::matching::casing::FuzzyThresholds;
use crate::matching::matcher::{CandidateSpan, Matcher, DEFAULT_PROGRESS_INTERVAL};
use crate::matching::resolver::{ConflictResolver, SelectionCriterion};
use crate::settings::Settings;
use distner_utils::progress::ProgressSink;
use serde::{Deserialize, Serialize};

/// Configuration for the labeling pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Scheme of the produced tags
    pub label_scheme: LabelScheme,

    /// Tag of tokens outside any entity
    pub outside_label: String,

    /// Thresholds for fuzzy matching
    pub fuzzy_thresholds: FuzzyThresholds,

    /// Tokens between two progress updates
    pub progress_interval: usize,

    /// Conflict resolution criteria, in order
    pub selection_criteria: Vec<SelectionCriterion>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label_scheme: LabelScheme::Bio2,
            outside_label: OUTSIDE_LABEL.to_string(),
            fuzzy_thresholds: FuzzyThresholds::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            selection_criteria: ConflictResolver::default().criteria().to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Create default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive from session settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            label_scheme: settings.label_scheme,
            outside_label: settings.outside_label.clone(),
            fuzzy_thresholds: settings.fuzzy_thresholds,
            progress_interval: settings.progress_interval,
            ..Self::default()
        }
    }

    /// Set tag scheme
    pub fn with_label_scheme(mut self, scheme: LabelScheme) -> Self {
        self.label_scheme = scheme;
        self
    }

    /// Set outside tag
    pub fn with_outside_label(mut self, outside: impl Into<String>) -> Self {
        self.outside_label = outside.into();
        self
    }

    /// Set fuzzy thresholds
    pub fn with_fuzzy_thresholds(mut self, thresholds: FuzzyThresholds) -> Self {
        self.fuzzy_thresholds = thresholds;
        self
    }

    /// Set progress interval
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set conflict resolution criteria
    pub fn with_selection_criteria(mut self, criteria: Vec<SelectionCriterion>) -> Self {
        self.selection_criteria = criteria;
        self
    }
}

/// Result of labeling one token sequence.
///
/// Spans refer to entries of the dictionary the annotation was produced
/// with; views must be built against that same dictionary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotation {
    /// One tag per token
    pub tags: Vec<String>,

    /// Every dictionary occurrence, overlapping
    pub candidates: Vec<CandidateSpan>,

    /// Non-overlapping selection of `candidates`
    pub resolved: Vec<CandidateSpan>,
}

/// Serializable description of a span
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    /// First covered token
    pub start: usize,

    /// One past the last covered token
    pub end: usize,

    /// Matched entity name
    pub name: String,

    /// Label of the rule set
    pub label: String,

    /// Knowledge-base entity
    pub entity_id: String,

    /// Rule set identifier
    pub rule_set_id: String,
}

impl MatchView {
    /// Describe a span
    pub fn new(span: &CandidateSpan, dictionary: &EntityDictionary) -> Self {
        let entry = dictionary.entry(span.entry);
        let profile = dictionary.profile_of(span.entry);
        Self {
            start: span.start,
            end: span.end,
            name: entry.name.clone(),
            label: profile.label.clone(),
            entity_id: entry.entity.to_string(),
            rule_set_id: profile.identifier.clone(),
        }
    }
}

/// Matches covering one token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMatchView {
    /// The token
    pub token: String,

    /// Resolved match covering the token
    pub chosen: Option<MatchView>,

    /// Other candidates covering the token
    pub alternatives: Vec<MatchView>,
}

impl Annotation {
    /// Views of the resolved spans
    pub fn resolved_views(&self, dictionary: &EntityDictionary) -> Vec<MatchView> {
        self.resolved
            .iter()
            .map(|span| MatchView::new(span, dictionary))
            .collect()
    }

    /// Views of all candidate spans
    pub fn candidate_views(&self, dictionary: &EntityDictionary) -> Vec<MatchView> {
        self.candidates
            .iter()
            .map(|span| MatchView::new(span, dictionary))
            .collect()
    }

    /// Per token: the chosen match and the unchosen alternatives covering it
    pub fn token_matches(
        &self,
        tokens: &[String],
        dictionary: &EntityDictionary,
    ) -> Vec<TokenMatchView> {
        tokens
            .iter()
            .enumerate()
            .map(|(position, token)| {
                let chosen = self.resolved.iter().find(|span| span.contains(position));
                let alternatives = self
                    .candidates
                    .iter()
                    .filter(|span| span.contains(position) && Some(*span) != chosen)
                    .map(|span| MatchView::new(span, dictionary))
                    .collect();
                TokenMatchView {
                    token: token.clone(),
                    chosen: chosen.map(|span| MatchView::new(span, dictionary)),
                    alternatives,
                }
            })
            .collect()
    }
}

/// Runs matching, conflict resolution and encoding against one dictionary
pub struct LabelingPipeline {
    config: PipelineConfig,
    resolver: ConflictResolver,
    encoder: LabelEncoder,
}

impl Default for LabelingPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl LabelingPipeline {
    /// Create a new pipeline
    pub fn new(config: PipelineConfig) -> Self {
        let resolver = ConflictResolver::new().with_criteria(config.selection_criteria.clone());
        let encoder =
            LabelEncoder::new(config.label_scheme).with_outside_label(config.outside_label.clone());
        Self {
            config,
            resolver,
            encoder,
        }
    }

    /// Get pipeline config
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Label a token sequence
    pub fn run(&self, tokens: &[String], dictionary: &EntityDictionary) -> Result<Annotation> {
        self.run_inner(tokens, dictionary, None)
    }

    /// Label a token sequence, reporting matching progress to `sink`
    pub fn run_with_progress(
        &self,
        tokens: &[String],
        dictionary: &EntityDictionary,
        sink: &dyn ProgressSink,
    ) -> Result<Annotation> {
        self.run_inner(tokens, dictionary, Some(sink))
    }

    fn run_inner(
        &self,
        tokens: &[String],
        dictionary: &EntityDictionary,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<Annotation> {
        let matcher = Matcher::new(dictionary)
            .with_thresholds(self.config.fuzzy_thresholds)
            .with_progress_interval(self.config.progress_interval);
        let candidates = match sink {
            Some(sink) => matcher.find_matches_with_progress(tokens, sink),
            None => matcher.find_matches(tokens),
        };

        let resolved = self.resolver.resolve(candidates.clone(), dictionary);
        let tags = self
            .encoder
            .encode_candidates(tokens.len(), &resolved, dictionary)?;

        tracing::info!(
            tokens = tokens.len(),
            candidates = candidates.len(),
            resolved = resolved.len(),
            "Labeled token sequence"
        );

        Ok(Annotation {
            tags,
            candidates,
            resolved,
        })
    }
}
