//! On-disk persistence of rule sets, one file per rule set

use crate::dictionary::ruleset::RuleSet;
use crate::error::{Error, Result};
use distner_utils::io::{
    ensure_dir, format_bytes, get_extension, list_files_with_prefix, write_atomic,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "rule_set_";

/// Serialization format of stored rule sets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFormat {
    /// Pretty-printed JSON
    #[default]
    Json,

    /// bincode, compact and fast to load
    Binary,
}

impl StoreFormat {
    /// File extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "bin",
        }
    }

    fn encode(self, rule_set: &RuleSet) -> Result<Vec<u8>> {
        match self {
            Self::Json => Ok(serde_json::to_vec_pretty(rule_set)?),
            Self::Binary => Ok(bincode::serde::encode_to_vec(
                rule_set,
                bincode::config::standard(),
            )?),
        }
    }

    fn decode(self, data: &[u8]) -> Result<RuleSet> {
        match self {
            Self::Json => Ok(serde_json::from_slice(data)?),
            Self::Binary => {
                Ok(bincode::serde::decode_from_slice(data, bincode::config::standard())?.0)
            }
        }
    }
}

/// Directory of persisted rule sets, named `rule_set_<identifier>.<ext>`
#[derive(Clone, Debug)]
pub struct RuleSetStore {
    dir: PathBuf,
    format: StoreFormat,
}

impl RuleSetStore {
    /// Open a store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>, format: StoreFormat) -> Result<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self { dir, format })
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store format
    pub fn format(&self) -> StoreFormat {
        self.format
    }

    /// File holding the rule set with this identifier
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{identifier}.{}", self.format.extension()))
    }

    /// Whether a rule set with this identifier is stored
    pub fn contains(&self, identifier: &str) -> bool {
        self.path_for(identifier).is_file()
    }

    /// Write a rule set, replacing any previous version
    pub fn save(&self, rule_set: &RuleSet) -> Result<()> {
        if rule_set.identifier().is_empty() {
            return Err(Error::Validation(
                "cannot store a rule set without identifier".to_string(),
            ));
        }
        let path = self.path_for(rule_set.identifier());
        let data = self.format.encode(rule_set)?;
        write_atomic(&path, &data)?;

        tracing::debug!(
            rule_set = %rule_set.identifier(),
            path = %path.display(),
            size = %format_bytes(data.len() as u64),
            "Saved rule set"
        );
        Ok(())
    }

    /// Read a rule set
    pub fn load(&self, identifier: &str) -> Result<RuleSet> {
        let rule_set = self.read(identifier)?;
        if rule_set.identifier() != identifier {
            let path = self.path_for(identifier);
            return Err(Error::Format(format!(
                "{} holds rule set '{}'",
                path.display(),
                rule_set.identifier()
            )));
        }
        tracing::debug!(rule_set = %identifier, "Loaded rule set");
        Ok(rule_set)
    }

    /// Read the file stored under `identifier` without checking the
    /// identifier recorded inside; a renamed file still holds the old one
    pub(crate) fn read(&self, identifier: &str) -> Result<RuleSet> {
        let path = self.path_for(identifier);
        if !path.is_file() {
            return Err(Error::NotFound(format!(
                "no stored rule set '{identifier}' in {}",
                self.dir.display()
            )));
        }
        let data = std::fs::read(&path)?;
        self.format.decode(&data)
    }

    /// Identifiers of all stored rule sets, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let extension = self.format.extension();
        let identifiers = list_files_with_prefix(&self.dir, FILE_PREFIX)?
            .into_iter()
            .filter(|path| get_extension(path).as_deref() == Some(extension))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.strip_prefix(FILE_PREFIX))
                    .map(str::to_string)
            })
            .collect();
        Ok(identifiers)
    }

    /// Move a stored rule set to a new identifier
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let from = self.path_for(old);
        if !from.is_file() {
            return Err(Error::NotFound(format!("no stored rule set '{old}'")));
        }
        let to = self.path_for(new);
        if to.exists() {
            return Err(Error::Validation(format!("rule set '{new}' is already stored")));
        }
        std::fs::rename(&from, &to)?;
        tracing::debug!(from = %old, to = %new, "Renamed stored rule set");
        Ok(())
    }

    /// Delete a stored rule set. Missing files are not an error.
    pub fn remove(&self, identifier: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(identifier)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
