use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SeqvaultError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessionId(String);

impl AccessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccessionId {
    type Err = SeqvaultError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| !ch.is_whitespace() && !ch.is_control() && ch != ',');
        if !is_valid {
            return Err(SeqvaultError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

impl TryFrom<String> for AccessionId {
    type Error = SeqvaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccessionId> for String {
    fn from(value: AccessionId) -> Self {
        value.0
    }
}

/// One protein sequence keyed by its accession.
///
/// An empty `sequence` marks a placeholder that has not been resolved yet and
/// is treated exactly like a missing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub accession_id: AccessionId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sequence: String,
}

impl SequenceRecord {
    pub fn new(
        accession_id: AccessionId,
        description: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            accession_id,
            description: description.into(),
            sequence: sequence.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.sequence.is_empty()
    }
}

/// De-duplicated accessions for one resolution round, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSet(BTreeSet<AccessionId>);

impl RequestSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &AccessionId) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessionId> {
        self.0.iter()
    }
}

impl FromIterator<AccessionId> for RequestSet {
    fn from_iter<I: IntoIterator<Item = AccessionId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RequestSet {
    type Item = &'a AccessionId;
    type IntoIter = std::collections::btree_set::Iter<'a, AccessionId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
    Fasta,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Fasta => write!(f, "fasta"),
        }
    }
}
