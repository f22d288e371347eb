use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::{AccessionId, RequestSet, SequenceRecord};
use crate::error::{FetchErrorKind, StoreError};
use crate::fasta::parse_record;
use crate::ncbi::SequenceFetcher;
use crate::store::SequenceStore;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub accession: AccessionId,
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl ProgressEvent {
    /// Share of the fetch queue handled so far, in `(0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum UnresolvedReason {
    FetchFailed {
        kind: FetchErrorKind,
        message: String,
    },
    ParseFailed {
        message: String,
    },
    NotPersisted,
    NotInStore,
}

/// Terminal state of one requested accession after a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    SatisfiedFromStore,
    FetchedAndStored,
    Unresolved { reason: UnresolvedReason },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    /// Resolved records sorted by accession.
    pub records: Vec<SequenceRecord>,
    pub outcomes: BTreeMap<AccessionId, Outcome>,
}

impl Resolution {
    pub fn fetched(&self) -> impl Iterator<Item = &AccessionId> {
        self.with_outcome(|outcome| matches!(outcome, Outcome::FetchedAndStored))
    }

    pub fn satisfied(&self) -> impl Iterator<Item = &AccessionId> {
        self.with_outcome(|outcome| matches!(outcome, Outcome::SatisfiedFromStore))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &AccessionId> {
        self.with_outcome(|outcome| matches!(outcome, Outcome::Unresolved { .. }))
    }

    fn with_outcome(
        &self,
        predicate: impl Fn(&Outcome) -> bool,
    ) -> impl Iterator<Item = &AccessionId> {
        self.outcomes
            .iter()
            .filter(move |(_, outcome)| predicate(*outcome))
            .map(|(id, _)| id)
    }
}

/// Answers accession requests from the store and fetches only what is missing.
pub struct Reconciler<F: SequenceFetcher, S: SequenceStore> {
    store: S,
    fetcher: F,
}

impl<F: SequenceFetcher, S: SequenceStore> Reconciler<F, S> {
    pub fn new(store: S, fetcher: F) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs one resolution round.
    ///
    /// Fetch and parse failures only leave the affected accession unresolved.
    /// Store failures abort the round.
    pub fn resolve<I>(
        &self,
        requested: I,
        sink: &dyn ProgressSink,
    ) -> Result<Resolution, StoreError>
    where
        I: IntoIterator<Item = AccessionId>,
    {
        let requested = requested.into_iter().collect::<RequestSet>();
        if requested.is_empty() {
            return Ok(Resolution::default());
        }

        let mut existing = self.store.lookup(&requested)?;
        let mut outcomes = BTreeMap::new();
        let mut to_fetch = Vec::new();
        for id in &requested {
            match existing.get(id) {
                Some(record) if record.is_resolved() => {
                    outcomes.insert(id.clone(), Outcome::SatisfiedFromStore);
                }
                _ => to_fetch.push(id.clone()),
            }
        }
        tracing::info!(
            requested = requested.len(),
            satisfied = outcomes.len(),
            to_fetch = to_fetch.len(),
            "starting resolution round"
        );

        let started = Instant::now();
        let total = to_fetch.len();
        let mut fetched = Vec::new();
        for (index, id) in to_fetch.iter().enumerate() {
            match self.fetch_one(id) {
                Ok(record) => fetched.push(record),
                Err(reason) => {
                    outcomes.insert(id.clone(), Outcome::Unresolved { reason });
                }
            }
            sink.event(ProgressEvent {
                accession: id.clone(),
                processed: index + 1,
                total,
                elapsed: started.elapsed(),
            });
        }

        if !fetched.is_empty() {
            self.store.upsert(&fetched)?;
            existing = self.store.lookup(&requested)?;
            for record in &fetched {
                let persisted = existing
                    .get(&record.accession_id)
                    .is_some_and(SequenceRecord::is_resolved);
                let outcome = if persisted {
                    Outcome::FetchedAndStored
                } else {
                    tracing::warn!(accession = %record.accession_id, "record missing after upsert");
                    Outcome::Unresolved {
                        reason: UnresolvedReason::NotPersisted,
                    }
                };
                outcomes.insert(record.accession_id.clone(), outcome);
            }
        }

        let resolution = Resolution {
            records: collect_resolved(existing, &requested),
            outcomes,
        };
        tracing::info!(
            resolved = resolution.records.len(),
            fetched = resolution.fetched().count(),
            unresolved = resolution.unresolved().count(),
            "finished resolution round"
        );
        Ok(resolution)
    }

    /// Answers from the store alone; nothing is fetched or written.
    pub fn lookup_only<I>(&self, requested: I) -> Result<Resolution, StoreError>
    where
        I: IntoIterator<Item = AccessionId>,
    {
        let requested = requested.into_iter().collect::<RequestSet>();
        if requested.is_empty() {
            return Ok(Resolution::default());
        }
        let existing = self.store.lookup(&requested)?;
        let outcomes = requested
            .iter()
            .map(|id| {
                let outcome = match existing.get(id) {
                    Some(record) if record.is_resolved() => Outcome::SatisfiedFromStore,
                    _ => Outcome::Unresolved {
                        reason: UnresolvedReason::NotInStore,
                    },
                };
                (id.clone(), outcome)
            })
            .collect();
        Ok(Resolution {
            records: collect_resolved(existing, &requested),
            outcomes,
        })
    }

    fn fetch_one(&self, id: &AccessionId) -> Result<SequenceRecord, UnresolvedReason> {
        let raw = self.fetcher.fetch(id).map_err(|err| {
            tracing::warn!(accession = %id, kind = ?err.kind(), error = %err, "fetch failed");
            UnresolvedReason::FetchFailed {
                kind: err.kind(),
                message: err.to_string(),
            }
        })?;
        let mut record = parse_record(&raw).map_err(|err| {
            tracing::warn!(accession = %id, error = %err, "unparseable record");
            UnresolvedReason::ParseFailed {
                message: err.to_string(),
            }
        })?;
        if record.accession_id != *id {
            tracing::debug!(
                requested = %id,
                header = %record.accession_id,
                "keying fetched record by requested accession"
            );
            record.accession_id = id.clone();
        }
        Ok(record)
    }
}

fn collect_resolved(
    records: BTreeMap<AccessionId, SequenceRecord>,
    requested: &RequestSet,
) -> Vec<SequenceRecord> {
    records
        .into_iter()
        .filter(|(id, record)| requested.contains(id) && record.is_resolved())
        .map(|(_, record)| record)
        .collect()
}
