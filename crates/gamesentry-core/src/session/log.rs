//! Per-user ordered collection of completed intervals.
//!
//! Entries keep insertion order; that index is what edit/delete operate on.
//! The log never holds two overlapping intervals: inserts and edits that
//! would overlap are rejected and leave the log untouched.

use super::interval::{IntervalRecord, SessionInterval};
use crate::error::{SessionError, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLog {
    entries: Vec<IntervalRecord>,
}

impl SessionLog {
    pub fn new(entries: Vec<IntervalRecord>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[IntervalRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_records(self) -> Vec<IntervalRecord> {
        self.entries
    }

    /// First entry (other than `skip`) overlapping `candidate`.
    /// Entries with unparsable bounds are ignored.
    pub fn find_overlap(
        &self,
        candidate: &SessionInterval,
        skip: Option<usize>,
    ) -> Option<&IntervalRecord> {
        self.entries.iter().enumerate().find_map(|(idx, other)| {
            if Some(idx) == skip {
                return None;
            }
            let (start, stop) = (other.start_time()?, other.stop_time()?);
            candidate.overlaps(start, stop).then_some(other)
        })
    }

    /// Fails with `OverlapRejected` if `candidate` cannot be inserted.
    pub fn check_insert(&self, candidate: &SessionInterval) -> Result<(), SessionError> {
        self.reject_overlap(candidate, None)
    }

    pub fn push(&mut self, candidate: SessionInterval) -> Result<&IntervalRecord, SessionError> {
        self.check_insert(&candidate)?;
        self.entries.push(candidate.to_record());
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Replace the entry at `index` with `record`, stored exactly as given.
    /// The record must parse and must not overlap any other entry.
    pub fn replace(&mut self, index: usize, record: IntervalRecord) -> Result<(), SessionError> {
        self.bounds_check(index)?;
        let candidate = record.parse()?;
        self.reject_overlap(&candidate, Some(index))?;
        self.entries[index] = record;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<IntervalRecord, SessionError> {
        self.bounds_check(index)?;
        Ok(self.entries.remove(index))
    }

    /// Entries with their log index, most recent start first. Entries whose
    /// start does not parse sort last.
    pub fn recent_first(&self) -> Vec<(usize, &IntervalRecord)> {
        let mut indexed: Vec<(usize, &IntervalRecord)> = self.entries.iter().enumerate().collect();
        indexed.sort_by(|a, b| b.1.start_time().cmp(&a.1.start_time()));
        indexed
    }

    fn reject_overlap(
        &self,
        candidate: &SessionInterval,
        skip: Option<usize>,
    ) -> Result<(), SessionError> {
        match self.find_overlap(candidate, skip) {
            Some(other) => Err(SessionError::OverlapRejected {
                start: other.start.clone(),
                stop: other.stop.clone(),
            }),
            None => Ok(()),
        }
    }

    fn bounds_check(&self, index: usize) -> Result<(), SessionError> {
        if index >= self.entries.len() {
            return Err(ValidationError::OutOfBounds {
                collection: "session log".into(),
                index,
                len: self.entries.len(),
            }
            .into());
        }
        Ok(())
    }
}
