//! Instance memory.
//!
//! Experiences are stored content-addressed: the identity of an instance is
//! its `(decision, outcome)` pair under exact equality, and re-experiencing
//! the same pair appends an occurrence time instead of duplicating the
//! instance. Occurrence history is what recency and frequency act on.
//!
//! Under optimized learning the occurrence list is not retained; instances
//! carry only `(count, created, last)` and the activation engine uses the
//! closed-form approximation instead.

use std::collections::HashMap;
use std::io;

use ordered_float::OrderedFloat;
use serde::Serialize;
use smallvec::{smallvec, SmallVec};

use crate::choice::DecisionKey;
use crate::error::{AgentError, Result};

/// Identity of an instance: decision key plus bit-exact outcome.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct InstanceKey {
	pub decision: DecisionKey,
	pub outcome: OrderedFloat<f64>,
}

/// How an instance write entered the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Origin {
	/// Seeded by `populate` or default-utility materialization.
	Prepopulated,
	/// Recorded from an observed (or provisional) outcome.
	Experienced,
}

/// A stored experience with its occurrence history.
#[derive(Clone, Debug)]
pub(crate) struct Instance {
	pub decision: DecisionKey,
	pub outcome: f64,
	pub created: u64,
	/// Occurrence times, ascending. Empty under optimized learning.
	pub occurrences: SmallVec<[u64; 4]>,
	pub count: u32,
	pub last: u64,
}

impl Instance {
	pub fn key(&self) -> InstanceKey {
		InstanceKey {
			decision: self.decision.clone(),
			outcome: OrderedFloat(self.outcome),
		}
	}
}

/// Read-only snapshot of one instance, for inspection and testing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InstanceRecord {
	/// Canonical decision the instance belongs to.
	pub decision: DecisionKey,
	/// Outcome value.
	pub outcome: f64,
	/// Time of the first occurrence.
	pub created: u64,
	/// Occurrence times. Under optimized learning only the first and last
	/// survive; `count` is authoritative there.
	pub occurrences: Vec<u64>,
	/// Number of occurrences.
	pub count: u32,
}

/// Content-addressed memory of past experiences.
///
/// Iteration order is insertion order, so identical write sequences yield
/// bit-identical stores and downstream tie-breaking stays deterministic.
#[derive(Clone, Debug, Default)]
pub(crate) struct InstanceStore {
	instances: Vec<Instance>,
	index: HashMap<InstanceKey, usize>,
	optimized: bool,
	/// Time of the first `Experienced` write, separating prepopulated
	/// seeds from lived history for `clear(preserve_prepopulated)`.
	first_experienced: Option<u64>,
}

impl InstanceStore {
	pub fn new(optimized: bool) -> Self {
		Self {
			optimized,
			..Self::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.instances.is_empty()
	}

	pub fn len(&self) -> usize {
		self.instances.len()
	}

	/// Switch the learning mode. Only legal while empty, since the two
	/// modes retain different occurrence state.
	pub fn set_optimized(&mut self, optimized: bool) -> Result<()> {
		if optimized != self.optimized && !self.is_empty() {
			return Err(AgentError::OptimizedLearningLocked);
		}
		self.optimized = optimized;
		Ok(())
	}

	pub fn iter(&self) -> impl Iterator<Item = &Instance> {
		self.instances.iter()
	}

	/// Record an experience: reinforce the exact `(decision, outcome)`
	/// instance if present, otherwise create one.
	pub fn add(&mut self, decision: DecisionKey, outcome: f64, time: u64, origin: Origin) {
		if origin == Origin::Experienced {
			self.first_experienced = Some(self.first_experienced.map_or(time, |t| t.min(time)));
		}
		let key = InstanceKey {
			decision: decision.clone(),
			outcome: OrderedFloat(outcome),
		};
		if let Some(&i) = self.index.get(&key) {
			let instance = &mut self.instances[i];
			if !self.optimized {
				// Writes at earlier times (delayed corrections, past-time
				// seeding) keep the list ascending.
				let at = instance.occurrences.partition_point(|&o| o <= time);
				instance.occurrences.insert(at, time);
			}
			instance.count += 1;
			instance.created = instance.created.min(time);
			instance.last = instance.last.max(time);
			return;
		}
		let occurrences = if self.optimized {
			SmallVec::new()
		} else {
			smallvec![time]
		};
		let _ = self.index.insert(key, self.instances.len());
		self.instances.push(Instance {
			decision,
			outcome,
			created: time,
			occurrences,
			count: 1,
			last: time,
		});
	}

	/// Retract one occurrence recorded at exactly `time`, deleting the
	/// instance when its last occurrence goes. Used by delayed-response
	/// correction to un-merge a provisional outcome.
	pub fn forget(&mut self, decision: &DecisionKey, outcome: f64, time: u64) -> Result<()> {
		if self.optimized {
			return Err(AgentError::DelayedFeedbackUnsupported);
		}
		let key = InstanceKey {
			decision: decision.clone(),
			outcome: OrderedFloat(outcome),
		};
		let &i = self
			.index
			.get(&key)
			.ok_or(AgentError::StaleDelayedResponse)?;
		let instance = &mut self.instances[i];
		let at = instance
			.occurrences
			.iter()
			.rposition(|&o| o == time)
			.ok_or(AgentError::StaleDelayedResponse)?;
		let _ = instance.occurrences.remove(at);
		instance.count -= 1;
		if instance.occurrences.is_empty() {
			let _ = self.instances.remove(i);
			self.reindex();
			return Ok(());
		}
		instance.created = instance.occurrences[0];
		instance.last = instance.occurrences[instance.occurrences.len() - 1];
		Ok(())
	}

	fn reindex(&mut self) {
		self.index.clear();
		for (i, instance) in self.instances.iter().enumerate() {
			let _ = self.index.insert(instance.key(), i);
		}
	}

	/// Remove everything, optionally keeping instances created before the
	/// first experienced write. Retained instances are re-seeded to a
	/// single occurrence at their creation time.
	pub fn clear(&mut self, preserve_prepopulated: bool) {
		if preserve_prepopulated {
			let cutoff = self.first_experienced;
			self.instances
				.retain(|instance| cutoff.map_or(true, |t| instance.created < t));
			for instance in &mut self.instances {
				if !self.optimized {
					instance.occurrences = smallvec![instance.created];
				}
				instance.count = 1;
				instance.last = instance.created;
			}
		} else {
			self.instances.clear();
		}
		self.reindex();
		self.first_experienced = None;
	}

	pub fn records(&self) -> Vec<InstanceRecord> {
		self.instances
			.iter()
			.map(|instance| {
				let occurrences = if self.optimized {
					if instance.created == instance.last {
						vec![instance.created]
					} else {
						vec![instance.created, instance.last]
					}
				} else {
					instance.occurrences.to_vec()
				};
				InstanceRecord {
					decision: instance.decision.clone(),
					outcome: instance.outcome,
					created: instance.created,
					occurrences,
					count: instance.count,
				}
			})
			.collect()
	}
}

/// Write instance records as CSV, occurrences separated by `;`.
///
/// # Errors
///
/// Propagates I/O errors from the writer.
pub(crate) fn write_csv<W: io::Write>(records: &[InstanceRecord], mut writer: W) -> io::Result<()> {
	writeln!(writer, "decision,outcome,created,occurrences")?;
	for record in records {
		let occurrences = record
			.occurrences
			.iter()
			.map(ToString::to_string)
			.collect::<Vec<_>>()
			.join(";");
		writeln!(
			writer,
			"{},{},{},{}",
			record.decision, record.outcome, record.created, occurrences
		)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::choice::{Choice, DECISION_ATTRIBUTE};

	fn key(name: &str) -> DecisionKey {
		Choice::from(name)
			.canonical(&[DECISION_ATTRIBUTE.to_owned()], false)
			.unwrap()
	}

	#[test]
	fn test_add_merges_exact_pairs() {
		let mut store = InstanceStore::new(false);
		store.add(key("a"), 10.0, 0, Origin::Prepopulated);
		store.add(key("a"), 10.0, 3, Origin::Experienced);
		store.add(key("a"), 9.0, 3, Origin::Experienced);
		assert_eq!(store.len(), 2);
		let records = store.records();
		assert_eq!(records[0].occurrences, vec![0, 3]);
		assert_eq!(records[0].created, 0);
		assert_eq!(records[1].occurrences, vec![3]);
	}

	#[test]
	fn test_near_equal_outcomes_never_merge() {
		let mut store = InstanceStore::new(false);
		store.add(key("a"), 0.5, 0, Origin::Prepopulated);
		store.add(key("a"), 0.5 + f64::EPSILON, 0, Origin::Prepopulated);
		assert_eq!(store.len(), 2);
	}

	#[test]
	fn test_past_time_write_keeps_occurrences_ascending() {
		let mut store = InstanceStore::new(false);
		store.add(key("u"), 40.0, 50, Origin::Prepopulated);
		store.add(key("u"), 40.0, 22, Origin::Prepopulated);
		let records = store.records();
		assert_eq!(records[0].occurrences, vec![22, 50]);
		assert_eq!(records[0].created, 22);
	}

	#[test]
	fn test_forget_unmerges_one_occurrence() {
		let mut store = InstanceStore::new(false);
		store.add(key("a"), 10.0, 0, Origin::Prepopulated);
		store.add(key("a"), 10.0, 1, Origin::Experienced);
		store.forget(&key("a"), 10.0, 1).unwrap();
		let records = store.records();
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].occurrences, vec![0]);
	}

	#[test]
	fn test_forget_removes_single_occurrence_instance() {
		let mut store = InstanceStore::new(false);
		store.add(key("a"), 10.0, 0, Origin::Prepopulated);
		store.add(key("b"), 5.0, 1, Origin::Experienced);
		store.forget(&key("b"), 5.0, 1).unwrap();
		assert_eq!(store.len(), 1);
		// The survivor is still findable through the index.
		store.add(key("a"), 10.0, 2, Origin::Experienced);
		assert_eq!(store.len(), 1);
		assert_eq!(store.records()[0].occurrences, vec![0, 2]);
	}

	#[test]
	fn test_forget_missing_is_stale() {
		let mut store = InstanceStore::new(false);
		assert!(matches!(
			store.forget(&key("a"), 1.0, 0),
			Err(AgentError::StaleDelayedResponse)
		));
	}

	#[test]
	fn test_forget_rejected_under_optimized_learning() {
		let mut store = InstanceStore::new(true);
		store.add(key("a"), 1.0, 0, Origin::Experienced);
		assert!(matches!(
			store.forget(&key("a"), 1.0, 0),
			Err(AgentError::DelayedFeedbackUnsupported)
		));
	}

	#[test]
	fn test_optimized_tracks_count_and_bounds_only() {
		let mut store = InstanceStore::new(true);
		store.add(key("a"), 1.0, 0, Origin::Prepopulated);
		store.add(key("a"), 1.0, 4, Origin::Experienced);
		store.add(key("a"), 1.0, 9, Origin::Experienced);
		let records = store.records();
		assert_eq!(records[0].count, 3);
		assert_eq!(records[0].occurrences, vec![0, 9]);
	}

	#[test]
	fn test_set_optimized_requires_empty_store() {
		let mut store = InstanceStore::new(false);
		store.set_optimized(true).unwrap();
		store.set_optimized(false).unwrap();
		store.add(key("a"), 1.0, 0, Origin::Prepopulated);
		assert!(store.set_optimized(true).is_err());
		// A no-op toggle is always fine.
		store.set_optimized(false).unwrap();
	}

	#[test]
	fn test_clear_preserves_pre_experience_instances() {
		let mut store = InstanceStore::new(false);
		store.add(key("a"), 1.0, 0, Origin::Prepopulated);
		store.add(key("b"), 1.0, 0, Origin::Prepopulated);
		store.add(key("a"), 0.0, 1, Origin::Experienced);
		store.add(key("a"), 1.0, 2, Origin::Experienced);
		store.clear(true);
		let records = store.records();
		assert_eq!(records.len(), 2);
		// Preserved instances are re-seeded to their creation time.
		assert_eq!(records[0].occurrences, vec![0]);
		assert_eq!(records[0].count, 1);
		store.clear(false);
		assert!(store.is_empty());
	}

	#[test]
	fn test_clear_without_experience_preserves_everything() {
		let mut store = InstanceStore::new(false);
		store.add(key("a"), 1.0, 0, Origin::Prepopulated);
		store.add(key("b"), 1.0, 3, Origin::Prepopulated);
		store.clear(true);
		assert_eq!(store.len(), 2);
	}

	#[test]
	fn test_identical_sequences_reproduce_identical_records() {
		let run = || {
			let mut store = InstanceStore::new(false);
			store.add(key("a"), 10.0, 0, Origin::Prepopulated);
			store.add(key("b"), 5.5, 0, Origin::Prepopulated);
			store.add(key("a"), 10.0, 2, Origin::Experienced);
			store.add(key("c"), -1.25, 3, Origin::Experienced);
			store.records()
		};
		assert_eq!(run(), run());
	}

	#[test]
	fn test_csv_export() {
		let mut store = InstanceStore::new(false);
		store.add(key("a"), 10.0, 0, Origin::Prepopulated);
		store.add(key("a"), 10.0, 3, Origin::Experienced);
		let mut out = Vec::new();
		write_csv(&store.records(), &mut out).unwrap();
		let text = String::from_utf8(out).unwrap();
		let mut lines = text.lines();
		assert_eq!(lines.next(), Some("decision,outcome,created,occurrences"));
		assert_eq!(lines.next(), Some("a,10,0,0;3"));
	}
}
