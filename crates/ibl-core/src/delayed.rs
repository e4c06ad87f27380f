//! Deferred outcome resolution.
//!
//! `respond_delayed` opens a [`DelayedResponse`]: the decision is recorded
//! immediately with the blended expectation standing in for the outcome, so
//! the choice loop never blocks on slow feedback, and the token can rewrite
//! that provisional outcome whenever the real one arrives. Tokens outlive
//! the cycle that created them and resolve in any order.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::choice::DecisionKey;
use crate::error::Result;
use crate::instance::{InstanceStore, Origin};

/// A deferred outcome awaiting its real value.
pub struct DelayedResponse {
	store: Arc<Mutex<InstanceStore>>,
	decision: DecisionKey,
	time: u64,
	expectation: f64,
	outcome: f64,
	resolved: bool,
}

impl DelayedResponse {
	pub(crate) fn new(
		store: Arc<Mutex<InstanceStore>>,
		decision: DecisionKey,
		time: u64,
		expectation: f64,
	) -> Self {
		Self {
			store,
			decision,
			time,
			expectation,
			outcome: expectation,
			resolved: false,
		}
	}

	/// Replace the recorded outcome with `actual` and return the previous
	/// value, so callers can track deltas.
	///
	/// The provisional occurrence is retracted and relearned under the new
	/// outcome at its original time; if the provisional value had merged
	/// into an existing instance, only that one occurrence moves. May be
	/// called again to correct the correction.
	///
	/// # Errors
	///
	/// Fails when the provisional instance no longer exists, typically
	/// because the agent was reset since the response was opened.
	pub fn update(&mut self, actual: f64) -> Result<f64> {
		{
			let mut store = self.store.lock();
			store.forget(&self.decision, self.outcome, self.time)?;
			store.add(self.decision.clone(), actual, self.time, Origin::Experienced);
		}
		let previous = self.outcome;
		self.outcome = actual;
		self.resolved = true;
		tracing::debug!(decision = %self.decision, previous, actual, "delayed response updated");
		Ok(previous)
	}

	/// Whether `update` has been called at least once.
	#[must_use]
	pub const fn is_resolved(&self) -> bool {
		self.resolved
	}

	/// The currently recorded outcome: the expectation until the first
	/// `update`, the latest actual value after.
	#[must_use]
	pub const fn outcome(&self) -> f64 {
		self.outcome
	}

	/// The blended expectation at the time the decision was made.
	#[must_use]
	pub const fn expectation(&self) -> f64 {
		self.expectation
	}

	/// The decision the deferred outcome belongs to.
	#[must_use]
	pub fn decision(&self) -> &DecisionKey {
		&self.decision
	}
}

impl fmt::Debug for DelayedResponse {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DelayedResponse")
			.field("decision", &self.decision)
			.field("time", &self.time)
			.field("expectation", &self.expectation)
			.field("outcome", &self.outcome)
			.field("resolved", &self.resolved)
			.finish_non_exhaustive()
	}
}
