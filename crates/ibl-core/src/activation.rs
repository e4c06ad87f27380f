//! Activation calculation.
//!
//! The retrieval strength of an instance combines three terms:
//!
//! 1. **Base-level activation** (recency/frequency): `B = ln[Σ (t - o)^(-d)]`
//!    over occurrences `o < t`, or its closed-form approximation under
//!    optimized learning
//! 2. **Mismatch penalty** (partial matching):
//!    `M = -P Σ w_a (1 - sim_a(query, instance))`
//! 3. **Activation noise**: a logistic draw scaled by the noise parameter
//!
//! Total activation feeds the blended-value softmax. An instance with no
//! occurrence before the current time is not retrievable at all.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::choice::{DecisionKey, Value};
use crate::error::{AgentError, Result};
use crate::instance::{Instance, InstanceKey};
use crate::similarity::SimilarityRegistry;

/// Parameters feeding the activation computation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivationParams {
	/// Scale of the logistic activation noise; 0 disables the draw entirely
	pub noise: f64,
	/// `d` in the forgetting equation (default: 0.5 for human-like decay)
	pub decay: f64,
	/// Partial-matching penalty `P`; absent disables partial matching
	pub mismatch_penalty: Option<f64>,
	/// Use the closed-form base-level approximation
	pub optimized_learning: bool,
	/// Freeze noise draws per instance within one clock tick
	pub fixed_noise: bool,
}

impl Default for ActivationParams {
	fn default() -> Self {
		Self {
			noise: 0.25,
			decay: 0.5,
			mismatch_penalty: None,
			optimized_learning: false,
			fixed_noise: false,
		}
	}
}

/// Breakdown of activation components for a single instance.
#[derive(Clone, Debug, Serialize)]
pub struct ActivationBreakdown {
	/// From occurrence history: `ln[Σ (t - o)^(-d)]`
	pub base_level: f64,
	/// From partial matching; absent when partial matching is off
	pub mismatch: Option<f64>,
	/// Logistic noise draw (0 when noise is disabled)
	pub noise: f64,
	/// Combined total
	pub total: f64,
}

// ============================================================================
// Base-Level Activation
// ============================================================================

/// Compute base-level activation from an occurrence history.
///
/// `B = ln[Σ (t - o)^(-d)]`
///
/// Only occurrences strictly before `now` count; an instance recorded at
/// the current tick has no age yet. With `decay = 0` the sum degenerates to
/// the occurrence count.
///
/// # Returns
///
/// Base-level activation, or negative infinity if nothing precedes `now`.
#[must_use]
pub fn base_level(occurrences: &[u64], now: u64, decay: f64) -> f64 {
	let aged = occurrences.iter().filter(|&&o| o < now);
	if decay == 0.0 {
		#[allow(clippy::cast_precision_loss)]
		return (aged.count() as f64).ln();
	}
	let sum: f64 = aged
		.map(|&o| {
			#[allow(clippy::cast_precision_loss)]
			let age = (now - o) as f64;
			age.powf(-decay)
		})
		.sum();
	sum.ln()
}

/// Closed-form approximation of base-level activation.
///
/// `B = ln[n / (1 - d)] - d ln(t - created)`
///
/// Asymptotically equal to the full sum while needing only the occurrence
/// count and the age since creation, so the store can drop per-occurrence
/// history (optimized learning).
///
/// # Returns
///
/// Approximate base-level activation, or negative infinity if the instance
/// was created at the current tick.
#[must_use]
pub fn base_level_optimized(count: u32, created: u64, now: u64, decay: f64) -> f64 {
	if created >= now {
		return f64::NEG_INFINITY;
	}
	let n = f64::from(count);
	if decay == 0.0 {
		return n.ln();
	}
	#[allow(clippy::cast_precision_loss)]
	let age = (now - created) as f64;
	(n / (1.0 - decay)).ln() - decay * age.ln()
}

// ============================================================================
// Activation Noise
// ============================================================================

/// Draw logistic activation noise: `-s ln(1/u - 1)` for uniform `u`.
///
/// The logistic distribution is the standard ACT-R stand-in for the sum of
/// many small independent disturbances; `scale` is the `s` parameter.
#[must_use]
pub fn logistic_noise<R: Rng>(scale: f64, rng: &mut R) -> f64 {
	let u: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
	-scale * (1.0 / u - 1.0).ln()
}

/// Noise draws frozen per instance within one clock tick.
///
/// With `fixed_noise`, every evaluation of the same instance at the same
/// clock value sees the same draw, so equivalent instances order
/// reproducibly across a choice cycle's candidates and a blend repeated
/// without advancing the clock reproduces its retrieval probabilities.
#[derive(Debug, Default)]
pub(crate) struct NoiseCache {
	time: u64,
	draws: HashMap<InstanceKey, f64>,
}

impl NoiseCache {
	pub fn draw<R: Rng>(&mut self, now: u64, key: &InstanceKey, scale: f64, rng: &mut R) -> f64 {
		if self.time != now {
			self.draws.clear();
			self.time = now;
		}
		*self
			.draws
			.entry(key.clone())
			.or_insert_with(|| logistic_noise(scale, rng))
	}

	pub fn clear(&mut self) {
		self.draws.clear();
		self.time = 0;
	}
}

// ============================================================================
// Partial Matching
// ============================================================================

/// How an instance relates to a query under the matching rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MatchResult {
	/// A non-similarity attribute differs; the instance does not compete.
	Excluded,
	/// Every attribute matched exactly with no similarity entry involved.
	Exact,
	/// Matched through similarity functions; carries the mismatch term.
	Partial(f64),
}

/// Match a single attribute, returning its mismatch contribution.
fn attribute_match(
	attribute: &str,
	query: &Value,
	stored: &Value,
	registry: &SimilarityRegistry,
	penalty: Option<f64>,
) -> Result<MatchResult> {
	if let (Some(p), Some(entry)) = (penalty, registry.get(attribute)) {
		let similarity = entry.evaluate(query, stored)?;
		if !(0.0..=1.0).contains(&similarity) {
			return Err(AgentError::InvalidSimilarity {
				attribute: attribute.to_owned(),
				value: similarity,
			});
		}
		return Ok(MatchResult::Partial(-p * entry.weight * (1.0 - similarity)));
	}
	if query == stored {
		Ok(MatchResult::Exact)
	} else {
		Ok(MatchResult::Excluded)
	}
}

/// Match a full query key against an instance key.
pub(crate) fn match_instance(
	query: &DecisionKey,
	stored: &DecisionKey,
	schema: &[String],
	registry: &SimilarityRegistry,
	penalty: Option<f64>,
) -> Result<MatchResult> {
	let mut term = 0.0;
	let mut partial = false;
	for (i, attribute) in schema.iter().enumerate() {
		match attribute_match(
			attribute,
			&query.values()[i],
			&stored.values()[i],
			registry,
			penalty,
		)? {
			MatchResult::Excluded => return Ok(MatchResult::Excluded),
			MatchResult::Exact => {}
			MatchResult::Partial(t) => {
				term += t;
				partial = true;
			}
		}
	}
	Ok(if partial {
		MatchResult::Partial(term)
	} else {
		MatchResult::Exact
	})
}

/// Match only the given `(schema index, value)` conditions, leaving the
/// remaining attributes unconstrained. Used by discrete blending.
pub(crate) fn match_conditions(
	conditions: &[(usize, Value)],
	stored: &DecisionKey,
	schema: &[String],
	registry: &SimilarityRegistry,
	penalty: Option<f64>,
) -> Result<MatchResult> {
	let mut term = 0.0;
	let mut partial = false;
	for (i, value) in conditions {
		match attribute_match(&schema[*i], value, &stored.values()[*i], registry, penalty)? {
			MatchResult::Excluded => return Ok(MatchResult::Excluded),
			MatchResult::Exact => {}
			MatchResult::Partial(t) => {
				term += t;
				partial = true;
			}
		}
	}
	Ok(if partial {
		MatchResult::Partial(term)
	} else {
		MatchResult::Exact
	})
}

// ============================================================================
// Combined Activation
// ============================================================================

/// Compute the full activation of an instance against a query it matched.
///
/// Returns `None` when the instance has no retrievable occurrence yet.
pub(crate) fn instance_activation<R: Rng>(
	instance: &Instance,
	mismatch: Option<f64>,
	params: &ActivationParams,
	now: u64,
	rng: &mut R,
	cache: &mut NoiseCache,
) -> Option<ActivationBreakdown> {
	let base = if params.optimized_learning {
		base_level_optimized(instance.count, instance.created, now, params.decay)
	} else {
		base_level(&instance.occurrences, now, params.decay)
	};
	if !base.is_finite() {
		return None;
	}
	let noise = if params.noise > 0.0 {
		if params.fixed_noise {
			cache.draw(now, &instance.key(), params.noise, rng)
		} else {
			logistic_noise(params.noise, rng)
		}
	} else {
		0.0
	};
	let total = base + mismatch.unwrap_or(0.0) + noise;
	Some(ActivationBreakdown {
		base_level: base,
		mismatch,
		noise,
		total,
	})
}
