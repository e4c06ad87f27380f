//! Blended retrieval.
//!
//! Retrieval is graded, not winner-take-all: every matching instance gets a
//! retrieval probability from a softmax over activation,
//!
//! `p_i = exp(A_i / T) / Σ_j exp(A_j / T)`
//!
//! and a candidate's blended value is the probability-weighted average of
//! the retrieved outcomes, `V = Σ p_i u_i`. Exploration enters through the
//! per-instance activation noise, so selection among candidates is a plain
//! argmax over blended values.

use rand::rngs::StdRng;
use serde::Serialize;

use crate::activation::{
	instance_activation, match_conditions, match_instance, ActivationParams, MatchResult,
	NoiseCache,
};
use crate::choice::{Choice, DecisionKey, Value};
use crate::error::Result;
use crate::instance::InstanceStore;
use crate::similarity::SimilarityRegistry;

/// Smallest usable blending temperature.
///
/// Below this the softmax exponents overflow for ordinary activation
/// spreads; configured and derived temperatures must clear it.
pub const MINIMUM_TEMPERATURE: f64 = 0.01;

/// One instance's share of a candidate's blended value.
#[derive(Clone, Debug, Serialize)]
pub struct RetrievalDetail {
	/// The instance's outcome.
	pub outcome: f64,
	/// Base-level activation.
	pub base_level: f64,
	/// Mismatch-penalty term; absent when partial matching is off.
	pub mismatch: Option<f64>,
	/// Activation noise draw.
	pub noise: f64,
	/// Total activation.
	pub activation: f64,
	/// Softmax retrieval probability within the candidate's match set.
	pub retrieval_probability: f64,
}

/// Detail record for one candidate of a choice cycle.
#[derive(Clone, Debug, Serialize)]
pub struct ChoiceDetail {
	/// The candidate as presented.
	pub choice: Choice,
	/// Its blended value.
	pub blended_value: f64,
	/// Per-instance retrieval breakdown, in store order. Empty when the
	/// value came from the default utility.
	pub retrievals: Vec<RetrievalDetail>,
}

/// Softmax retrieval probabilities over activations at a temperature.
///
/// Computed with max-subtraction so large activations cannot overflow.
#[must_use]
pub fn retrieval_probabilities(activations: &[f64], temperature: f64) -> Vec<f64> {
	let top = activations
		.iter()
		.copied()
		.fold(f64::NEG_INFINITY, f64::max);
	let weights: Vec<f64> = activations
		.iter()
		.map(|&a| ((a - top) / temperature).exp())
		.collect();
	let total: f64 = weights.iter().sum();
	weights.into_iter().map(|w| w / total).collect()
}

/// Blended value: probability-weighted average of outcomes.
#[must_use]
pub fn blended_value(probabilities: &[f64], outcomes: &[f64]) -> f64 {
	probabilities
		.iter()
		.zip(outcomes.iter())
		.map(|(p, u)| p * u)
		.sum()
}

/// A candidate's blend over its matching instances.
#[derive(Clone, Debug)]
pub(crate) struct CandidateBlend {
	pub blended: f64,
	pub retrievals: Vec<RetrievalDetail>,
}

/// Everything one blending pass needs, borrowed from the agent.
pub(crate) struct BlendContext<'a> {
	pub store: &'a InstanceStore,
	pub schema: &'a [String],
	pub registry: &'a SimilarityRegistry,
	pub params: &'a ActivationParams,
	pub temperature: f64,
	pub now: u64,
	pub rng: &'a mut StdRng,
	pub cache: &'a mut NoiseCache,
}

impl BlendContext<'_> {
	/// Blend all instances matching `query` into a value, or `None` when
	/// nothing in memory is retrievable for it.
	pub fn blend(&mut self, query: &DecisionKey) -> Result<Option<CandidateBlend>> {
		let mut outcomes = Vec::new();
		let mut breakdowns = Vec::new();
		for instance in self.store.iter() {
			let mismatch = match match_instance(
				query,
				&instance.decision,
				self.schema,
				self.registry,
				self.params.mismatch_penalty,
			)? {
				MatchResult::Excluded => continue,
				MatchResult::Exact => None,
				MatchResult::Partial(term) => Some(term),
			};
			let Some(breakdown) = instance_activation(
				instance,
				mismatch,
				self.params,
				self.now,
				self.rng,
				self.cache,
			) else {
				continue;
			};
			outcomes.push(instance.outcome);
			breakdowns.push(breakdown);
		}
		if outcomes.is_empty() {
			return Ok(None);
		}
		let activations: Vec<f64> = breakdowns.iter().map(|b| b.total).collect();
		let probabilities = retrieval_probabilities(&activations, self.temperature);
		let blended = blended_value(&probabilities, &outcomes);
		let retrievals: Vec<RetrievalDetail> = breakdowns
			.into_iter()
			.zip(outcomes.iter().zip(probabilities.iter()))
			.map(|(b, (&outcome, &p))| {
				tracing::trace!(
					%query,
					outcome,
					base_level = b.base_level,
					mismatch = ?b.mismatch,
					noise = b.noise,
					activation = b.total,
					retrieval_probability = p,
					"instance retrieval"
				);
				RetrievalDetail {
					outcome,
					base_level: b.base_level,
					mismatch: b.mismatch,
					noise: b.noise,
					activation: b.total,
					retrieval_probability: p,
				}
			})
			.collect();
		tracing::debug!(%query, blended, "blended value");
		Ok(Some(CandidateBlend { blended, retrievals }))
	}

	/// One softmax over every instance matching `conditions`, aggregated by
	/// the value the instances hold at `blend_index`.
	///
	/// Returns `(value, probability mass)` pairs in first-encounter order.
	pub fn discrete(
		&mut self,
		blend_index: usize,
		conditions: &[(usize, Value)],
	) -> Result<Vec<(Value, f64)>> {
		let mut values = Vec::new();
		let mut activations = Vec::new();
		for instance in self.store.iter() {
			let mismatch = match match_conditions(
				conditions,
				&instance.decision,
				self.schema,
				self.registry,
				self.params.mismatch_penalty,
			)? {
				MatchResult::Excluded => continue,
				MatchResult::Exact => None,
				MatchResult::Partial(term) => Some(term),
			};
			let Some(breakdown) = instance_activation(
				instance,
				mismatch,
				self.params,
				self.now,
				self.rng,
				self.cache,
			) else {
				continue;
			};
			values.push(instance.decision.values()[blend_index].clone());
			activations.push(breakdown.total);
		}
		if values.is_empty() {
			return Ok(Vec::new());
		}
		let probabilities = retrieval_probabilities(&activations, self.temperature);
		let mut distribution: Vec<(Value, f64)> = Vec::new();
		for (value, p) in values.into_iter().zip(probabilities) {
			match distribution.iter_mut().find(|(v, _)| *v == value) {
				Some((_, mass)) => *mass += p,
				None => distribution.push((value, p)),
			}
		}
		Ok(distribution)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn close(a: f64, b: f64) {
		assert!((a - b).abs() < 1e-10, "{a} vs {b}");
	}

	#[test]
	fn test_softmax_single() {
		let p = retrieval_probabilities(&[0.7], 1.0);
		assert_eq!(p, vec![1.0]);
	}

	#[test]
	fn test_softmax_known_split() {
		// Activations ln(2^-1/2) and 0 at T = 1 give the 1/(1+sqrt(2)) split.
		let p = retrieval_probabilities(&[-0.346_573_590_279_972_64, 0.0], 1.0);
		close(p[0], 0.414_213_562_373_095_1);
		close(p[1], 0.585_786_437_626_904_9);
		close(p.iter().sum::<f64>(), 1.0);
	}

	#[test]
	fn test_softmax_temperature_flattens() {
		let sharp = retrieval_probabilities(&[1.0, 0.0], 0.5);
		let flat = retrieval_probabilities(&[1.0, 0.0], 2.0);
		assert!(sharp[0] > flat[0]);
		assert!(flat[0] > 0.5);
	}

	#[test]
	fn test_softmax_extreme_activations_stable() {
		let p = retrieval_probabilities(&[900.0, 899.0], 1.0);
		assert!(p[0].is_finite() && p[1].is_finite());
		close(p.iter().sum::<f64>(), 1.0);
		assert!(p[0] > p[1]);
	}

	#[test]
	fn test_blended_value_weighted_average() {
		close(blended_value(&[0.25, 0.75], &[0.0, 8.0]), 6.0);
		close(
			blended_value(&[0.414_213_562_373_095_1, 0.585_786_437_626_904_9], &[10.0, 0.0]),
			4.142_135_623_730_951,
		);
	}
}
