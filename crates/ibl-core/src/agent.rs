//! The decision agent.
//!
//! An [`Agent`] owns its instance memory, logical clock, configuration,
//! similarity registry, and random source, and drives the choose/respond
//! protocol:
//!
//! 1. `choose` canonicalizes and validates the options, advances the clock,
//!    blends a value for every candidate, and picks the argmax
//! 2. `respond` closes the pending decision by writing or reinforcing an
//!    instance; `respond_delayed` instead records the blended expectation
//!    provisionally and hands back a [`DelayedResponse`] for later
//!    correction
//!
//! Nothing is shared between agents, so independent agents can run on
//! independent threads; reproducibility comes from seeding each agent's own
//! random source.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activation::{ActivationParams, NoiseCache};
use crate::blending::{BlendContext, ChoiceDetail, MINIMUM_TEMPERATURE};
use crate::choice::{Choice, DecisionKey, Value, DECISION_ATTRIBUTE};
use crate::delayed::DelayedResponse;
use crate::error::{AgentError, Result};
use crate::instance::{write_csv, InstanceRecord, InstanceStore, Origin};
use crate::similarity::{SimilarityFn, SimilarityRegistry};

static NEXT_AGENT_ID: AtomicU64 = AtomicU64::new(1);

fn generated_name() -> String {
	format!("agent-{}", NEXT_AGENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// A default utility: a fixed hypothesis, or one computed per candidate.
enum DefaultUtility {
	Fixed(f64),
	Computed(Arc<dyn Fn(&Choice) -> f64 + Send + Sync>),
}

impl DefaultUtility {
	fn evaluate(&self, choice: &Choice) -> f64 {
		match self {
			Self::Fixed(v) => *v,
			Self::Computed(f) => f(choice),
		}
	}
}

/// The decision taken by the latest `choose`, awaiting its outcome.
struct PendingDecision {
	candidates: Vec<(Choice, DecisionKey)>,
	blended: Vec<f64>,
	chosen: usize,
}

/// An instance-based learning agent.
pub struct Agent {
	name: String,
	attributes: Vec<String>,
	schema: Vec<String>,
	params: ActivationParams,
	temperature: Option<f64>,
	default_utility: Option<DefaultUtility>,
	default_utility_populates: bool,
	store: Arc<Mutex<InstanceStore>>,
	registry: SimilarityRegistry,
	time: u64,
	rng: StdRng,
	cache: NoiseCache,
	pending: Option<PendingDecision>,
	previous_options: Option<Vec<Choice>>,
}

impl Agent {
	// ========================================================================
	// Construction
	// ========================================================================

	/// A fresh agent with no attribute schema and a generated name.
	#[must_use]
	pub fn new() -> Self {
		Self::build(generated_name(), Vec::new())
	}

	/// A fresh agent with an explicit name.
	#[must_use]
	pub fn named(name: impl Into<String>) -> Self {
		Self::build(name.into(), Vec::new())
	}

	/// A fresh agent whose options carry the given attributes.
	///
	/// # Errors
	///
	/// Rejects duplicate attribute names.
	pub fn with_attributes<I, S>(attributes: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::named_with_attributes(generated_name(), attributes)
	}

	/// A fresh named agent with an attribute schema.
	///
	/// # Errors
	///
	/// Rejects duplicate attribute names.
	pub fn named_with_attributes<I, S>(name: impl Into<String>, attributes: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
		let mut seen = HashSet::new();
		for attribute in &attributes {
			if !seen.insert(attribute.clone()) {
				return Err(AgentError::DuplicateAttribute(attribute.clone()));
			}
		}
		Ok(Self::build(name.into(), attributes))
	}

	fn build(name: String, attributes: Vec<String>) -> Self {
		let schema = if attributes.is_empty() {
			vec![DECISION_ATTRIBUTE.to_owned()]
		} else {
			attributes.clone()
		};
		Self {
			name,
			attributes,
			schema,
			params: ActivationParams::default(),
			temperature: None,
			default_utility: None,
			default_utility_populates: false,
			store: Arc::new(Mutex::new(InstanceStore::new(false))),
			registry: SimilarityRegistry::default(),
			time: 0,
			rng: StdRng::from_entropy(),
			cache: NoiseCache::default(),
			pending: None,
			previous_options: None,
		}
	}

	// ========================================================================
	// Configuration
	// ========================================================================

	/// The agent's name.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Declared attribute names; empty for bare-value options.
	#[must_use]
	pub fn attributes(&self) -> &[String] {
		&self.attributes
	}

	/// The logical clock.
	#[must_use]
	pub const fn time(&self) -> u64 {
		self.time
	}

	/// Reseed the agent's random source for reproducible runs.
	pub fn seed(&mut self, seed: u64) {
		self.rng = StdRng::seed_from_u64(seed);
		self.cache.clear();
	}

	/// Activation noise scale.
	#[must_use]
	pub const fn noise(&self) -> f64 {
		self.params.noise
	}

	/// Set the activation noise scale.
	///
	/// # Errors
	///
	/// Rejects negative or non-finite values, leaving state unchanged.
	pub fn set_noise(&mut self, noise: f64) -> Result<()> {
		if !noise.is_finite() || noise < 0.0 {
			return Err(AgentError::InvalidNoise(noise));
		}
		if noise == 0.0 && self.temperature.is_none() {
			tracing::warn!("noise is 0 with no temperature set; blending will use temperature 1");
		}
		self.params.noise = noise;
		Ok(())
	}

	/// Base-level decay `d`.
	#[must_use]
	pub const fn decay(&self) -> f64 {
		self.params.decay
	}

	/// Set the base-level decay.
	///
	/// # Errors
	///
	/// Rejects negative or non-finite values, and values of 1 or more while
	/// optimized learning is enabled.
	pub fn set_decay(&mut self, decay: f64) -> Result<()> {
		if !decay.is_finite() || decay < 0.0 {
			return Err(AgentError::InvalidDecay(decay));
		}
		if self.params.optimized_learning && decay >= 1.0 {
			return Err(AgentError::DecayConflictsWithOptimized(decay));
		}
		self.params.decay = decay;
		Ok(())
	}

	/// Blending temperature, if explicitly set.
	#[must_use]
	pub const fn temperature(&self) -> Option<f64> {
		self.temperature
	}

	/// Set or unset the blending temperature. While unset, the temperature
	/// is derived as `sqrt(2) * noise`.
	///
	/// # Errors
	///
	/// Rejects explicit values below [`MINIMUM_TEMPERATURE`], and unsetting
	/// while the derived value would fall below it (in particular while
	/// noise is exactly 0).
	pub fn set_temperature(&mut self, temperature: Option<f64>) -> Result<()> {
		match temperature {
			Some(t) if !t.is_finite() || t < MINIMUM_TEMPERATURE => {
				Err(AgentError::InvalidTemperature(t))
			}
			Some(t) => {
				self.temperature = Some(t);
				Ok(())
			}
			None => {
				let derived = std::f64::consts::SQRT_2 * self.params.noise;
				if derived < MINIMUM_TEMPERATURE {
					return Err(AgentError::UnderivableTemperature(self.params.noise));
				}
				self.temperature = None;
				Ok(())
			}
		}
	}

	/// Partial-matching penalty, if partial matching is enabled.
	#[must_use]
	pub const fn mismatch_penalty(&self) -> Option<f64> {
		self.params.mismatch_penalty
	}

	/// Set or unset the partial-matching penalty.
	///
	/// Enabling partial matching supersedes an active default utility:
	/// partially matching instances leave no candidate without experience.
	/// The superseded default utility is cleared with a diagnostic.
	///
	/// # Errors
	///
	/// Rejects negative or non-finite values.
	pub fn set_mismatch_penalty(&mut self, penalty: Option<f64>) -> Result<()> {
		if let Some(p) = penalty {
			if !p.is_finite() || p < 0.0 {
				return Err(AgentError::InvalidMismatchPenalty(p));
			}
			if self.default_utility.is_some() {
				tracing::warn!(
					"mismatch penalty supersedes the active default utility; clearing it"
				);
				self.default_utility = None;
			}
		}
		self.params.mismatch_penalty = penalty;
		Ok(())
	}

	/// The fixed default utility, if one is set.
	#[must_use]
	pub fn default_utility(&self) -> Option<f64> {
		match self.default_utility {
			Some(DefaultUtility::Fixed(v)) => Some(v),
			Some(DefaultUtility::Computed(_)) | None => None,
		}
	}

	/// Whether any default utility (fixed or computed) is set.
	#[must_use]
	pub const fn has_default_utility(&self) -> bool {
		self.default_utility.is_some()
	}

	/// Set or clear the fixed default utility hypothesized for unseen
	/// decisions. Setting one while partial matching is active clears the
	/// mismatch penalty with a diagnostic; the most recent assignment wins.
	pub fn set_default_utility(&mut self, utility: Option<f64>) {
		match utility {
			Some(v) => {
				self.warn_default_supersedes_mismatch();
				self.default_utility = Some(DefaultUtility::Fixed(v));
			}
			None => self.default_utility = None,
		}
	}

	/// Set a default utility computed from the candidate.
	pub fn set_default_utility_fn<F>(&mut self, f: F)
	where
		F: Fn(&Choice) -> f64 + Send + Sync + 'static,
	{
		self.warn_default_supersedes_mismatch();
		self.default_utility = Some(DefaultUtility::Computed(Arc::new(f)));
	}

	fn warn_default_supersedes_mismatch(&mut self) {
		if self.params.mismatch_penalty.is_some() {
			tracing::warn!("default utility supersedes the active mismatch penalty; clearing it");
			self.params.mismatch_penalty = None;
		}
	}

	/// Whether default utilities materialize as real instances on first use.
	#[must_use]
	pub const fn default_utility_populates(&self) -> bool {
		self.default_utility_populates
	}

	/// Control default-utility materialization.
	pub fn set_default_utility_populates(&mut self, populates: bool) {
		self.default_utility_populates = populates;
	}

	/// Whether the closed-form base-level approximation is in use.
	#[must_use]
	pub const fn optimized_learning(&self) -> bool {
		self.params.optimized_learning
	}

	/// Switch the closed-form base-level approximation on or off.
	///
	/// # Errors
	///
	/// Rejects enabling with `decay >= 1`, and any change while instances
	/// are stored (the two modes retain different occurrence state).
	pub fn set_optimized_learning(&mut self, optimized: bool) -> Result<()> {
		if optimized == self.params.optimized_learning {
			return Ok(());
		}
		if optimized && self.params.decay >= 1.0 {
			return Err(AgentError::DecayConflictsWithOptimized(self.params.decay));
		}
		self.store.lock().set_optimized(optimized)?;
		self.params.optimized_learning = optimized;
		Ok(())
	}

	/// Whether noise draws are frozen per instance within a clock tick.
	#[must_use]
	pub const fn fixed_noise(&self) -> bool {
		self.params.fixed_noise
	}

	/// Control per-tick noise freezing.
	pub fn set_fixed_noise(&mut self, fixed: bool) {
		self.params.fixed_noise = fixed;
		self.cache.clear();
	}

	/// Register, reweight, or remove similarity entries.
	///
	/// An empty `attributes` slice addresses every schema attribute (for
	/// agents without declared attributes, the decision itself). With a
	/// function, registers it; with only a weight, adjusts the weight
	/// (entries created this way use equality similarity); with neither,
	/// removes the entries.
	///
	/// # Errors
	///
	/// Rejects unknown attribute names and negative or non-finite weights.
	pub fn similarity(
		&mut self,
		attributes: &[&str],
		function: Option<SimilarityFn>,
		weight: Option<f64>,
	) -> Result<()> {
		if let Some(w) = weight {
			if !w.is_finite() || w < 0.0 {
				return Err(AgentError::InvalidWeight(w));
			}
		}
		let targets: Vec<String> = if attributes.is_empty() {
			self.schema.clone()
		} else {
			attributes
				.iter()
				.map(|a| {
					if self.schema.iter().any(|s| s == a) {
						Ok((*a).to_owned())
					} else {
						Err(AgentError::UnknownAttribute((*a).to_owned()))
					}
				})
				.collect::<Result<_>>()?
		};
		if function.is_none() && weight.is_none() {
			for attribute in &targets {
				self.registry.remove(attribute);
			}
			return Ok(());
		}
		for attribute in &targets {
			self.registry.set(attribute, function.clone(), weight);
		}
		Ok(())
	}

	fn effective_temperature(&self) -> f64 {
		self.temperature.unwrap_or_else(|| {
			if self.params.noise == 0.0 {
				// Degenerate but permitted configuration; see set_noise.
				1.0
			} else {
				std::f64::consts::SQRT_2 * self.params.noise
			}
		})
	}

	fn declared(&self) -> bool {
		!self.attributes.is_empty()
	}

	// ========================================================================
	// Choose / Respond
	// ========================================================================

	/// Choose among options by highest blended value.
	///
	/// Advances the clock by one and leaves the decision pending until
	/// `respond`. Exact blended-value ties resolve to the first-listed
	/// option.
	///
	/// # Errors
	///
	/// Protocol error while a non-delayed response is pending; validation
	/// errors for empty, malformed, or duplicate options; `NoExperience`
	/// when a candidate has no retrievable instance and no default utility
	/// is set. Validation failures leave the agent unchanged.
	pub fn choose(&mut self, options: &[Choice]) -> Result<Choice> {
		self.run_choose(options).map(|(choice, _)| choice)
	}

	/// Like [`choose`](Self::choose), also returning per-candidate detail
	/// records ordered by descending blended value.
	///
	/// # Errors
	///
	/// As [`choose`](Self::choose).
	pub fn choose_details(&mut self, options: &[Choice]) -> Result<(Choice, Vec<ChoiceDetail>)> {
		self.run_choose(options)
	}

	/// Repeat the previous `choose` with the same option set.
	///
	/// # Errors
	///
	/// As [`choose`](Self::choose); `NoOptions` when nothing was chosen yet.
	pub fn choose_again(&mut self) -> Result<Choice> {
		let options = self
			.previous_options
			.clone()
			.ok_or(AgentError::NoOptions)?;
		self.choose(&options)
	}

	fn run_choose(&mut self, options: &[Choice]) -> Result<(Choice, Vec<ChoiceDetail>)> {
		if self.pending.is_some() {
			return Err(AgentError::ResponsePending);
		}
		if options.is_empty() {
			return Err(AgentError::NoOptions);
		}
		let declared = self.declared();
		let mut candidates: Vec<(Choice, DecisionKey)> = Vec::with_capacity(options.len());
		let mut seen = HashSet::new();
		for option in options {
			let key = option.canonical(&self.schema, declared)?;
			if !seen.insert(key.clone()) {
				return Err(AgentError::DuplicateOption(option.to_string()));
			}
			candidates.push((option.clone(), key));
		}

		// Blend at the advanced clock, but only commit the advance (and any
		// default-utility materialization) once every candidate has a value.
		let now = self.time + 1;
		let temperature = self.effective_temperature();
		let mut blended = Vec::with_capacity(candidates.len());
		let mut retrievals = Vec::with_capacity(candidates.len());
		let mut defaulted: Vec<(usize, f64)> = Vec::new();
		{
			let store = self.store.lock();
			let mut ctx = BlendContext {
				store: &store,
				schema: &self.schema,
				registry: &self.registry,
				params: &self.params,
				temperature,
				now,
				rng: &mut self.rng,
				cache: &mut self.cache,
			};
			for (i, (option, key)) in candidates.iter().enumerate() {
				match ctx.blend(key)? {
					Some(candidate) => {
						blended.push(candidate.blended);
						retrievals.push(candidate.retrievals);
					}
					None => {
						let utility = self
							.default_utility
							.as_ref()
							.ok_or_else(|| AgentError::NoExperience(option.to_string()))?
							.evaluate(option);
						blended.push(utility);
						retrievals.push(Vec::new());
						defaulted.push((i, utility));
					}
				}
			}
		}

		let mut chosen = 0;
		for i in 1..blended.len() {
			if blended[i] > blended[chosen] {
				chosen = i;
			}
		}

		if self.default_utility_populates && !defaulted.is_empty() {
			let mut store = self.store.lock();
			for (i, utility) in &defaulted {
				store.add(
					candidates[*i].1.clone(),
					*utility,
					self.time,
					Origin::Prepopulated,
				);
			}
		}
		self.time = now;
		self.previous_options = Some(options.to_vec());

		let mut details: Vec<ChoiceDetail> = candidates
			.iter()
			.zip(blended.iter().zip(retrievals))
			.map(|((option, _), (&blended_value, retrievals))| ChoiceDetail {
				choice: option.clone(),
				blended_value,
				retrievals,
			})
			.collect();
		details.sort_by(|a, b| {
			b.blended_value
				.partial_cmp(&a.blended_value)
				.unwrap_or(std::cmp::Ordering::Equal)
		});

		let choice = candidates[chosen].0.clone();
		tracing::debug!(
			agent = %self.name,
			time = self.time,
			choice = %choice,
			blended = blended[chosen],
			"choice selected"
		);
		self.pending = Some(PendingDecision {
			candidates,
			blended,
			chosen,
		});
		Ok((choice, details))
	}

	/// Close the pending decision with an observed outcome, writing or
	/// reinforcing the chosen decision's instance at the current time.
	///
	/// # Errors
	///
	/// Protocol error when no decision is pending.
	pub fn respond(&mut self, outcome: f64) -> Result<()> {
		let index = self.resolve_pending(None)?;
		self.commit_response(index, outcome);
		Ok(())
	}

	/// Close the pending decision, crediting `choice` (which must be one of
	/// the pending candidates) instead of the one `choose` returned.
	///
	/// # Errors
	///
	/// As [`respond`](Self::respond), plus `UnknownCandidate` when `choice`
	/// was not among the pending candidates.
	pub fn respond_for(&mut self, choice: &Choice, outcome: f64) -> Result<()> {
		let index = self.resolve_pending(Some(choice))?;
		self.commit_response(index, outcome);
		Ok(())
	}

	/// Close the pending decision without knowing the outcome yet.
	///
	/// The blended expectation computed at selection time is recorded
	/// provisionally, and the returned [`DelayedResponse`] can rewrite it
	/// whenever the real outcome arrives, in any order relative to other
	/// outstanding tokens and later cycles.
	///
	/// # Errors
	///
	/// Protocol error when no decision is pending; rejected under optimized
	/// learning, which discards the occurrence history a later correction
	/// needs.
	pub fn respond_delayed(&mut self) -> Result<DelayedResponse> {
		self.delayed_inner(None)
	}

	/// Open a delayed response credited to `choice` instead of the chosen
	/// candidate, using that candidate's blended value as the expectation.
	///
	/// # Errors
	///
	/// As [`respond_delayed`](Self::respond_delayed), plus
	/// `UnknownCandidate` when `choice` was not among the pending
	/// candidates.
	pub fn respond_delayed_for(&mut self, choice: &Choice) -> Result<DelayedResponse> {
		self.delayed_inner(Some(choice))
	}

	fn resolve_pending(&self, choice: Option<&Choice>) -> Result<usize> {
		let pending = self.pending.as_ref().ok_or(AgentError::NoChoicePending)?;
		match choice {
			None => Ok(pending.chosen),
			Some(c) => {
				let key = c.canonical(&self.schema, self.declared())?;
				pending
					.candidates
					.iter()
					.position(|(_, k)| *k == key)
					.ok_or_else(|| AgentError::UnknownCandidate(c.to_string()))
			}
		}
	}

	fn commit_response(&mut self, index: usize, outcome: f64) {
		let Some(pending) = self.pending.take() else {
			return;
		};
		let (_, key) = &pending.candidates[index];
		self.store
			.lock()
			.add(key.clone(), outcome, self.time, Origin::Experienced);
		tracing::debug!(
			agent = %self.name,
			time = self.time,
			decision = %key,
			outcome,
			"response recorded"
		);
	}

	fn delayed_inner(&mut self, choice: Option<&Choice>) -> Result<DelayedResponse> {
		let index = self.resolve_pending(choice)?;
		if self.params.optimized_learning {
			return Err(AgentError::DelayedFeedbackUnsupported);
		}
		let Some(pending) = self.pending.take() else {
			return Err(AgentError::NoChoicePending);
		};
		let (_, key) = &pending.candidates[index];
		let expectation = pending.blended[index];
		self.store
			.lock()
			.add(key.clone(), expectation, self.time, Origin::Experienced);
		tracing::debug!(
			agent = %self.name,
			time = self.time,
			decision = %key,
			expectation,
			"delayed response opened"
		);
		Ok(DelayedResponse::new(
			Arc::clone(&self.store),
			key.clone(),
			self.time,
			expectation,
		))
	}

	// ========================================================================
	// Memory management
	// ========================================================================

	/// Seed instances for each decision at the current time.
	///
	/// # Errors
	///
	/// Validation errors for malformed decisions; nothing is written on
	/// failure.
	pub fn populate(&mut self, decisions: &[Choice], outcome: f64) -> Result<()> {
		self.populate_at(decisions, outcome, self.time)
	}

	/// Seed instances at an explicit (possibly earlier) time.
	///
	/// # Errors
	///
	/// Rejects times the clock has not reached, and malformed decisions;
	/// nothing is written on failure.
	pub fn populate_at(&mut self, decisions: &[Choice], outcome: f64, time: u64) -> Result<()> {
		if time > self.time {
			return Err(AgentError::FutureTime {
				time,
				now: self.time,
			});
		}
		let declared = self.declared();
		let keys: Vec<DecisionKey> = decisions
			.iter()
			.map(|d| d.canonical(&self.schema, declared))
			.collect::<Result<_>>()?;
		let mut store = self.store.lock();
		for key in keys {
			store.add(key, outcome, time, Origin::Prepopulated);
		}
		Ok(())
	}

	/// Forget all experience and rewind the clock to 0, keeping the whole
	/// configuration (parameters, similarity registry, random source).
	///
	/// With `preserve_prepopulated`, instances created before the first
	/// experienced outcome survive, re-seeded at their creation times.
	pub fn reset(&mut self, preserve_prepopulated: bool) {
		self.store.lock().clear(preserve_prepopulated);
		self.time = 0;
		self.pending = None;
		self.previous_options = None;
		self.cache.clear();
	}

	/// Move the clock forward without recording anything.
	pub fn advance(&mut self, steps: u64) -> u64 {
		self.time += steps;
		self.time
	}

	/// Move the clock forward to an absolute target.
	///
	/// # Errors
	///
	/// Rejects targets behind the clock, leaving it unchanged.
	pub fn advance_to(&mut self, target: u64) -> Result<u64> {
		if target < self.time {
			return Err(AgentError::TargetBehindClock {
				target,
				now: self.time,
			});
		}
		self.time = target;
		Ok(self.time)
	}

	/// Read-only snapshot of the instance store, in insertion order.
	#[must_use]
	pub fn instances(&self) -> Vec<InstanceRecord> {
		self.store.lock().records()
	}

	/// Export the instance store as CSV.
	///
	/// # Errors
	///
	/// Propagates I/O errors from the writer.
	pub fn write_instances_csv<W: io::Write>(&self, writer: W) -> io::Result<()> {
		write_csv(&self.instances(), writer)
	}

	/// Blend over a discrete attribute instead of outcomes: one softmax
	/// across every instance matching `conditions`, aggregated by the value
	/// of `attribute`. Returns the most probable value (ties resolve to the
	/// first encountered) and the full distribution in first-encounter
	/// order. Does not advance the clock.
	///
	/// # Errors
	///
	/// Rejects unknown attribute names, conditions that are not an
	/// attribute bag, and conditions constraining the blend attribute
	/// itself.
	pub fn discrete_blend(
		&mut self,
		attribute: &str,
		conditions: &Choice,
	) -> Result<(Option<Value>, Vec<(Value, f64)>)> {
		let blend_index = self
			.schema
			.iter()
			.position(|a| a == attribute)
			.ok_or_else(|| AgentError::UnknownAttribute(attribute.to_owned()))?;
		let Choice::Attributes(entries) = conditions else {
			return Err(AgentError::MalformedOption(conditions.to_string()));
		};
		let mut parsed: Vec<(usize, Value)> = Vec::with_capacity(entries.len());
		for (name, value) in entries {
			if name == attribute {
				return Err(AgentError::MalformedOption(conditions.to_string()));
			}
			let index = self
				.schema
				.iter()
				.position(|a| a == name)
				.ok_or_else(|| AgentError::UnknownAttribute(name.clone()))?;
			parsed.push((index, value.clone()));
		}
		let temperature = self.effective_temperature();
		let distribution = {
			let store = self.store.lock();
			let mut ctx = BlendContext {
				store: &store,
				schema: &self.schema,
				registry: &self.registry,
				params: &self.params,
				temperature,
				now: self.time,
				rng: &mut self.rng,
				cache: &mut self.cache,
			};
			ctx.discrete(blend_index, &parsed)?
		};
		let mut best: Option<(Value, f64)> = None;
		for (value, mass) in &distribution {
			if best.as_ref().map_or(true, |(_, m)| *mass > *m) {
				best = Some((value.clone(), *mass));
			}
		}
		Ok((best.map(|(value, _)| value), distribution))
	}
}

impl Default for Agent {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Agent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Agent")
			.field("name", &self.name)
			.field("attributes", &self.attributes)
			.field("time", &self.time)
			.field("params", &self.params)
			.field("temperature", &self.temperature)
			.field("instances", &self.store.lock().len())
			.finish_non_exhaustive()
	}
}
