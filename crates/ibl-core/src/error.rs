//! Error types for agent operations.

use crate::blending::MINIMUM_TEMPERATURE;
use crate::choice::Value;

/// Errors that can occur while configuring or driving an agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
	/// Noise must be a non-negative finite number.
	#[error("noise must be a non-negative finite number, got {0}")]
	InvalidNoise(f64),

	/// Decay must be a non-negative finite number.
	#[error("decay must be a non-negative finite number, got {0}")]
	InvalidDecay(f64),

	/// Optimized learning requires decay below one.
	#[error("decay must be below 1 while optimized learning is enabled, got {0}")]
	DecayConflictsWithOptimized(f64),

	/// Temperature below the usable minimum.
	#[error("temperature must be at least {MINIMUM_TEMPERATURE}, got {0}")]
	InvalidTemperature(f64),

	/// Unsetting the temperature while the value derived from noise would be unusable.
	#[error("cannot derive a usable temperature from noise {0}; set temperature explicitly")]
	UnderivableTemperature(f64),

	/// Mismatch penalty must be a non-negative finite number.
	#[error("mismatch penalty must be a non-negative finite number, got {0}")]
	InvalidMismatchPenalty(f64),

	/// Similarity weights must be non-negative finite numbers.
	#[error("similarity weight must be a non-negative finite number, got {0}")]
	InvalidWeight(f64),

	/// A similarity function returned a value outside [0, 1].
	#[error("similarity for attribute {attribute:?} returned {value}, outside [0, 1]")]
	InvalidSimilarity {
		/// Attribute whose similarity function misbehaved
		attribute: String,
		/// The out-of-range value it returned
		value: f64,
	},

	/// A numeric similarity function was handed a non-numeric value.
	#[error("similarity arguments must be numeric, got {0} and {1}")]
	NonNumericSimilarityArgument(Value, Value),

	/// Ratio similarities are only defined for positive numbers.
	#[error("similarity arguments must be positive, got {0} and {1}")]
	NonPositiveSimilarityArgument(f64, f64),

	/// Bounded similarities need a non-empty range.
	#[error("similarity bounds must satisfy minimum < maximum, got {minimum} and {maximum}")]
	InvalidBounds {
		/// Lower bound supplied
		minimum: f64,
		/// Upper bound supplied
		maximum: f64,
	},

	/// Attribute names must be mutually distinct.
	#[error("duplicate attribute name {0:?}")]
	DuplicateAttribute(String),

	/// An attribute name outside the agent's schema.
	#[error("attribute {0:?} is not part of the agent's schema")]
	UnknownAttribute(String),

	/// `choose` needs at least one option.
	#[error("options must not be empty")]
	NoOptions,

	/// Two options canonicalized to the same decision key.
	#[error("options must be mutually distinct; {0} appears more than once")]
	DuplicateOption(String),

	/// An option that cannot be canonicalized against the attribute schema.
	#[error("option {0} does not fit the agent's attribute schema")]
	MalformedOption(String),

	/// A candidate with no retrievable instances and no default utility.
	#[error("no experience for option {0} and no default utility is set")]
	NoExperience(String),

	/// `choose` was called while the previous choice awaits a response.
	#[error("choose() called while a response to the previous choice is pending")]
	ResponsePending,

	/// `respond` was called with no choice pending.
	#[error("respond() called with no choice pending")]
	NoChoicePending,

	/// `respond_for` named an option that was not among the pending candidates.
	#[error("option {0} was not among the pending candidates")]
	UnknownCandidate(String),

	/// A write at a time the clock has not reached yet.
	#[error("time {time} is in the future (clock is at {now})")]
	FutureTime {
		/// Requested write time
		time: u64,
		/// Current clock value
		now: u64,
	},

	/// `advance_to` with a target behind the clock.
	#[error("advance target {target} is behind the clock ({now})")]
	TargetBehindClock {
		/// Requested target time
		target: u64,
		/// Current clock value
		now: u64,
	},

	/// Optimized learning can only change while the store is empty.
	#[error("optimized learning can only be changed while no instances are stored")]
	OptimizedLearningLocked,

	/// Delayed feedback needs the occurrence history that optimized learning discards.
	#[error("delayed feedback requires full occurrence history; disable optimized learning")]
	DelayedFeedbackUnsupported,

	/// The instance behind a delayed response is gone (typically after `reset`).
	#[error("the delayed response no longer matches a stored instance")]
	StaleDelayedResponse,
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
