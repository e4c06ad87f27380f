//! # IBL Core
//!
//! A sequential decision engine implementing Instance-Based Learning (IBL)
//! theory on top of ACT-R activation dynamics.
//!
//! ## Why Instance-Based Learning?
//!
//! Most decision models summarize experience into a handful of learned
//! weights. People don't seem to: choice behavior under uncertainty tracks
//! individual remembered episodes, weighted by how retrievable they are
//! right now. IBL models this directly:
//!
//! - **Every experience is kept** - a (decision, outcome) pair with its
//!   occurrence history
//! - **Retrieval is graded** - recency, frequency, similarity, and noise
//!   determine how much each instance contributes
//! - **Values are blended** - a candidate's worth is the retrieval-weighted
//!   average of remembered outcomes
//! - **Feedback can arrive late** - provisional expectations stand in until
//!   the real outcome is known
//!
//! ## Core Concepts
//!
//! ### Activation
//!
//! Every instance has an activation that determines its retrieval weight:
//!
//! 1. **Base-level activation** - recency and frequency of occurrences
//!    ```text
//!    B = ln[Σ (t - o)^(-d)]
//!    ```
//!
//! 2. **Partial matching** - similarity-weighted penalty for near matches
//!    ```text
//!    M = -P Σ w_a (1 - sim_a(query, instance))
//!    ```
//!
//! 3. **Activation noise** - a logistic draw scaled by the noise parameter
//!
//! ### Blending
//!
//! Retrieval probabilities come from a softmax over activation,
//!
//! ```text
//! p_i = exp(A_i / T) / Σ_j exp(A_j / T)
//! ```
//!
//! and a candidate's blended value is `Σ p_i u_i`. `choose` picks the
//! candidate with the greatest blended value; exploration enters through
//! the per-instance noise.
//!
//! ## Example
//!
//! ```rust
//! use ibl_core::{Agent, Choice};
//!
//! # fn main() -> ibl_core::Result<()> {
//! let mut agent = Agent::new();
//! agent.seed(42);
//! // Hypothesize 10 for options never tried, so both get explored.
//! agent.set_default_utility(Some(10.0));
//!
//! let options = [Choice::from("safe"), Choice::from("risky")];
//! for _ in 0..50 {
//!     let choice = agent.choose(&options)?;
//!     let payoff = if choice == Choice::from("safe") {
//!         1.0
//!     } else if agent.time() % 4 == 0 {
//!         3.0
//!     } else {
//!         0.0
//!     };
//!     agent.respond(payoff)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## References
//!
//! - Gonzalez, C., Lerch, J. F., & Lebiere, C. (2003). *Instance-based
//!   learning in dynamic decision making*
//! - Anderson, J. R. (2007). *How Can the Human Mind Occur in the Physical
//!   Universe?* - ACT-R activation and blending
//! - Lebiere, C. (1999). *Blending: An ACT-R mechanism for aggregate
//!   retrievals*

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::needless_return)]

pub mod activation;
pub mod agent;
pub mod blending;
pub mod choice;
pub mod delayed;
pub mod error;
pub mod instance;
pub mod similarity;

pub use activation::{
	base_level, base_level_optimized, logistic_noise, ActivationBreakdown, ActivationParams,
};
pub use agent::Agent;
pub use blending::{
	blended_value, retrieval_probabilities, ChoiceDetail, RetrievalDetail, MINIMUM_TEMPERATURE,
};
pub use choice::{Choice, DecisionKey, Value};
pub use delayed::DelayedResponse;
pub use error::{AgentError, Result};
pub use instance::InstanceRecord;
pub use similarity::{
	bounded_linear_similarity, bounded_quadratic_similarity, equality_similarity,
	numeric_similarity, positive_linear_similarity, positive_quadratic_similarity, SimilarityFn,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_basic_decision_loop() {
		let mut agent = Agent::new();
		agent.seed(1);
		agent.set_default_utility(Some(5.0));
		let options = [Choice::from("safe"), Choice::from("risky")];
		for _ in 0..20 {
			let choice = agent.choose(&options).unwrap();
			let payoff = if choice == Choice::from("safe") { 1.0 } else { 2.0 };
			agent.respond(payoff).unwrap();
		}
		assert_eq!(agent.time(), 20);
		// Both options were tried and remembered.
		let decisions: std::collections::HashSet<String> = agent
			.instances()
			.iter()
			.map(|r| r.decision.to_string())
			.collect();
		assert!(decisions.contains("safe") && decisions.contains("risky"));
	}
}
