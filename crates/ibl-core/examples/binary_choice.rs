//! Binary Choice Example
//!
//! The classic safe/risky paradigm from decisions-from-experience research:
//! a safe option always pays 1, a risky option pays 3 a quarter of the time
//! and 0 otherwise. The agent learns from its own experienced outcomes and
//! (like people) ends up underweighting the rare big payoff.
//!
//! Run with: `cargo run --example binary_choice`

use ibl_core::{Agent, Choice};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PARTICIPANTS: usize = 100;
const ROUNDS: usize = 60;

fn main() -> ibl_core::Result<()> {
	let mut agent = Agent::named("binary-choice");
	agent.seed(42);
	// An optimistic prior makes both options worth exploring.
	agent.set_default_utility(Some(10.0));

	let mut reward_rng = StdRng::seed_from_u64(24);
	let options = [Choice::from("safe"), Choice::from("risky")];
	let mut risky_chosen = vec![0_usize; ROUNDS];

	for _ in 0..PARTICIPANTS {
		agent.reset(false);
		for count in &mut risky_chosen {
			let choice = agent.choose(&options)?;
			let payoff = if choice == Choice::from("safe") {
				1.0
			} else {
				*count += 1;
				if reward_rng.gen::<f64>() < 0.25 {
					3.0
				} else {
					0.0
				}
			};
			agent.respond(payoff)?;
		}
	}

	println!("=== Safe/Risky Binary Choice ===\n");
	println!("{PARTICIPANTS} simulated participants, {ROUNDS} rounds each\n");
	println!("fraction choosing risky, by block of 10 rounds:");
	for (block, chunk) in risky_chosen.chunks(10).enumerate() {
		let total: usize = chunk.iter().sum();
		#[allow(clippy::cast_precision_loss)]
		let fraction = total as f64 / (PARTICIPANTS * chunk.len()) as f64;
		println!("  rounds {:>2}-{:>2}: {fraction:.3}", block * 10 + 1, block * 10 + chunk.len());
	}

	Ok(())
}
