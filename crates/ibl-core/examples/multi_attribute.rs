//! Multi-Attribute Choice with Partial Matching
//!
//! Options here are cards with a number and a color, and only cards close
//! to (1, red) pay well. Partial matching lets experience with one card
//! inform the value of similar cards: a stored (2, red) instance partially
//! matches a (3, red) candidate through the numeric similarity function.
//!
//! Run with: `cargo run --example multi_attribute`

use ibl_core::{bounded_linear_similarity, Agent, Choice, Value};

fn card(n: i64, color: &str) -> Choice {
	Choice::attributes([("n", Value::from(n)), ("color", Value::from(color))])
}

fn payoff(n: i64, color: &str) -> f64 {
	let mut value = if color == "red" { 1.0 } else { 0.0 };
	if n == 1 {
		value += 2.0;
	} else if (n - 1).abs() == 1 {
		value += 1.0;
	}
	value
}

fn main() -> ibl_core::Result<()> {
	let mut agent = Agent::with_attributes(["n", "color"])?;
	agent.seed(42);
	agent.set_mismatch_penalty(Some(1.0))?;
	agent.similarity(&["n"], Some(bounded_linear_similarity(1.0, 4.0)?), None)?;

	let cards: Vec<(i64, &str)> = (1_i64..=4)
		.flat_map(|n| ["red", "yellow", "green"].map(|c| (n, c)))
		.collect();
	let options: Vec<Choice> = cards.iter().map(|&(n, c)| card(n, c)).collect();

	// Seed mild optimism for every card, then play.
	agent.populate(&options, 3.2)?;

	println!("=== Multi-Attribute Card Choice ===\n");
	let mut wins = 0_usize;
	let rounds = 200;
	for _ in 0..rounds {
		let choice = agent.choose(&options)?;
		let index = options.iter().position(|o| *o == choice).unwrap_or(0);
		let (n, color) = cards[index];
		let value = payoff(n, color);
		if value >= 3.0 {
			wins += 1;
		}
		agent.respond(value)?;
	}
	#[allow(clippy::cast_precision_loss)]
	let percent = 100.0 * wins as f64 / rounds as f64;
	println!("picked the (1, red) jackpot card in {percent:.1}% of rounds");

	// What number does memory predict for red cards?
	let (best, distribution) =
		agent.discrete_blend("n", &Choice::attributes([("color", Value::from("red"))]))?;
	println!("\nmost retrievable number among red cards: {best:?}");
	for (value, probability) in distribution {
		println!("  n = {value}: {probability:.3}");
	}

	Ok(())
}
