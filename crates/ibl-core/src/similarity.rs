//! Attribute similarity.
//!
//! Partial matching compares a query attribute against a stored attribute
//! through a registered similarity function `(value, value) -> [0, 1]`.
//! Attributes without a registered function are exact-match only. Each
//! entry also carries a weight that scales its share of the mismatch
//! penalty.
//!
//! The stock constructors mirror the similarity shapes decision modellers
//! actually use: ratio similarity for positive magnitudes and
//! range-normalized similarity for bounded scales, each in a linear and a
//! squared variant.

use std::collections::HashMap;
use std::sync::Arc;

use crate::choice::Value;
use crate::error::{AgentError, Result};

/// A similarity function over attribute values, returning a value in [0, 1].
pub type SimilarityFn = Arc<dyn Fn(&Value, &Value) -> Result<f64> + Send + Sync>;

/// One registered attribute: an optional function (absent means equality
/// similarity) and a weight.
#[derive(Clone)]
pub(crate) struct SimilarityEntry {
	pub function: Option<SimilarityFn>,
	pub weight: f64,
}

impl SimilarityEntry {
	/// Evaluate this entry's similarity between a query and a stored value.
	pub fn evaluate(&self, query: &Value, stored: &Value) -> Result<f64> {
		match &self.function {
			Some(f) => f(query, stored),
			None => Ok(if query == stored { 1.0 } else { 0.0 }),
		}
	}
}

/// Per-attribute table of similarity entries.
#[derive(Clone, Default)]
pub(crate) struct SimilarityRegistry {
	entries: HashMap<String, SimilarityEntry>,
}

impl SimilarityRegistry {
	pub fn get(&self, attribute: &str) -> Option<&SimilarityEntry> {
		self.entries.get(attribute)
	}

	/// Set or update an entry. A missing function keeps whatever function
	/// the entry already has (equality similarity for new entries); a
	/// missing weight keeps the current weight (1 for new entries).
	pub fn set(&mut self, attribute: &str, function: Option<SimilarityFn>, weight: Option<f64>) {
		let entry = self
			.entries
			.entry(attribute.to_owned())
			.or_insert(SimilarityEntry {
				function: None,
				weight: 1.0,
			});
		if function.is_some() {
			entry.function = function;
		}
		if let Some(w) = weight {
			entry.weight = w;
		}
	}

	pub fn remove(&mut self, attribute: &str) {
		let _ = self.entries.remove(attribute);
	}
}

// ============================================================================
// Stock similarity functions
// ============================================================================

fn numeric_pair(x: &Value, y: &Value) -> Result<(f64, f64)> {
	match (x.as_f64(), y.as_f64()) {
		(Some(a), Some(b)) => Ok((a, b)),
		_ => Err(AgentError::NonNumericSimilarityArgument(
			x.clone(),
			y.clone(),
		)),
	}
}

/// Exact-equality similarity: 1 for equal values, 0 for anything else.
///
/// The same rule unregistered entries get implicitly; registering it makes
/// an attribute participate in partial matching, so non-equal values are
/// penalized instead of excluding the instance.
#[must_use]
pub fn equality_similarity() -> SimilarityFn {
	Arc::new(|x, y| Ok(if x == y { 1.0 } else { 0.0 }))
}

/// Lift a plain numeric function to a [`SimilarityFn`].
///
/// Non-numeric arguments are rejected; the result is clamped to [0, 1].
pub fn numeric_similarity<F>(f: F) -> SimilarityFn
where
	F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
{
	Arc::new(move |x, y| {
		let (a, b) = numeric_pair(x, y)?;
		Ok(f(a, b).clamp(0.0, 1.0))
	})
}

/// Ratio similarity for positive magnitudes: `min(x, y) / max(x, y)`.
///
/// Scale-free, so 1 vs 2 is as similar as 1000 vs 2000. Arguments must be
/// strictly positive.
#[must_use]
pub fn positive_linear_similarity() -> SimilarityFn {
	Arc::new(|x, y| {
		let (a, b) = numeric_pair(x, y)?;
		positive_ratio(a, b)
	})
}

/// Squared ratio similarity: `(min(x, y) / max(x, y))²`.
///
/// Falls off faster than the linear variant as magnitudes diverge.
#[must_use]
pub fn positive_quadratic_similarity() -> SimilarityFn {
	Arc::new(|x, y| {
		let (a, b) = numeric_pair(x, y)?;
		positive_ratio(a, b).map(|s| s * s)
	})
}

fn positive_ratio(a: f64, b: f64) -> Result<f64> {
	if a <= 0.0 || b <= 0.0 {
		return Err(AgentError::NonPositiveSimilarityArgument(a, b));
	}
	Ok(a.min(b) / a.max(b))
}

/// Range-normalized similarity: `1 - |x - y| / (maximum - minimum)`.
///
/// Arguments outside the range clamp to it, with a diagnostic.
///
/// # Errors
///
/// Returns an error unless `minimum < maximum`.
pub fn bounded_linear_similarity(minimum: f64, maximum: f64) -> Result<SimilarityFn> {
	bounded(minimum, maximum, |s| s)
}

/// Squared range-normalized similarity: `(1 - |x - y| / (maximum - minimum))²`.
///
/// # Errors
///
/// Returns an error unless `minimum < maximum`.
pub fn bounded_quadratic_similarity(minimum: f64, maximum: f64) -> Result<SimilarityFn> {
	bounded(minimum, maximum, |s| s * s)
}

fn bounded<F>(minimum: f64, maximum: f64, shape: F) -> Result<SimilarityFn>
where
	F: Fn(f64) -> f64 + Send + Sync + 'static,
{
	if !(minimum < maximum) {
		return Err(AgentError::InvalidBounds { minimum, maximum });
	}
	let span = maximum - minimum;
	Ok(Arc::new(move |x, y| {
		let (a, b) = numeric_pair(x, y)?;
		let (ca, cb) = (a.clamp(minimum, maximum), b.clamp(minimum, maximum));
		if ca != a || cb != b {
			tracing::warn!(
				minimum,
				maximum,
				"similarity arguments outside bounds, clamping"
			);
		}
		Ok(shape(1.0 - (ca - cb).abs() / span))
	}))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn close(a: f64, b: f64) {
		assert!((a - b).abs() < 1e-10, "{a} vs {b}");
	}

	#[test]
	fn test_positive_linear() {
		let f = positive_linear_similarity();
		close(f(&Value::from(1.0), &Value::from(2.0)).unwrap(), 0.5);
		close(f(&Value::from(2.0), &Value::from(1.0)).unwrap(), 0.5);
		close(f(&Value::from(10.0), &Value::from(100.0)).unwrap(), 0.1);
		close(f(&Value::from(1999.0), &Value::from(2000.0)).unwrap(), 0.9995);
		close(f(&Value::from(1.0), &Value::from(1.0)).unwrap(), 1.0);
		close(f(&Value::from(0.001), &Value::from(0.002)).unwrap(), 0.5);
		assert!(f(&Value::from(0.0), &Value::from(1.0)).is_err());
		assert!(f(&Value::from(1.0), &Value::from(-1.0)).is_err());
		assert!(f(&Value::from("one"), &Value::from(1.0)).is_err());
	}

	#[test]
	fn test_positive_linear_scale_free() {
		let f = positive_linear_similarity();
		for i in 0..40 {
			let n = 10.0_f64.powi(i);
			close(
				f(&Value::from(2e-20 * n), &Value::from(3e-20 * n)).unwrap(),
				2.0 / 3.0,
			);
		}
	}

	#[test]
	fn test_positive_quadratic() {
		let f = positive_quadratic_similarity();
		close(f(&Value::from(1.0), &Value::from(2.0)).unwrap(), 0.25);
		close(f(&Value::from(10.0), &Value::from(100.0)).unwrap(), 0.01);
		close(f(&Value::from(1.0), &Value::from(1.0)).unwrap(), 1.0);
	}

	#[test]
	fn test_bounded_linear() {
		let f = bounded_linear_similarity(-1.0, 1.0).unwrap();
		close(f(&Value::from(0.0), &Value::from(1.0)).unwrap(), 0.5);
		close(f(&Value::from(-0.1), &Value::from(0.1)).unwrap(), 0.9);
		close(f(&Value::from(-1.0), &Value::from(1.0)).unwrap(), 0.0);
		close(f(&Value::from(0.0), &Value::from(0.0)).unwrap(), 1.0);
		// Out-of-range arguments clamp.
		close(f(&Value::from(-2.0), &Value::from(0.0)).unwrap(), 0.5);
		assert!(f(&Value::from("zero"), &Value::from(0.0)).is_err());
	}

	#[test]
	fn test_bounded_linear_translation_invariant() {
		let f = bounded_linear_similarity(0.0, 100.0).unwrap();
		for i in 0..95 {
			let (a, b) = (f64::from(i), f64::from(i + 5));
			close(f(&Value::from(a), &Value::from(b)).unwrap(), 0.95);
			close(f(&Value::from(b), &Value::from(a)).unwrap(), 0.95);
		}
	}

	#[test]
	fn test_bounded_quadratic() {
		let f = bounded_quadratic_similarity(-1.0, 1.0).unwrap();
		close(f(&Value::from(0.0), &Value::from(1.0)).unwrap(), 0.25);
		close(f(&Value::from(-0.1), &Value::from(0.1)).unwrap(), 0.81);
	}

	#[test]
	fn test_bounds_validation() {
		assert!(bounded_linear_similarity(1.0, -2.0).is_err());
		assert!(bounded_linear_similarity(0.0, 0.0).is_err());
		assert!(bounded_quadratic_similarity(3.0, 3.0).is_err());
	}

	#[test]
	fn test_equality_entry() {
		let entry = SimilarityEntry {
			function: None,
			weight: 1.0,
		};
		close(
			entry
				.evaluate(&Value::from("red"), &Value::from("red"))
				.unwrap(),
			1.0,
		);
		close(
			entry
				.evaluate(&Value::from("red"), &Value::from("blue"))
				.unwrap(),
			0.0,
		);
	}

	#[test]
	fn test_registry_weight_only_update_keeps_function() {
		let mut registry = SimilarityRegistry::default();
		registry.set("n", Some(numeric_similarity(|x, y| 1.0 - (x - y).abs())), None);
		registry.set("n", None, Some(0.5));
		let entry = registry.get("n").unwrap();
		assert!(entry.function.is_some());
		close(entry.weight, 0.5);
		registry.remove("n");
		assert!(registry.get("n").is_none());
	}
}
