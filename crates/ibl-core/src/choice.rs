//! Option canonicalization.
//!
//! Callers present options in whatever shape their task produces: a bare
//! value, a positional list of attribute values, or a named attribute bag.
//! The agent reduces every shape to a [`DecisionKey`], an ordered tuple of
//! [`Value`]s laid out by its attribute schema. The key is what instances
//! are stored and matched under; the original [`Choice`] is what callers
//! get back from `choose`.

use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Name of the implicit attribute used by agents without a declared schema.
pub(crate) const DECISION_ATTRIBUTE: &str = "_decision";

/// A single attribute or decision value.
///
/// Floating-point values are wrapped in [`OrderedFloat`] so keys hash and
/// compare; equality on them is bit equality, so near-equal outcomes never
/// merge into one instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
	/// An attribute the option does not specify.
	Nil,
	/// Boolean value.
	Bool(bool),
	/// Integer value.
	Int(i64),
	/// Floating-point value.
	Num(OrderedFloat<f64>),
	/// String value.
	Str(String),
}

impl Value {
	/// Numeric view of this value, if it has one.
	#[must_use]
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Int(i) => Some(*i as f64),
			Self::Num(n) => Some(n.into_inner()),
			Self::Nil | Self::Bool(_) | Self::Str(_) => None,
		}
	}

	/// Whether this is the missing-attribute marker.
	#[must_use]
	pub const fn is_nil(&self) -> bool {
		matches!(self, Self::Nil)
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Self::Int(i64::from(v))
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Self::Num(OrderedFloat(v))
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Self::Str(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Self::Str(v)
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Nil => Ok(()),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Int(i) => write!(f, "{i}"),
			Self::Num(n) => write!(f, "{n}"),
			Self::Str(s) => write!(f, "{s}"),
		}
	}
}

/// An option as presented to `choose` or `populate`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
	/// A bare value; for agents with attributes, the first attribute.
	Atom(Value),
	/// Attribute values in schema order; extras beyond the schema are ignored.
	Values(Vec<Value>),
	/// Named attribute entries; names outside the schema are ignored.
	Attributes(Vec<(String, Value)>),
}

impl Choice {
	/// Build a positional option from attribute values in schema order.
	pub fn values<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
		Self::Values(values.into_iter().map(Into::into).collect())
	}

	/// Build a named-attribute option.
	pub fn attributes<K: Into<String>, V: Into<Value>>(
		entries: impl IntoIterator<Item = (K, V)>,
	) -> Self {
		Self::Attributes(
			entries
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}

	/// Canonicalize against the schema. `declared` distinguishes agents with
	/// a real attribute schema from the implicit single-attribute case.
	pub(crate) fn canonical(&self, schema: &[String], declared: bool) -> Result<DecisionKey> {
		if !declared {
			return match self {
				Self::Atom(v) => Ok(DecisionKey(vec![v.clone()])),
				Self::Values(vs) if vs.len() == 1 => Ok(DecisionKey(vec![vs[0].clone()])),
				Self::Values(_) | Self::Attributes(_) => {
					Err(AgentError::MalformedOption(self.to_string()))
				}
			};
		}
		let key = match self {
			Self::Atom(v) => {
				let mut values = vec![Value::Nil; schema.len()];
				values[0] = v.clone();
				values
			}
			Self::Values(vs) => {
				let mut values: Vec<Value> = vs.iter().take(schema.len()).cloned().collect();
				values.resize(schema.len(), Value::Nil);
				values
			}
			Self::Attributes(entries) => schema
				.iter()
				.map(|attr| {
					entries
						.iter()
						.find(|(name, _)| name == attr)
						.map_or(Value::Nil, |(_, v)| v.clone())
				})
				.collect(),
		};
		Ok(DecisionKey(key))
	}
}

impl From<Value> for Choice {
	fn from(v: Value) -> Self {
		Self::Atom(v)
	}
}

impl From<bool> for Choice {
	fn from(v: bool) -> Self {
		Self::Atom(v.into())
	}
}

impl From<i32> for Choice {
	fn from(v: i32) -> Self {
		Self::Atom(v.into())
	}
}

impl From<i64> for Choice {
	fn from(v: i64) -> Self {
		Self::Atom(v.into())
	}
}

impl From<f64> for Choice {
	fn from(v: f64) -> Self {
		Self::Atom(v.into())
	}
}

impl From<&str> for Choice {
	fn from(v: &str) -> Self {
		Self::Atom(v.into())
	}
}

impl From<String> for Choice {
	fn from(v: String) -> Self {
		Self::Atom(v.into())
	}
}

impl fmt::Display for Choice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Atom(v) => write!(f, "{v}"),
			Self::Values(vs) => {
				write!(f, "(")?;
				for (i, v) in vs.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{v}")?;
				}
				write!(f, ")")
			}
			Self::Attributes(entries) => {
				write!(f, "{{")?;
				for (i, (name, v)) in entries.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{name}: {v}")?;
				}
				write!(f, "}}")
			}
		}
	}
}

/// The canonical identity of an option: attribute values in schema order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionKey(Vec<Value>);

impl DecisionKey {
	/// Attribute values in schema order.
	#[must_use]
	pub fn values(&self) -> &[Value] {
		&self.0
	}
}

impl fmt::Display for DecisionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.0.len() == 1 {
			return write!(f, "{}", self.0[0]);
		}
		write!(f, "(")?;
		for (i, v) in self.0.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{v}")?;
		}
		write!(f, ")")
	}
}
