use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
	Fact,
	Task,
	Digest,
}
impl MemoryKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Fact => "fact",
			Self::Task => "task",
			Self::Digest => "digest",
		}
	}

	/// Strength assigned at creation. Digests start weaker so they are evicted first.
	pub fn initial_strength(self) -> f32 {
		match self {
			Self::Fact | Self::Task => 1.0,
			Self::Digest => 0.5,
		}
	}
}

impl fmt::Display for MemoryKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for MemoryKind {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"fact" => Ok(Self::Fact),
			"task" => Ok(Self::Task),
			"digest" => Ok(Self::Digest),
			other => Err(format!("Unknown memory kind {other:?}.")),
		}
	}
}
