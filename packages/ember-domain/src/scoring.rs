use time::{Duration, OffsetDateTime};

pub const SIMILARITY_POINTS: f32 = 50.0;
pub const STRENGTH_POINTS: f32 = 30.0;
pub const ACCESS_POINTS_PER_HIT: f32 = 2.0;
pub const ACCESS_POINTS_CAP: f32 = 20.0;
pub const RECENT_DAY_BONUS: f32 = 10.0;
pub const RECENT_WEEK_BONUS: f32 = 5.0;

#[derive(Clone, Copy, Debug)]
pub struct ScoreInputs {
	pub similarity: Option<f32>,
	pub similarity_weight: f32,
	pub strength: f32,
	pub access_count: i64,
	pub last_accessed_at: Option<OffsetDateTime>,
}

pub fn score(inputs: ScoreInputs, now: OffsetDateTime) -> f32 {
	let similarity_term = inputs
		.similarity
		.filter(|value| value.is_finite())
		.map(|value| value * SIMILARITY_POINTS * inputs.similarity_weight)
		.unwrap_or(0.0);
	let strength_term = inputs.strength * STRENGTH_POINTS;
	let access_term =
		(inputs.access_count.max(0) as f32 * ACCESS_POINTS_PER_HIT).min(ACCESS_POINTS_CAP);

	similarity_term + strength_term + access_term + recency_bonus(inputs.last_accessed_at, now)
}

pub fn recency_bonus(last_accessed_at: Option<OffsetDateTime>, now: OffsetDateTime) -> f32 {
	let Some(last_accessed_at) = last_accessed_at else { return 0.0 };
	let age = now - last_accessed_at;

	if age < Duration::days(1) {
		RECENT_DAY_BONUS
	} else if age < Duration::days(7) {
		RECENT_WEEK_BONUS
	} else {
		0.0
	}
}

pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn missing_last_access_earns_no_bonus() {
		assert_eq!(recency_bonus(None, datetime!(2026-01-10 00:00 UTC)), 0.0);
	}

	#[test]
	fn access_term_saturates() {
		let now = datetime!(2026-01-10 00:00 UTC);
		let inputs = ScoreInputs {
			similarity: None,
			similarity_weight: 1.0,
			strength: 0.0,
			access_count: 1_000,
			last_accessed_at: None,
		};

		assert_eq!(score(inputs, now), ACCESS_POINTS_CAP);
	}

	#[test]
	fn mismatched_dimensions_have_no_similarity() {
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), None);
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
	}
}
