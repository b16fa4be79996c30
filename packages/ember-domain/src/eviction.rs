use time::OffsetDateTime;

pub trait Evictable {
	fn is_permanent(&self) -> bool;

	fn strength(&self) -> f32;

	fn updated_at(&self) -> OffsetDateTime;
}

pub fn at_capacity(len: usize, capacity: usize) -> bool {
	len >= capacity
}

/// Weakest non-permanent entry; ties go to the least recently updated one.
///
/// Returns `None` when every entry is permanent, in which case nothing may be evicted.
pub fn select_victim<T>(items: &[T]) -> Option<&T>
where
	T: Evictable,
{
	items.iter().filter(|item| !item.is_permanent()).min_by(|a, b| {
		a.strength().total_cmp(&b.strength()).then_with(|| a.updated_at().cmp(&b.updated_at()))
	})
}
