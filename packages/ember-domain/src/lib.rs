pub mod candidate;
pub mod clock;
pub mod eviction;
pub mod keyword;
pub mod kind;
pub mod model_json;
pub mod reconcile;
pub mod retry;
pub mod scoring;
pub mod settings;
pub mod time_serde;
pub mod transcript;

pub use kind::MemoryKind;

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Upper bound for `strength`; pinning resets to it and reinforcement saturates at it.
pub const MAX_STRENGTH: f32 = 1.0;
