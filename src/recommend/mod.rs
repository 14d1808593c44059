//! Genre-preference recommendations.
//!
//! [`RecommendationEngine`] turns a user's favorite-genre multiset into a
//! bounded, duplicate-free movie list, falling back to popularity ranking
//! when there is no signal. User profiles are read through the
//! [`ProfileStore`] collaborator trait; this crate never writes them.

mod engine;
mod profile;

pub use engine::RecommendationEngine;
pub use profile::{MemoryProfileStore, ProfileStore, UserProfile};
