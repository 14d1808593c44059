//! Upstream catalog access.
//!
//! [`CatalogClient`] wraps the paginated third-party catalog API and
//! normalizes its raw JSON into [`MovieRecord`]s. All upstream I/O in the
//! crate goes through this module; aggregators and the recommendation engine
//! never see raw wire shapes.

mod client;
mod types;

pub use client::{BrowseCategory, CatalogClient};
pub use types::{CastMember, CatalogPage, ImageResolver, MovieDetails, MovieRecord};
