//! OMDb API integration
//!
//! Primary title database: exact title/year lookups, searches and detail
//! records (year and genres) keyed by IMDb id.
//!
//! API docs: https://www.omdbapi.com/

mod adapter;
mod client;
pub mod dto;

pub use client::{DEFAULT_OMDB_URL, OmdbClient};
