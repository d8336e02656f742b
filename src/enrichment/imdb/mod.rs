//! IMDb find integration
//!
//! Secondary search whose result buckets (exact, popular, approximate,
//! substring) are flattened in priority order.

mod client;
pub mod dto;

pub use client::{DEFAULT_IMDB_FIND_URL, ImdbFindClient};
