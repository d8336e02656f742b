//! Kitsu API integration
//!
//! Resolves anime series: search by title, genres by id.

mod client;
pub mod dto;

pub use client::{DEFAULT_KITSU_URL, KitsuClient};
