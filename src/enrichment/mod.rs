//! Media enrichment module - completes partial records from external metadata
//! providers.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - Internal types that represent our business logic
//! - **API DTOs** (`omdb/dto.rs`, `imdb/dto.rs`, `kitsu/dto.rs`) - Exact API response shapes
//! - **Adapters** - Convert DTOs to domain models
//! - **Clients** - Provider clients, all issuing requests through the coordinator
//! - **Coordinator** - Request deduplication and per-host concurrency bounds
//! - **Resolver** - Fuzzy matching and disambiguation over provider results
//! - **Service** - Composition root wiring the above together
//!
//! # Usage
//!
//! ```ignore
//! use enrichment::{EnrichmentService, EnrichmentConfig, PartialRecord};
//!
//! let service = EnrichmentService::new(EnrichmentConfig::default())?;
//! let record = PartialRecord::new().with_title("Arrietty").with_year(Some(2010));
//! let resolved = service.resolve(record, MediaClass::Movie).await?;
//! println!("{} ({:?})", resolved.title, resolved.year);
//! ```

pub mod coordinator;
pub mod distance;
pub mod domain;
pub mod imdb;
pub mod kitsu;
pub mod omdb;
pub mod resolver;
pub mod service;
pub mod traits;

pub use coordinator::RequestCoordinator;
pub use domain::{CandidateMatch, EnrichmentError, PartialRecord, ResolvedRecord};
pub use resolver::{MATCH_THRESHOLD, Resolver};
pub use service::{EnrichmentConfig, EnrichmentService};
