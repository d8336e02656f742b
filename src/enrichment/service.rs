//! Enrichment service - wires providers, the request coordinator and the
//! resolver together.
//!
//! One service owns one [`RequestCoordinator`]; every provider client it
//! builds shares it, so duplicate lookups across concurrent resolutions
//! collapse into a single request.

use std::collections::HashMap;
use std::sync::Arc;

use crate::enrichment::{
    coordinator::{CoordinatorConfig, DEFAULT_HOST_LIMIT, HttpTransport, RequestCoordinator, ReqwestTransport},
    domain::{EnrichmentError, PartialRecord, ResolvedRecord},
    imdb::{DEFAULT_IMDB_FIND_URL, ImdbFindClient},
    kitsu::{DEFAULT_KITSU_URL, KitsuClient},
    omdb::{DEFAULT_OMDB_URL, OmdbClient},
    resolver::Resolver,
};
use crate::model::MediaClass;

/// Configuration for the enrichment service
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub omdb_url: String,
    /// Sent as `apikey` when present
    pub omdb_api_key: Option<String>,
    pub imdb_find_url: String,
    pub kitsu_url: String,
    pub default_host_limit: usize,
    /// Per-host overrides of `default_host_limit`
    pub host_limits: HashMap<String, usize>,
    pub user_agent: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            omdb_url: DEFAULT_OMDB_URL.to_string(),
            omdb_api_key: None,
            imdb_find_url: DEFAULT_IMDB_FIND_URL.to_string(),
            kitsu_url: DEFAULT_KITSU_URL.to_string(),
            default_host_limit: DEFAULT_HOST_LIMIT,
            host_limits: HashMap::new(),
            user_agent: concat!("media-minder/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Completes partial records against the configured providers.
pub struct EnrichmentService {
    coordinator: Arc<RequestCoordinator>,
    resolver: Resolver,
}

impl EnrichmentService {
    /// Create a service that talks to the network.
    pub fn new(config: EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a service over an explicit transport.
    pub fn with_transport(config: EnrichmentConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let coordinator = Arc::new(RequestCoordinator::new(
            transport,
            CoordinatorConfig {
                default_host_limit: config.default_host_limit,
                host_limits: config.host_limits,
            },
        ));

        let resolver = Resolver::new(
            Arc::new(OmdbClient::new(
                Arc::clone(&coordinator),
                config.omdb_url,
                config.omdb_api_key,
            )),
            Arc::new(ImdbFindClient::new(Arc::clone(&coordinator), config.imdb_find_url)),
            Arc::new(KitsuClient::new(Arc::clone(&coordinator), config.kitsu_url)),
        );

        Self {
            coordinator,
            resolver,
        }
    }

    /// Resolve one record for a source of the given class.
    pub async fn resolve(
        &self,
        record: PartialRecord,
        class: MediaClass,
    ) -> Result<ResolvedRecord, EnrichmentError> {
        self.resolver.resolve(record, class).await
    }

    /// Physical provider requests issued so far.
    pub fn lookups(&self) -> usize {
        self.coordinator.dispatched()
    }
}
