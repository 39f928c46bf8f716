// Service registry - picks the service for a URL
//
// Field tables are validated when a service is registered, so schema
// mistakes surface at startup rather than mid-resolution.

use tracing::{debug, info};

use super::svtplay::Svtplay;
use super::traits::{Resolution, ResolvedItem, Service, ServiceContext};
use super::viafree::Viafree;
use crate::downloader::errors::ServiceError;
use crate::downloader::models::{EpisodeReference, ResolveOptions};

pub struct ServiceRegistry {
    services: Vec<Box<dyn Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
        }
    }

    /// Registry with every built-in service
    pub fn with_defaults() -> Result<Self, ServiceError> {
        let mut registry = Self::new();
        registry.add_service(Box::new(Svtplay::new()))?;
        registry.add_service(Box::new(Viafree::new()))?;
        Ok(registry)
    }

    pub fn add_service(&mut self, service: Box<dyn Service>) -> Result<(), ServiceError> {
        service.field_table().validate()?;
        debug!(service = service.name(), "Registered service");
        self.services.push(service);
        Ok(())
    }

    pub fn service_names(&self) -> Vec<&'static str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    pub fn find(&self, url: &str) -> Option<&dyn Service> {
        self.services
            .iter()
            .find(|service| service.handles(url))
            .map(|service| service.as_ref())
    }

    fn require(&self, url: &str) -> Result<&dyn Service, ServiceError> {
        self.find(url)
            .ok_or_else(|| ServiceError::UnsupportedUrl(url.to_string()))
    }

    /// Resolve one episode page
    pub async fn resolve(
        &self,
        ctx: &ServiceContext,
        url: &str,
        options: &ResolveOptions,
    ) -> Resolution {
        match self.require(url) {
            Ok(service) => {
                info!(service = service.name(), url = %url, "Resolving");
                service.get(ctx, url, options).await
            }
            Err(e) => {
                let mut resolution = Resolution::new(options.clone());
                resolution.push(ResolvedItem::Error(e));
                resolution
            }
        }
    }

    /// Enumerate episodes of a listing page
    pub async fn episodes(
        &self,
        ctx: &ServiceContext,
        url: &str,
        options: &ResolveOptions,
    ) -> Result<Vec<EpisodeReference>, ServiceError> {
        let service = self.require(url)?;
        info!(service = service.name(), url = %url, "Enumerating episodes");
        service.find_all_episodes(ctx, url, options).await
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
