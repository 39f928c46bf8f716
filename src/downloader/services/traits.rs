// Service trait and resolution result types

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use crate::downloader::errors::ServiceError;
use crate::downloader::fields::FieldTable;
use crate::downloader::filename::Filenamify;
use crate::downloader::info::InfoReport;
use crate::downloader::manifests::ManifestParsers;
use crate::downloader::models::{EpisodeReference, ResolveOptions, StreamHandle, SubtitleHandle};
use crate::downloader::traits::{HttpClient, Sanitizer};

/// One artifact produced while resolving a page, in production order
#[derive(Debug)]
pub enum ResolvedItem {
    Info(InfoReport),
    Subtitle(SubtitleHandle),
    Stream(StreamHandle),
    Error(ServiceError),
}

/// Everything a service produced for one page
#[derive(Debug)]
pub struct Resolution {
    /// Options snapshot after the service's own adjustments
    pub options: ResolveOptions,
    pub items: Vec<ResolvedItem>,
}

impl Resolution {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            options,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: ResolvedItem) {
        self.items.push(item);
    }

    pub fn streams(&self) -> Vec<&StreamHandle> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ResolvedItem::Stream(stream) => Some(stream),
                _ => None,
            })
            .collect()
    }

    pub fn subtitles(&self) -> Vec<&SubtitleHandle> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ResolvedItem::Subtitle(subtitle) => Some(subtitle),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&ServiceError> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ResolvedItem::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }

    pub fn info(&self) -> Option<&InfoReport> {
        self.items.iter().find_map(|item| match item {
            ResolvedItem::Info(report) => Some(report),
            _ => None,
        })
    }
}

/// Collaborators shared by all services
pub struct ServiceContext {
    pub http: Arc<dyn HttpClient>,
    pub parsers: ManifestParsers,
    pub sanitizer: Box<dyn Sanitizer>,
}

impl ServiceContext {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            parsers: ManifestParsers::default(),
            sanitizer: Box::new(Filenamify),
        }
    }

    pub fn with_parsers(mut self, parsers: ManifestParsers) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Box<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }
}

/// A streaming site
#[async_trait]
pub trait Service: Send + Sync {
    /// Tag used in derived filenames and logs
    fn name(&self) -> &'static str;

    fn supported_domains(&self) -> &'static [&'static str];

    /// Key mapping for this service's JSON
    fn field_table(&self) -> &'static FieldTable;

    /// True when the URL host is one of the supported domains or a subdomain
    fn handles(&self, url: &str) -> bool {
        let host = match Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) {
            Some(host) => host,
            None => return false,
        };
        self.supported_domains()
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
    }

    /// Resolve one episode page into info, subtitles and streams.
    /// Failures are reported as `ResolvedItem::Error` entries.
    async fn get(&self, ctx: &ServiceContext, url: &str, options: &ResolveOptions) -> Resolution;

    /// Expand a listing page into episode page URLs
    async fn find_all_episodes(
        &self,
        ctx: &ServiceContext,
        url: &str,
        options: &ResolveOptions,
    ) -> Result<Vec<EpisodeReference>, ServiceError>;
}
