// Downloader module - page resolution for the supported streaming services

pub mod dispatcher;
pub mod enumerator;
pub mod errors;
pub mod fields;
pub mod filename;
pub mod http;
pub mod info;
pub mod manifests;
pub mod models;
pub mod normalizer;
pub mod resolver;
pub mod selector;
pub mod services;
pub mod traits;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use errors::ServiceError;
pub use http::ReqwestHttpClient;
pub use models::{
    CanonicalMetadata, EpisodeReference, NetworkConfig, Protocol, ResolveOptions, StreamHandle,
    SubtitleHandle,
};
pub use selector::select_stream;
pub use services::{Resolution, ResolvedItem, ServiceContext, ServiceRegistry};
pub use traits::{HttpClient, HttpResponse, ManifestParser, Sanitizer};
