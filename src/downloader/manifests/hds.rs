// HDS (f4m) manifest parser

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::downloader::errors::ServiceError;
use crate::downloader::models::{Protocol, ResolveOptions, StreamHandle};
use crate::downloader::traits::{HttpResponse, ManifestParser};

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "media", default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    #[serde(rename = "@url")]
    url: Option<String>,
    /// May carry a fraction
    #[serde(rename = "@bitrate")]
    bitrate: Option<String>,
}

/// Query parameter the legacy f4m servers insist on
pub const HDCORE_PARAM: (&str, &str) = ("hdcore", "3.7.0");

#[derive(Debug, Default)]
pub struct HdsParser;

impl ManifestParser for HdsParser {
    fn name(&self) -> &'static str {
        "hds"
    }

    fn parse(
        &self,
        options: &ResolveOptions,
        response: &HttpResponse,
        source_url: &str,
    ) -> Result<BTreeMap<u32, StreamHandle>, ServiceError> {
        if response.status >= 400 {
            return Err(ServiceError::Parser(format!(
                "Can't read HDS playlist. {}",
                response.status
            )));
        }
        if !response.body.contains("<manifest") {
            return Err(ServiceError::Parser("Not an f4m manifest".to_string()));
        }

        let manifest: Manifest = quick_xml::de::from_str(&response.body)
            .map_err(|e| ServiceError::Parser(format!("Invalid f4m manifest: {}", e)))?;

        let mut streams = BTreeMap::new();
        for media in manifest.media {
            let bitrate = media
                .bitrate
                .as_deref()
                .and_then(|b| b.trim().parse::<f64>().ok())
                .map(|b| b as u32)
                .unwrap_or(0);
            let mut handle = StreamHandle::new(Protocol::Hds, source_url, bitrate, options);
            handle.media = media.url;
            streams.insert(bitrate, handle);
        }
        Ok(streams)
    }
}
