// DASH MPD parser
//
// One stream per video representation, its bitrate including the best
// audio representation.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::downloader::errors::ServiceError;
use crate::downloader::models::{Protocol, ResolveOptions, StreamHandle};
use crate::downloader::traits::{HttpResponse, ManifestParser};

#[derive(Debug, Deserialize)]
struct Mpd {
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "AdaptationSet", default)]
    adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Deserialize)]
struct AdaptationSet {
    #[serde(rename = "@mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "@contentType")]
    content_type: Option<String>,
    #[serde(rename = "Representation", default)]
    representations: Vec<Representation>,
}

#[derive(Debug, Deserialize)]
struct Representation {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@bandwidth")]
    bandwidth: Option<u64>,
    #[serde(rename = "@height")]
    height: Option<u32>,
    #[serde(rename = "@mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "@contentType")]
    content_type: Option<String>,
}

impl Representation {
    /// Own mime/content type, falling back to the enclosing set's
    fn kind<'a>(&'a self, set: &'a AdaptationSet) -> &'a str {
        self.mime_type
            .as_deref()
            .or(self.content_type.as_deref())
            .or(set.mime_type.as_deref())
            .or(set.content_type.as_deref())
            .unwrap_or_default()
    }

    fn kbps(&self) -> u32 {
        self.bandwidth
            .map(|b| u32::try_from(b / 1000).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct DashParser;

impl ManifestParser for DashParser {
    fn name(&self) -> &'static str {
        "dash"
    }

    fn parse(
        &self,
        options: &ResolveOptions,
        response: &HttpResponse,
        source_url: &str,
    ) -> Result<BTreeMap<u32, StreamHandle>, ServiceError> {
        if response.status >= 400 {
            return Err(ServiceError::Parser(format!(
                "Can't read DASH manifest. {}",
                response.status
            )));
        }
        if !response.body.contains("<MPD") {
            return Err(ServiceError::Parser("Not a DASH manifest".to_string()));
        }

        let mpd: Mpd = quick_xml::de::from_str(&response.body)
            .map_err(|e| ServiceError::Parser(format!("Invalid DASH manifest: {}", e)))?;

        let mut video: Vec<(u32, Option<String>)> = Vec::new();
        let mut best_audio = 0u32;

        for set in mpd.periods.iter().flat_map(|p| &p.adaptation_sets) {
            for representation in &set.representations {
                let kind = representation.kind(set);
                if kind.contains("audio") {
                    best_audio = best_audio.max(representation.kbps());
                } else if kind.contains("video") || representation.height.is_some() {
                    video.push((representation.kbps(), representation.id.clone()));
                }
            }
        }

        let mut streams = BTreeMap::new();
        for (bandwidth, id) in video {
            let bitrate = bandwidth.saturating_add(best_audio);
            let mut handle = StreamHandle::new(Protocol::Dash, source_url, bitrate, options);
            handle.media = id;
            streams.insert(bitrate, handle);
        }
        Ok(streams)
    }
}
