// Stream dispatcher - routes format descriptors to manifest parsers
//
// Primary and alternate URLs are independent sources; both are yielded.
// Empty parser results are zero streams, parser failures propagate as-is.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::errors::ServiceError;
use super::manifests::{rtmp, ManifestParsers, HDCORE_PARAM};
use super::models::{ResolveOptions, StreamFormat, StreamFormatDescriptor, StreamHandle};
use super::traits::{HttpClient, ManifestParser};

lazy_static! {
    static ref SECURE_HDS_RE: Regex = Regex::new(r"/se/secure/").unwrap();
}

pub struct StreamDispatcher<'a> {
    http: &'a dyn HttpClient,
    parsers: &'a ManifestParsers,
}

impl<'a> StreamDispatcher<'a> {
    pub fn new(http: &'a dyn HttpClient, parsers: &'a ManifestParsers) -> Self {
        Self { http, parsers }
    }

    pub async fn dispatch(
        &self,
        descriptor: &StreamFormatDescriptor,
        options: &ResolveOptions,
    ) -> Result<Vec<StreamHandle>, ServiceError> {
        match &descriptor.format {
            StreamFormat::Hls => {
                self.adaptive(self.parsers.hls.as_ref(), descriptor, options, &[])
                    .await
            }
            StreamFormat::Dash264 | StreamFormat::DashHbbtv => {
                self.adaptive(self.parsers.dash.as_ref(), descriptor, options, &[])
                    .await
            }
            StreamFormat::Hds => {
                if SECURE_HDS_RE.is_match(&descriptor.primary_url) {
                    debug!(url = %descriptor.primary_url, "Skipping secure HDS delivery");
                    return Ok(Vec::new());
                }
                self.adaptive(self.parsers.hds.as_ref(), descriptor, options, &[HDCORE_PARAM])
                    .await
            }
            StreamFormat::RtmpMedium => self.medium(&descriptor.primary_url, options).await,
            StreamFormat::Unknown(tag) => {
                debug!(format = %tag, "Skipping unknown stream format");
                Ok(Vec::new())
            }
        }
    }

    async fn adaptive(
        &self,
        parser: &dyn ManifestParser,
        descriptor: &StreamFormatDescriptor,
        options: &ResolveOptions,
        query: &[(&str, &str)],
    ) -> Result<Vec<StreamHandle>, ServiceError> {
        let primary = &descriptor.primary_url;
        let response = self.http.get_with_query(primary, query).await?;
        let mut streams: Vec<StreamHandle> =
            parser.parse(options, &response, primary)?.into_values().collect();
        debug!(parser = parser.name(), url = %primary, count = streams.len(), "Parsed primary");

        if let Some(alternate) = &descriptor.alternate_url {
            let resolved = self.http.get(alternate).await?;
            if !resolved.is_success() {
                debug!(url = %alternate, status = resolved.status, "Alternate not available");
                return Ok(streams);
            }
            let alt_url = resolved.final_url.clone();
            let manifest = if query.is_empty() {
                resolved
            } else {
                self.http.get_with_query(&alt_url, query).await?
            };
            let alt_streams = parser.parse(options, &manifest, &alt_url)?;
            debug!(parser = parser.name(), url = %alt_url, count = alt_streams.len(), "Parsed alternate");
            streams.extend(alt_streams.into_values());
        }

        Ok(streams)
    }

    /// Single-file delivery: f4m manifests go to HDS, everything else is RTMP
    async fn medium(
        &self,
        url: &str,
        options: &ResolveOptions,
    ) -> Result<Vec<StreamHandle>, ServiceError> {
        if url.contains(".f4m") {
            let descriptor = StreamFormatDescriptor::new(StreamFormat::Hds, url);
            return self
                .adaptive(self.parsers.hds.as_ref(), &descriptor, options, &[HDCORE_PARAM])
                .await;
        }

        let target = rtmp::split_target(url)?;
        Ok(vec![rtmp::build(options, target, rtmp::DEFAULT_BITRATE)])
    }
}
