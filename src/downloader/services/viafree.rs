// viafree / tv3play family service
//
// Video id from the page -> playapi video and stream documents ->
// info, subtitles, then medium/HLS streams

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::diagnostics::{api_message, check_response, StatusPolicy};
use super::traits::{Resolution, ResolvedItem, Service, ServiceContext};
use crate::downloader::dispatcher::StreamDispatcher;
use crate::downloader::enumerator::EpisodeEnumerator;
use crate::downloader::errors::ServiceError;
use crate::downloader::fields::{Field, FieldTable, VIAFREE_FIELDS};
use crate::downloader::filename::derive_filename;
use crate::downloader::info::InfoReport;
use crate::downloader::models::{
    CanonicalMetadata, EpisodeReference, ResolveOptions, StreamFormat, StreamFormatDescriptor,
    SubtitleHandle, SubtitleKind, TitleType,
};
use crate::downloader::normalizer::{Normalizer, Schema};
use crate::downloader::resolver::IdentifierResolver;
use crate::downloader::utils::json_string;

pub const SERVICE_TAG: &str = "viafree";
pub const API_URL: &str = "https://playapi.mtgx.tv/v3/videos/";
pub const HEARING_IMPAIRED_SUFFIX: &str = "-SDH";

const SUPPORTED_DOMAINS: &[&str] = &[
    "tv3play.se",
    "tv6play.se",
    "tv8play.se",
    "tv10play.se",
    "tv3play.no",
    "tv3play.dk",
    "tv6play.no",
    "viasat4play.no",
    "tv3play.ee",
    "tv3play.lv",
    "tv3play.lt",
    "tvplay.lv",
    "viagame.com",
    "juicyplay.se",
    "viafree.se",
    "viafree.dk",
    "viafree.no",
    "play.tv3.lt",
    "tv3play.tv3.ee",
    "tvplay.skaties.lv",
];

pub struct Viafree {
    normalizer: Normalizer,
    resolver: IdentifierResolver,
}

impl Default for Viafree {
    fn default() -> Self {
        Self::new()
    }
}

impl Viafree {
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::new(&VIAFREE_FIELDS, Schema::Viafree),
            resolver: IdentifierResolver::viafree(),
        }
    }

    pub fn with_resolver(mut self, resolver: IdentifierResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Fetch an API document; 403 is geoblocking, `msg` is an API error
    async fn api_document(
        &self,
        ctx: &ServiceContext,
        url: &str,
        msg_override: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let response = ctx.http.get(url).await?;
        check_response(StatusPolicy::GeoBlocking, &response, url)?;
        let document = response.json()?;
        if let Some(message) = api_message(&VIAFREE_FIELDS, &document) {
            return Err(ServiceError::Api(
                msg_override.map(str::to_string).unwrap_or(message),
            ));
        }
        Ok(document)
    }

    /// Clips borrow season/episode from the episode they were cut from
    async fn with_parent_position(
        &self,
        ctx: &ServiceContext,
        video: &Value,
        metadata: CanonicalMetadata,
    ) -> CanonicalMetadata {
        let t = &VIAFREE_FIELDS;
        if metadata.title_type != Some(TitleType::Clip) || metadata.season_episode.is_some() {
            return metadata;
        }
        let Some(parent_id) = t.get(video, Field::DerivedFromId).and_then(json_string) else {
            return metadata;
        };

        let parent_url = format!("{}{}", API_URL, parent_id);
        let parent = match self.api_document(ctx, &parent_url, None).await {
            Ok(parent) => parent,
            Err(e) => {
                debug!(parent = %parent_id, error = %e, "Parent video unavailable");
                return metadata;
            }
        };
        match self.normalizer.normalize(&parent, false, None) {
            Ok(parent) if parent.season_episode.is_some() => {
                metadata.with_season_episode(parent.season_episode)
            }
            _ => metadata,
        }
    }

    async fn resolve(
        &self,
        ctx: &ServiceContext,
        url: &str,
        resolution: &mut Resolution,
    ) -> Result<(), ServiceError> {
        let t: &FieldTable = &VIAFREE_FIELDS;

        // Status is not checked; the URL-based strategies still apply to an
        // error page. Transport errors abort.
        let page = ctx.http.get(url).await?;
        let video_id = self
            .resolver
            .resolve_video_id(&page.body, url)
            .ok_or_else(|| ServiceError::Extraction(format!("Can't find video file for: {}", url)))?;

        let video = self
            .api_document(ctx, &format!("{}{}", API_URL, video_id), None)
            .await?;

        let mut options = resolution.options.clone();
        if t.str(&video, Field::Type) == Some("live") {
            options = options.with_live(true);
        }

        let metadata = self.normalizer.normalize(&video, false, None)?;
        let metadata = self.with_parent_position(ctx, &video, metadata).await;

        if options.output_auto {
            let output = derive_filename(
                &metadata,
                options.output.as_deref(),
                SERVICE_TAG,
                ctx.sanitizer.as_ref(),
            );
            options = options.with_service(SERVICE_TAG).with_output(Some(output));
        }
        resolution.options = options.clone();

        if options.output_excluded() {
            return Err(ServiceError::Excluded);
        }

        let streams = self
            .api_document(
                ctx,
                &format!("{}stream/{}", API_URL, video_id),
                Some("Can't play this because the video is either not found or geoblocked."),
            )
            .await?;

        if options.get_info {
            resolution.push(ResolvedItem::Info(InfoReport::new(&options, &metadata)));
            info!(video_id = %video_id, "Collected info");
        }

        if let Some(sami) = t.str(&video, Field::SamiPath) {
            resolution.push(ResolvedItem::Subtitle(SubtitleHandle::new(
                &options,
                SubtitleHandle::kind_for_url(sami),
                sami,
                None,
            )));
        }
        if let Some(webvtt) = t.str(&video, Field::SubtitlesWebvtt) {
            resolution.push(ResolvedItem::Subtitle(SubtitleHandle::new(
                &options,
                SubtitleKind::Wrst,
                webvtt,
                None,
            )));
        }
        if let Some(sdh) = t.str(&video, Field::SubtitlesForHearingImpaired) {
            let suffix = options.get_all_subtitles.then_some(HEARING_IMPAIRED_SUFFIX);
            resolution.push(ResolvedItem::Subtitle(SubtitleHandle::new(
                &options,
                SubtitleHandle::kind_for_url(sdh),
                sdh,
                suffix,
            )));
        }

        let mut descriptors = Vec::new();
        if let Some(renditions) = t.get(&streams, Field::Streams) {
            if let Some(medium) = t.str(renditions, Field::Medium) {
                descriptors.push(StreamFormatDescriptor::new(StreamFormat::RtmpMedium, medium));
            }
            if let Some(hls) = t.str(renditions, Field::Hls) {
                descriptors.push(StreamFormatDescriptor::new(StreamFormat::Hls, hls));
            }
        }
        if descriptors.is_empty() {
            return Err(ServiceError::NoStreams);
        }

        let dispatcher = StreamDispatcher::new(ctx.http.as_ref(), &ctx.parsers);
        for descriptor in &descriptors {
            match dispatcher.dispatch(descriptor, &options).await {
                Ok(handles) => {
                    for handle in handles {
                        resolution.push(ResolvedItem::Stream(handle));
                    }
                }
                Err(e) => resolution.push(ResolvedItem::Error(e)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Service for Viafree {
    fn name(&self) -> &'static str {
        SERVICE_TAG
    }

    fn supported_domains(&self) -> &'static [&'static str] {
        SUPPORTED_DOMAINS
    }

    fn field_table(&self) -> &'static FieldTable {
        &VIAFREE_FIELDS
    }

    async fn get(&self, ctx: &ServiceContext, url: &str, options: &ResolveOptions) -> Resolution {
        let mut resolution = Resolution::new(options.clone());
        if let Err(e) = self.resolve(ctx, url, &mut resolution).await {
            resolution.push(ResolvedItem::Error(e));
        }
        resolution
    }

    async fn find_all_episodes(
        &self,
        ctx: &ServiceContext,
        url: &str,
        options: &ResolveOptions,
    ) -> Result<Vec<EpisodeReference>, ServiceError> {
        EpisodeEnumerator::new(ctx.http.as_ref(), ctx.sanitizer.as_ref())
            .viafree(url, options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::Protocol;
    use crate::downloader::resolver::{ExtractionStrategy, PageInput};
    use crate::downloader::testing::FakeHttp;
    use crate::downloader::utils::query_param;
    use std::sync::Arc;

    const PAGE_URL: &str = "https://www.viafree.se/program/show/sasong-1/avsnitt-2";
    const PAGE: &str = r#"<div data-video-id="4711"></div>"#;

    fn video(extra: &str) -> String {
        format!(
            r#"{{"id":4711,"title":"Avsnitt 2","format_title":"Show","type":"program",
                "duration":1500,"sami_path":null,"subtitles_webvtt":"https://cdn.example.com/s.vtt",
                "subtitles_for_hearing_impaired":"https://cdn.example.com/sdh.xml",
                "format_position":{{"is_episodic":true,"season":1,"episode":"2"}}{}}}"#,
            extra
        )
    }

    #[test]
    fn test_handles_domains() {
        let service = Viafree::new();
        assert!(service.handles("https://www.viafree.se/program/x"));
        assert!(service.handles("http://play.tv3.lt/programos/x"));
        assert!(!service.handles("https://www.svtplay.se/video/1"));
    }

    #[tokio::test]
    async fn test_unresolvable_page() {
        let ctx = ServiceContext::new(Arc::new(
            FakeHttp::new().with("https://www.viafree.se/", 200, "<html></html>"),
        ));
        let resolution = Viafree::new()
            .get(&ctx, "https://www.viafree.se/", &ResolveOptions::default())
            .await;
        match resolution.errors().as_slice() {
            [ServiceError::Extraction(msg)] => {
                assert_eq!(msg, "Can't find video file for: https://www.viafree.se/")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_geoblocked_video() {
        let http = FakeHttp::new()
            .with(PAGE_URL, 200, PAGE)
            .with("https://playapi.mtgx.tv/v3/videos/4711", 403, "");
        let ctx = ServiceContext::new(Arc::new(http));
        let resolution = Viafree::new().get(&ctx, PAGE_URL, &ResolveOptions::default()).await;
        assert!(matches!(resolution.errors().as_slice(), [ServiceError::GeoBlocked]));
    }

    #[tokio::test]
    async fn test_api_message() {
        let http = FakeHttp::new()
            .with(PAGE_URL, 200, PAGE)
            .with("https://playapi.mtgx.tv/v3/videos/4711", 200, r#"{"msg":"Not found"}"#);
        let ctx = ServiceContext::new(Arc::new(http));
        let resolution = Viafree::new().get(&ctx, PAGE_URL, &ResolveOptions::default()).await;
        match resolution.errors().as_slice() {
            [ServiceError::Api(msg)] => assert_eq!(msg, "Not found"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_msg_is_not_found_or_geoblocked() {
        let http = FakeHttp::new()
            .with(PAGE_URL, 200, PAGE)
            .with("https://playapi.mtgx.tv/v3/videos/4711", 200, &video(""))
            .with("https://playapi.mtgx.tv/v3/videos/stream/4711", 200, r#"{"msg":"nope"}"#);
        let ctx = ServiceContext::new(Arc::new(http));
        let resolution = Viafree::new().get(&ctx, PAGE_URL, &ResolveOptions::default()).await;
        match resolution.errors().as_slice() {
            [ServiceError::Api(msg)] => assert!(msg.contains("either not found or geoblocked")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_resolution_order() {
        let http = FakeHttp::new()
            .with(PAGE_URL, 200, PAGE)
            .with("https://playapi.mtgx.tv/v3/videos/4711", 200, &video(""))
            .with(
                "https://playapi.mtgx.tv/v3/videos/stream/4711",
                200,
                r#"{"streams":{"medium":"rtmp://fms.example.com:1935/mtg/path/clip.mp4","hls":null}}"#,
            );
        let ctx = ServiceContext::new(Arc::new(http));
        let options = ResolveOptions::default()
            .with_output_auto(true)
            .with_get_info(true)
            .with_get_all_subtitles(true);
        let resolution = Viafree::new().get(&ctx, PAGE_URL, &options).await;

        assert!(resolution.errors().is_empty());
        assert!(matches!(resolution.items[0], ResolvedItem::Info(_)));
        let subtitles = resolution.subtitles();
        assert_eq!(subtitles.len(), 2);
        assert_eq!(subtitles[0].kind, SubtitleKind::Wrst);
        assert_eq!(subtitles[1].kind, SubtitleKind::Sami);
        assert_eq!(subtitles[1].suffix.as_deref(), Some("-SDH"));

        let streams = resolution.streams();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].protocol, Protocol::Rtmp);
        assert_eq!(streams[0].bitrate, 800);

        let output = resolution.options.output.as_ref().unwrap().to_string_lossy().to_string();
        assert!(output.starts_with("Show.S01E02.Avsnitt.2-"));
        assert!(output.ends_with("-viafree"));
    }

    #[tokio::test]
    async fn test_no_renditions() {
        let http = FakeHttp::new()
            .with(PAGE_URL, 200, PAGE)
            .with("https://playapi.mtgx.tv/v3/videos/4711", 200, &video(""))
            .with(
                "https://playapi.mtgx.tv/v3/videos/stream/4711",
                200,
                r#"{"streams":{"medium":null,"hls":""}}"#,
            );
        let ctx = ServiceContext::new(Arc::new(http));
        let resolution = Viafree::new().get(&ctx, PAGE_URL, &ResolveOptions::default()).await;
        assert!(matches!(resolution.errors().as_slice(), [ServiceError::NoStreams]));
        assert!(resolution.streams().is_empty());
    }

    #[tokio::test]
    async fn test_clip_takes_parent_position() {
        let clip = r#"{"id":9,"title":"Best bits-show","format_title":"Show","type":"clip",
            "duration":61,"derived_from_id":4711,"format_position":{}}"#;
        let http = FakeHttp::new()
            .with("https://www.viafree.se/klipp/9", 200, "")
            .with("https://playapi.mtgx.tv/v3/videos/9", 200, clip)
            .with("https://playapi.mtgx.tv/v3/videos/4711", 200, &video(""))
            .with(
                "https://playapi.mtgx.tv/v3/videos/stream/9",
                200,
                r#"{"streams":{"medium":null,"hls":null}}"#,
            );
        let ctx = ServiceContext::new(Arc::new(http));
        let options = ResolveOptions::default().with_output_auto(true);
        let resolution = Viafree::new()
            .get(&ctx, "https://www.viafree.se/klipp/9", &options)
            .await;
        let output = resolution.options.output.unwrap().to_string_lossy().to_string();
        assert!(output.starts_with("Show.S01E02.Best.bits-"), "{}", output);
    }

    #[tokio::test]
    async fn test_custom_identifier_chain() {
        struct QueryVideoId;

        impl ExtractionStrategy for QueryVideoId {
            fn name(&self) -> &'static str {
                "query-v"
            }

            fn try_extract(&self, page: &PageInput) -> Option<String> {
                query_param(page.url, "v")
            }
        }

        let url = "https://www.viafree.se/embed?v=4711";
        let http = FakeHttp::new()
            .with(url, 200, "<html></html>")
            .with("https://playapi.mtgx.tv/v3/videos/4711", 403, "");
        let ctx = ServiceContext::new(Arc::new(http));
        let service =
            Viafree::new().with_resolver(IdentifierResolver::new(vec![Box::new(QueryVideoId)]));

        // The id was found, so the request reached the API
        let resolution = service.get(&ctx, url, &ResolveOptions::default()).await;
        assert!(matches!(resolution.errors().as_slice(), [ServiceError::GeoBlocked]));

        let resolution = Viafree::new().get(&ctx, url, &ResolveOptions::default()).await;
        assert!(matches!(resolution.errors().as_slice(), [ServiceError::Extraction(_)]));
    }

    #[tokio::test]
    async fn test_error_page_still_resolves_from_url() {
        // The page itself is unrouted and answers 404
        let http = FakeHttp::new().with("https://playapi.mtgx.tv/v3/videos/4711", 403, "");
        let ctx = ServiceContext::new(Arc::new(http));
        let resolution = Viafree::new()
            .get(&ctx, "https://www.viafree.se/klipp/4711", &ResolveOptions::default())
            .await;
        assert!(matches!(resolution.errors().as_slice(), [ServiceError::GeoBlocked]));
    }
}
