// svtplay.se service
//
// Page state JSON -> metadata -> videoplayer API -> subtitles and streams

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::diagnostics::{check_response, StatusPolicy};
use super::traits::{Resolution, ResolvedItem, Service, ServiceContext};
use crate::downloader::dispatcher::StreamDispatcher;
use crate::downloader::enumerator::{EpisodeEnumerator, SVTPLAY_ORIGIN, SVTPLAY_STATE_RE};
use crate::downloader::errors::ServiceError;
use crate::downloader::fields::{Field, FieldTable, SVTPLAY_FIELDS};
use crate::downloader::filename::derive_filename;
use crate::downloader::info::InfoReport;
use crate::downloader::models::{
    EpisodeReference, ResolveOptions, StreamFormat, StreamFormatDescriptor, SubtitleHandle,
    SubtitleKind,
};
use crate::downloader::normalizer::{Normalizer, Schema};
use crate::downloader::utils::{embedded_json, join_url, query_param};

pub const SERVICE_TAG: &str = "svtplay";
pub const API_URL: &str = "https://api.svt.se/videoplayer-api/video/";

const SUPPORTED_DOMAINS: &[&str] = &["svtplay.se", "svt.se", "beta.svtplay.se", "svtflow.se"];

pub struct Svtplay {
    normalizer: Normalizer,
}

impl Default for Svtplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Svtplay {
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::new(&SVTPLAY_FIELDS, Schema::Svtplay),
        }
    }

    /// Only episode and clip pages are playable on the main site
    fn check_page_shape(url: &str) -> Result<(), ServiceError> {
        let parsed = Url::parse(url).map_err(|_| ServiceError::UnsupportedUrl(url.to_string()))?;
        let host = parsed.host_str().unwrap_or_default();
        if host == "www.svtplay.se" || host == "svtplay.se" {
            let path = parsed.path();
            if !path.starts_with("/video") && !path.starts_with("/klipp") {
                return Err(ServiceError::UnsupportedUrl(
                    "This mode is not supported anymore. need the url with the video".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// `videoTitlePage` object of a page
    async fn title_page(&self, ctx: &ServiceContext, url: &str) -> Result<Value, ServiceError> {
        let t = &SVTPLAY_FIELDS;
        let response = ctx.http.get(url).await?;
        check_response(StatusPolicy::Generic, &response, url)?;

        let state = embedded_json(&SVTPLAY_STATE_RE, &response.body)
            .ok_or_else(|| ServiceError::Extraction("Can't find video info.".to_string()))??;
        t.get(&state, Field::VideoTitlePage)
            .cloned()
            .ok_or_else(|| ServiceError::Extraction("Can't find video info.".to_string()))
    }

    async fn resolve(
        &self,
        ctx: &ServiceContext,
        url: &str,
        resolution: &mut Resolution,
    ) -> Result<(), ServiceError> {
        let t: &FieldTable = &SVTPLAY_FIELDS;
        Self::check_page_shape(url)?;

        let access = query_param(url, t.key(Field::AccessService));
        let mut page = self.title_page(ctx, url).await?;

        let has_video = t
            .get(&page, Field::Video)
            .map_or(false, |video| t.contains(video, Field::ProgramTitle));
        if !has_video {
            return Err(ServiceError::Extraction(
                "Can't find any video on that page".to_string(),
            ));
        }

        if let Some(access) = access.as_deref() {
            let version_url = t
                .get(&page, Field::Video)
                .map(|video| t.array(video, Field::Versions))
                .unwrap_or(&[])
                .iter()
                .find(|version| t.str(version, Field::AccessService) == Some(access))
                .and_then(|version| t.str(version, Field::ContentUrl))
                .map(str::to_string);
            if let Some(version_url) = version_url {
                debug!(access = %access, "Following access version");
                page = self.title_page(ctx, &join_url(SVTPLAY_ORIGIN, &version_url)?).await?;
            }
        }

        let mut options = resolution.options.clone();
        if let Some(live) = t
            .get(&page, Field::Video)
            .and_then(|video| t.get(video, Field::Live))
            .and_then(Value::as_bool)
        {
            options = options.with_live(live);
        }

        let metadata = self.normalizer.normalize(&page, true, access.as_deref())?;
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

        if options.get_info {
            resolution.push(ResolvedItem::Info(InfoReport::new(&options, &metadata)));
            info!(video_id = %metadata.video_id, "Collected info");
        }

        let api_url = format!("{}{}", API_URL, metadata.video_id);
        let response = ctx.http.get(&api_url).await?;
        check_response(StatusPolicy::Generic, &response, &api_url)?;
        let api = response.json()?;

        if let Some(live) = t.get(&api, Field::Live).and_then(Value::as_bool) {
            options = options.with_live(live);
            resolution.options = options.clone();
        }

        for reference in t.array(&api, Field::SubtitleReferences) {
            if t.str(reference, Field::Format) != Some("websrt") {
                continue;
            }
            if let Some(subtitle_url) = t.str(reference, Field::Url) {
                resolution.push(ResolvedItem::Subtitle(SubtitleHandle::new(
                    &options,
                    SubtitleKind::Wrst,
                    subtitle_url,
                    None,
                )));
            }
        }

        if !t.contains(&api, Field::VideoReferences) {
            return Ok(());
        }
        let references = t.array(&api, Field::VideoReferences);
        if references.is_empty() {
            return Err(ServiceError::NoStreams);
        }

        let dispatcher = StreamDispatcher::new(ctx.http.as_ref(), &ctx.parsers);
        for reference in references {
            let Some(stream_url) = t.str(reference, Field::Url) else {
                continue;
            };
            let format = StreamFormat::from_tag(t.str(reference, Field::Format).unwrap_or_default());
            let descriptor = StreamFormatDescriptor::new(format, stream_url)
                .with_alternate(query_param(stream_url, t.key(Field::Alt)));

            match dispatcher.dispatch(&descriptor, &options).await {
                Ok(streams) => {
                    for stream in streams {
                        resolution.push(ResolvedItem::Stream(stream));
                    }
                }
                Err(e) => resolution.push(ResolvedItem::Error(e)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Service for Svtplay {
    fn name(&self) -> &'static str {
        SERVICE_TAG
    }

    fn supported_domains(&self) -> &'static [&'static str] {
        SUPPORTED_DOMAINS
    }

    fn field_table(&self) -> &'static FieldTable {
        &SVTPLAY_FIELDS
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
            .svtplay(url, options)
            .await
    }
}
