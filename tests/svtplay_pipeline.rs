mod common;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use common::{svtplay_page, FakeHttp};
use playgrab_lib::downloader::manifests::ManifestParsers;
use playgrab_lib::downloader::{
    HttpResponse, ManifestParser, Protocol, Sanitizer, StreamHandle, SubtitleHandle,
};
use playgrab_lib::{select_stream, ResolveOptions, ResolvedItem, ServiceContext, ServiceError, ServiceRegistry};

const PAGE_URL: &str = "https://www.svtplay.se/video/123/show/ep-2";
const API_URL: &str = "https://api.svt.se/videoplayer-api/video/abc123";
const HLS_URL: &str =
    "https://svt-vod.example.com/v/master.m3u8?alt=https%3A%2F%2Fswitcher.example.com%2Falt.m3u8";

const STATE: &str = r#"{"videoTitlePage":{"video":{"programTitle":"Show","title":"Ep1",
"programVersionId":"abc123","materialLength":125,"episodic":true,"season":1,
"episodeNumber":2,"titleType":"SERIES_OR_TV_SHOW","closedCaptioned":true,
"description":"Second episode"}}}"#;

const API: &str = r#"{"live":false,
"subtitleReferences":[{"format":"websrt","url":"https://media.example.com/sub.srt"},
                      {"format":"webvtt","url":"https://media.example.com/sub.vtt"}],
"videoReferences":[
  {"format":"hls","url":"https://svt-vod.example.com/v/master.m3u8?alt=https%3A%2F%2Fswitcher.example.com%2Falt.m3u8"},
  {"format":"dash264","url":"https://svt-vod.example.com/v/manifest.mpd"},
  {"format":"hds","url":"https://svt-vod.example.com/se/secure/manifest.f4m"}]}"#;

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1280000
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2560000
high/index.m3u8
";

const ALT_MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=900000
alt/index.m3u8
";

const MPD: &str = r#"<MPD type="static"><Period>
<AdaptationSet mimeType="video/mp4"><Representation id="v1" bandwidth="3000000"/></AdaptationSet>
<AdaptationSet contentType="audio"><Representation id="a1" bandwidth="128000"/></AdaptationSet>
</Period></MPD>"#;

fn fixture() -> FakeHttp {
    FakeHttp::new()
        .with(PAGE_URL, 200, &svtplay_page(STATE))
        .with(API_URL, 200, API)
        .with(HLS_URL, 200, MASTER)
        .with_redirect(
            "https://switcher.example.com/alt.m3u8",
            "https://alt-cdn.example.com/v/master.m3u8",
            200,
            ALT_MASTER,
        )
        .with("https://svt-vod.example.com/v/manifest.mpd", 200, MPD)
}

#[tokio::test]
async fn test_full_page_resolution() {
    let http = Arc::new(fixture());
    let ctx = ServiceContext::new(http.clone());
    let registry = ServiceRegistry::with_defaults().unwrap();
    let options = ResolveOptions::default()
        .with_output_auto(true)
        .with_get_info(true);

    let resolution = registry.resolve(&ctx, PAGE_URL, &options).await;
    assert!(resolution.errors().is_empty(), "{:?}", resolution.errors());

    assert_eq!(
        resolution.options.output,
        Some(PathBuf::from("Show.S01E02.Ep1-6ca13d5-svtplay"))
    );
    assert_eq!(resolution.options.service.as_deref(), Some("svtplay"));

    // Info first, then subtitles, then streams
    assert!(matches!(resolution.items[0], ResolvedItem::Info(_)));
    assert!(matches!(resolution.items[1], ResolvedItem::Subtitle(_)));

    let report = resolution.info().unwrap().render();
    assert!(report.starts_with("Show: Show\nTitle: Ep1\n"));
    assert!(report.contains("Duration: 3 min\n"));
    assert!(report.contains("Season: 1\nEpisode: 2\n"));
    assert!(report.contains("Subtitled: Yes\n"));

    let subtitles: Vec<&SubtitleHandle> = resolution.subtitles();
    assert_eq!(subtitles.len(), 1);
    assert_eq!(subtitles[0].url, "https://media.example.com/sub.srt");

    let streams = resolution.streams();
    let urls: Vec<&str> = streams.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://svt-vod.example.com/v/low/index.m3u8",
            "https://svt-vod.example.com/v/high/index.m3u8",
            "https://alt-cdn.example.com/v/alt/index.m3u8",
            "https://svt-vod.example.com/v/manifest.mpd",
        ]
    );
    assert_eq!(streams[3].protocol, Protocol::Dash);
    assert_eq!(streams[3].bitrate, 3128);
    assert!(streams.iter().all(|s| !s.live));

    // Secure HDS is never requested
    assert!(!http.requests().iter().any(|url| url.contains("/se/secure/")));
}

#[tokio::test]
async fn test_selection_over_resolved_streams() {
    let ctx = ServiceContext::new(Arc::new(fixture()));
    let registry = ServiceRegistry::with_defaults().unwrap();
    let resolution = registry
        .resolve(&ctx, PAGE_URL, &ResolveOptions::default())
        .await;
    let streams: Vec<_> = resolution.streams().into_iter().cloned().collect();

    let best = select_stream(&streams, &ResolveOptions::default()).unwrap();
    assert_eq!(best.bitrate, 3128);

    let hls = ResolveOptions::default().with_preferred(Some(Protocol::Hls));
    assert_eq!(select_stream(&streams, &hls).unwrap().bitrate, 2560);

    let near = ResolveOptions::default().with_quality(Some(1000), 200);
    assert_eq!(select_stream(&streams, &near).unwrap().bitrate, 900);

    let none = ResolveOptions::default().with_quality(Some(5000), 100);
    assert!(select_stream(&streams, &none).is_none());
}

#[tokio::test]
async fn test_empty_references_is_no_streams() {
    let http = FakeHttp::new()
        .with(PAGE_URL, 200, &svtplay_page(STATE))
        .with(API_URL, 200, r#"{"videoReferences":[]}"#);
    let ctx = ServiceContext::new(Arc::new(http));
    let registry = ServiceRegistry::with_defaults().unwrap();
    let resolution = registry
        .resolve(&ctx, PAGE_URL, &ResolveOptions::default())
        .await;

    assert!(resolution.streams().is_empty());
    assert!(matches!(resolution.errors().as_slice(), [ServiceError::NoStreams]));
}

#[tokio::test]
async fn test_excluded_episode_makes_no_api_call() {
    let http = Arc::new(FakeHttp::new().with(PAGE_URL, 200, &svtplay_page(STATE)));
    let ctx = ServiceContext::new(http.clone());
    let registry = ServiceRegistry::with_defaults().unwrap();
    let options = ResolveOptions::default()
        .with_output_auto(true)
        .with_exclude(vec!["Ep1".to_string()]);

    let resolution = registry.resolve(&ctx, PAGE_URL, &options).await;
    assert_eq!(resolution.items.len(), 1);
    assert!(resolution.errors()[0].is_exclusion());
    assert_eq!(http.requests(), vec![PAGE_URL.to_string()]);
}

#[tokio::test]
async fn test_info_report_written_next_to_output() {
    let dir = tempfile::tempdir().unwrap();
    let hint = format!("{}/", dir.path().display());
    let ctx = ServiceContext::new(Arc::new(fixture()));
    let registry = ServiceRegistry::with_defaults().unwrap();
    let options = ResolveOptions::default()
        .with_output(Some(PathBuf::from(hint)))
        .with_output_auto(true)
        .with_get_info(true);

    let resolution = registry.resolve(&ctx, PAGE_URL, &options).await;
    let path = resolution.info().unwrap().save().unwrap();

    assert_eq!(path, dir.path().join("Show.S01E02.Ep1-6ca13d5-svtplay.txt"));
    let written = std::fs::read_to_string(path).unwrap();
    assert!(written.contains("Description: Second episode\n"));
}

#[tokio::test]
async fn test_episodes_from_feed() {
    let feed = r#"<?xml version="1.0"?><rss><channel><title>Show</title>
<item><link>https://www.svtplay.se/video/2/show/ep-2</link></item>
<item><link>https://www.svtplay.se/video/1/show/ep-1</link></item>
<item><link>https://www.svtplay.se/video/1/show/ep-1</link></item>
</channel></rss>"#;
    let http = FakeHttp::new().with("https://www.svtplay.se/show/rss.xml", 200, feed);
    let ctx = ServiceContext::new(Arc::new(http));
    let registry = ServiceRegistry::with_defaults().unwrap();

    let episodes = registry
        .episodes(&ctx, "https://www.svtplay.se/show/rss.xml", &ResolveOptions::default())
        .await
        .unwrap();
    let urls: Vec<&str> = episodes.iter().map(|e| e.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.svtplay.se/video/1/show/ep-1",
            "https://www.svtplay.se/video/2/show/ep-2",
        ]
    );
}

#[tokio::test]
async fn test_unknown_domain() {
    let ctx = ServiceContext::new(Arc::new(FakeHttp::new()));
    let registry = ServiceRegistry::with_defaults().unwrap();
    let resolution = registry
        .resolve(&ctx, "https://example.com/video/1", &ResolveOptions::default())
        .await;
    assert!(matches!(
        resolution.errors().as_slice(),
        [ServiceError::UnsupportedUrl(_)]
    ));
    assert!(registry
        .episodes(&ctx, "https://example.com/", &ResolveOptions::default())
        .await
        .is_err());
}

/// Lowercases and joins words with underscores
struct SnakeCase;

impl Sanitizer for SnakeCase {
    fn sanitize(&self, raw: &str) -> String {
        raw.split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase()
    }
}

/// Answers every HLS playlist with one fixed rendition
struct FixedHls;

impl ManifestParser for FixedHls {
    fn name(&self) -> &'static str {
        "fixed-hls"
    }

    fn parse(
        &self,
        options: &ResolveOptions,
        _response: &HttpResponse,
        source_url: &str,
    ) -> Result<BTreeMap<u32, StreamHandle>, ServiceError> {
        let mut streams = BTreeMap::new();
        streams.insert(42, StreamHandle::new(Protocol::Hls, source_url, 42, options));
        Ok(streams)
    }
}

#[tokio::test]
async fn test_custom_sanitizer_names_output() {
    let ctx = ServiceContext::new(Arc::new(fixture())).with_sanitizer(Box::new(SnakeCase));
    let registry = ServiceRegistry::with_defaults().unwrap();
    let options = ResolveOptions::default().with_output_auto(true);

    let resolution = registry.resolve(&ctx, PAGE_URL, &options).await;
    assert_eq!(
        resolution.options.output,
        Some(PathBuf::from("show.s01e02.ep1-6ca13d5-svtplay"))
    );
}

#[tokio::test]
async fn test_custom_manifest_parser() {
    let parsers = ManifestParsers {
        hls: Box::new(FixedHls),
        ..ManifestParsers::default()
    };
    let ctx = ServiceContext::new(Arc::new(fixture())).with_parsers(parsers);
    let registry = ServiceRegistry::with_defaults().unwrap();

    let resolution = registry
        .resolve(&ctx, PAGE_URL, &ResolveOptions::default())
        .await;
    let hls: Vec<&StreamHandle> = resolution
        .streams()
        .into_iter()
        .filter(|s| s.protocol == Protocol::Hls)
        .collect();

    // Primary and alternate both go through the replacement parser
    assert_eq!(hls.len(), 2);
    assert!(hls.iter().all(|s| s.bitrate == 42));
    assert_eq!(hls[1].url, "https://alt-cdn.example.com/v/master.m3u8");
}
