// Identifier resolver - ordered strategy chain for viafree-family pages
//
// Strategies run in order; the first one that yields an id wins.
// Order matters: page attributes beat embedded JSON, JSON beats the URL.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::fields::{Field, FieldTable, VIAFREE_FIELDS};
use super::utils::{embedded_json, json_string, json_u32, url_path};

lazy_static! {
    static ref DATA_VIDEO_ID_RE: Regex = Regex::new(r#"data-video-id="([0-9]+)""#).unwrap();
    static ref DATA_VIDEOID_RE: Regex = Regex::new(r#"data-videoid="([0-9]+)"#).unwrap();
    static ref PARAMS_RE: Regex = Regex::new(r#"params":(\{.*\}),"query"#).unwrap();
    pub(crate) static ref PROGRAM_STORE_RE: Regex =
        Regex::new(r#""ContentPageProgramStore":(\{.*\}),"ApplicationStore"#).unwrap();
    static ref TRAILING_NUMBER_RE: Regex = Regex::new(r"\w-(\d+)$").unwrap();
    static ref SLUG_NUMBER_RE: Regex = Regex::new(r"(\w+)-(\d+)").unwrap();
    static ref SEASON_SLUG_RE: Regex = Regex::new(r"(s\w+)-(\d+)").unwrap();
    static ref EPISODE_IN_URL_RE: Regex = Regex::new(r"(episode|avsnitt)-(\d+)").unwrap();
    static ref PATH_NUMBER_RE: Regex = Regex::new(r"/\w+/(\d+)").unwrap();
    static ref JUICYPLAY_IFRAME_RE: Regex =
        Regex::new(r#"iframe src="http://play\.juicyplay\.se[^"]+id=(\d+)"#).unwrap();
}

/// Page as seen by the strategies
#[derive(Debug, Clone, Copy)]
pub struct PageInput<'a> {
    pub html: &'a str,
    pub url: &'a str,
}

impl<'a> PageInput<'a> {
    pub fn new(html: &'a str, url: &'a str) -> Self {
        Self { html, url }
    }
}

/// One way of finding a video id in a page
pub trait ExtractionStrategy: Send + Sync {
    /// Name of the strategy (for logging)
    fn name(&self) -> &'static str;

    fn try_extract(&self, page: &PageInput) -> Option<String>;
}

/// `data-video-id="123"`
pub struct DataVideoIdAttribute;

impl ExtractionStrategy for DataVideoIdAttribute {
    fn name(&self) -> &'static str {
        "data-video-id"
    }

    fn try_extract(&self, page: &PageInput) -> Option<String> {
        first_capture(&DATA_VIDEO_ID_RE, page.html)
    }
}

/// `data-videoid="123`
pub struct DataVideoidAttribute;

impl ExtractionStrategy for DataVideoidAttribute {
    fn name(&self) -> &'static str {
        "data-videoid"
    }

    fn try_extract(&self, page: &PageInput) -> Option<String> {
        first_capture(&DATA_VIDEOID_RE, page.html)
    }
}

/// Season/episode tokens from the router `params` blob
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParamsTokens {
    season: String,
    episode: String,
    /// Episode token is an opaque clip id rather than `avsnitt-N`
    clip: bool,
}

fn params_tokens(page: &PageInput, fields: &FieldTable) -> Option<ParamsTokens> {
    let params = embedded_json(&PARAMS_RE, page.html)?.ok()?;
    let season_raw = json_string(fields.get(&params, Field::SeasonNumberOrVideoId)?)?;
    let mut season = TRAILING_NUMBER_RE
        .captures(&season_raw)
        .map(|c| c[1].to_string())
        .unwrap_or(season_raw);

    match fields
        .get(&params, Field::VideoIdOrEpisodeNumber)
        .and_then(json_string)
    {
        Some(token) => {
            if let Some(caps) = SEASON_SLUG_RE.captures(&season) {
                season = caps[2].to_string();
            }
            match SLUG_NUMBER_RE.captures(&token) {
                Some(caps) => Some(ParamsTokens {
                    season,
                    episode: caps[2].to_string(),
                    clip: false,
                }),
                None => Some(ParamsTokens {
                    season,
                    episode: token,
                    clip: true,
                }),
            }
        }
        None => {
            let episode = EPISODE_IN_URL_RE
                .captures(page.url)
                .map(|c| c[2].to_string())
                .unwrap_or_else(|| season.clone());
            Some(ParamsTokens {
                season,
                episode,
                clip: false,
            })
        }
    }
}

/// Clip ids straight from the `params` blob
pub struct RouterParams {
    fields: &'static FieldTable,
}

impl ExtractionStrategy for RouterParams {
    fn name(&self) -> &'static str {
        "router-params"
    }

    fn try_extract(&self, page: &PageInput) -> Option<String> {
        params_tokens(page, self.fields)
            .filter(|tokens| tokens.clip)
            .map(|tokens| tokens.episode)
    }
}

/// Season/episode tokens matched against the program store listing
pub struct ProgramStoreLookup {
    fields: &'static FieldTable,
}

impl ExtractionStrategy for ProgramStoreLookup {
    fn name(&self) -> &'static str {
        "program-store"
    }

    fn try_extract(&self, page: &PageInput) -> Option<String> {
        let tokens = params_tokens(page, self.fields).filter(|t| !t.clip)?;
        let store = embedded_json(&PROGRAM_STORE_RE, page.html)?.ok()?;
        let f = self.fields;

        let season: Option<u32> = tokens.season.parse().ok();
        let episode: Option<u32> = tokens.episode.parse().ok();
        let videos = f
            .get(&store, Field::Format)
            .and_then(|format| f.get(format, Field::Videos))
            .and_then(Value::as_object)?;

        for group in videos.values() {
            for program in f.array(group, Field::Program) {
                let program_episode = f.get(program, Field::EpisodeNumber).and_then(json_u32);
                let program_season = f.get(program, Field::SeasonNumber).and_then(json_u32);
                let program_id = f.get(program, Field::Id).and_then(json_string);

                if episode.is_some()
                    && program_episode == episode
                    && program_season == season
                {
                    if let Some(id) = program_id {
                        return Some(id);
                    }
                }
                if program_id.as_deref() == Some(tokens.episode.as_str()) {
                    return Some(tokens.episode);
                }
            }
        }
        None
    }
}

/// `/<word>/<digits>` in the URL path
pub struct UrlPathNumber;

impl ExtractionStrategy for UrlPathNumber {
    fn name(&self) -> &'static str {
        "url-path"
    }

    fn try_extract(&self, page: &PageInput) -> Option<String> {
        first_capture(&PATH_NUMBER_RE, &url_path(page.url))
    }
}

/// Embedded juicyplay player iframe
pub struct JuicyplayIframe;

impl ExtractionStrategy for JuicyplayIframe {
    fn name(&self) -> &'static str {
        "juicyplay-iframe"
    }

    fn try_extract(&self, page: &PageInput) -> Option<String> {
        first_capture(&JUICYPLAY_IFRAME_RE, page.html)
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strategy chain
pub struct IdentifierResolver {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl IdentifierResolver {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Default chain for viafree pages
    pub fn viafree() -> Self {
        Self::new(vec![
            Box::new(DataVideoIdAttribute),
            Box::new(DataVideoidAttribute),
            Box::new(RouterParams {
                fields: &VIAFREE_FIELDS,
            }),
            Box::new(ProgramStoreLookup {
                fields: &VIAFREE_FIELDS,
            }),
            Box::new(UrlPathNumber),
            Box::new(JuicyplayIframe),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve_video_id(&self, html: &str, url: &str) -> Option<String> {
        let page = PageInput::new(html, url);
        for strategy in &self.strategies {
            if let Some(id) = strategy.try_extract(&page) {
                debug!(strategy = strategy.name(), id = %id, "Resolved video id");
                return Some(id);
            }
        }
        debug!(url = %url, "No strategy matched");
        None
    }
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self::viafree()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://www.viafree.se/program/reality/paradise-hotel/sasong-2/avsnitt-12";

    fn resolve(html: &str, url: &str) -> Option<String> {
        IdentifierResolver::viafree().resolve_video_id(html, url)
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(
            IdentifierResolver::viafree().strategy_names(),
            vec![
                "data-video-id",
                "data-videoid",
                "router-params",
                "program-store",
                "url-path",
                "juicyplay-iframe"
            ]
        );
    }

    #[test]
    fn test_data_video_id_wins() {
        let html = r#"<div data-video-id="111"></div><div data-videoid="222"></div>"#;
        assert_eq!(resolve(html, "https://www.viafree.se/x/333"), Some("111".to_string()));
    }

    #[test]
    fn test_data_videoid() {
        let html = r#"<div data-videoid="222"></div>"#;
        assert_eq!(resolve(html, "https://www.viafree.se/"), Some("222".to_string()));
    }

    #[test]
    fn test_router_params_clip() {
        let html = r#"{"params":{"seasonNumberOrVideoId":"sasong-2","videoIdOrEpisodeNumber":"998877"},"query":{}}"#;
        assert_eq!(resolve(html, PAGE_URL), Some("998877".to_string()));
    }

    #[test]
    fn test_program_store_match() {
        let html = concat!(
            r#"{"params":{"seasonNumberOrVideoId":"sasong-2","videoIdOrEpisodeNumber":"avsnitt-12"},"query":{}},"#,
            r#""ContentPageProgramStore":{"format":{"videos":{"2":{"program":["#,
            r#"{"id":"5001","episodeNumber":11,"seasonNumber":2},"#,
            r#"{"id":"5002","episodeNumber":12,"seasonNumber":2}]}}}},"ApplicationStore":{}"#
        );
        assert_eq!(resolve(html, PAGE_URL), Some("5002".to_string()));
    }

    #[test]
    fn test_missing_episode_token_uses_url() {
        let html = concat!(
            r#"{"params":{"seasonNumberOrVideoId":"sasong-1"},"query":{}},"#,
            r#""ContentPageProgramStore":{"format":{"videos":{"1":{"program":["#,
            r#"{"id":7,"episodeNumber":4,"seasonNumber":1}]}}}},"ApplicationStore":{}"#
        );
        let url = "https://www.viafree.se/program/x/sasong-1/avsnitt-4";
        assert_eq!(resolve(html, url), Some("7".to_string()));
    }

    #[test]
    fn test_url_path_number() {
        assert_eq!(
            resolve("<html></html>", "https://www.tv3play.se/program/12345"),
            Some("12345".to_string())
        );
    }

    #[test]
    fn test_juicyplay_iframe() {
        let html = r#"<iframe src="http://play.juicyplay.se/embed?id=4242"></iframe>"#;
        assert_eq!(resolve(html, "https://juicyplay.se/"), Some("4242".to_string()));
    }

    #[test]
    fn test_exhausted_chain() {
        assert_eq!(resolve("<html></html>", "https://www.viafree.se/"), None);
    }

    #[test]
    fn test_custom_chain() {
        let resolver = IdentifierResolver::new(vec![Box::new(JuicyplayIframe)]);
        let html = r#"<div data-video-id="111"></div>"#;
        assert_eq!(resolver.resolve_video_id(html, "https://x/program/9"), None);
    }
}
