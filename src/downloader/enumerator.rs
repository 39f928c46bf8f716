// Episode enumerator - expands a listing page into episode page URLs
//
// svtplay prefers the RSS feed and falls back to the embedded page state;
// viafree reads the program store. Output is path-unique and sorted.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

use super::errors::ServiceError;
use super::fields::{Field, FieldTable, SVTPLAY_FIELDS, VIAFREE_FIELDS};
use super::filename::{derive_filename, AUDIO_DESCRIPTION_SUFFIX, SIGN_INTERPRETATION_SUFFIX};
use super::models::{EpisodeReference, ResolveOptions};
use super::normalizer::{Normalizer, Schema};
use super::resolver::PROGRAM_STORE_RE;
use super::traits::{HttpClient, Sanitizer};
use super::utils::{embedded_json, join_url, json_string, json_u32, query_param, url_path};

pub const SVTPLAY_ORIGIN: &str = "https://www.svtplay.se";
pub const LAST_CHANCE_MAX_PAGES: u32 = 10;
const RSS_SUFFIX: &str = "rss.xml";

lazy_static! {
    pub(crate) static ref SVTPLAY_STATE_RE: Regex =
        Regex::new(r"__svtplay'\] = (\{.*\});").unwrap();
    static ref RSS_LINK_RE: Regex = Regex::new(
        r#"<link rel="alternate" type="application/rss\+xml" [^>]*href="([^"]+)""#
    )
    .unwrap();
    static ref SEASON_PATH_RE: Regex = Regex::new(r"sasong-(\d+)").unwrap();
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    link: Option<String>,
}

/// Links of every `<item>` in an RSS document
pub fn parse_rss_links(body: &str) -> Result<Vec<String>, ServiceError> {
    let rss: Rss = quick_xml::de::from_str(body)
        .map_err(|e| ServiceError::Extraction(format!("Invalid RSS feed: {}", e)))?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| item.link)
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .collect())
}

/// Dedupe by path, expand against `origin`, sort, keep the last `all_last`
pub fn finalize(
    origin: &str,
    references: Vec<String>,
    all_last: usize,
) -> Result<Vec<EpisodeReference>, ServiceError> {
    let mut seen = HashSet::new();
    let mut expanded = Vec::new();
    for reference in references {
        let absolute = join_url(origin, &reference)?;
        if seen.insert(url_path(&absolute)) {
            expanded.push(absolute);
        }
    }
    expanded.sort();

    if all_last > 0 && expanded.len() > all_last {
        expanded = expanded.split_off(expanded.len() - all_last);
    }
    Ok(expanded.into_iter().map(EpisodeReference).collect())
}

fn origin_of(url: &str) -> Result<String, ServiceError> {
    Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .map_err(|_| ServiceError::UnsupportedUrl(url.to_string()))
}

pub struct EpisodeEnumerator<'a> {
    http: &'a dyn HttpClient,
    sanitizer: &'a dyn Sanitizer,
}

impl<'a> EpisodeEnumerator<'a> {
    pub fn new(http: &'a dyn HttpClient, sanitizer: &'a dyn Sanitizer) -> Self {
        Self { http, sanitizer }
    }

    async fn fetch(&self, url: &str) -> Result<String, ServiceError> {
        let response = self.http.get(url).await?;
        if !response.is_success() {
            return Err(ServiceError::Http {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }

    // ==================== svtplay ====================

    pub async fn svtplay(
        &self,
        listing_url: &str,
        options: &ResolveOptions,
    ) -> Result<Vec<EpisodeReference>, ServiceError> {
        let mut url = listing_url.to_string();
        let path = url_path(&url);
        let tab = query_param(&url, "tab");
        let is_feed = path.len() > RSS_SUFFIX.len() && path.ends_with(RSS_SUFFIX);

        let mut page: Option<String> = None;
        let feed_url = if is_feed {
            Some(url.clone())
        } else {
            let html = self.fetch(&url).await?;
            let link = RSS_LINK_RE
                .captures(&html)
                .map(|c| c[1].to_string())
                .map(|href| join_url(&url, &href))
                .transpose()?;
            page = Some(html);
            link
        };

        if !options.include_clips && tab.is_none() {
            if let Some(feed_url) = feed_url {
                match self.feed(&feed_url).await {
                    Ok(links) => {
                        info!(count = links.len(), "Episodes from RSS feed");
                        return finalize(SVTPLAY_ORIGIN, links, options.all_last);
                    }
                    Err(e) => warn!(
                        feed = %feed_url,
                        error = %e,
                        "Error parsing RSS feed, falling back to page data"
                    ),
                }
            }
        } else if is_feed {
            url = url.replace(RSS_SUFFIX, "");
            page = None;
        }

        let paths = if path.contains("sista-chansen") {
            self.last_chance().await?
        } else {
            let html = match page {
                Some(html) => html,
                None => self.fetch(&url).await?,
            };
            let state = embedded_json(&SVTPLAY_STATE_RE, &html).ok_or_else(|| {
                ServiceError::Extraction("Couldn't retrieve episode list".to_string())
            })??;
            if path.contains("/genre") {
                self.genre(&state, tab.as_deref(), options)
            } else {
                self.title_page(&state, tab.as_deref(), options)
            }
        };

        debug!(count = paths.len(), "Episodes from page data");
        finalize(SVTPLAY_ORIGIN, paths, options.all_last)
    }

    async fn feed(&self, feed_url: &str) -> Result<Vec<String>, ServiceError> {
        let body = self.fetch(feed_url).await?;
        parse_rss_links(&body)
    }

    /// Bounded walk over the paginated last-chance grid
    async fn last_chance(&self) -> Result<Vec<String>, ServiceError> {
        let t = &SVTPLAY_FIELDS;
        let mut collected = Vec::new();
        let mut page = 1;
        let mut last_page = LAST_CHANCE_MAX_PAGES;

        while page <= last_page {
            let url = format!("{}/sista-chansen?sida={}", SVTPLAY_ORIGIN, page);
            let response = self.http.get(&url).await?;
            let state = match embedded_json(&SVTPLAY_STATE_RE, &response.body) {
                Some(state) => state?,
                None => break,
            };
            let grid = match t.get(&state, Field::GridPage) {
                Some(grid) => grid,
                None => break,
            };
            if let Some(total) = t
                .get(grid, Field::Pagination)
                .and_then(|p| t.get(p, Field::TotalPages))
                .and_then(json_u32)
            {
                last_page = total.min(LAST_CHANCE_MAX_PAGES);
            }
            collected.extend(
                t.array(grid, Field::Content)
                    .iter()
                    .filter_map(|item| t.str(item, Field::ContentUrl))
                    .map(str::to_string),
            );
            page += 1;
        }
        Ok(collected)
    }

    fn genre(&self, state: &Value, tab: Option<&str>, options: &ResolveOptions) -> Vec<String> {
        let t = &SVTPLAY_FIELDS;
        let mut paths = Vec::new();
        let cluster = match t.get(state, Field::ClusterPage) {
            Some(cluster) => cluster,
            None => return paths,
        };
        match tab {
            Some(tab) => {
                for entry in t.array(cluster, Field::Tabs) {
                    if t.str(entry, Field::Slug) == Some(tab) {
                        self.videos_to_list(t.array(entry, Field::Content), &mut paths, options);
                    }
                }
            }
            None => self.videos_to_list(t.array(cluster, Field::Clips), &mut paths, options),
        }
        paths
    }

    fn title_page(&self, state: &Value, tab: Option<&str>, options: &ResolveOptions) -> Vec<String> {
        let t = &SVTPLAY_FIELDS;
        let mut paths = Vec::new();
        let tabs = t
            .get(state, Field::VideoTitlePage)
            .map(|page| t.array(page, Field::RelatedVideosTabs))
            .unwrap_or(&[]);

        for entry in tabs {
            let slug = t.str(entry, Field::Slug).unwrap_or_default();
            let wanted = match tab {
                Some(tab) => slug == tab,
                None => slug.contains("sasong") || slug.contains("senast"),
            };
            if wanted {
                self.videos_to_list(t.array(entry, Field::Videos), &mut paths, options);
            }
            if options.include_clips && slug == "klipp" {
                self.videos_to_list(t.array(entry, Field::Videos), &mut paths, options);
            }
        }
        paths
    }

    /// Append each video path, and each access version path, unless excluded
    fn videos_to_list(&self, videos: &[Value], paths: &mut Vec<String>, options: &ResolveOptions) {
        let t = &SVTPLAY_FIELDS;
        let normalizer = Normalizer::new(t, Schema::Svtplay);

        for video in videos {
            if let Some(content_url) = t.str(video, Field::ContentUrl) {
                let path = url_path(content_url);
                if !paths.contains(&path) {
                    let excluded = match normalizer.normalize(video, false, None) {
                        Ok(metadata) => {
                            let name = derive_filename(
                                &metadata,
                                options.output.as_deref(),
                                "svtplay",
                                self.sanitizer,
                            );
                            options.excluded(&name.to_string_lossy())
                        }
                        Err(e) => {
                            debug!(path = %path, error = %e, "Listing entry without metadata");
                            false
                        }
                    };
                    if excluded {
                        debug!(path = %path, "Excluding listing entry");
                    } else {
                        paths.push(path);
                    }
                }
            }

            for version in t.array(video, Field::Versions) {
                let Some(content_url) = t.str(version, Field::ContentUrl) else {
                    continue;
                };
                let path = url_path(content_url);
                let suffix = match t.str(version, Field::AccessService) {
                    Some(a) if a == t.key(Field::AudioDescription) => AUDIO_DESCRIPTION_SUFFIX,
                    Some(a) if a == t.key(Field::SignInterpretation) => SIGN_INTERPRETATION_SUFFIX,
                    _ => "",
                };
                if !options.excluded(suffix) && !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
    }

    // ==================== viafree ====================

    pub async fn viafree(
        &self,
        listing_url: &str,
        options: &ResolveOptions,
    ) -> Result<Vec<EpisodeReference>, ServiceError> {
        let t: &FieldTable = &VIAFREE_FIELDS;
        let html = self.fetch(listing_url).await?;
        let store = embedded_json(&PROGRAM_STORE_RE, &html).ok_or_else(|| {
            ServiceError::Extraction("Couldn't retrieve episode list".to_string())
        })??;

        let wanted_season: Option<u32> = SEASON_PATH_RE
            .captures(&url_path(listing_url))
            .and_then(|c| c[1].parse().ok());

        let format = t.get(&store, Field::Format).ok_or_else(|| {
            ServiceError::Normalization(format!("{}: missing \"{}\"", t.service, t.key(Field::Format)))
        })?;

        let seasons: Vec<u32> = t
            .array(format, Field::Seasons)
            .iter()
            .filter_map(|s| t.get(s, Field::SeasonNumber).and_then(json_u32))
            .filter(|n| wanted_season.map_or(true, |w| w == *n))
            .collect();

        let mut links = Vec::new();
        let videos = t.get(format, Field::Videos);
        for season in seasons {
            let Some(group) = videos.and_then(|v| v.get(season.to_string())) else {
                continue;
            };
            let mut kinds = vec![Field::Program];
            if options.include_clips {
                kinds.push(Field::Clip);
            }
            for kind in kinds {
                links.extend(
                    t.array(group, kind)
                        .iter()
                        .filter_map(|entry| t.get(entry, Field::SharingUrl).and_then(json_string)),
                );
            }
        }

        finalize(&origin_of(listing_url)?, links, options.all_last)
    }
}
