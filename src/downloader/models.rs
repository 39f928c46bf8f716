// Common data models for service resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of title as declared by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitleType {
    Movie,
    TvShow,
    Clip,
    /// Raw upstream value we have no mapping for
    Other(String),
}

impl fmt::Display for TitleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "Movie"),
            Self::TvShow => write!(f, "TV-Show"),
            Self::Clip => write!(f, "Clip"),
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Season and episode always travel together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonEpisode {
    pub season: u32,
    pub episode: u32,
}

impl SeasonEpisode {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    /// `S01E02`, or None when both numbers are zero
    pub fn tag(&self) -> Option<String> {
        if self.season == 0 && self.episode == 0 {
            return None;
        }
        Some(format!("S{:02}E{:02}", self.season, self.episode))
    }
}

/// Normalized metadata for one episode or clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMetadata {
    /// Program name, absent when it adds nothing over the title
    pub show: Option<String>,
    pub title: String,
    /// Opaque service id, used for API calls and filename hashing
    pub video_id: String,
    pub broadcast_date: Option<String>,
    pub publish_date: Option<String>,
    pub duration_minutes: u64,
    pub season_episode: Option<SeasonEpisode>,
    pub title_type: Option<TitleType>,
    pub has_subtitle: bool,
    pub audio_description: bool,
    pub sign_interpretation: bool,
    pub description: Option<String>,
}

impl CanonicalMetadata {
    pub fn season(&self) -> Option<u32> {
        self.season_episode.map(|se| se.season)
    }

    pub fn episode(&self) -> Option<u32> {
        self.season_episode.map(|se| se.episode)
    }

    /// Copy of this record with a different season/episode pair
    pub fn with_season_episode(&self, season_episode: Option<SeasonEpisode>) -> Self {
        Self {
            season_episode,
            ..self.clone()
        }
    }
}

/// Declared format of one entry in a video references list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFormat {
    Hls,
    Hds,
    Dash264,
    DashHbbtv,
    /// Single-file "medium" stream, RTMP or an f4m manifest
    RtmpMedium,
    Unknown(String),
}

impl StreamFormat {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "hls" => Self::Hls,
            "hds" => Self::Hds,
            "dash264" => Self::Dash264,
            "dashhbbtv" => Self::DashHbbtv,
            "rtmp-medium" | "medium" => Self::RtmpMedium,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFormatDescriptor {
    pub format: StreamFormat,
    pub primary_url: String,
    pub alternate_url: Option<String>,
}

impl StreamFormatDescriptor {
    pub fn new(format: StreamFormat, primary_url: impl Into<String>) -> Self {
        Self {
            format,
            primary_url: primary_url.into(),
            alternate_url: None,
        }
    }

    pub fn with_alternate(mut self, alternate_url: Option<String>) -> Self {
        self.alternate_url = alternate_url;
        self
    }
}

/// Absolute URL of an episode page
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeReference(pub String);

impl EpisodeReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery protocol of a resolved stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Hls,
    Dash,
    Hds,
    Rtmp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hls => write!(f, "hls"),
            Self::Dash => write!(f, "dash"),
            Self::Hds => write!(f, "hds"),
            Self::Rtmp => write!(f, "rtmp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hls" => Ok(Self::Hls),
            "dash" => Ok(Self::Dash),
            "hds" => Ok(Self::Hds),
            "rtmp" => Ok(Self::Rtmp),
            other => Err(format!("unknown protocol: {}", other)),
        }
    }
}

/// One playable rendition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamHandle {
    pub protocol: Protocol,
    /// Manifest, playlist or RTMP connection URL
    pub url: String,
    /// Bitrate in kbps
    pub bitrate: u32,
    /// HDS media path inside the manifest
    pub media: Option<String>,
    /// Extra client arguments (RTMP)
    pub args: Vec<String>,
    pub live: bool,
    pub output: Option<PathBuf>,
}

impl StreamHandle {
    pub fn new(protocol: Protocol, url: impl Into<String>, bitrate: u32, options: &ResolveOptions) -> Self {
        Self {
            protocol,
            url: url.into(),
            bitrate,
            media: None,
            args: Vec::new(),
            live: options.live,
            output: options.output.clone(),
        }
    }
}

/// Subtitle container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubtitleKind {
    /// WebVTT / web SRT
    Wrst,
    Sami,
}

impl fmt::Display for SubtitleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wrst => write!(f, "wrst"),
            Self::Sami => write!(f, "sami"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleHandle {
    pub kind: SubtitleKind,
    pub url: String,
    /// Appended to the output name, e.g. `-SDH`
    pub suffix: Option<String>,
    pub output: Option<PathBuf>,
}

impl SubtitleHandle {
    pub fn new(options: &ResolveOptions, kind: SubtitleKind, url: impl Into<String>, suffix: Option<&str>) -> Self {
        Self {
            kind,
            url: url.into(),
            suffix: suffix.map(str::to_string),
            output: options.output.clone(),
        }
    }

    /// Kind implied by the file extension of a subtitle URL
    pub fn kind_for_url(url: &str) -> SubtitleKind {
        if url.ends_with("vtt") {
            SubtitleKind::Wrst
        } else {
            SubtitleKind::Sami
        }
    }
}

/// Configuration snapshot threaded through one resolution.
///
/// Stages never mutate a shared instance; they return an updated copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOptions {
    /// Output path hint, replaced by the derived name when `output_auto`
    pub output: Option<PathBuf>,
    pub output_auto: bool,
    /// Tag of the service that resolved the page
    pub service: Option<String>,
    pub live: bool,
    pub get_info: bool,
    pub get_all_subtitles: bool,
    pub include_clips: bool,
    /// Keep only the last N enumerated episodes (0 keeps all)
    pub all_last: usize,
    pub exclude: Vec<String>,
    /// Preferred bitrate in kbps
    pub quality: Option<u32>,
    /// Accepted distance from `quality` in kbps
    pub flexible_quality: u32,
    pub preferred: Option<Protocol>,
}

impl ResolveOptions {
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_output_auto(mut self, enabled: bool) -> Self {
        self.output_auto = enabled;
        self
    }

    pub fn with_service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    pub fn with_live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn with_get_info(mut self, enabled: bool) -> Self {
        self.get_info = enabled;
        self
    }

    pub fn with_include_clips(mut self, enabled: bool) -> Self {
        self.include_clips = enabled;
        self
    }

    pub fn with_all_last(mut self, n: usize) -> Self {
        self.all_last = n;
        self
    }

    pub fn with_exclude(mut self, words: Vec<String>) -> Self {
        self.exclude = words;
        self
    }

    pub fn with_get_all_subtitles(mut self, enabled: bool) -> Self {
        self.get_all_subtitles = enabled;
        self
    }

    pub fn with_quality(mut self, quality: Option<u32>, flexible: u32) -> Self {
        self.quality = quality;
        self.flexible_quality = flexible;
        self
    }

    pub fn with_preferred(mut self, preferred: Option<Protocol>) -> Self {
        self.preferred = preferred;
        self
    }

    /// True when any exclude word occurs in `name`
    pub fn excluded(&self, name: &str) -> bool {
        self.exclude
            .iter()
            .filter(|word| !word.is_empty())
            .any(|word| name.contains(word.as_str()))
    }

    /// Same check applied to the current output path
    pub fn output_excluded(&self) -> bool {
        self.output
            .as_deref()
            .and_then(Path::to_str)
            .map_or(false, |name| self.excluded(name))
    }
}

/// Network configuration for the HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// SOCKS5 or HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Timeout in seconds
    pub timeout_seconds: Option<u32>,

    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_seconds: Some(30),
            user_agent: None,
        }
    }
}
