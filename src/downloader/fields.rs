// Per-service JSON field tables
//
// Every upstream key the services read lives in one of these tables, so an
// upstream rename is a one-line change here. Tables are validated once when
// the service registry is built.

use serde_json::Value;
use std::collections::HashSet;

use super::errors::ServiceError;

/// Logical name of an upstream JSON field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    AccessService,
    AudioDescription,
    SignInterpretation,
    VideoTitlePage,
    Video,
    ProgramTitle,
    Title,
    Versions,
    Live,
    SubtitleReferences,
    Format,
    VideoReferences,
    Url,
    Alt,
    BroadcastDate,
    PublishDate,
    Duration,
    Episodic,
    Season,
    EpisodeNumber,
    TitleType,
    ClosedCaptioned,
    ProgramVersionId,
    Id,
    GridPage,
    Pagination,
    TotalPages,
    Content,
    ContentUrl,
    ClusterPage,
    Tabs,
    Slug,
    Clips,
    RelatedVideosTabs,
    Videos,
    Description,
    Summary,
    FormatTitle,
    Broadcasts,
    AirAt,
    PlayableFrom,
    FormatPosition,
    IsEpisodic,
    Episode,
    Type,
    SamiPath,
    SubtitlesWebvtt,
    SubtitlesForHearingImpaired,
    Streams,
    Medium,
    Hls,
    Msg,
    DerivedFromId,
    SeasonNumberOrVideoId,
    VideoIdOrEpisodeNumber,
    Program,
    SeasonNumber,
    Seasons,
    SharingUrl,
    Clip,
}

/// Immutable mapping from logical field to upstream key
#[derive(Debug)]
pub struct FieldTable {
    pub service: &'static str,
    entries: &'static [(Field, &'static str)],
    required: &'static [Field],
}

impl FieldTable {
    pub const fn new(
        service: &'static str,
        entries: &'static [(Field, &'static str)],
        required: &'static [Field],
    ) -> Self {
        Self {
            service,
            entries,
            required,
        }
    }

    /// Upstream key for `field`; empty when the table lacks it, which makes
    /// every lookup miss instead of reading an unrelated key.
    pub fn key(&self, field: Field) -> &'static str {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, key)| *key)
            .unwrap_or("")
    }

    /// Non-null value of `field` in `value`
    pub fn get<'a>(&self, value: &'a Value, field: Field) -> Option<&'a Value> {
        match value.get(self.key(field)) {
            Some(Value::Null) | None => None,
            Some(v) => Some(v),
        }
    }

    pub fn contains(&self, value: &Value, field: Field) -> bool {
        value.get(self.key(field)).is_some()
    }

    /// Non-empty string value of `field`
    pub fn str<'a>(&self, value: &'a Value, field: Field) -> Option<&'a str> {
        self.get(value, field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn array<'a>(&self, value: &'a Value, field: Field) -> &'a [Value] {
        self.get(value, field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Reject tables with duplicate fields, empty keys or missing fields
    pub fn validate(&self) -> Result<(), ServiceError> {
        let mut seen = HashSet::new();
        for (field, key) in self.entries {
            if key.is_empty() {
                return Err(ServiceError::Config(format!(
                    "{}: empty key for {:?}",
                    self.service, field
                )));
            }
            if !seen.insert(*field) {
                return Err(ServiceError::Config(format!(
                    "{}: duplicate entry for {:?}",
                    self.service, field
                )));
            }
        }
        for field in self.required {
            if !seen.contains(field) {
                return Err(ServiceError::Config(format!(
                    "{}: missing entry for {:?}",
                    self.service, field
                )));
            }
        }
        Ok(())
    }
}

pub static SVTPLAY_FIELDS: FieldTable = FieldTable::new(
    "svtplay",
    &[
        (Field::AccessService, "accessService"),
        (Field::AudioDescription, "audioDescription"),
        (Field::SignInterpretation, "signInterpretation"),
        (Field::VideoTitlePage, "videoTitlePage"),
        (Field::Video, "video"),
        (Field::ProgramTitle, "programTitle"),
        (Field::Title, "title"),
        (Field::Versions, "versions"),
        (Field::Live, "live"),
        (Field::SubtitleReferences, "subtitleReferences"),
        (Field::Format, "format"),
        (Field::VideoReferences, "videoReferences"),
        (Field::Url, "url"),
        (Field::Alt, "alt"),
        (Field::BroadcastDate, "broadcastDate"),
        (Field::PublishDate, "publishDate"),
        (Field::Duration, "materialLength"),
        (Field::Episodic, "episodic"),
        (Field::Season, "season"),
        (Field::EpisodeNumber, "episodeNumber"),
        (Field::TitleType, "titleType"),
        (Field::ClosedCaptioned, "closedCaptioned"),
        (Field::ProgramVersionId, "programVersionId"),
        (Field::Id, "id"),
        (Field::GridPage, "gridPage"),
        (Field::Pagination, "pagination"),
        (Field::TotalPages, "totalPages"),
        (Field::Content, "content"),
        (Field::ContentUrl, "contentUrl"),
        (Field::ClusterPage, "clusterPage"),
        (Field::Tabs, "tabs"),
        (Field::Slug, "slug"),
        (Field::Clips, "clips"),
        (Field::RelatedVideosTabs, "relatedVideosTabs"),
        (Field::Videos, "videos"),
        (Field::Description, "description"),
    ],
    &[
        Field::AccessService,
        Field::AudioDescription,
        Field::SignInterpretation,
        Field::VideoTitlePage,
        Field::Video,
        Field::ProgramTitle,
        Field::Title,
        Field::Duration,
        Field::ProgramVersionId,
        Field::Id,
        Field::VideoReferences,
        Field::Format,
        Field::Url,
        Field::ContentUrl,
        Field::Slug,
    ],
);

pub static VIAFREE_FIELDS: FieldTable = FieldTable::new(
    "viafree",
    &[
        (Field::Id, "id"),
        (Field::SeasonNumberOrVideoId, "seasonNumberOrVideoId"),
        (Field::VideoIdOrEpisodeNumber, "videoIdOrEpisodeNumber"),
        (Field::Format, "format"),
        (Field::Videos, "videos"),
        (Field::Program, "program"),
        (Field::EpisodeNumber, "episodeNumber"),
        (Field::SeasonNumber, "seasonNumber"),
        (Field::Seasons, "seasons"),
        (Field::SharingUrl, "sharingUrl"),
        (Field::Clip, "clip"),
        (Field::Msg, "msg"),
        (Field::Type, "type"),
        (Field::SamiPath, "sami_path"),
        (Field::SubtitlesWebvtt, "subtitles_webvtt"),
        (Field::SubtitlesForHearingImpaired, "subtitles_for_hearing_impaired"),
        (Field::Streams, "streams"),
        (Field::Medium, "medium"),
        (Field::Hls, "hls"),
        (Field::Title, "title"),
        (Field::ProgramTitle, "format_title"),
        (Field::DerivedFromId, "derived_from_id"),
        (Field::FormatPosition, "format_position"),
        (Field::IsEpisodic, "is_episodic"),
        (Field::Season, "season"),
        (Field::Episode, "episode"),
        (Field::Broadcasts, "broadcasts"),
        (Field::AirAt, "air_at"),
        (Field::PlayableFrom, "playable_from"),
        (Field::Duration, "duration"),
        (Field::Description, "description"),
        (Field::Summary, "summary"),
    ],
    &[
        Field::Id,
        Field::Title,
        Field::ProgramTitle,
        Field::Duration,
        Field::Type,
        Field::Msg,
        Field::Streams,
        Field::Medium,
        Field::Hls,
        Field::SeasonNumberOrVideoId,
        Field::VideoIdOrEpisodeNumber,
    ],
);
