// Schema normalizer - per-service JSON into CanonicalMetadata
//
// All key lookups go through the service's FieldTable. Optional upstream
// fields are left out of the record rather than defaulted.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::errors::ServiceError;
use super::fields::{Field, FieldTable};
use super::models::{CanonicalMetadata, SeasonEpisode, TitleType};
use super::utils::{json_string, json_u32};

lazy_static! {
    static ref CLIP_TITLE_RE: Regex = Regex::new(r"(.+)-").unwrap();
}

/// JSON layout family of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Svtplay,
    Viafree,
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    table: &'static FieldTable,
    schema: Schema,
}

impl Normalizer {
    pub fn new(table: &'static FieldTable, schema: Schema) -> Self {
        Self { table, schema }
    }

    /// Build the canonical record.
    ///
    /// `nested` means the record lives under the table's `Video` key.
    /// `access` is the access-service value the caller asked for, if any.
    pub fn normalize(
        &self,
        raw: &Value,
        nested: bool,
        access: Option<&str>,
    ) -> Result<CanonicalMetadata, ServiceError> {
        let raw = if nested {
            self.table
                .get(raw, Field::Video)
                .ok_or_else(|| missing(self.table, Field::Video))?
        } else {
            raw
        };

        match self.schema {
            Schema::Svtplay => self.normalize_svtplay(raw, access),
            Schema::Viafree => self.normalize_viafree(raw, access),
        }
    }

    fn normalize_svtplay(
        &self,
        raw: &Value,
        access: Option<&str>,
    ) -> Result<CanonicalMetadata, ServiceError> {
        let t = self.table;
        let (program, title) = self.titles(raw)?;

        let season_episode = if t.contains(raw, Field::Episodic) {
            pair(t.get(raw, Field::Season), t.get(raw, Field::EpisodeNumber))
        } else {
            None
        };

        let title_type = t.str(raw, Field::TitleType).map(|raw_type| match raw_type {
            "MOVIE" => TitleType::Movie,
            "SERIES_OR_TV_SHOW" => TitleType::TvShow,
            "CLIP" => TitleType::Clip,
            other => TitleType::Other(other.to_string()),
        });

        let video_id = t
            .get(raw, Field::ProgramVersionId)
            .and_then(json_string)
            .or_else(|| t.get(raw, Field::Id).and_then(json_string))
            .ok_or_else(|| missing(t, Field::Id))?;

        let (audio_description, sign_interpretation) = self.access_flags(access);

        Ok(CanonicalMetadata {
            show: show_name(program, &title),
            title,
            video_id,
            broadcast_date: t.str(raw, Field::BroadcastDate).map(str::to_string),
            publish_date: t.str(raw, Field::PublishDate).map(str::to_string),
            duration_minutes: duration_minutes(t.get(raw, Field::Duration)),
            season_episode,
            title_type,
            has_subtitle: truthy(t.get(raw, Field::ClosedCaptioned)),
            audio_description,
            sign_interpretation,
            description: t.str(raw, Field::Description).map(str::to_string),
        })
    }

    fn normalize_viafree(
        &self,
        raw: &Value,
        access: Option<&str>,
    ) -> Result<CanonicalMetadata, ServiceError> {
        let t = self.table;
        let (program, mut title) = self.titles(raw)?;

        let title_type = t.str(raw, Field::Type).map(|raw_type| match raw_type {
            "program" => TitleType::TvShow,
            "clip" => TitleType::Clip,
            other => TitleType::Other(other.to_string()),
        });

        // Clip titles carry the show name as a trailing "-showname"
        if title_type == Some(TitleType::Clip) {
            if let Some(stripped) = CLIP_TITLE_RE
                .captures(&title)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
            {
                title = stripped;
            }
        }

        let first_broadcast = t.array(raw, Field::Broadcasts).first();
        let season_episode = t.get(raw, Field::FormatPosition).and_then(|pos| {
            if t.contains(pos, Field::IsEpisodic) {
                pair(t.get(pos, Field::Season), t.get(pos, Field::Episode))
            } else {
                None
            }
        });

        let has_subtitle = [
            Field::SamiPath,
            Field::SubtitlesForHearingImpaired,
            Field::SubtitlesWebvtt,
        ]
        .iter()
        .any(|field| t.str(raw, *field).is_some());

        let description = match (t.str(raw, Field::Summary), t.str(raw, Field::Description)) {
            (Some(summary), Some(long)) => Some(format!("{}\n{}", summary, long)),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        };

        let video_id = t
            .get(raw, Field::Id)
            .and_then(json_string)
            .ok_or_else(|| missing(t, Field::Id))?;

        let (audio_description, sign_interpretation) = self.access_flags(access);

        Ok(CanonicalMetadata {
            show: show_name(program, &title),
            title,
            video_id,
            broadcast_date: first_broadcast
                .and_then(|b| t.str(b, Field::AirAt))
                .map(str::to_string),
            publish_date: first_broadcast
                .and_then(|b| t.str(b, Field::PlayableFrom))
                .map(str::to_string),
            duration_minutes: duration_minutes(t.get(raw, Field::Duration)),
            season_episode,
            title_type,
            has_subtitle,
            audio_description,
            sign_interpretation,
            description,
        })
    }

    /// Program title and title; both keys must exist structurally.
    /// A null or empty program title is "no show".
    fn titles(&self, raw: &Value) -> Result<(String, String), ServiceError> {
        let t = self.table;
        if !t.contains(raw, Field::ProgramTitle) {
            return Err(missing(t, Field::ProgramTitle));
        }
        let program = t
            .get(raw, Field::ProgramTitle)
            .and_then(json_string)
            .unwrap_or_default();
        let title = t
            .get(raw, Field::Title)
            .and_then(json_string)
            .ok_or_else(|| missing(t, Field::Title))?;
        Ok((program, title))
    }

    /// At most one of (audio description, sign interpretation)
    fn access_flags(&self, access: Option<&str>) -> (bool, bool) {
        match access.filter(|a| !a.is_empty()) {
            Some(a) if a == self.table.key(Field::AudioDescription) => (true, false),
            Some(a) if a == self.table.key(Field::SignInterpretation) => (false, true),
            _ => (false, false),
        }
    }
}

fn missing(table: &FieldTable, field: Field) -> ServiceError {
    ServiceError::Normalization(format!(
        "{}: missing \"{}\"",
        table.service,
        table.key(field)
    ))
}

fn show_name(program: String, title: &str) -> Option<String> {
    if !program.is_empty() && program != title {
        Some(program)
    } else {
        None
    }
}

fn pair(season: Option<&Value>, episode: Option<&Value>) -> Option<SeasonEpisode> {
    let season = season.and_then(json_u32)?;
    let episode = episode.and_then(json_u32)?;
    Some(SeasonEpisode::new(season, episode))
}

fn truthy(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Bool(false)))
}

/// ceil(seconds / 60); non-numeric or negative input counts as zero
pub fn duration_minutes(raw_seconds: Option<&Value>) -> u64 {
    let seconds = raw_seconds.and_then(Value::as_f64).unwrap_or(0.0);
    if seconds <= 0.0 {
        return 0;
    }
    (seconds / 60.0).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::fields::{SVTPLAY_FIELDS, VIAFREE_FIELDS};
    use serde_json::json;

    fn svt() -> Normalizer {
        Normalizer::new(&SVTPLAY_FIELDS, Schema::Svtplay)
    }

    fn via() -> Normalizer {
        Normalizer::new(&VIAFREE_FIELDS, Schema::Viafree)
    }

    fn svt_page() -> Value {
        json!({
            "video": {
                "programTitle": "Agenda",
                "title": "Avsnitt 3",
                "programVersionId": "1234567-003A",
                "id": 99,
                "materialLength": 125,
                "episodic": true,
                "season": 2,
                "episodeNumber": 3,
                "titleType": "SERIES_OR_TV_SHOW",
                "closedCaptioned": true,
                "broadcastDate": "2017-01-03T21:15:00+01:00",
                "description": "Politik"
            }
        })
    }

    #[test]
    fn test_svtplay_nested() {
        let meta = svt().normalize(&svt_page(), true, None).unwrap();
        assert_eq!(meta.show.as_deref(), Some("Agenda"));
        assert_eq!(meta.title, "Avsnitt 3");
        assert_eq!(meta.video_id, "1234567-003A");
        assert_eq!(meta.duration_minutes, 3);
        assert_eq!(meta.season(), Some(2));
        assert_eq!(meta.episode(), Some(3));
        assert_eq!(meta.title_type, Some(TitleType::TvShow));
        assert!(meta.has_subtitle);
        assert_eq!(meta.publish_date, None);
        assert_eq!(meta.description.as_deref(), Some("Politik"));
        assert!(!meta.audio_description && !meta.sign_interpretation);
    }

    #[test]
    fn test_svtplay_show_equal_to_title_dropped() {
        let raw = json!({"programTitle": "Film", "title": "Film", "id": 7, "materialLength": 60});
        let meta = svt().normalize(&raw, false, None).unwrap();
        assert_eq!(meta.show, None);
        assert_eq!(meta.video_id, "7");
        assert_eq!(meta.duration_minutes, 1);
        assert_eq!(meta.season_episode, None);
        assert_eq!(meta.title_type, None);
    }

    #[test]
    fn test_svtplay_empty_program_title_means_no_show() {
        let raw = json!({"programTitle": "", "title": "Klipp", "id": "x"});
        let meta = svt().normalize(&raw, false, None).unwrap();
        assert_eq!(meta.show, None);
    }

    #[test]
    fn test_svtplay_missing_title_is_schema_drift() {
        let raw = json!({"video": {"programTitle": "Agenda", "id": 1}});
        assert!(matches!(
            svt().normalize(&raw, true, None),
            Err(ServiceError::Normalization(_))
        ));
        let raw = json!({"title": "x", "id": 1});
        assert!(svt().normalize(&raw, false, None).is_err());
    }

    #[test]
    fn test_svtplay_episodic_requires_both_numbers() {
        let raw = json!({"programTitle": "A", "title": "B", "id": 1, "episodic": true, "season": 1});
        let meta = svt().normalize(&raw, false, None).unwrap();
        assert_eq!(meta.season_episode, None);
    }

    #[test]
    fn test_access_variant_sets_one_flag() {
        let meta = svt()
            .normalize(&svt_page(), true, Some("audioDescription"))
            .unwrap();
        assert!(meta.audio_description);
        assert!(!meta.sign_interpretation);

        let meta = svt()
            .normalize(&svt_page(), true, Some("signInterpretation"))
            .unwrap();
        assert!(!meta.audio_description);
        assert!(meta.sign_interpretation);

        let meta = svt().normalize(&svt_page(), true, Some("other")).unwrap();
        assert!(!meta.audio_description && !meta.sign_interpretation);
    }

    #[test]
    fn test_svtplay_title_types() {
        for (raw_type, expected) in [
            ("MOVIE", TitleType::Movie),
            ("CLIP", TitleType::Clip),
            ("SPECIAL", TitleType::Other("SPECIAL".to_string())),
        ] {
            let raw = json!({"programTitle": "A", "title": "B", "id": 1, "titleType": raw_type});
            let meta = svt().normalize(&raw, false, None).unwrap();
            assert_eq!(meta.title_type, Some(expected));
        }
    }

    #[test]
    fn test_duration_rounds_up() {
        assert_eq!(duration_minutes(Some(&json!(125))), 3);
        assert_eq!(duration_minutes(Some(&json!(120))), 2);
        assert_eq!(duration_minutes(Some(&json!(0))), 0);
        assert_eq!(duration_minutes(None), 0);
    }

    #[test]
    fn test_viafree_program() {
        let raw = json!({
            "id": 804377,
            "title": "Avsnitt 5",
            "format_title": "Paradise Hotel",
            "type": "program",
            "duration": 2580,
            "format_position": {"is_episodic": true, "season": 9, "episode": "5"},
            "broadcasts": [{"air_at": "2017-03-01T20:00:00+01:00", "playable_from": "2017-03-01T21:00:00+01:00"}],
            "summary": "Kort",
            "description": "Lang",
            "sami_path": null,
            "subtitles_webvtt": "https://example.com/sub.vtt",
            "subtitles_for_hearing_impaired": ""
        });
        let meta = via().normalize(&raw, false, None).unwrap();
        assert_eq!(meta.show.as_deref(), Some("Paradise Hotel"));
        assert_eq!(meta.video_id, "804377");
        assert_eq!(meta.duration_minutes, 43);
        assert_eq!(meta.season_episode, Some(SeasonEpisode::new(9, 5)));
        assert_eq!(meta.title_type, Some(TitleType::TvShow));
        assert_eq!(meta.broadcast_date.as_deref(), Some("2017-03-01T20:00:00+01:00"));
        assert_eq!(meta.publish_date.as_deref(), Some("2017-03-01T21:00:00+01:00"));
        assert!(meta.has_subtitle);
        assert_eq!(meta.description.as_deref(), Some("Kort\nLang"));
    }

    #[test]
    fn test_viafree_description_variants() {
        let base = |summary: Value, description: Value| {
            json!({"id": 1, "title": "t", "format_title": "s", "summary": summary, "description": description})
        };
        let meta = via().normalize(&base(json!(null), json!("Lang")), false, None).unwrap();
        assert_eq!(meta.description.as_deref(), Some("Lang"));
        let meta = via().normalize(&base(json!("Kort"), json!(null)), false, None).unwrap();
        assert_eq!(meta.description.as_deref(), Some("Kort"));
        let meta = via().normalize(&base(json!(null), json!("")), false, None).unwrap();
        assert_eq!(meta.description, None);
        assert!(!meta.has_subtitle);
    }

    #[test]
    fn test_viafree_clip_title_loses_show_suffix() {
        let raw = json!({
            "id": 5, "title": "Bästa klippen-paradisehotel", "format_title": "Paradise Hotel", "type": "clip"
        });
        let meta = via().normalize(&raw, false, None).unwrap();
        assert_eq!(meta.title, "Bästa klippen");
        assert_eq!(meta.title_type, Some(TitleType::Clip));
    }

    #[test]
    fn test_viafree_missing_format_title() {
        let raw = json!({"id": 5, "title": "x"});
        assert!(matches!(
            via().normalize(&raw, false, None),
            Err(ServiceError::Normalization(_))
        ));
    }

    #[test]
    fn test_null_program_title_means_no_show() {
        let raw = json!({"id": 5, "title": "Film", "format_title": null, "type": "program"});
        let meta = via().normalize(&raw, false, None).unwrap();
        assert_eq!(meta.show, None);
        assert_eq!(meta.title, "Film");

        let page = json!({"video": {"programTitle": null, "title": "Film", "id": "x1"}});
        let meta = svt().normalize(&page, true, None).unwrap();
        assert_eq!(meta.show, None);
    }
}
