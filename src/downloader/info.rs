// Info report - plain text metadata written beside the media output

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::errors::ServiceError;
use super::models::{CanonicalMetadata, ResolveOptions};

pub const INFO_SUFFIX: &str = "txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoReport {
    pub metadata: CanonicalMetadata,
    /// Output basename the report is written next to
    pub output: Option<PathBuf>,
}

impl InfoReport {
    pub fn new(options: &ResolveOptions, metadata: &CanonicalMetadata) -> Self {
        Self {
            metadata: metadata.clone(),
            output: options.output.clone(),
        }
    }

    /// One `Label: value` line per present field, each followed by a newline
    pub fn render(&self) -> String {
        let m = &self.metadata;
        let mut lines: Vec<(&str, String)> = Vec::new();

        if let Some(show) = &m.show {
            lines.push(("Show", show.clone()));
        }
        lines.push(("Title", m.title.clone()));
        if let Some(date) = &m.broadcast_date {
            lines.push(("Broadcast Date", date.clone()));
        }
        if let Some(date) = &m.publish_date {
            lines.push(("PublishDate Date", date.clone()));
        }
        lines.push(("Duration", format!("{} min", m.duration_minutes)));
        if let Some(se) = m.season_episode {
            lines.push(("Season", se.season.to_string()));
            lines.push(("Episode", se.episode.to_string()));
        }
        if let Some(title_type) = &m.title_type {
            lines.push(("Type", title_type.to_string()));
        }
        if m.audio_description {
            lines.push(("Audiodescription", "Yes".to_string()));
        }
        if m.sign_interpretation {
            lines.push(("Sign Interpretation", "Yes".to_string()));
        }
        if m.has_subtitle {
            lines.push(("Subtitled", "Yes".to_string()));
        }
        if let Some(description) = &m.description {
            lines.push(("Description", description.clone()));
        }

        lines
            .into_iter()
            .map(|(label, value)| format!("{}: {}\n", label, value))
            .collect()
    }

    /// Path the report is written to: `<output>.txt`
    pub fn path(&self) -> Option<PathBuf> {
        self.output.as_deref().map(|output| with_suffix(output, INFO_SUFFIX))
    }

    pub fn save(&self) -> Result<PathBuf, ServiceError> {
        let path = self.path().ok_or_else(|| {
            ServiceError::Config("No output name to write the info report next to".to_string())
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.render())?;
        info!(path = %path.display(), "Wrote info report");
        Ok(path)
    }
}

/// Append `.suffix` without touching dots already in the name
fn with_suffix(output: &Path, suffix: &str) -> PathBuf {
    let mut raw = output.as_os_str().to_os_string();
    raw.push(".");
    raw.push(suffix);
    PathBuf::from(raw)
}
