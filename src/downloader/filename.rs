// Output filename derivation
//
// Pure function of the metadata: same record, same name. The 7-char hash of
// the video id keeps episodes that sanitize to the same name apart.

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::models::CanonicalMetadata;
use super::traits::Sanitizer;

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref DOT_DASH_RE: Regex = Regex::new(r"\.-\.").unwrap();
}

const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

pub const AUDIO_DESCRIPTION_SUFFIX: &str = "-syntolkat";
pub const SIGN_INTERPRETATION_SUFFIX: &str = "-teckentolkat";

/// Default sanitizer: keeps case and letters, drops characters that are
/// unsafe on common filesystems and turns whitespace into dots.
#[derive(Debug, Clone, Copy, Default)]
pub struct Filenamify;

impl Sanitizer for Filenamify {
    fn sanitize(&self, raw: &str) -> String {
        let kept: String = raw
            .chars()
            .filter(|c| !c.is_control() && !UNSAFE_CHARS.contains(c))
            .collect();
        let dotted = WHITESPACE_RE.replace_all(kept.trim(), ".");
        let collapsed = DOT_DASH_RE.replace_all(&dotted, "-");
        collapsed.trim_matches(|c| c == '.' || c == ' ').to_string()
    }
}

/// First 7 hex chars of sha256(video_id)
pub fn short_hash(video_id: &str) -> String {
    let digest = hex::encode(Sha256::digest(video_id.as_bytes()));
    digest[..7].to_string()
}

/// Derive `primary[.SxxEyy][.secondary][-syntolkat][-teckentolkat]-hash7-tag`
/// and place it in the directory of `output_hint`, if it has one.
pub fn derive_filename(
    metadata: &CanonicalMetadata,
    output_hint: Option<&Path>,
    service_tag: &str,
    sanitizer: &dyn Sanitizer,
) -> PathBuf {
    let title = sanitizer.sanitize(&metadata.title);
    let (primary, secondary) = match metadata.show.as_deref() {
        Some(show) => {
            let show = sanitizer.sanitize(show);
            if show == title {
                (show, None)
            } else {
                (show, Some(title))
            }
        }
        None => (title, None),
    };

    let mut name = primary;
    if let Some(tag) = metadata.season_episode.and_then(|se| se.tag()) {
        name.push('.');
        name.push_str(&tag);
    }
    if let Some(secondary) = secondary {
        name.push('.');
        name.push_str(&secondary);
    }
    if metadata.audio_description {
        name.push_str(AUDIO_DESCRIPTION_SUFFIX);
    }
    if metadata.sign_interpretation {
        name.push_str(SIGN_INTERPRETATION_SUFFIX);
    }
    name.push_str(&format!("-{}-{}", short_hash(&metadata.video_id), service_tag));

    let name = sanitizer.sanitize(&name);
    match output_hint.and_then(hint_directory) {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Directory part of an output hint; a trailing separator marks the whole
/// hint as a directory.
fn hint_directory(hint: &Path) -> Option<PathBuf> {
    let raw = hint.to_string_lossy();
    if raw.ends_with(std::path::MAIN_SEPARATOR) || raw.ends_with('/') {
        return Some(hint.to_path_buf());
    }
    hint.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
