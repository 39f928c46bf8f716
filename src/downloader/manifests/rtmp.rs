// RTMP stream handles for the single-file "medium" delivery

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::downloader::errors::ServiceError;
use crate::downloader::models::{Protocol, ResolveOptions, StreamHandle};

lazy_static! {
    static ref APP_PATH_RE: Regex = Regex::new(r"^(/[^/]+)/(.*)").unwrap();
}

pub const DEFAULT_BITRATE: u32 = 800;
pub const PLAYER_SWF: &str = "http://flvplayer.viastream.viasat.tv/flvplayer/play/swf/player.swf";

/// Connection URL and client arguments for an RTMP address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpTarget {
    /// `scheme://host[:port]/app`
    pub connection_url: String,
    pub args: Vec<String>,
}

/// Split the path into the application prefix and the playpath
pub fn split_target(address: &str) -> Result<RtmpTarget, ServiceError> {
    let parsed = Url::parse(address).map_err(|_| rtmp_error())?;
    let host = parsed.host_str().ok_or_else(rtmp_error)?;
    let caps = APP_PATH_RE.captures(parsed.path()).ok_or_else(rtmp_error)?;
    let (app, playpath) = match (caps.get(1), caps.get(2)) {
        (Some(app), Some(playpath)) => (app.as_str(), playpath.as_str()),
        _ => return Err(rtmp_error()),
    };

    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    Ok(RtmpTarget {
        connection_url: format!("{}://{}{}", parsed.scheme(), authority, app),
        args: vec![
            "-W".to_string(),
            PLAYER_SWF.to_string(),
            "-y".to_string(),
            playpath.to_string(),
        ],
    })
}

/// RTMP client handle
pub fn build(options: &ResolveOptions, target: RtmpTarget, bitrate: u32) -> StreamHandle {
    let mut handle = StreamHandle::new(Protocol::Rtmp, target.connection_url, bitrate, options);
    handle.args = target.args;
    handle
}

fn rtmp_error() -> ServiceError {
    ServiceError::Extraction("Can't get rtmpparse info".to_string())
}
