// HLS master/media playlist parser

use m3u8_rs::Playlist;
use std::collections::BTreeMap;
use url::Url;

use crate::downloader::errors::ServiceError;
use crate::downloader::models::{Protocol, ResolveOptions, StreamHandle};
use crate::downloader::traits::{HttpResponse, ManifestParser};

#[derive(Debug, Default)]
pub struct HlsParser;

impl ManifestParser for HlsParser {
    fn name(&self) -> &'static str {
        "hls"
    }

    fn parse(
        &self,
        options: &ResolveOptions,
        response: &HttpResponse,
        source_url: &str,
    ) -> Result<BTreeMap<u32, StreamHandle>, ServiceError> {
        if response.status >= 400 {
            return Err(ServiceError::Parser(format!(
                "Can't read HLS playlist. {}",
                response.status
            )));
        }

        let base = Url::parse(source_url)
            .map_err(|e| ServiceError::Parser(format!("Bad playlist URL {}: {}", source_url, e)))?;
        let playlist = m3u8_rs::parse_playlist_res(response.body.as_bytes())
            .map_err(|e| ServiceError::Parser(format!("Invalid HLS playlist: {:?}", e)))?;

        let mut streams = BTreeMap::new();
        match playlist {
            Playlist::MasterPlaylist(master) => {
                for variant in master.variants.into_iter().filter(|v| !v.is_i_frame) {
                    let url = base
                        .join(&variant.uri)
                        .map_err(|e| ServiceError::Parser(format!("Bad variant URI: {}", e)))?;
                    let bitrate = u32::try_from(variant.bandwidth / 1000).unwrap_or(u32::MAX);
                    streams.insert(
                        bitrate,
                        StreamHandle::new(Protocol::Hls, url.as_str(), bitrate, options),
                    );
                }
            }
            Playlist::MediaPlaylist(_) => {
                streams.insert(0, StreamHandle::new(Protocol::Hls, source_url, 0, options));
            }
        }
        Ok(streams)
    }
}
