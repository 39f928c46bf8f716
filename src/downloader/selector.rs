// StreamSelector - picks one rendition from the resolved streams
//
// Handles:
// - Protocol preference (only when the preferred protocol is on offer)
// - Requested bitrate with a tolerance window
// - Highest bitrate otherwise

use serde::Serialize;

use super::models::{Protocol, ResolveOptions, StreamHandle};

/// One line of the stream listing
#[derive(Debug, Clone, Serialize)]
pub struct StreamOption {
    /// Display label (e.g., "hls 3128 kbps")
    pub label: String,
    pub protocol: Protocol,
    pub bitrate: u32,
    pub url: String,
    /// Whether this is the stream `select_stream` would pick
    pub is_selected: bool,
}

pub struct StreamSelector;

impl StreamSelector {
    /// Candidate set after applying the protocol preference
    fn candidates<'a>(streams: &'a [StreamHandle], options: &ResolveOptions) -> Vec<&'a StreamHandle> {
        if let Some(preferred) = options.preferred {
            let matching: Vec<&StreamHandle> =
                streams.iter().filter(|s| s.protocol == preferred).collect();
            if !matching.is_empty() {
                return matching;
            }
        }
        streams.iter().collect()
    }

    /// Pick the stream to fetch; None when a requested quality is out of reach
    pub fn select_stream<'a>(
        streams: &'a [StreamHandle],
        options: &ResolveOptions,
    ) -> Option<&'a StreamHandle> {
        let candidates = Self::candidates(streams, options);

        match options.quality {
            Some(quality) => candidates
                .into_iter()
                .filter(|s| s.bitrate.abs_diff(quality) <= options.flexible_quality)
                // closest first, higher bitrate on ties
                .min_by_key(|s| (s.bitrate.abs_diff(quality), std::cmp::Reverse(s.bitrate))),
            None => candidates.into_iter().max_by_key(|s| s.bitrate),
        }
    }

    /// Listing of all streams sorted by protocol then bitrate
    pub fn stream_options(streams: &[StreamHandle], options: &ResolveOptions) -> Vec<StreamOption> {
        let selected = Self::select_stream(streams, options);
        let mut listing: Vec<StreamOption> = streams
            .iter()
            .map(|s| StreamOption {
                label: format!("{} {} kbps", s.protocol, s.bitrate),
                protocol: s.protocol,
                bitrate: s.bitrate,
                url: s.url.clone(),
                is_selected: selected.map_or(false, |sel| std::ptr::eq(sel, s)),
            })
            .collect();
        listing.sort_by(|a, b| {
            a.protocol
                .to_string()
                .cmp(&b.protocol.to_string())
                .then(a.bitrate.cmp(&b.bitrate))
        });
        listing
    }
}

/// Convenience wrapper over [`StreamSelector::select_stream`]
pub fn select_stream<'a>(
    streams: &'a [StreamHandle],
    options: &ResolveOptions,
) -> Option<&'a StreamHandle> {
    StreamSelector::select_stream(streams, options)
}
