// Manifest parsers and stream builders used by the dispatcher

pub mod dash;
pub mod hds;
pub mod hls;
pub mod rtmp;

pub use dash::DashParser;
pub use hds::{HdsParser, HDCORE_PARAM};
pub use hls::HlsParser;

use super::traits::ManifestParser;

/// Parser set handed to the dispatcher
pub struct ManifestParsers {
    pub hls: Box<dyn ManifestParser>,
    pub dash: Box<dyn ManifestParser>,
    pub hds: Box<dyn ManifestParser>,
}

impl Default for ManifestParsers {
    fn default() -> Self {
        Self {
            hls: Box::new(HlsParser),
            dash: Box::new(DashParser),
            hds: Box::new(HdsParser),
        }
    }
}
