pub mod cli;
pub mod config;
pub mod downloader;

pub use cli::{execute, Cli};
pub use config::AppConfig;
pub use downloader::{
    select_stream, ResolveOptions, Resolution, ResolvedItem, ServiceContext, ServiceError,
    ServiceRegistry,
};
