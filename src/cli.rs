// Command-line interface
//
// Subcommands:
// - streams: resolve pages and list subtitles and streams
// - episodes: list the episode pages of a listing
// - info: print (and optionally save) the metadata report

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::downloader::models::{EpisodeReference, Protocol, ResolveOptions};
use crate::downloader::selector::StreamSelector;
use crate::downloader::services::diagnostics::{diagnose_status, StatusPolicy};
use crate::downloader::{
    ReqwestHttpClient, Resolution, ResolvedItem, ServiceContext, ServiceError, ServiceRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "playgrab")]
#[command(about = "Resolve streams, subtitles and metadata from svtplay and viafree pages")]
#[command(version)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: <config dir>/playgrab/config.toml)
    #[arg(long, env = "PLAYGRAB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// SOCKS5 or HTTP proxy URL
    #[arg(long, env = "PLAYGRAB_PROXY", global = true)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List subtitles and streams of an episode page
    Streams(ResolveArgs),
    /// List the episode pages of a show, season or listing page
    Episodes(ResolveArgs),
    /// Print the metadata report of an episode page
    Info(InfoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Episode or listing page URL
    pub url: String,

    /// Output name or directory (trailing separator); names are derived unless a file name is given
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Preferred bitrate in kbps
    #[arg(short, long)]
    pub quality: Option<u32>,

    /// Accepted distance from --quality in kbps
    #[arg(short = 'Q', long)]
    pub flexible_quality: Option<u32>,

    /// Preferred protocol (hls, dash, hds, rtmp)
    #[arg(short = 'P', long)]
    pub preferred: Option<Protocol>,

    /// Treat the stream as live
    #[arg(long)]
    pub live: bool,

    /// Keep every subtitle variant apart (hearing impaired gets -SDH)
    #[arg(long)]
    pub all_subtitles: bool,

    /// Include clips when enumerating episodes
    #[arg(long)]
    pub include_clips: bool,

    /// Skip episodes whose output name contains any of these words
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Resolve every episode of the listing page
    #[arg(short = 'A', long)]
    pub all_episodes: bool,

    /// Keep only the last N episodes of the listing
    #[arg(long, default_value_t = 0)]
    pub all_last: usize,
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Write `<output>.txt` next to the media output
    #[arg(long)]
    pub save: bool,
}

impl ResolveArgs {
    /// Layer the flags over the config snapshot
    fn apply(&self, base: ResolveOptions) -> ResolveOptions {
        let output_auto = match &self.output {
            None => true,
            Some(path) => {
                path.is_dir() || path.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR)
            }
        };
        let output = match &self.output {
            Some(path) if path.is_dir() && !path.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR) => {
                Some(path.join(""))
            }
            Some(path) => Some(path.clone()),
            None => base.output.clone(),
        };

        let mut exclude = base.exclude.clone();
        exclude.extend(self.exclude.iter().cloned());

        let quality = self.quality.or(base.quality);
        let flexible = self.flexible_quality.unwrap_or(base.flexible_quality);
        let preferred = self.preferred.or(base.preferred);
        let get_all_subtitles = self.all_subtitles || base.get_all_subtitles;
        let include_clips = self.include_clips || base.include_clips;

        base.with_output(output)
            .with_output_auto(output_auto)
            .with_quality(quality, flexible)
            .with_preferred(preferred)
            .with_live(self.live)
            .with_get_all_subtitles(get_all_subtitles)
            .with_include_clips(include_clips)
            .with_exclude(exclude)
            .with_all_last(self.all_last)
    }
}

/// User-facing hint for a failed page
fn error_suggestion(error: &ServiceError, proxy: Option<&str>) -> Option<String> {
    let reason = match error {
        ServiceError::GeoBlocked => diagnose_status(StatusPolicy::GeoBlocking, 403),
        ServiceError::Http { status, .. } => diagnose_status(StatusPolicy::Generic, *status),
        _ => None,
    }?;

    let mut suggestion = reason.description().to_string();
    if reason.proxy_might_help() {
        match proxy {
            Some(proxy) => suggestion.push_str(&format!(" (proxy in use: {})", proxy)),
            None => suggestion.push_str(". Try a proxy in the service's country (--proxy)"),
        }
    }
    Some(suggestion)
}

struct App {
    registry: ServiceRegistry,
    ctx: ServiceContext,
    proxy: Option<String>,
}

impl App {
    fn report_errors(&self, url: &str, resolution: &Resolution) -> usize {
        let mut failures = 0;
        for error in resolution.errors() {
            if error.is_exclusion() {
                debug!(url = %url, "Excluded");
                continue;
            }
            failures += 1;
            error!(url = %url, "{}", error);
            if let Some(hint) = error_suggestion(error, self.proxy.as_deref()) {
                warn!("{}", hint);
            }
        }
        failures
    }

    async fn pages(&self, args: &ResolveArgs, options: &ResolveOptions) -> Result<Vec<String>> {
        if !args.all_episodes {
            return Ok(vec![args.url.clone()]);
        }
        let episodes = self
            .registry
            .episodes(&self.ctx, &args.url, options)
            .await
            .with_context(|| format!("Can't enumerate episodes of {}", args.url))?;
        info!(count = episodes.len(), "Episodes to resolve");
        Ok(episodes.into_iter().map(|e| e.0).collect())
    }

    async fn streams(&self, args: &ResolveArgs, options: ResolveOptions) -> Result<usize> {
        let mut failures = 0;
        for url in self.pages(args, &options).await? {
            let resolution = self.registry.resolve(&self.ctx, &url, &options).await;
            failures += self.report_errors(&url, &resolution);
            print_resolution(&url, &resolution);
        }
        Ok(failures)
    }

    async fn episodes(&self, args: &ResolveArgs, options: ResolveOptions) -> Result<usize> {
        let episodes: Vec<EpisodeReference> = self
            .registry
            .episodes(&self.ctx, &args.url, &options)
            .await
            .with_context(|| format!("Can't enumerate episodes of {}", args.url))?;
        for episode in episodes {
            println!("{}", episode);
        }
        Ok(0)
    }

    async fn info(&self, args: &InfoArgs, options: ResolveOptions) -> Result<usize> {
        let options = options.with_get_info(true);
        let mut failures = 0;
        for url in self.pages(&args.resolve, &options).await? {
            let resolution = self.registry.resolve(&self.ctx, &url, &options).await;
            failures += self.report_errors(&url, &resolution);
            let Some(report) = resolution.info() else {
                info!(url = %url, "Couldn't collect info for this episode");
                continue;
            };
            print!("{}", report.render());
            if args.save {
                match report.save() {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => {
                        failures += 1;
                        error!(url = %url, "{}", e);
                    }
                }
            }
        }
        Ok(failures)
    }
}

fn print_resolution(url: &str, resolution: &Resolution) {
    println!("{}", url);
    if let Some(output) = &resolution.options.output {
        println!("  output: {}", output.display());
    }
    for item in &resolution.items {
        if let ResolvedItem::Subtitle(subtitle) = item {
            println!(
                "  subtitle {}{}: {}",
                subtitle.kind,
                subtitle.suffix.as_deref().unwrap_or_default(),
                subtitle.url
            );
        }
    }

    let streams: Vec<_> = resolution.streams().into_iter().cloned().collect();
    for option in StreamSelector::stream_options(&streams, &resolution.options) {
        let marker = if option.is_selected { "*" } else { " " };
        println!("  {} {}: {}", marker, option.label, option.url);
    }
}

/// Run the parsed command; returns the number of failed pages
pub async fn execute(cli: Cli) -> Result<usize> {
    let config = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_proxy(cli.proxy.clone())
        .with_timeout(cli.timeout);
    let base = config.resolve_options().context("Invalid output configuration")?;

    let http = ReqwestHttpClient::new(&config.network).context("Failed to build HTTP client")?;
    let app = App {
        registry: ServiceRegistry::with_defaults().context("Invalid service field tables")?,
        ctx: ServiceContext::new(Arc::new(http)),
        proxy: config.network.proxy.clone(),
    };

    match &cli.command {
        Commands::Streams(args) => app.streams(args, args.apply(base)).await,
        Commands::Episodes(args) => app.episodes(args, args.apply(base)).await,
        Commands::Info(args) => app.info(args, args.resolve.apply(base)).await,
    }
}
