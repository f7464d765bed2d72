use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "prerender")]
#[command(
    version,
    about = "Prerender proxy - render JavaScript-heavy pages to static HTML for crawlers",
    long_about = "Prerender proxy\n\nServes GET /render?url=<absolute-url> with fully rendered HTML for bots that\ncannot execute JavaScript, and GET /health as a liveness probe. Rendered\ndocuments are cached in memory with LRU eviction and a per-entry TTL.\n\nPrecedence for every setting: CLI flag > environment (PORT,\nCHROME_EXECUTABLE) > config file > built-in default."
)]
pub struct Cli {
    #[arg(long, help = "Port to listen on (default 3000)")]
    pub port: Option<u16>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for port/cache/render; flags override it"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Chromium/Chrome executable to drive; auto-detected when omitted"
    )]
    pub chrome_executable: Option<PathBuf>,

    #[arg(long, help = "Maximum number of cached documents (default 100)")]
    pub cache_entries: Option<usize>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Cache entry time-to-live in seconds (default 3600)"
    )]
    pub cache_ttl: Option<u64>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Navigation timeout in seconds for a single render (default 30)"
    )]
    pub nav_timeout: Option<u64>,

    #[arg(long, help = "Enable verbose (debug) logging")]
    pub verbose: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
