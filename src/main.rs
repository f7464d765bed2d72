mod cli;
mod settings;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use prerender_lib::{
    AppState, BrowserManager, BrowserSettings, Config, PageRenderer, RenderCache, RenderOptions,
    ResourcePolicy,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Cli) -> prerender_lib::Result<()> {
    let config = Config::load(args.config.as_deref())?;
    config.validate()?;
    let settings =
        settings::resolve_settings(&args, &config, &settings::EnvOverrides::from_env());
    info!("{}", settings::format_effective_config(&settings));

    let cache = Arc::new(RenderCache::new(settings.max_entries, settings.ttl));
    let manager = Arc::new(BrowserManager::new(BrowserSettings {
        executable: settings.chrome_executable.clone(),
    }));
    let renderer = Arc::new(PageRenderer::new(
        Arc::clone(&manager),
        RenderOptions {
            user_agent: settings.user_agent.clone(),
            navigation_timeout: settings.navigation_timeout,
            policy: ResourcePolicy::default(),
        },
    ));

    let state = AppState::new(cache, renderer);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    prerender_lib::server::run(addr, state, manager).await
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "prerender=debug,prerender_lib=debug"
    } else {
        "prerender=info,prerender_lib=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
