use std::process::ExitCode;

use tracing::{debug, error, info, warn};

use swap_monitor::config::mask_secret;
use swap_monitor::{
    build_notifier, build_source, build_store, Config, MatchRule, PollLoop, PollSettings,
};

const CONFIG_PATH_ENV: &str = "SWAP_MONITOR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    // Secrets may live in a .env file next to the binary
    let dotenv = dotenvy::dotenv().ok();

    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let loaded = Config::load_optional(&path);
    let config = match &loaded {
        Ok(Some(config)) => config.clone(),
        Ok(None) | Err(_) => {
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = swap_monitor::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        swap_monitor::logging::init_console_only(&config.logging.level);
    }

    info!("Swap Monitor v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(Some(_)) => info!("Loaded configuration from {}", path),
        Ok(None) => warn!("{} not found. Using default configuration.", path),
        Err(e) => {
            error!("Failed to load {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    }
    if let Some(env_path) = dotenv {
        debug!("Loaded environment from {}", env_path.display());
    }
    log_secrets(&config);

    if let Err(e) = config.validate() {
        error!("{}", e);
        error!("Refusing to start with an invalid configuration");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Startup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> swap_monitor::Result<()> {
    let source = build_source(&config)?;
    let notifier = build_notifier(&config.notify)?;
    let store = build_store(&config.store).await?;
    let rule = MatchRule::new(&config.rule.keywords, config.rule.scope);

    info!(
        "Watching {} for keywords {:?}",
        config
            .feeds
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        rule.keywords()
    );

    let poll_loop = PollLoop::new(
        source,
        rule,
        store,
        notifier,
        PollSettings::from_config(&config),
    );
    poll_loop.run_until(shutdown_signal()).await;
    Ok(())
}

fn log_secrets(config: &Config) {
    let secrets = [
        ("Reddit client id", &config.source.client_id),
        ("Reddit client secret", &config.source.client_secret),
        ("Email username", &config.notify.username),
        ("Email password", &config.notify.password),
    ];
    for (name, value) in secrets {
        if !value.is_empty() {
            debug!("{} found: {}", name, mask_secret(value));
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown requested");
}
