// # wanrelayd - WAN address relay daemon
//
// Thin integration layer: all relay logic lives in the library crates.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering destinations and starting the change dispatcher
// 4. Serving the push endpoint until SIGINT/SIGTERM
//
// ## Configuration
//
// ### HTTP delivery templates (n = 1..9)
// - `HTTP_REQUEST_<n>_URL`: Target URL; the slot is skipped when unset
// - `HTTP_REQUEST_<n>_METHOD`, `_BODY`: Request method and body
// - `HTTP_REQUEST_<n>_USERNAME`, `_PASSWORD`, `_BASIC_AUTH`: Credentials
// - `HTTP_REQUEST_<n>_TIMEOUT`: Per-attempt timeout (`5s`, `1m30s`)
// - `HTTP_REQUEST_<n>_RETRY_COUNT`: Retries after the first attempt
// - `HTTP_REQUEST_<n>_ONIPV4`, `_ONIPV6`: Address family flags
// - `HTTP_REQUEST_<n>_HEADER_<m>_KEY`, `_VALUE`: Extra headers (m = 1..9)
//
// ### Push endpoint
// - `DYNDNS_SERVER_BIND`: `host:port` or `:port` to listen on; unset disables the endpoint
// - `DYNDNS_SERVER_USERNAME`, `DYNDNS_SERVER_PASSWORD`: Expected credentials
// - `DYNDNS_SERVER_BASIC_AUTH`: Read credentials from the Authorization header
//
// ### Address construction
// - `DEVICE_LOCAL_ADDRESS_IPV6`: Interface identifier; enables prefix mode
//
// ### Logging
// - `LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export HTTP_REQUEST_1_URL='https://dyndns.example.com/update?ip=<ipaddr>'
// export DYNDNS_SERVER_BIND=0.0.0.0:8080
// export DYNDNS_SERVER_USERNAME=router
// export DYNDNS_SERVER_PASSWORD=secret
//
// wanrelayd
// ```

use anyhow::{Context, Result};
use std::env;
use std::net::Ipv6Addr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use wanrelay_core::config::{load_templates, parse_bool, parse_interface_id};
use wanrelay_core::{ChangeDispatcher, DestinationRegistry, TemplateStore};
use wanrelay_http::HttpRequestsDestination;
use wanrelay_push::PushConfig;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum WanrelayExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<WanrelayExitCode> for ExitCode {
    fn from(code: WanrelayExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Push endpoint settings
struct PushSettings {
    bind: String,
    username: String,
    password: String,
    basic_auth: bool,
}

/// Application configuration
struct Config {
    templates: TemplateStore,
    push: Option<PushSettings>,
    interface_id: Option<Ipv6Addr>,
    log_level: Level,
    invalid_log_level: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Only an unparseable interface identifier or bind address is fatal.
    /// Everything else falls back to defaults and is reported once logging
    /// is up.
    fn from_env() -> Result<Self> {
        let interface_id = match non_empty_var("DEVICE_LOCAL_ADDRESS_IPV6") {
            Some(value) => Some(
                parse_interface_id(&value).context("Failed to parse DEVICE_LOCAL_ADDRESS_IPV6")?,
            ),
            None => None,
        };

        let push = match non_empty_var("DYNDNS_SERVER_BIND") {
            Some(bind) => Some(PushSettings {
                bind: normalize_bind(&bind)?,
                username: env::var("DYNDNS_SERVER_USERNAME").unwrap_or_default(),
                password: env::var("DYNDNS_SERVER_PASSWORD").unwrap_or_default(),
                basic_auth: env::var("DYNDNS_SERVER_BASIC_AUTH")
                    .ok()
                    .and_then(|v| parse_bool(&v))
                    .unwrap_or(false),
            }),
            None => None,
        };

        let (log_level, invalid_log_level) = match non_empty_var("LOG_LEVEL") {
            Some(value) => match value.parse::<Level>() {
                Ok(level) => (level, None),
                Err(_) => (Level::INFO, Some(value)),
            },
            None => (Level::INFO, None),
        };

        Ok(Self {
            templates: TemplateStore::default(),
            push,
            interface_id,
            log_level,
            invalid_log_level,
        })
    }

    /// Load the delivery templates
    ///
    /// Template parsing logs its warnings, so this runs after the subscriber
    /// is installed.
    fn load_templates(&mut self) {
        self.templates = load_templates(|key| env::var(key).ok());
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Turn a `host:port` or `:port` bind value into something tokio can resolve
///
/// A missing host means every IPv4 interface.
fn normalize_bind(value: &str) -> Result<String> {
    let bind = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => value.to_string(),
    };

    let valid = bind
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if !valid {
        anyhow::bail!(
            "DYNDNS_SERVER_BIND '{}' is not a host:port or :port address",
            value
        );
    }

    Ok(bind)
}

fn main() -> ExitCode {
    let mut config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return WanrelayExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return WanrelayExitCode::ConfigError.into();
    }

    if let Some(value) = &config.invalid_log_level {
        warn!("Failed to parse LOG_LEVEL '{}', using default INFO", value);
    }

    info!("Starting wanrelayd daemon");
    config.load_templates();
    info!("Configuration loaded: {} template(s)", config.templates.len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return WanrelayExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            WanrelayExitCode::RuntimeError
        } else {
            WanrelayExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config) -> Result<()> {
    let mut registry = DestinationRegistry::new();

    if config.templates.is_empty() {
        info!("No HTTP_REQUEST_<n>_URL found, disabling HTTP request updates");
    } else {
        let destination = HttpRequestsDestination::new(config.templates)?;
        registry.register(Arc::new(destination));
    }

    // DNS providers and router clients are library integrations; none ships
    // with the daemon, so only the push endpoint feeds the dispatcher here.
    info!("No router client configured, polling disabled");

    if let Some(id) = config.interface_id {
        info!(interface_id = %id, "Using the IPv6 prefix to construct the IPv6 address");
    }

    info!("Registered destinations: {:?}", registry.names());

    let (dispatcher, sender) = ChangeDispatcher::new(registry);
    let (dispatch_shutdown_tx, dispatch_shutdown_rx) = oneshot::channel();
    let dispatcher_task = tokio::spawn(dispatcher.run_with_shutdown(dispatch_shutdown_rx));

    let mut push_shutdown_tx = None;
    let mut push_task = match config.push {
        Some(settings) => {
            let mut push_config =
                PushConfig::new(settings.username, settings.password, settings.basic_auth);
            if let Some(id) = config.interface_id {
                push_config = push_config.with_interface_id(id);
            }

            let (tx, rx) = oneshot::channel::<()>();
            push_shutdown_tx = Some(tx);
            let shutdown = async {
                let _ = rx.await;
            };
            Some(tokio::spawn(wanrelay_push::serve(
                settings.bind,
                push_config,
                sender.clone(),
                shutdown,
            )))
        }
        None => {
            info!("Env DYNDNS_SERVER_BIND not found, disabling DynDns server");
            None
        }
    };
    drop(sender);

    info!("Daemon initialized successfully");

    let mut push_finished = false;
    let outcome = match push_task.as_mut() {
        Some(task) => {
            tokio::select! {
                signal = wait_for_shutdown() => signal.map(|name| {
                    info!("Received shutdown signal: {}", name);
                }),
                served = task => {
                    push_finished = true;
                    match served {
                        Ok(Ok(())) => Err(anyhow::anyhow!("Push endpoint stopped unexpectedly")),
                        Ok(Err(e)) => Err(anyhow::Error::new(e).context("Push endpoint failed")),
                        Err(e) => Err(anyhow::Error::new(e).context("Push endpoint task panicked")),
                    }
                }
            }
        }
        None => wait_for_shutdown().await.map(|name| {
            info!("Received shutdown signal: {}", name);
        }),
    };

    info!("Shutting down daemon");

    if let Some(tx) = push_shutdown_tx {
        let _ = tx.send(());
    }
    if let Some(task) = push_task.filter(|_| !push_finished) {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Push endpoint error during shutdown: {}", e),
            Err(e) => warn!("Push endpoint task failed: {}", e),
        }
    }

    let _ = dispatch_shutdown_tx.send(());
    dispatcher_task
        .await
        .context("Dispatcher task panicked")?
        .context("Dispatcher failed")?;

    info!("Shutdown complete");
    outcome
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
