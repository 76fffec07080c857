//! The `/ip` endpoint
//!
//! ## Request handling
//!
//! 1. Basic mode: credentials come from the `Authorization` header. A missing
//!    header is answered with a 401 challenge.
//! 2. Otherwise credentials come from the `username`/`password` parameters.
//! 3. Both credentials are compared in constant time; a mismatch is a plain 401.
//! 4. `v4` is forwarded if it is an IPv4 address.
//! 5. Without an interface identifier, `v6` is forwarded if it is a real IPv6
//!    address. With one, `prefix` is combined with the identifier instead.
//! 6. Every authenticated request is answered with 200, whatever the
//!    parameters contained.

use crate::auth::{Credentials, basic_credentials};
use crate::config::PushConfig;
use axum::Router;
use axum::extract::{Query, Request, State};
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tokio::net::ToSocketAddrs;
use tracing::{Span, debug, debug_span, error, info, warn};
use wanrelay_core::{ChangeSender, Ipv6Prefix, construct};

/// Challenge sent when Basic credentials are missing
pub const BASIC_CHALLENGE: &str = "Basic realm=\"Authentication required to access this resource\"";

#[derive(Clone)]
struct PushState {
    config: Arc<PushConfig>,
    sender: ChangeSender,
}

/// Query parameters of an update; the first occurrence of a key wins
#[derive(Debug, Default)]
struct PushParams {
    v4: Option<String>,
    v6: Option<String>,
    prefix: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl PushParams {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "v4" => &mut params.v4,
                "v6" => &mut params.v6,
                "prefix" => &mut params.prefix,
                "username" => &mut params.username,
                "password" => &mut params.password,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Build the push router
pub fn router(config: PushConfig, sender: ChangeSender) -> Router {
    let state = PushState {
        config: Arc::new(config),
        sender,
    };

    Router::new()
        .route("/ip", any(handle_update))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Span for one request, recording the path only
///
/// The query string carries `username` and `password` outside Basic mode.
fn request_span(request: &Request) -> Span {
    debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path()
    )
}

fn unauthorized(challenge: bool) -> Response {
    if challenge {
        (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, BASIC_CHALLENGE)],
            "Unauthorized",
        )
            .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

async fn forward(sender: &ChangeSender, address: IpAddr) {
    if let Err(e) = sender.send(address).await {
        error!(ip = %address, "Failed to forward address: {}", e);
    }
}

async fn handle_update(
    State(state): State<PushState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    info!("Received incoming update request");
    let params = PushParams::from_pairs(pairs);
    let config = &state.config;

    let supplied = if config.basic_auth() {
        match basic_credentials(&headers) {
            Some(credentials) => credentials,
            None => {
                warn!("Rejected update: basic auth credentials missing");
                return unauthorized(true);
            }
        }
    } else {
        Credentials::new(
            params.username.clone().unwrap_or_default(),
            params.password.clone().unwrap_or_default(),
        )
    };

    if !supplied.matches(config.credentials()) {
        warn!("Rejected update: username / password mismatch");
        return unauthorized(false);
    }

    if let Some(raw) = params.v4.as_deref() {
        match raw.parse::<IpAddr>().map(|ip| ip.to_canonical()) {
            Ok(address @ IpAddr::V4(_)) => {
                info!(ip = %address, "Forwarding update request for IPv4");
                forward(&state.sender, address).await;
            }
            _ => warn!("Ignoring invalid v4 parameter"),
        }
    }

    match config.interface_id() {
        None => {
            if let Some(raw) = params.v6.as_deref() {
                match raw.parse::<IpAddr>() {
                    Ok(IpAddr::V6(address)) if address.to_ipv4_mapped().is_none() => {
                        info!(ip = %address, "Forwarding update request for IPv6");
                        forward(&state.sender, IpAddr::V6(address)).await;
                    }
                    _ => warn!("Ignoring invalid v6 parameter"),
                }
            }
        }
        Some(interface_id) => match params.prefix.as_deref().map(str::parse::<Ipv6Prefix>) {
            Some(Ok(prefix)) => {
                let address = construct(prefix.network(), interface_id);
                info!(%prefix, ip = %address, "Forwarding update request for IPv6");
                forward(&state.sender, IpAddr::V6(address)).await;
            }
            Some(Err(e)) => warn!("Failed to parse prefix: {}", e),
            None => debug!("No prefix parameter supplied"),
        },
    }

    StatusCode::OK.into_response()
}

/// Serve the push endpoint on `addr` until `shutdown` completes
///
/// `addr` is anything tokio can resolve, e.g. `"0.0.0.0:8080"` or
/// `"localhost:8080"`.
pub async fn serve<A, F>(
    addr: A,
    config: PushConfig,
    sender: ChangeSender,
    shutdown: F,
) -> std::io::Result<()>
where
    A: ToSocketAddrs,
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(config, sender);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Push endpoint listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Push endpoint stopped");
    Ok(())
}
