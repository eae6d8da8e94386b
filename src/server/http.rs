//! HTTP server implementation
//!
//! hyper http1 with TokioIo; one spawned task per accepted connection and a
//! single routing function over (method, path).

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::MongoClient;
use crate::leads::LeadService;
use crate::media::{HttpMediaStore, MediaStore};
use crate::routes;
use crate::routes::{not_found_response, BoxBody};
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub jwt: JwtValidator,
    pub leads: LeadService,
}

impl AppState {
    /// Wire up the services backing the HTTP routes
    pub async fn new(args: Args, mongo: MongoClient) -> Result<Self> {
        let jwt = JwtValidator::new(&args.jwt_secret(), args.jwt_expiry_seconds);

        let media: Arc<dyn MediaStore> = Arc::new(HttpMediaStore::new(
            &args.media_storage_url,
            args.media_public_url(),
        ));

        let leads = LeadService::new(&mongo, media).await?;

        Ok(Self {
            args,
            mongo,
            jwt,
            leads,
        })
    }
}

/// Run the HTTP server until the process is stopped
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Leadhub listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - using fallback JWT secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);

                tokio::task::spawn(async move {
                    let service =
                        service_fn(move |req| handle_request(Arc::clone(&state), addr, req));

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Auth routes (/auth/*) consume the request
    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    // Lead routes (/leads/*)
    if path.starts_with("/leads") {
        if let Some(response) = routes::handle_leads_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(state).await
        }
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(state).await
        }
        (Method::GET, "/version") => routes::version_info(),
        (Method::OPTIONS, _) => routes::cors_preflight(),
        _ => not_found_response(&path),
    };

    Ok(response)
}
