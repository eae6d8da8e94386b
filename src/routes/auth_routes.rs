//! HTTP routes for authentication
//!
//! - POST /auth/register - Create an account
//! - POST /auth/login    - Authenticate and get a JWT token
//! - GET  /auth/me       - Current account info from token

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::routes::{
    authenticate, cors_preflight, error_response, json_response, parse_json_body, BoxBody,
};
use crate::server::AppState;
use crate::types::LeadhubError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub identifier: String,
    pub display_name: String,
    pub expires_at: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub identifier: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Route /auth/* requests; `None` when the path has no auth route
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (method, path.as_str()) {
        (Method::OPTIONS, _) => cors_preflight(),
        (Method::POST, "/auth/register") => handle_register(req, state).await,
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::GET, "/auth/me") => handle_me(req, state).await,
        _ => return None,
    };

    Some(response)
}

/// POST /auth/register
///
/// Validates the fields, hashes the password with argon2, stores the
/// account, and returns a token so registration doubles as login.
async fn handle_register(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    match register(req, state).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn register(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>, LeadhubError> {
    let body: RegisterRequest = parse_json_body(req).await?;

    if body.identifier.is_empty() || body.password.is_empty() {
        return Err(LeadhubError::Validation(
            "Missing required fields: identifier, password".into(),
        ));
    }
    if body.password.len() < 8 {
        return Err(LeadhubError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let identifier = body.identifier.trim().to_lowercase();
    let display_name = if body.display_name.is_empty() {
        identifier.split('@').next().unwrap_or("User").to_string()
    } else {
        body.display_name.clone()
    };

    let collection = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;

    if collection
        .find_one(doc! { "identifier": &identifier })
        .await?
        .is_some()
    {
        return Err(LeadhubError::Conflict(
            "An account with this identifier already exists".into(),
        ));
    }

    let password_hash = hash_password(&body.password)?;
    let mut user = UserDoc::new(identifier.clone(), password_hash, display_name.clone());
    user.avatar_url = body.avatar_url;

    let user_id = match collection.insert_one(user).await {
        Ok(id) => id,
        // Unique index on identifier closes the check-then-insert race
        Err(e) if e.to_string().contains("E11000") => {
            return Err(LeadhubError::Conflict(
                "An account with this identifier already exists".into(),
            ));
        }
        Err(e) => return Err(e),
    };

    info!("Registered new account: {}", identifier);

    let (token, expires_at) = state.jwt.generate_token(&user_id, &identifier)?;
    Ok(json_response(
        StatusCode::CREATED,
        &AuthResponse {
            token,
            user_id: user_id.to_hex(),
            identifier,
            display_name,
            expires_at,
        },
    ))
}

/// POST /auth/login
async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    match login(req, state).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn login(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>, LeadhubError> {
    let body: LoginRequest = parse_json_body(req).await?;

    if body.identifier.is_empty() || body.password.is_empty() {
        return Err(LeadhubError::Validation(
            "Missing required fields: identifier, password".into(),
        ));
    }

    let identifier = body.identifier.trim().to_lowercase();
    let collection = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;

    // Generic rejection either way, so identifiers cannot be enumerated
    let user = match collection
        .find_one(doc! { "identifier": &identifier, "is_active": true })
        .await?
    {
        Some(u) => u,
        None => {
            warn!("Login failed - account not found: {}", identifier);
            return Err(LeadhubError::Auth("Invalid credentials".into()));
        }
    };

    if !verify_password(&body.password, &user.password_hash)? {
        warn!("Login failed - invalid password: {}", identifier);
        return Err(LeadhubError::Auth("Invalid credentials".into()));
    }

    let user_id = user
        ._id
        .ok_or_else(|| LeadhubError::Database("Stored user has no id".into()))?;

    info!("Login successful: {}", identifier);

    let (token, expires_at) = state.jwt.generate_token(&user_id, &identifier)?;
    Ok(json_response(
        StatusCode::OK,
        &AuthResponse {
            token,
            user_id: user_id.to_hex(),
            identifier,
            display_name: user.display_name,
            expires_at,
        },
    ))
}

/// GET /auth/me
async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    match me(req, state).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn me(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>, LeadhubError> {
    let caller = authenticate(&req, &state)?;

    let collection = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;
    let user = collection
        .find_one(doc! { "_id": caller.user_id })
        .await?
        .ok_or_else(|| LeadhubError::NotFound("User".into()))?;

    Ok(json_response(
        StatusCode::OK,
        &MeResponse {
            user_id: caller.user_id.to_hex(),
            identifier: user.identifier,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
        },
    ))
}
