//! HTTP routes for the lead lifecycle
//!
//! - POST /leads                - Create a lead (multipart/form-data with media)
//! - GET  /leads                - Leads created by the caller
//! - GET  /leads/partner        - Leads assigned to the caller as partner
//! - GET  /leads/:id            - Single lead with related summaries
//! - PUT  /leads/:leadId/status - Run a status transition
//! - PUT  /leads/:leadId/note   - Set the partner note

use bson::oid::ObjectId;
use futures_util::TryStreamExt;
use http_body_util::BodyStream;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use multer::{Constraints, Multipart, SizeLimit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{ContactMethod, LeadDoc, LeadStatus};
use crate::leads::{CreateLeadInput, LeadView, StatusChange};
use crate::media::MediaFile;
use crate::routes::{
    authenticate, cors_preflight, error_response, json_response, parse_json_body, query_param,
    BoxBody,
};
use crate::server::AppState;
use crate::types::LeadhubError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub offer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub note: String,
}

#[derive(Serialize)]
struct LeadEnvelope {
    message: &'static str,
    lead: LeadDoc,
}

#[derive(Serialize)]
struct LeadViewEnvelope {
    message: &'static str,
    lead: LeadView,
}

#[derive(Serialize)]
struct LeadsEnvelope {
    message: &'static str,
    leads: Vec<LeadView>,
}

/// Route /leads/* requests; `None` when the path has no lead route
pub async fn handle_leads_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if segments.first().map(String::as_str) != Some("leads") {
        return None;
    }
    let rest: Vec<&str> = segments[1..].iter().map(String::as_str).collect();

    let response = match (method, rest.as_slice()) {
        (Method::OPTIONS, _) => cors_preflight(),
        (Method::POST, []) => handle_create(req, state).await,
        (Method::GET, []) => handle_user_leads(req, state).await,
        (Method::GET, ["partner"]) => handle_partner_leads(req, state).await,
        (Method::GET, [id]) => {
            let id = id.to_string();
            handle_lead_by_id(req, state, &id).await
        }
        (Method::PUT, [id, "status"]) => {
            let id = id.to_string();
            handle_update_status(req, state, &id).await
        }
        (Method::PUT, [id, "note"]) => {
            let id = id.to_string();
            handle_add_note(req, state, &id).await
        }
        _ => return None,
    };

    Some(response)
}

/// POST /leads
async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    match create(req, state).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>, LeadhubError> {
    let caller = authenticate(&req, &state)?;
    let input = parse_create_form(req, &state).await?;

    let lead = state.leads.create_lead(caller.user_id, input).await?;

    Ok(json_response(
        StatusCode::CREATED,
        &LeadEnvelope {
            message: "Lead created successfully",
            lead,
        },
    ))
}

/// Parse the multipart/form-data creation request into a validated input.
///
/// Text fields arrive alongside any number of `media` file parts; the whole
/// stream is capped at the configured upload limit.
async fn parse_create_form(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<CreateLeadInput, LeadhubError> {
    let content_type = req
        .headers()
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| LeadhubError::Http(format!("Expected multipart/form-data: {}", e)))?;

    let body_stream = BodyStream::new(req.into_body())
        .try_filter_map(|frame| std::future::ready(Ok(frame.into_data().ok())));

    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(state.args.max_upload_bytes));

    let mut multipart = Multipart::with_constraints(body_stream, boundary, constraints);

    let mut customer_name = String::new();
    let mut email = String::new();
    let mut phone = String::new();
    let mut contact_method = None;
    let mut address = String::new();
    let mut service_request_date = None;
    let mut details = String::new();
    let mut service = None;
    let mut location = None;
    let mut files: Vec<MediaFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LeadhubError::Http(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "media" {
            if files.len() >= state.args.max_upload_files {
                return Err(LeadhubError::Validation(format!(
                    "At most {} media files are allowed",
                    state.args.max_upload_files
                )));
            }
            let file_name = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| LeadhubError::Validation("Media part is missing a filename".into()))?;
            let content_type = field
                .content_type()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| LeadhubError::Http(format!("Failed to read media part: {}", e)))?;

            files.push(MediaFile {
                file_name: unique_file_name(&file_name),
                content_type,
                data,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| LeadhubError::Http(format!("Failed to read field '{}': {}", name, e)))?;

        match name.as_str() {
            "customerName" => customer_name = value,
            "email" => email = value,
            "phone" => phone = value,
            "contactMethod" => {
                contact_method = Some(ContactMethod::parse(&value).ok_or_else(|| {
                    LeadhubError::Validation(format!("Unrecognized contact method '{}'", value))
                })?)
            }
            "address" => address = value,
            "serviceRequestDate" => service_request_date = Some(parse_request_date(&value)?),
            "details" => details = value,
            "service" => service = Some(parse_object_id(&value, "service")?),
            "location" => location = Some(parse_object_id(&value, "location")?),
            // Unknown fields are ignored, matching typical form tolerance
            _ => {}
        }
    }

    for (label, value) in [
        ("customerName", &customer_name),
        ("email", &email),
        ("phone", &phone),
        ("address", &address),
        ("details", &details),
    ] {
        if value.trim().is_empty() {
            return Err(LeadhubError::Validation(format!(
                "Missing required field: {}",
                label
            )));
        }
    }
    if !email.contains('@') {
        return Err(LeadhubError::Validation("Invalid email address".into()));
    }

    Ok(CreateLeadInput {
        customer_name,
        email,
        phone,
        contact_method: contact_method
            .ok_or_else(|| LeadhubError::Validation("Missing required field: contactMethod".into()))?,
        address,
        service_request_date: service_request_date.ok_or_else(|| {
            LeadhubError::Validation("Missing required field: serviceRequestDate".into())
        })?,
        details,
        service: service
            .ok_or_else(|| LeadhubError::Validation("Missing required field: service".into()))?,
        location: location
            .ok_or_else(|| LeadhubError::Validation("Missing required field: location".into()))?,
        files,
    })
}

/// PUT /leads/:leadId/status
async fn handle_update_status(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    match update_status(req, state, id).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn update_status(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>, LeadhubError> {
    let caller = authenticate(&req, &state)?;
    let lead_id = parse_object_id(id, "lead")?;
    let body: StatusUpdateRequest = parse_json_body(req).await?;

    let lead = state
        .leads
        .update_status(
            caller.user_id,
            lead_id,
            StatusChange {
                status: &body.status,
                reason: body.reason.as_deref(),
                offer: body.offer.as_deref(),
            },
        )
        .await?;

    Ok(json_response(
        StatusCode::OK,
        &LeadEnvelope {
            message: "Lead updated successfully",
            lead,
        },
    ))
}

/// PUT /leads/:leadId/note
async fn handle_add_note(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    match add_note(req, state, id).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn add_note(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>, LeadhubError> {
    let caller = authenticate(&req, &state)?;
    let lead_id = parse_object_id(id, "lead")?;
    let body: NoteRequest = parse_json_body(req).await?;

    if body.note.trim().is_empty() {
        return Err(LeadhubError::Validation("Note is required".into()));
    }

    let lead = state
        .leads
        .add_note(caller.user_id, lead_id, body.note.trim())
        .await?;

    Ok(json_response(
        StatusCode::OK,
        &LeadEnvelope {
            message: "Note added successfully",
            lead,
        },
    ))
}

/// GET /leads
async fn handle_user_leads(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    match user_leads(req, state).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn user_leads(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>, LeadhubError> {
    let caller = authenticate(&req, &state)?;
    let status = parse_status_filter(&req)?;

    let leads = state.leads.user_leads(caller.user_id, status).await?;

    Ok(json_response(
        StatusCode::OK,
        &LeadsEnvelope {
            message: "Leads fetched successfully",
            leads,
        },
    ))
}

/// GET /leads/partner
async fn handle_partner_leads(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    match partner_leads(req, state).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn partner_leads(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>, LeadhubError> {
    let caller = authenticate(&req, &state)?;
    let status = parse_status_filter(&req)?;

    let leads = state.leads.partner_leads(caller.user_id, status).await?;

    Ok(json_response(
        StatusCode::OK,
        &LeadsEnvelope {
            message: "Partner leads fetched successfully",
            leads,
        },
    ))
}

/// GET /leads/:id
async fn handle_lead_by_id(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    match lead_by_id(req, state, id).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn lead_by_id(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>, LeadhubError> {
    let caller = authenticate(&req, &state)?;
    let lead_id = parse_object_id(id, "lead")?;

    let view = state.leads.lead_by_id(lead_id).await?;

    // Lead details are visible only to the two parties
    if view.lead.user != caller.user_id && view.lead.partner != caller.user_id {
        return Err(LeadhubError::Forbidden(
            "You are not a party to this lead".into(),
        ));
    }

    Ok(json_response(
        StatusCode::OK,
        &LeadViewEnvelope {
            message: "Lead fetched successfully",
            lead: view,
        },
    ))
}

fn parse_status_filter(req: &Request<Incoming>) -> Result<Option<LeadStatus>, LeadhubError> {
    match query_param(req, "status") {
        None => Ok(None),
        Some(raw) => LeadStatus::parse(raw)
            .map(Some)
            .ok_or_else(|| LeadhubError::Validation(format!("Unrecognized status '{}'", raw))),
    }
}

fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, LeadhubError> {
    ObjectId::parse_str(raw)
        .map_err(|_| LeadhubError::Validation(format!("Invalid {} id '{}'", what, raw)))
}

/// Parse the requested service date; RFC 3339 first, then a bare date
fn parse_request_date(raw: &str) -> Result<bson::DateTime, LeadhubError> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(bson::DateTime::from_chrono(dt.with_timezone(&chrono::Utc)));
    }

    let date = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| LeadhubError::Validation(format!("Invalid serviceRequestDate '{}'", raw)))?;
    let dt = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| LeadhubError::Validation(format!("Invalid serviceRequestDate '{}'", raw)))?
        .and_utc();
    Ok(bson::DateTime::from_chrono(dt))
}

/// Prefix uploads with a unique id so concurrent inquiries cannot collide
/// on the storage path.
fn unique_file_name(original: &str) -> String {
    let safe: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = format!("{}-{}", uuid::Uuid::new_v4(), safe);
    info!(original = %original, stored = %name, "Staged upload");
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_date_accepts_rfc3339() {
        let dt = parse_request_date("2025-06-01T10:30:00Z").unwrap();
        assert_eq!(dt.to_chrono().to_rfc3339(), "2025-06-01T10:30:00+00:00");
    }

    #[test]
    fn test_parse_request_date_accepts_bare_date() {
        let dt = parse_request_date("2025-06-01").unwrap();
        assert_eq!(dt.to_chrono().format("%Y-%m-%d").to_string(), "2025-06-01");
    }

    #[test]
    fn test_parse_request_date_rejects_garbage() {
        assert!(parse_request_date("next tuesday").is_err());
        assert!(parse_request_date("").is_err());
    }

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "lead").unwrap(), id);
        assert!(parse_object_id("not-an-id", "lead").is_err());
    }

    #[test]
    fn test_unique_file_name_sanitizes_and_prefixes() {
        let name = unique_file_name("../weird name.png");
        assert!(name.ends_with("___weird_name.png"));
        assert!(!name.contains('/'));
        assert!(name.len() > "___weird_name.png".len());
    }
}
