//! # Link Lifecycle Routes
//!
//! Mutations of a sponsor/member link and per-pair reads.
//!
//! Every mutation goes through [`AppState::execute`]: the lifecycle engine
//! commits, the record is written through to the database when one is
//! configured, and only then does the notification go out.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use famlink_core::{AccountCode, AccountId};
use famlink_engine::{EligibilityReport, LinkCommand, LinkView};
use famlink_state::{FamilyLink, LinkTransitionRecord, ResendEligibility};

use crate::error::{AppError, ErrorBody};
use crate::extractors::{acting_account, extract_parsed_json, Parse};
use crate::state::AppState;

// ── Request DTOs ─────────────────────────────────────────────────────

/// Sponsor asks to link the member owning `member_code`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestLinkRequest {
    pub sponsor_id: String,
    /// Shareable code of the member, case-insensitive.
    pub member_code: String,
}

impl Parse for RequestLinkRequest {
    type Output = (AccountId, AccountCode);

    fn parse(self) -> Result<Self::Output, AppError> {
        Ok((
            AccountId::new(self.sponsor_id)?,
            AccountCode::new(self.member_code)?,
        ))
    }
}

/// Member's answer to a pending request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecisionRequest {
    pub member_id: String,
    pub sponsor_id: String,
    /// `true` to accept, `false` to decline.
    pub approve: bool,
}

impl Parse for DecisionRequest {
    type Output = (AccountId, AccountId, bool);

    fn parse(self) -> Result<Self::Output, AppError> {
        Ok((
            AccountId::new(self.member_id)?,
            AccountId::new(self.sponsor_id)?,
            self.approve,
        ))
    }
}

/// Identifies an approved link to dissolve.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkPairRequest {
    pub sponsor_id: String,
    pub member_id: String,
}

impl Parse for LinkPairRequest {
    type Output = (AccountId, AccountId);

    fn parse(self) -> Result<Self::Output, AppError> {
        Ok((
            AccountId::new(self.sponsor_id)?,
            AccountId::new(self.member_id)?,
        ))
    }
}

// ── Response DTOs ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    /// `None` for the creating transition.
    pub from_state: Option<String>,
    pub to_state: String,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub reason: String,
}

impl From<&LinkTransitionRecord> for TransitionResponse {
    fn from(record: &LinkTransitionRecord) -> Self {
        Self {
            from_state: record.from_state.map(|s| s.as_str().to_string()),
            to_state: record.to_state.as_str().to_string(),
            timestamp: *record.timestamp.as_datetime(),
            actor: record.actor.to_string(),
            reason: record.reason.clone(),
        }
    }
}

/// A stored link record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkResponse {
    pub id: Uuid,
    pub sponsor_id: String,
    pub member_id: String,
    /// `INITIATED`, `APPROVED`, `REJECTED` or `REVOKED`.
    pub status: String,
    pub reject_count: u32,
    pub last_reject_date: Option<DateTime<Utc>>,
    pub new_request_date: Option<DateTime<Utc>>,
    pub display_name: String,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
    pub version: u64,
    pub transitions: Vec<TransitionResponse>,
}

impl From<&FamilyLink> for LinkResponse {
    fn from(link: &FamilyLink) -> Self {
        Self {
            id: *link.id.as_uuid(),
            sponsor_id: link.sponsor_id.to_string(),
            member_id: link.member_id.to_string(),
            status: link.status.as_str().to_string(),
            reject_count: link.reject_count,
            last_reject_date: link.last_reject_date.map(|t| *t.as_datetime()),
            new_request_date: link.new_request_date.map(|t| *t.as_datetime()),
            display_name: link.display_name.clone(),
            created_date: *link.created_date.as_datetime(),
            last_modified_date: *link.last_modified_date.as_datetime(),
            version: link.version,
            transitions: link.transitions.iter().map(TransitionResponse::from).collect(),
        }
    }
}

/// Whether a re-request would pass right now, and if not, why.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EligibilityResponse {
    pub eligible: bool,
    /// `eligible`, `awaiting_decision`, `already_linked`,
    /// `cooldown_active` or `limit_exceeded`.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl From<ResendEligibility> for EligibilityResponse {
    fn from(eligibility: ResendEligibility) -> Self {
        let mut response = Self {
            eligible: eligibility.is_eligible(),
            kind: String::new(),
            requested_at: None,
            retry_at: None,
            reject_count: None,
            max: None,
        };
        response.kind = match eligibility {
            ResendEligibility::Eligible => "eligible",
            ResendEligibility::AwaitingDecision { requested_at } => {
                response.requested_at = Some(*requested_at.as_datetime());
                "awaiting_decision"
            }
            ResendEligibility::AlreadyLinked => "already_linked",
            ResendEligibility::CooldownActive { retry_at } => {
                response.retry_at = Some(*retry_at.as_datetime());
                "cooldown_active"
            }
            ResendEligibility::LimitExceeded { reject_count, max } => {
                response.reject_count = Some(reject_count);
                response.max = Some(max);
                "limit_exceeded"
            }
        }
        .to_string();
        response
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EligibilityReportResponse {
    pub link_id: Uuid,
    pub status: String,
    pub reject_count: u32,
    pub eligibility: EligibilityResponse,
    /// Absent on the revoked path, which has no attempt ceiling.
    pub remaining_attempts: Option<u32>,
}

impl From<EligibilityReport> for EligibilityReportResponse {
    fn from(report: EligibilityReport) -> Self {
        Self {
            link_id: *report.link_id.as_uuid(),
            status: report.status.as_str().to_string(),
            reject_count: report.reject_count,
            eligibility: report.eligibility.into(),
            remaining_attempts: report.remaining_attempts,
        }
    }
}

/// A link as seen by one of its parties.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkViewResponse {
    pub link_id: Uuid,
    pub sponsor_id: String,
    pub member_id: String,
    pub status: String,
    /// The other party: the member for sponsors, the sponsor for members.
    pub counterpart_id: String,
    pub counterpart_name: String,
    pub display_name: String,
    pub reject_count: u32,
    pub requested_at: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<EligibilityResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
}

impl From<LinkView> for LinkViewResponse {
    fn from(view: LinkView) -> Self {
        Self {
            link_id: *view.link_id.as_uuid(),
            sponsor_id: view.sponsor_id.to_string(),
            member_id: view.member_id.to_string(),
            status: view.status.as_str().to_string(),
            counterpart_id: view.counterpart_id.to_string(),
            counterpart_name: view.counterpart_name,
            display_name: view.display_name,
            reject_count: view.reject_count,
            requested_at: *view.requested_at.as_datetime(),
            last_modified_date: *view.last_modified_date.as_datetime(),
            eligibility: view.eligibility.map(EligibilityResponse::from),
            remaining_attempts: view.remaining_attempts,
        }
    }
}

// ── Router ───────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/links", post(request_link))
        .route("/v1/links/decision", post(decide))
        .route("/v1/links/remove-member", post(remove_member))
        .route("/v1/links/remove-sponsor", post(remove_sponsor))
        .route("/v1/links/{sponsor_id}/{member_id}", get(get_link))
        .route(
            "/v1/links/{sponsor_id}/{member_id}/eligibility",
            get(check_eligibility),
        )
}

// ── Handlers ─────────────────────────────────────────────────────────

/// POST /v1/links — Request a link, or re-request a rejected/revoked one.
#[utoipa::path(
    post,
    path = "/v1/links",
    request_body = RequestLinkRequest,
    responses(
        (status = 201, description = "Link is now INITIATED", body = LinkResponse),
        (status = 404, description = "Sponsor or member not found", body = ErrorBody),
        (status = 409, description = "Request pending or pair already linked", body = ErrorBody),
        (status = 422, description = "Self link or incomplete member contact details", body = ErrorBody),
        (status = 429, description = "Cooldown active or attempt limit reached", body = ErrorBody),
        (status = 503, description = "Directory unavailable", body = ErrorBody),
    ),
    tag = "links"
)]
pub async fn request_link(
    State(state): State<AppState>,
    body: Result<Json<RequestLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    let (sponsor_id, member_code) = extract_parsed_json(body)?;
    let link = state
        .execute(LinkCommand::Request {
            sponsor_id,
            member_code,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(LinkResponse::from(&link))))
}

/// POST /v1/links/decision — Member approves or declines a pending request.
#[utoipa::path(
    post,
    path = "/v1/links/decision",
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Link is APPROVED or REJECTED", body = LinkResponse),
        (status = 404, description = "No link for the pair", body = ErrorBody),
        (status = 409, description = "Link is not awaiting a decision", body = ErrorBody),
    ),
    tag = "links"
)]
pub async fn decide(
    State(state): State<AppState>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<LinkResponse>, AppError> {
    let (member_id, sponsor_id, approve) = extract_parsed_json(body)?;
    let link = state
        .execute(LinkCommand::Decide {
            member_id,
            sponsor_id,
            approve,
        })
        .await?;
    Ok(Json(LinkResponse::from(&link)))
}

/// POST /v1/links/remove-member — Sponsor removes an approved member.
#[utoipa::path(
    post,
    path = "/v1/links/remove-member",
    request_body = LinkPairRequest,
    params(("x-account-id" = String, Header, description = "Account performing the removal")),
    responses(
        (status = 200, description = "Link is REVOKED", body = LinkResponse),
        (status = 400, description = "Missing acting account header", body = ErrorBody),
        (status = 403, description = "The member cannot remove itself this way", body = ErrorBody),
        (status = 404, description = "No link for the pair", body = ErrorBody),
        (status = 409, description = "Link is not approved", body = ErrorBody),
    ),
    tag = "links"
)]
pub async fn remove_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LinkPairRequest>, JsonRejection>,
) -> Result<Json<LinkResponse>, AppError> {
    let acting = acting_account(&headers)?;
    let (sponsor_id, member_id) = extract_parsed_json(body)?;
    let link = state
        .execute(LinkCommand::RemoveMember {
            sponsor_id,
            member_id,
            acting_account: acting,
        })
        .await?;
    Ok(Json(LinkResponse::from(&link)))
}

/// POST /v1/links/remove-sponsor — Member leaves an approved link.
#[utoipa::path(
    post,
    path = "/v1/links/remove-sponsor",
    request_body = LinkPairRequest,
    responses(
        (status = 200, description = "Link is REJECTED", body = LinkResponse),
        (status = 404, description = "No link for the pair", body = ErrorBody),
        (status = 409, description = "Link is not approved", body = ErrorBody),
    ),
    tag = "links"
)]
pub async fn remove_sponsor(
    State(state): State<AppState>,
    body: Result<Json<LinkPairRequest>, JsonRejection>,
) -> Result<Json<LinkResponse>, AppError> {
    let (sponsor_id, member_id) = extract_parsed_json(body)?;
    let link = state
        .execute(LinkCommand::RemoveSponsor {
            member_id,
            sponsor_id,
        })
        .await?;
    Ok(Json(LinkResponse::from(&link)))
}

/// GET /v1/links/{sponsor_id}/{member_id} — The active record of a pair.
#[utoipa::path(
    get,
    path = "/v1/links/{sponsor_id}/{member_id}",
    params(
        ("sponsor_id" = String, Path, description = "Sponsor account id"),
        ("member_id" = String, Path, description = "Member account id"),
    ),
    responses(
        (status = 200, description = "Link found", body = LinkResponse),
        (status = 404, description = "No link for the pair", body = ErrorBody),
    ),
    tag = "links"
)]
pub async fn get_link(
    State(state): State<AppState>,
    Path((sponsor_id, member_id)): Path<(String, String)>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state
        .engine
        .get_link(&AccountId::new(sponsor_id)?, &AccountId::new(member_id)?)?;
    Ok(Json(LinkResponse::from(&link)))
}

/// GET /v1/links/{sponsor_id}/{member_id}/eligibility — Resend eligibility.
#[utoipa::path(
    get,
    path = "/v1/links/{sponsor_id}/{member_id}/eligibility",
    params(
        ("sponsor_id" = String, Path, description = "Sponsor account id"),
        ("member_id" = String, Path, description = "Member account id"),
    ),
    responses(
        (status = 200, description = "Eligibility evaluated now", body = EligibilityReportResponse),
        (status = 404, description = "No link for the pair", body = ErrorBody),
    ),
    tag = "links"
)]
pub async fn check_eligibility(
    State(state): State<AppState>,
    Path((sponsor_id, member_id)): Path<(String, String)>,
) -> Result<Json<EligibilityReportResponse>, AppError> {
    let report = state
        .engine
        .check_eligibility(&AccountId::new(sponsor_id)?, &AccountId::new(member_id)?)?;
    Ok(Json(report.into()))
}
