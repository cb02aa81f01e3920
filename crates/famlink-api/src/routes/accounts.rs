//! # Account Listing Routes
//!
//! Per-account views of links: a sponsor's members and outgoing requests,
//! a member's sponsors and incoming requests. Names are enriched from the
//! directory, falling back to the stored display name.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use famlink_core::AccountId;
use famlink_engine::LinkView;

use crate::error::{AppError, ErrorBody};
use crate::routes::links::LinkViewResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sponsors/{sponsor_id}/members", get(list_members))
        .route("/v1/sponsors/{sponsor_id}/outgoing", get(list_outgoing))
        .route("/v1/members/{member_id}/sponsors", get(list_sponsors))
        .route("/v1/members/{member_id}/incoming", get(list_incoming))
}

fn into_response(views: Vec<LinkView>) -> Json<Vec<LinkViewResponse>> {
    Json(views.into_iter().map(LinkViewResponse::from).collect())
}

/// GET /v1/sponsors/{sponsor_id}/members — Approved members of a sponsor.
#[utoipa::path(
    get,
    path = "/v1/sponsors/{sponsor_id}/members",
    params(("sponsor_id" = String, Path, description = "Sponsor account id")),
    responses(
        (status = 200, description = "Approved links, oldest first", body = [LinkViewResponse]),
        (status = 422, description = "Malformed account id", body = ErrorBody),
    ),
    tag = "accounts"
)]
pub async fn list_members(
    State(state): State<AppState>,
    Path(sponsor_id): Path<String>,
) -> Result<Json<Vec<LinkViewResponse>>, AppError> {
    let views = state.engine.list_members(&AccountId::new(sponsor_id)?)?;
    Ok(into_response(views))
}

/// GET /v1/sponsors/{sponsor_id}/outgoing — Pending and failed requests
/// with their resend eligibility.
#[utoipa::path(
    get,
    path = "/v1/sponsors/{sponsor_id}/outgoing",
    params(("sponsor_id" = String, Path, description = "Sponsor account id")),
    responses(
        (status = 200, description = "Non-approved links, oldest first", body = [LinkViewResponse]),
        (status = 422, description = "Malformed account id", body = ErrorBody),
    ),
    tag = "accounts"
)]
pub async fn list_outgoing(
    State(state): State<AppState>,
    Path(sponsor_id): Path<String>,
) -> Result<Json<Vec<LinkViewResponse>>, AppError> {
    let views = state
        .engine
        .list_outgoing_non_approved(&AccountId::new(sponsor_id)?)?;
    Ok(into_response(views))
}

/// GET /v1/members/{member_id}/sponsors — Approved sponsors of a member.
#[utoipa::path(
    get,
    path = "/v1/members/{member_id}/sponsors",
    params(("member_id" = String, Path, description = "Member account id")),
    responses(
        (status = 200, description = "Approved links, oldest first", body = [LinkViewResponse]),
        (status = 422, description = "Malformed account id", body = ErrorBody),
    ),
    tag = "accounts"
)]
pub async fn list_sponsors(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<Vec<LinkViewResponse>>, AppError> {
    let views = state.engine.list_sponsors(&AccountId::new(member_id)?)?;
    Ok(into_response(views))
}

/// GET /v1/members/{member_id}/incoming — Requests awaiting the member.
#[utoipa::path(
    get,
    path = "/v1/members/{member_id}/incoming",
    params(("member_id" = String, Path, description = "Member account id")),
    responses(
        (status = 200, description = "INITIATED links, oldest first", body = [LinkViewResponse]),
        (status = 422, description = "Malformed account id", body = ErrorBody),
    ),
    tag = "accounts"
)]
pub async fn list_incoming(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<Vec<LinkViewResponse>>, AppError> {
    let views = state
        .engine
        .list_incoming_pending(&AccountId::new(member_id)?)?;
    Ok(into_response(views))
}
