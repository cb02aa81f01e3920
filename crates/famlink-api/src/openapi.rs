//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "famlink API",
        version = "0.1.0",
        description = "Sponsor/member family link lifecycle: requests, decisions, removals, listings and resend eligibility.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::links::request_link,
        crate::routes::links::decide,
        crate::routes::links::remove_member,
        crate::routes::links::remove_sponsor,
        crate::routes::links::get_link,
        crate::routes::links::check_eligibility,
        crate::routes::accounts::list_members,
        crate::routes::accounts::list_outgoing,
        crate::routes::accounts::list_sponsors,
        crate::routes::accounts::list_incoming,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::links::RequestLinkRequest,
        crate::routes::links::DecisionRequest,
        crate::routes::links::LinkPairRequest,
        crate::routes::links::LinkResponse,
        crate::routes::links::TransitionResponse,
        crate::routes::links::EligibilityResponse,
        crate::routes::links::EligibilityReportResponse,
        crate::routes::links::LinkViewResponse,
    )),
    tags(
        (name = "links", description = "Link lifecycle"),
        (name = "accounts", description = "Per-account link listings"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/v1/links",
            "/v1/links/decision",
            "/v1/links/remove-member",
            "/v1/links/remove-sponsor",
            "/v1/links/{sponsor_id}/{member_id}",
            "/v1/links/{sponsor_id}/{member_id}/eligibility",
            "/v1/sponsors/{sponsor_id}/members",
            "/v1/sponsors/{sponsor_id}/outgoing",
            "/v1/members/{member_id}/sponsors",
            "/v1/members/{member_id}/incoming",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
