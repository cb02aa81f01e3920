//! # API Route Modules
//!
//! - `links`: link lifecycle mutations and per-pair reads (`/v1/links/*`).
//! - `accounts`: listings from a sponsor's or a member's point of view
//!   (`/v1/sponsors/*`, `/v1/members/*`).

pub mod accounts;
pub mod links;
