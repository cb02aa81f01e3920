//! Family link persistence.
//!
//! All functions take a `&PgPool` and operate on the `family_links` table.
//! Lifecycle rules live in the engine; the table only mirrors committed
//! records. Writes are idempotent per `(id, version)` and never move a row
//! back to an older version, so write-throughs that finish out of order
//! leave the newest state in place.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use famlink_core::{AccountId, LinkId, Timestamp};
use famlink_state::{FamilyLink, LinkStatus, LinkTransitionRecord};

/// Raised when a stored row cannot be turned back into a [`FamilyLink`].
#[derive(Debug, thiserror::Error)]
#[error("family_links row {id}: {reason}")]
pub struct RowDecodeError {
    id: Uuid,
    reason: String,
}

fn encode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Encode(Box::new(err))
}

fn to_db_int<T, U>(value: T, column: &str) -> Result<U, sqlx::Error>
where
    U: TryFrom<T>,
    T: Copy + std::fmt::Display,
{
    U::try_from(value).map_err(|_| {
        encode_error(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{column} value {value} out of range"),
        ))
    })
}

/// Insert or update a link row.
///
/// Returns `false` when the stored row already has the same or a newer
/// version, in which case nothing is written.
pub async fn upsert(pool: &PgPool, link: &FamilyLink) -> Result<bool, sqlx::Error> {
    let transitions = serde_json::to_value(&link.transitions).map_err(|e| {
        tracing::error!(link_id = %link.id, error = %e, "failed to serialize link transitions");
        encode_error(e)
    })?;
    let reject_count: i32 = to_db_int(link.reject_count, "reject_count")?;
    let version: i64 = to_db_int(link.version, "version")?;

    let result = sqlx::query(
        "INSERT INTO family_links (
             id, sponsor_id, member_id, status, reject_count, last_reject_date,
             new_request_date, display_name, created_date, last_modified_date,
             is_active, version, transitions)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         ON CONFLICT (id) DO UPDATE SET
             status = EXCLUDED.status,
             reject_count = EXCLUDED.reject_count,
             last_reject_date = EXCLUDED.last_reject_date,
             new_request_date = EXCLUDED.new_request_date,
             display_name = EXCLUDED.display_name,
             last_modified_date = EXCLUDED.last_modified_date,
             is_active = EXCLUDED.is_active,
             version = EXCLUDED.version,
             transitions = EXCLUDED.transitions
         WHERE family_links.version < EXCLUDED.version",
    )
    .bind(link.id.as_uuid())
    .bind(link.sponsor_id.as_str())
    .bind(link.member_id.as_str())
    .bind(link.status.as_str())
    .bind(reject_count)
    .bind(link.last_reject_date.map(|t| *t.as_datetime()))
    .bind(link.new_request_date.map(|t| *t.as_datetime()))
    .bind(&link.display_name)
    .bind(link.created_date.as_datetime())
    .bind(link.last_modified_date.as_datetime())
    .bind(link.is_active)
    .bind(version)
    .bind(&transitions)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load every row, active or archived, oldest first.
///
/// Fails on the first row that does not decode; hydration must not guess.
pub async fn load_all(pool: &PgPool) -> Result<Vec<FamilyLink>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FamilyLinkRow>(
        "SELECT id, sponsor_id, member_id, status, reject_count, last_reject_date,
                new_request_date, display_name, created_date, last_modified_date,
                is_active, version, transitions
         FROM family_links ORDER BY created_date",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| row.into_link().map_err(|e| sqlx::Error::Decode(Box::new(e))))
        .collect()
}

/// Internal row type for SQLx mapping.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FamilyLinkRow {
    pub(crate) id: Uuid,
    pub(crate) sponsor_id: String,
    pub(crate) member_id: String,
    pub(crate) status: String,
    pub(crate) reject_count: i32,
    pub(crate) last_reject_date: Option<DateTime<Utc>>,
    pub(crate) new_request_date: Option<DateTime<Utc>>,
    pub(crate) display_name: String,
    pub(crate) created_date: DateTime<Utc>,
    pub(crate) last_modified_date: DateTime<Utc>,
    pub(crate) is_active: bool,
    pub(crate) version: i64,
    pub(crate) transitions: serde_json::Value,
}

impl FamilyLinkRow {
    pub(crate) fn into_link(self) -> Result<FamilyLink, RowDecodeError> {
        let id = self.id;
        let fail = |reason: String| RowDecodeError { id, reason };

        let sponsor_id = AccountId::new(self.sponsor_id).map_err(|e| fail(e.to_string()))?;
        let member_id = AccountId::new(self.member_id).map_err(|e| fail(e.to_string()))?;
        let status: LinkStatus = self.status.parse().map_err(fail)?;
        let reject_count = u32::try_from(self.reject_count)
            .map_err(|_| fail(format!("negative reject_count {}", self.reject_count)))?;
        let version = u64::try_from(self.version)
            .map_err(|_| fail(format!("negative version {}", self.version)))?;
        let transitions: Vec<LinkTransitionRecord> = serde_json::from_value(self.transitions)
            .map_err(|e| fail(format!("transitions: {e}")))?;

        Ok(FamilyLink {
            id: LinkId::from_uuid(id),
            sponsor_id,
            member_id,
            status,
            reject_count,
            last_reject_date: self.last_reject_date.map(Timestamp::from_utc),
            new_request_date: self.new_request_date.map(Timestamp::from_utc),
            display_name: self.display_name,
            created_date: Timestamp::from_utc(self.created_date),
            last_modified_date: Timestamp::from_utc(self.last_modified_date),
            is_active: self.is_active,
            version,
            transitions,
        })
    }
}
