//! Database operations for `shop_requests`, including the approval
//! transaction.

use chrono::{DateTime, Utc};
use harmony_core::{
    CoreError, ReviewDecision, Shop, ShopRequest, ShopRequestStatus, DEFAULT_CLOSE_TIME,
    DEFAULT_OPEN_TIME,
};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::shops::{insert_shop, NewShop};
use crate::{is_unique_violation, DbError};

const ONE_PENDING_CONSTRAINT: &str = "shop_requests_one_pending_per_user";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
struct ShopRequestRow {
    id: Uuid,
    user_id: Uuid,
    shop_name: String,
    description: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    province: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status: String,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ShopRequestRow {
    fn into_request(self) -> Result<ShopRequest, DbError> {
        Ok(ShopRequest {
            id: self.id,
            user_id: self.user_id,
            shop_name: self.shop_name,
            description: self.description,
            address: self.address,
            phone: self.phone,
            province: self.province,
            latitude: self.latitude,
            longitude: self.longitude,
            status: self.status.parse()?,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    request: ShopRequestRow,
    requester_name: String,
    requester_email: String,
}

/// A request joined with the requester's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct ShopRequestListing {
    #[serde(flatten)]
    pub request: ShopRequest,
    pub requester_name: String,
    pub requester_email: String,
}

#[derive(Debug, Clone)]
pub struct NewShopRequest {
    pub shop_name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub coordinates: Option<(f64, f64)>,
}

/// Result of a committed approval.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub request: ShopRequest,
    pub shop: Shop,
}

const REQUEST_COLUMNS: &str = "id, user_id, shop_name, description, address, phone, province, \
     latitude, longitude, status, reviewed_by, reviewed_at, created_at";

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Submits a pending request for `user_id`.
///
/// # Errors
///
/// Returns [`DbError::PendingRequestExists`] if the user already has a
/// pending request, or [`DbError::Sqlx`] on other failures.
pub async fn create_shop_request(
    pool: &PgPool,
    user_id: Uuid,
    new: &NewShopRequest,
) -> Result<ShopRequest, DbError> {
    let (latitude, longitude) = new.coordinates.unzip();
    let row = sqlx::query_as::<_, ShopRequestRow>(&format!(
        "INSERT INTO shop_requests \
             (user_id, shop_name, description, address, phone, province, latitude, longitude) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {REQUEST_COLUMNS}"
    ))
    .bind(user_id)
    .bind(new.shop_name.trim())
    .bind(new.description.as_deref())
    .bind(new.address.as_deref())
    .bind(new.phone.as_deref())
    .bind(new.province.as_deref())
    .bind(latitude)
    .bind(longitude)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e, ONE_PENDING_CONSTRAINT) {
            DbError::PendingRequestExists { user_id }
        } else {
            DbError::Sqlx(e)
        }
    })?;

    row.into_request()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_shop_request(pool: &PgPool, id: Uuid) -> Result<Option<ShopRequest>, DbError> {
    let row = sqlx::query_as::<_, ShopRequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM shop_requests WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(ShopRequestRow::into_request).transpose()
}

/// All requests newest first, optionally filtered by status, with requester
/// name and email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shop_requests(
    pool: &PgPool,
    status: Option<ShopRequestStatus>,
) -> Result<Vec<ShopRequestListing>, DbError> {
    let rows = sqlx::query_as::<_, ListingRow>(
        "SELECT r.id, r.user_id, r.shop_name, r.description, r.address, r.phone, r.province, \
                r.latitude, r.longitude, r.status, r.reviewed_by, r.reviewed_at, r.created_at, \
                u.name AS requester_name, u.email AS requester_email \
         FROM shop_requests r \
         JOIN users u ON u.id = r.user_id \
         WHERE ($1::text IS NULL OR r.status = $1) \
         ORDER BY r.created_at DESC",
    )
    .bind(status.map(ShopRequestStatus::as_str))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(ShopRequestListing {
                request: row.request.into_request()?,
                requester_name: row.requester_name,
                requester_email: row.requester_email,
            })
        })
        .collect()
}

/// A user's own requests, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shop_requests_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ShopRequest>, DbError> {
    let rows = sqlx::query_as::<_, ShopRequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM shop_requests WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(ShopRequestRow::into_request).collect()
}

/// Approves a pending request.
///
/// In one transaction: marks the request approved with reviewer and
/// timestamp, promotes the requester to `admin` (a superadmin keeps its
/// role), and creates an approved shop from the request. If any step fails
/// nothing is committed and the request stays pending.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the request does not exist,
/// [`DbError::InvalidShopRequestTransition`] if it is not pending, or
/// [`DbError::Sqlx`] if any write fails.
pub async fn approve_shop_request(
    pool: &PgPool,
    id: Uuid,
    reviewer_id: Uuid,
) -> Result<ApprovalOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let current = lock_request(&mut *tx, id).await?;
    check_transition(&current, ReviewDecision::Approve)?;

    let request = mark_reviewed(&mut *tx, id, ShopRequestStatus::Approved, reviewer_id).await?;

    sqlx::query(
        "UPDATE users SET role = 'admin', updated_at = NOW() \
         WHERE id = $1 AND role = 'user'",
    )
    .bind(request.user_id)
    .execute(&mut *tx)
    .await?;

    let shop = insert_shop(
        &mut *tx,
        &NewShop {
            owner_id: request.user_id,
            name: &request.shop_name,
            description: request.description.as_deref(),
            address: request.address.as_deref(),
            phone: request.phone.as_deref(),
            province: request.province.as_deref(),
            open_time: DEFAULT_OPEN_TIME,
            close_time: DEFAULT_CLOSE_TIME,
            coordinates: request.shop_coordinates(),
            is_approved: true,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        request_id = %id,
        reviewer_id = %reviewer_id,
        shop_id = %shop.id,
        "shop request approved"
    );

    Ok(ApprovalOutcome {
        request,
        shop: shop.into(),
    })
}

/// Rejects a pending request.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the request does not exist,
/// [`DbError::InvalidShopRequestTransition`] if it is not pending, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn reject_shop_request(
    pool: &PgPool,
    id: Uuid,
    reviewer_id: Uuid,
) -> Result<ShopRequest, DbError> {
    let mut tx = pool.begin().await?;

    let current = lock_request(&mut *tx, id).await?;
    check_transition(&current, ReviewDecision::Reject)?;
    let request = mark_reviewed(&mut *tx, id, ShopRequestStatus::Rejected, reviewer_id).await?;

    tx.commit().await?;

    tracing::info!(request_id = %id, reviewer_id = %reviewer_id, "shop request rejected");
    Ok(request)
}

async fn lock_request(conn: &mut PgConnection, id: Uuid) -> Result<ShopRequest, DbError> {
    sqlx::query_as::<_, ShopRequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM shop_requests WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFound)?
    .into_request()
}

fn check_transition(request: &ShopRequest, decision: ReviewDecision) -> Result<(), DbError> {
    match request.status.review(decision) {
        Ok(_) => Ok(()),
        Err(CoreError::RequestAlreadyReviewed { current }) => {
            Err(DbError::InvalidShopRequestTransition {
                id: request.id,
                current,
            })
        }
        Err(other) => Err(other.into()),
    }
}

async fn mark_reviewed(
    conn: &mut PgConnection,
    id: Uuid,
    status: ShopRequestStatus,
    reviewer_id: Uuid,
) -> Result<ShopRequest, DbError> {
    let row = sqlx::query_as::<_, ShopRequestRow>(&format!(
        "UPDATE shop_requests \
         SET status = $2, reviewed_by = $3, reviewed_at = NOW() \
         WHERE id = $1 AND status = 'pending' \
         RETURNING {REQUEST_COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(reviewer_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => row.into_request(),
        None => Err(DbError::NotFound),
    }
}
