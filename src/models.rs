use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations (Postgres enum types) ---

/// PostType
///
/// Whether the reporter lost the item or found it. Stored as the `post_type` enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "post_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostType {
    #[default]
    #[serde(alias = "Lost")]
    Lost,
    #[serde(alias = "Found")]
    Found,
}

/// ItemStatus
///
/// Lifecycle of a post. Starts at `Pending` and moves to `Recovered` exactly once,
/// through the recovery transition. There is no way back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "item_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ItemStatus {
    #[default]
    Pending,
    Recovered,
}

// --- Core Records (Mapped to Database) ---

/// Item
///
/// A lost-or-found post from the `items` table. `contact_email` is the ownership key:
/// "my items" and every owner-only mutation compare it against the session subject.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Item {
    pub id: Uuid,
    pub post_type: PostType,
    // URI of the uploaded picture; the service never dereferences it.
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    /// Date of the loss (or find). Drives the recency ordering of `/recentItems`.
    #[ts(type = "string")]
    pub date_lost: DateTime<Utc>,
    pub contact_name: String,
    pub contact_email: String,
    pub status: ItemStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Exact, case-sensitive comparison against the ownership key.
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.contact_email == email
    }
}

/// RecoveredItem
///
/// A row of `recovered_items`: proof that the item `item_id` was recovered, and by whom.
/// Created once by the recovery transition and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecoveredItem {
    pub id: Uuid,
    // Soft reference to items.id, maintained by the application.
    pub item_id: Uuid,
    pub recovered_location: String,
    #[ts(type = "string")]
    pub recovered_date: DateTime<Utc>,
    pub contact_name: String,
    // The subject who performed the recovery; owner key for "my recoveries".
    pub contact_email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateItemRequest
///
/// Input payload for posting a new item (POST /items). New items always start `pending`.
/// `contact_email` may be omitted; the handler stamps the session subject either way.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateItemRequest {
    pub post_type: PostType,
    #[serde(default)]
    pub thumbnail: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[ts(type = "string")]
    pub date_lost: DateTime<Utc>,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

/// UpdateItemRequest
///
/// Partial update payload (PATCH /items/{id}). Every whitelisted field is optional and
/// omitted fields keep their stored value. Unknown fields are rejected.
///
/// `status` is accepted so clients can echo the full record back, but it can't be used
/// to change the status.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[ts(export)]
pub struct UpdateItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_type: Option<PostType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub date_lost: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// RecoverItemRequest
///
/// Input payload for the recovery transition (POST /items/{id}). `item_id` is optional;
/// when present it must match the id in the path.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecoverItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<Uuid>,
    pub recovered_location: String,
    #[ts(type = "string")]
    pub recovered_date: DateTime<Utc>,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

/// NewRecovery
///
/// The resolved recovery record handed to the repository: identity already checked
/// and stamped by the handler.
#[derive(Debug, Clone, Default)]
pub struct NewRecovery {
    pub recovered_location: String,
    pub recovered_date: DateTime<Utc>,
    pub contact_name: String,
    pub contact_email: String,
}

/// TokenRequest
///
/// Identity payload for POST /jwt. Only `email` is required; it becomes the token subject.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// --- Output Schemas ---

/// SessionAck
///
/// Body returned by the session endpoints (POST /jwt, POST /logout).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionAck {
    pub success: bool,
}
