use crate::{
    AppState,
    auth::{self, AuthUser},
    config::AppConfig,
    error::{AppError, ErrorResponse},
    extract::{Json, Path, Query},
    models::{
        CreateItemRequest, Item, NewRecovery, RecoverItemRequest, RecoveredItem, SessionAck,
        TokenRequest, UpdateItemRequest,
    },
    repository::RECENT_ITEMS_LIMIT,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// OwnerQuery
///
/// Legacy `?email=` parameter of the "my" listings. The listing itself is always scoped to
/// the session subject; the parameter may only repeat it.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct OwnerQuery {
    /// Must equal the authenticated email when given.
    pub email: Option<String>,
}

// --- Helpers ---

/// Resolves the owner key for a "my" listing.
fn scoped_owner<'a>(user: &'a AuthUser, query: &OwnerQuery) -> Result<&'a str, AppError> {
    match query.email.as_deref() {
        Some(email) if email != user.email => Err(AppError::Forbidden(
            "email does not match the signed-in user".to_string(),
        )),
        _ => Ok(user.email.as_str()),
    }
}

/// Owner-only check for mutations of an existing item.
fn ensure_owner(item: &Item, user: &AuthUser) -> Result<(), AppError> {
    if item.is_owned_by(&user.email) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "only the item's owner can change it".to_string(),
        ))
    }
}

/// An explicit contact email in a payload must name the session subject.
fn ensure_same_subject(claimed: Option<&str>, user: &AuthUser) -> Result<(), AppError> {
    match claimed {
        Some(email) if email != user.email => Err(AppError::Forbidden(
            "contactEmail must be the signed-in user's email".to_string(),
        )),
        _ => Ok(()),
    }
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

// --- Session Handlers ---

/// issue_session
///
/// [Public Route] Signs a 5-hour token for the posted identity and sets it as the
/// HTTP-only `token` cookie.
#[utoipa::path(
    post,
    path = "/jwt",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Session cookie set", body = SessionAck),
        (status = 422, description = "Missing or malformed email", body = ErrorResponse)
    )
)]
pub async fn issue_session(
    State(config): State<AppConfig>,
    jar: CookieJar,
    Json(mut identity): Json<TokenRequest>,
) -> Result<(CookieJar, Json<SessionAck>), AppError> {
    // The subject must match stored emails and `?email=` exactly.
    identity.email = identity.email.trim().to_string();
    if !looks_like_email(&identity.email) {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }

    let token = auth::issue_token(&config.jwt_secret, &identity).map_err(|e| {
        tracing::error!("failed to sign session token: {:?}", e);
        AppError::Internal
    })?;

    tracing::debug!(subject = %identity.email, "session issued");
    let jar = jar.add(auth::session_cookie(&config, token));
    Ok((jar, Json(SessionAck { success: true })))
}

/// end_session
///
/// [Public Route] Clears the session cookie. Succeeds whether or not a session exists.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Session cookie cleared", body = SessionAck))
)]
pub async fn end_session(
    State(config): State<AppConfig>,
    jar: CookieJar,
) -> (CookieJar, Json<SessionAck>) {
    // Always sent, even without a session cookie on the request.
    let mut removal = auth::session_cookie(&config, String::new());
    removal.make_removal();
    (jar.add(removal), Json(SessionAck { success: true }))
}

// --- Item Handlers ---

/// create_item
///
/// [Authenticated Route] Posts a new lost/found item. The item is owned by the session
/// subject and starts `pending`.
#[utoipa::path(
    post,
    path = "/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Created", body = Item),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "contactEmail is not the session subject", body = ErrorResponse),
        (status = 422, description = "Invalid draft", body = ErrorResponse)
    )
)]
pub async fn create_item(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    ensure_same_subject(payload.contact_email.as_deref(), &user)?;
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }

    let item = state.repo.create_item(payload, &user.email).await?;
    tracing::info!(item_id = %item.id, owner = %item.contact_email, "item posted");
    Ok((StatusCode::CREATED, Json(item)))
}

/// get_items
///
/// [Public Route] Every posted item, for general browsing.
#[utoipa::path(
    get,
    path = "/items",
    responses((status = 200, description = "All items", body = [Item]))
)]
pub async fn get_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(state.repo.list_items().await?))
}

/// get_recent_items
///
/// [Public Route] The six items with the latest `dateLost`.
#[utoipa::path(
    get,
    path = "/recentItems",
    responses((status = 200, description = "Most recent items", body = [Item]))
)]
pub async fn get_recent_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(state.repo.list_recent_items(RECENT_ITEMS_LIMIT).await?))
}

/// get_item_details
///
/// [Authenticated Route] A single item by id.
#[utoipa::path(
    get,
    path = "/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Found", body = Item),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_item_details(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, AppError> {
    state
        .repo
        .get_item(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("item"))
}

/// update_item
///
/// [Authenticated Route] Partial update of an item by its owner. Fields left out of the
/// patch keep their value; `status` can only be echoed unchanged.
#[utoipa::path(
    patch,
    path = "/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated", body = Item),
        (status = 400, description = "Malformed id or unreadable body", body = ErrorResponse),
        (status = 403, description = "Not Owner", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 422, description = "Unknown field, or status change attempted", body = ErrorResponse)
    )
)]
pub async fn update_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<Item>, AppError> {
    let existing = state
        .repo
        .get_item(id)
        .await?
        .ok_or(AppError::NotFound("item"))?;
    ensure_owner(&existing, &user)?;

    if payload.status.is_some_and(|status| status != existing.status) {
        return Err(AppError::Validation(
            "status only changes through recovery".to_string(),
        ));
    }
    if payload.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if let Some(email) = payload.contact_email.as_deref() {
        if !looks_like_email(email) {
            return Err(AppError::Validation(
                "contactEmail must be an email address".to_string(),
            ));
        }
    }

    // Last write wins; the item may have been deleted since the ownership check.
    state
        .repo
        .update_item(id, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("item"))
}

/// get_my_items
///
/// [Authenticated Route] Items owned by the session subject.
#[utoipa::path(
    get,
    path = "/myItems",
    params(OwnerQuery),
    responses(
        (status = 200, description = "My Items", body = [Item]),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "email is not the session subject", body = ErrorResponse)
    )
)]
pub async fn get_my_items(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Item>>, AppError> {
    let owner = scoped_owner(&user, &query)?;
    Ok(Json(state.repo.list_items_by_owner(owner).await?))
}

/// delete_my_item
///
/// [Authenticated Route] Deletes one of the subject's own items. Recovery records that
/// point at it are kept.
#[utoipa::path(
    delete,
    path = "/myItems/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 403, description = "Not Owner", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_my_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let existing = state
        .repo
        .get_item(id)
        .await?
        .ok_or(AppError::NotFound("item"))?;
    ensure_owner(&existing, &user)?;

    if state.repo.delete_item(id).await? {
        tracing::info!(item_id = %id, "item deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("item"))
    }
}

// --- Recovery Handlers ---

/// recover_item
///
/// [Authenticated Route] The recovery transition: records who recovered the item, where
/// and when, and marks the item `recovered`, in one atomic step. A second recovery of the
/// same item is rejected with 409.
#[utoipa::path(
    post,
    path = "/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = RecoverItemRequest,
    responses(
        (status = 201, description = "Recovered", body = RecoveredItem),
        (status = 400, description = "Malformed id or unreadable body", body = ErrorResponse),
        (status = 403, description = "contactEmail is not the session subject", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 409, description = "Already recovered", body = ErrorResponse),
        (status = 422, description = "Body itemId disagrees with path", body = ErrorResponse)
    )
)]
pub async fn recover_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecoverItemRequest>,
) -> Result<(StatusCode, Json<RecoveredItem>), AppError> {
    if payload.item_id.is_some_and(|body_id| body_id != id) {
        return Err(AppError::Validation(
            "itemId does not match the item in the path".to_string(),
        ));
    }
    ensure_same_subject(payload.contact_email.as_deref(), &user)?;
    if payload.recovered_location.trim().is_empty() {
        return Err(AppError::Validation(
            "recoveredLocation must not be empty".to_string(),
        ));
    }

    let contact_name = if payload.contact_name.is_empty() {
        user.name.clone().unwrap_or_default()
    } else {
        payload.contact_name
    };
    let recovery = NewRecovery {
        recovered_location: payload.recovered_location,
        recovered_date: payload.recovered_date,
        contact_name,
        contact_email: user.email.clone(),
    };

    let recovered = state.repo.recover_item(id, recovery).await.map_err(|e| {
        tracing::warn!(item_id = %id, "recovery rejected: {}", e);
        AppError::from(e)
    })?;

    tracing::info!(
        item_id = %id,
        recovery_id = %recovered.id,
        recovered_by = %recovered.contact_email,
        "item recovered"
    );
    Ok((StatusCode::CREATED, Json(recovered)))
}

/// get_recovered_items
///
/// [Authenticated Route] Recovery records made by the session subject.
#[utoipa::path(
    get,
    path = "/recoveredItems",
    params(OwnerQuery),
    responses(
        (status = 200, description = "My Recoveries", body = [RecoveredItem]),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "email is not the session subject", body = ErrorResponse)
    )
)]
pub async fn get_recovered_items(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<RecoveredItem>>, AppError> {
    let owner = scoped_owner(&user, &query)?;
    Ok(Json(state.repo.list_recoveries_by_owner(owner).await?))
}
