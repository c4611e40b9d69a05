use axum::{extract::State, http::StatusCode};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;
use whereisit::{
    AppError, AppState, InMemoryRepository,
    auth::AuthUser,
    config::AppConfig,
    extract::{Json, Path, Query},
    handlers::{self, OwnerQuery},
    models::{
        CreateItemRequest, Item, ItemStatus, PostType, RecoverItemRequest, UpdateItemRequest,
    },
    repository::Repository,
};

// --- TEST UTILITIES ---

const OWNER: &str = "owner@example.com";
const FINDER: &str = "finder@example.com";

fn create_test_state() -> (AppState, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState {
        repo: repo.clone(),
        config: AppConfig::default(),
    };
    (state, repo)
}

fn user(email: &str) -> AuthUser {
    AuthUser {
        email: email.to_string(),
        name: Some("Test User".to_string()),
    }
}

fn draft(title: &str) -> CreateItemRequest {
    CreateItemRequest {
        post_type: PostType::Lost,
        title: title.to_string(),
        location: "Main hall".to_string(),
        date_lost: Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap(),
        ..CreateItemRequest::default()
    }
}

fn recovery_payload() -> RecoverItemRequest {
    RecoverItemRequest {
        item_id: None,
        recovered_location: "Security office".to_string(),
        recovered_date: Utc.with_ymd_and_hms(2025, 1, 12, 17, 0, 0).unwrap(),
        contact_name: String::new(),
        contact_email: None,
    }
}

async fn seed_item(state: &AppState, owner: &str, title: &str) -> Item {
    let (status, Json(item)) =
        handlers::create_item(user(owner), State(state.clone()), Json(draft(title)))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    item
}

// --- CREATE ---

#[test]
async fn test_create_item_stamps_owner_and_pending_status() {
    let (state, _) = create_test_state();

    let item = seed_item(&state, OWNER, "Backpack").await;

    assert_eq!(item.contact_email, OWNER);
    assert_eq!(item.status, ItemStatus::Pending);
    assert_ne!(item.id, Uuid::nil());
}

#[test]
async fn test_create_item_rejects_foreign_contact_email() {
    let (state, repo) = create_test_state();
    let mut payload = draft("Backpack");
    payload.contact_email = Some("someone-else@example.com".to_string());

    let result = handlers::create_item(user(OWNER), State(state), Json(payload)).await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert!(repo.list_items().await.unwrap().is_empty());
}

#[test]
async fn test_create_item_rejects_blank_title() {
    let (state, _) = create_test_state();

    let result = handlers::create_item(user(OWNER), State(state), Json(draft("   "))).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- READ ---

#[test]
async fn test_get_item_details_not_found() {
    let (state, _) = create_test_state();

    let result =
        handlers::get_item_details(user(OWNER), State(state), Path(Uuid::new_v4())).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_get_item_details_visible_to_any_signed_in_user() {
    let (state, _) = create_test_state();
    let item = seed_item(&state, OWNER, "Scarf").await;

    let Json(found) = handlers::get_item_details(user(FINDER), State(state), Path(item.id))
        .await
        .unwrap();

    assert_eq!(found.id, item.id);
    assert_eq!(found.title, "Scarf");
}

#[test]
async fn test_get_my_items_rejects_foreign_email_query() {
    let (state, _) = create_test_state();
    seed_item(&state, OWNER, "Scarf").await;

    let result = handlers::get_my_items(
        user(FINDER),
        State(state),
        Query(OwnerQuery {
            email: Some(OWNER.to_string()),
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status(), StatusCode::FORBIDDEN);
}

// --- UPDATE ---

#[test]
async fn test_update_item_merges_partial_patch() {
    let (state, _) = create_test_state();
    let item = seed_item(&state, OWNER, "Headphones").await;

    let patch = UpdateItemRequest {
        description: Some("Black, over-ear".to_string()),
        ..UpdateItemRequest::default()
    };
    let Json(updated) =
        handlers::update_item(user(OWNER), State(state), Path(item.id), Json(patch))
            .await
            .unwrap();

    assert_eq!(updated.description, "Black, over-ear");
    assert_eq!(updated.title, "Headphones");
    assert_eq!(updated.location, "Main hall");
}

#[test]
async fn test_update_item_forbidden_for_non_owner() {
    let (state, repo) = create_test_state();
    let item = seed_item(&state, OWNER, "Headphones").await;

    let patch = UpdateItemRequest {
        title: Some("Mine now".to_string()),
        ..UpdateItemRequest::default()
    };
    let result = handlers::update_item(user(FINDER), State(state), Path(item.id), Json(patch)).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::FORBIDDEN);
    let stored = repo.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Headphones");
}

#[test]
async fn test_update_item_cannot_change_status() {
    let (state, _) = create_test_state();
    let item = seed_item(&state, OWNER, "Headphones").await;

    let patch = UpdateItemRequest {
        status: Some(ItemStatus::Recovered),
        ..UpdateItemRequest::default()
    };
    let result = handlers::update_item(user(OWNER), State(state), Path(item.id), Json(patch)).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
async fn test_update_item_accepts_unchanged_status_echo() {
    let (state, _) = create_test_state();
    let item = seed_item(&state, OWNER, "Headphones").await;

    let patch = UpdateItemRequest {
        status: Some(ItemStatus::Pending),
        category: Some("Electronics".to_string()),
        ..UpdateItemRequest::default()
    };
    let Json(updated) =
        handlers::update_item(user(OWNER), State(state), Path(item.id), Json(patch))
            .await
            .unwrap();

    assert_eq!(updated.category, "Electronics");
    assert_eq!(updated.status, ItemStatus::Pending);
}

// --- DELETE ---

#[test]
async fn test_delete_item_success() {
    let (state, repo) = create_test_state();
    let item = seed_item(&state, OWNER, "Umbrella").await;

    let status = handlers::delete_my_item(user(OWNER), State(state), Path(item.id))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(repo.get_item(item.id).await.unwrap().is_none());
}

#[test]
async fn test_delete_item_not_owner() {
    let (state, repo) = create_test_state();
    let item = seed_item(&state, OWNER, "Umbrella").await;

    let result = handlers::delete_my_item(user(FINDER), State(state), Path(item.id)).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::FORBIDDEN);
    assert!(repo.get_item(item.id).await.unwrap().is_some());
}

#[test]
async fn test_delete_item_not_found() {
    let (state, _) = create_test_state();

    let result = handlers::delete_my_item(user(OWNER), State(state), Path(Uuid::new_v4())).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

// --- RECOVERY TRANSITION ---

#[test]
async fn test_recover_item_links_record_and_flips_status() {
    let (state, repo) = create_test_state();
    let item = seed_item(&state, OWNER, "Passport").await;

    let (status, Json(recovered)) = handlers::recover_item(
        user(FINDER),
        State(state.clone()),
        Path(item.id),
        Json(recovery_payload()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(recovered.item_id, item.id);
    assert_eq!(recovered.contact_email, FINDER);
    // Empty contact name falls back to the session's name claim.
    assert_eq!(recovered.contact_name, "Test User");

    let stored = repo.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ItemStatus::Recovered);
    assert_eq!(repo.recoveries_for(item.id).await.len(), 1);
}

#[test]
async fn test_recover_item_twice_conflicts() {
    let (state, repo) = create_test_state();
    let item = seed_item(&state, OWNER, "Passport").await;

    handlers::recover_item(
        user(FINDER),
        State(state.clone()),
        Path(item.id),
        Json(recovery_payload()),
    )
    .await
    .unwrap();

    let second = handlers::recover_item(
        user(OWNER),
        State(state),
        Path(item.id),
        Json(recovery_payload()),
    )
    .await;

    assert_eq!(second.unwrap_err().status(), StatusCode::CONFLICT);
    assert_eq!(repo.recoveries_for(item.id).await.len(), 1);
}

#[test]
async fn test_recover_item_missing_item() {
    let (state, _) = create_test_state();

    let result = handlers::recover_item(
        user(FINDER),
        State(state),
        Path(Uuid::new_v4()),
        Json(recovery_payload()),
    )
    .await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_recover_item_rejects_mismatched_body_id() {
    let (state, repo) = create_test_state();
    let item = seed_item(&state, OWNER, "Passport").await;

    let mut payload = recovery_payload();
    payload.item_id = Some(Uuid::new_v4());
    let result =
        handlers::recover_item(user(FINDER), State(state), Path(item.id), Json(payload)).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::UNPROCESSABLE_ENTITY);
    let stored = repo.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ItemStatus::Pending);
}

#[test]
async fn test_recovered_items_scoped_to_recoverer() {
    let (state, _) = create_test_state();
    let first = seed_item(&state, OWNER, "Passport").await;
    let second = seed_item(&state, OWNER, "Wallet").await;

    handlers::recover_item(
        user(FINDER),
        State(state.clone()),
        Path(first.id),
        Json(recovery_payload()),
    )
    .await
    .unwrap();
    let mut later = recovery_payload();
    later.recovered_date = later.recovered_date + Duration::days(1);
    handlers::recover_item(user(OWNER), State(state.clone()), Path(second.id), Json(later))
        .await
        .unwrap();

    let Json(mine) = handlers::get_recovered_items(
        user(FINDER),
        State(state),
        Query(OwnerQuery { email: None }),
    )
    .await
    .unwrap();

    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].item_id, first.id);
}
