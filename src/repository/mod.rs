use crate::{
    error::RepoError,
    models::{CreateItemRequest, Item, NewRecovery, RecoveredItem, UpdateItemRequest},
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Number of items returned by the "recent items" listing.
pub const RECENT_ITEMS_LIMIT: i64 = 6;

/// Repository Trait
///
/// The persistence contract for both logical collections (`items`, `recovered_items`) and
/// the transition that links them. Handlers only ever see `Arc<dyn Repository>`, so the
/// Postgres and in-memory backends are interchangeable.
///
/// None of these methods check ownership; that is decided at the handler boundary.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Items ---

    /// Inserts a new `pending` item owned by `contact_email`. No field validation here.
    async fn create_item(
        &self,
        req: CreateItemRequest,
        contact_email: &str,
    ) -> Result<Item, RepoError>;
    /// Every item, unordered.
    async fn list_items(&self) -> Result<Vec<Item>, RepoError>;
    /// Items by `date_lost` descending, truncated to `limit`. Each call is a fresh query.
    async fn list_recent_items(&self, limit: i64) -> Result<Vec<Item>, RepoError>;
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, RepoError>;
    /// Partial merge: only the `Some` fields of `req` are written. `None` if no such item.
    async fn update_item(
        &self,
        id: Uuid,
        req: UpdateItemRequest,
    ) -> Result<Option<Item>, RepoError>;
    /// Items whose `contact_email` equals `email` exactly, newest `date_lost` first (ties:
    /// newest post first).
    async fn list_items_by_owner(&self, email: &str) -> Result<Vec<Item>, RepoError>;
    /// Returns true if a row was deleted.
    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError>;

    // --- Recoveries ---

    /// Recovery records whose `contact_email` equals `email` exactly.
    async fn list_recoveries_by_owner(&self, email: &str)
    -> Result<Vec<RecoveredItem>, RepoError>;

    // --- Recovery Transition ---

    /// Atomically inserts the recovery record and flips the item to `recovered`.
    ///
    /// Fails with `NotFound` if the item does not exist and `AlreadyRecovered` if it was
    /// recovered before; in both cases nothing is written.
    async fn recover_item(
        &self,
        item_id: Uuid,
        recovery: NewRecovery,
    ) -> Result<RecoveredItem, RepoError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
