use super::Repository;
use crate::{
    error::RepoError,
    models::{CreateItemRequest, Item, ItemStatus, NewRecovery, RecoveredItem, UpdateItemRequest},
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Collections {
    // Insertion order, like a heap table.
    items: Vec<Item>,
    recoveries: Vec<RecoveredItem>,
}

/// InMemoryRepository
///
/// A `Repository` over process memory, used by the test suites. Both collections sit
/// behind one lock, so the recovery transition is atomic here too.
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<Collections>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recovery record pointing at `item_id`.
    pub async fn recoveries_for(&self, item_id: Uuid) -> Vec<RecoveredItem> {
        let state = self.state.read().await;
        state
            .recoveries
            .iter()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect()
    }
}

/// Sorts by `date_lost` descending, newest insert first on ties.
fn sort_recent_first(items: &mut [Item]) {
    items.sort_by(|a, b| {
        b.date_lost
            .cmp(&a.date_lost)
            .then(b.created_at.cmp(&a.created_at))
    });
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_item(
        &self,
        req: CreateItemRequest,
        contact_email: &str,
    ) -> Result<Item, RepoError> {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            post_type: req.post_type,
            thumbnail: req.thumbnail,
            title: req.title,
            description: req.description,
            category: req.category,
            location: req.location,
            date_lost: req.date_lost,
            contact_name: req.contact_name,
            contact_email: contact_email.to_string(),
            status: ItemStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.items.push(item.clone());
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
        Ok(self.state.read().await.items.clone())
    }

    async fn list_recent_items(&self, limit: i64) -> Result<Vec<Item>, RepoError> {
        let mut items = self.state.read().await.items.clone();
        sort_recent_first(&mut items);
        items.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(items)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, RepoError> {
        let state = self.state.read().await;
        Ok(state.items.iter().find(|item| item.id == id).cloned())
    }

    async fn update_item(
        &self,
        id: Uuid,
        req: UpdateItemRequest,
    ) -> Result<Option<Item>, RepoError> {
        let mut state = self.state.write().await;
        let Some(item) = state.items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };

        if let Some(post_type) = req.post_type {
            item.post_type = post_type;
        }
        if let Some(thumbnail) = req.thumbnail {
            item.thumbnail = thumbnail;
        }
        if let Some(title) = req.title {
            item.title = title;
        }
        if let Some(description) = req.description {
            item.description = description;
        }
        if let Some(category) = req.category {
            item.category = category;
        }
        if let Some(location) = req.location {
            item.location = location;
        }
        if let Some(date_lost) = req.date_lost {
            item.date_lost = date_lost;
        }
        if let Some(contact_name) = req.contact_name {
            item.contact_name = contact_name;
        }
        if let Some(contact_email) = req.contact_email {
            item.contact_email = contact_email;
        }
        item.updated_at = Utc::now();

        Ok(Some(item.clone()))
    }

    async fn list_items_by_owner(&self, email: &str) -> Result<Vec<Item>, RepoError> {
        let mut items: Vec<Item> = self
            .state
            .read()
            .await
            .items
            .iter()
            .filter(|item| item.is_owned_by(email))
            .cloned()
            .collect();
        sort_recent_first(&mut items);
        Ok(items)
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.items.len();
        state.items.retain(|item| item.id != id);
        Ok(state.items.len() < before)
    }

    async fn list_recoveries_by_owner(
        &self,
        email: &str,
    ) -> Result<Vec<RecoveredItem>, RepoError> {
        let mut recoveries: Vec<RecoveredItem> = self
            .state
            .read()
            .await
            .recoveries
            .iter()
            .filter(|r| r.contact_email == email)
            .cloned()
            .collect();
        recoveries.sort_by(|a, b| b.recovered_date.cmp(&a.recovered_date));
        Ok(recoveries)
    }

    /// recover_item
    ///
    /// Both writes happen under a single write guard; checks run before anything is
    /// mutated, so a rejected call leaves both collections untouched.
    async fn recover_item(
        &self,
        item_id: Uuid,
        recovery: NewRecovery,
    ) -> Result<RecoveredItem, RepoError> {
        let mut state = self.state.write().await;

        let index = state
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(RepoError::NotFound)?;

        if state.items[index].status == ItemStatus::Recovered
            || state.recoveries.iter().any(|r| r.item_id == item_id)
        {
            return Err(RepoError::AlreadyRecovered);
        }

        let now = Utc::now();
        let recovered = RecoveredItem {
            id: Uuid::new_v4(),
            item_id,
            recovered_location: recovery.recovered_location,
            recovered_date: recovery.recovered_date,
            contact_name: recovery.contact_name,
            contact_email: recovery.contact_email,
            created_at: now,
        };
        state.recoveries.push(recovered.clone());

        let item = &mut state.items[index];
        item.status = ItemStatus::Recovered;
        item.updated_at = now;

        Ok(recovered)
    }
}
