use super::Repository;
use crate::{
    error::RepoError,
    models::{CreateItemRequest, Item, ItemStatus, NewRecovery, RecoveredItem, UpdateItemRequest},
};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. Holds the process-wide pool, which `main`
/// creates at startup and closes on shutdown.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// insert_recovery
///
/// Writes one `recovered_items` row on the caller's connection (always a transaction:
/// the only caller is the recovery transition). A unique-index hit on `item_id` means a
/// concurrent recovery won the race.
async fn insert_recovery(
    conn: &mut PgConnection,
    item_id: Uuid,
    recovery: &NewRecovery,
) -> Result<RecoveredItem, RepoError> {
    sqlx::query_as::<_, RecoveredItem>(
        r#"
        INSERT INTO recovered_items
            (id, item_id, recovered_location, recovered_date, contact_name, contact_email, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING id, item_id, recovered_location, recovered_date, contact_name, contact_email, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(item_id)
    .bind(&recovery.recovered_location)
    .bind(recovery.recovered_date)
    .bind(&recovery.contact_name)
    .bind(&recovery.contact_email)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::AlreadyRecovered,
        other => RepoError::from(other),
    })
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_item
    ///
    /// New items are always inserted as `pending`.
    async fn create_item(
        &self,
        req: CreateItemRequest,
        contact_email: &str,
    ) -> Result<Item, RepoError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items
                (id, post_type, thumbnail, title, description, category, location,
                 date_lost, contact_name, contact_email, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', NOW(), NOW())
            RETURNING id, post_type, thumbnail, title, description, category, location,
                      date_lost, contact_name, contact_email, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.post_type)
        .bind(req.thumbnail)
        .bind(req.title)
        .bind(req.description)
        .bind(req.category)
        .bind(req.location)
        .bind(req.date_lost)
        .bind(req.contact_name)
        .bind(contact_email)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
        let items = sqlx::query_as::<_, Item>(
            r#"SELECT id, post_type, thumbnail, title, description, category, location,
                      date_lost, contact_name, contact_email, status, created_at, updated_at
               FROM items"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// list_recent_items
    ///
    /// Ties on `date_lost` are broken by insertion time so the page is stable.
    async fn list_recent_items(&self, limit: i64) -> Result<Vec<Item>, RepoError> {
        let items = sqlx::query_as::<_, Item>(
            r#"SELECT id, post_type, thumbnail, title, description, category, location,
                      date_lost, contact_name, contact_email, status, created_at, updated_at
               FROM items
               ORDER BY date_lost DESC, created_at DESC
               LIMIT $1"#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, RepoError> {
        let item = sqlx::query_as::<_, Item>(
            r#"SELECT id, post_type, thumbnail, title, description, category, location,
                      date_lost, contact_name, contact_email, status, created_at, updated_at
               FROM items
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// update_item
    ///
    /// `COALESCE` keeps the stored value for every field the patch leaves out.
    /// `status` is never written here.
    async fn update_item(
        &self,
        id: Uuid,
        req: UpdateItemRequest,
    ) -> Result<Option<Item>, RepoError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET post_type = COALESCE($2, post_type),
                thumbnail = COALESCE($3, thumbnail),
                title = COALESCE($4, title),
                description = COALESCE($5, description),
                category = COALESCE($6, category),
                location = COALESCE($7, location),
                date_lost = COALESCE($8, date_lost),
                contact_name = COALESCE($9, contact_name),
                contact_email = COALESCE($10, contact_email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, post_type, thumbnail, title, description, category, location,
                      date_lost, contact_name, contact_email, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(req.post_type)
        .bind(req.thumbnail)
        .bind(req.title)
        .bind(req.description)
        .bind(req.category)
        .bind(req.location)
        .bind(req.date_lost)
        .bind(req.contact_name)
        .bind(req.contact_email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_items_by_owner(&self, email: &str) -> Result<Vec<Item>, RepoError> {
        let items = sqlx::query_as::<_, Item>(
            r#"SELECT id, post_type, thumbnail, title, description, category, location,
                      date_lost, contact_name, contact_email, status, created_at, updated_at
               FROM items
               WHERE contact_email = $1
               ORDER BY date_lost DESC, created_at DESC"#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_recoveries_by_owner(
        &self,
        email: &str,
    ) -> Result<Vec<RecoveredItem>, RepoError> {
        let recoveries = sqlx::query_as::<_, RecoveredItem>(
            r#"SELECT id, item_id, recovered_location, recovered_date, contact_name, contact_email, created_at
               FROM recovered_items
               WHERE contact_email = $1
               ORDER BY recovered_date DESC"#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(recoveries)
    }

    /// recover_item
    ///
    /// Runs in one transaction. `FOR UPDATE` serializes concurrent recoveries of the same
    /// item; any early return drops the transaction, which rolls it back.
    async fn recover_item(
        &self,
        item_id: Uuid,
        recovery: NewRecovery,
    ) -> Result<RecoveredItem, RepoError> {
        let mut tx = self.pool.begin().await?;

        let status = sqlx::query_scalar::<_, ItemStatus>(
            "SELECT status FROM items WHERE id = $1 FOR UPDATE",
        )
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        match status {
            None => return Err(RepoError::NotFound),
            Some(ItemStatus::Recovered) => return Err(RepoError::AlreadyRecovered),
            Some(ItemStatus::Pending) => {}
        }

        let recovered = insert_recovery(&mut *tx, item_id, &recovery).await?;

        sqlx::query("UPDATE items SET status = 'recovered', updated_at = NOW() WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(recovered)
    }
}
