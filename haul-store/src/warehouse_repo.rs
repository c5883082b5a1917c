use async_trait::async_trait;
use chrono::{DateTime, Utc};
use haul_core::{
    ActorRole, CodeSnapshot, CodeState, Destination, Dimensions, LifecycleStatus, Packing,
    PackingStatus, ProcessLogEntry, StoreError, StoreResult, TrackingCode, WarehouseItem,
    WarehouseItemStatus, WarehouseStore, WarehouseTransaction,
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::process_log_repo::insert_log_entry;

const ITEM_COLUMNS: &str = r#"
    w.tracking_code, w.destination_hint, w.length_cm, w.width_cm, w.height_cm,
    w.weight_kg, w.status, w.order_link_id, w.updated_at,
    (SELECT pc.packing_id FROM packing_codes pc
      WHERE pc.tracking_code = w.tracking_code AND pc.active
      LIMIT 1) AS active_packing
"#;

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct WarehouseItemRow {
    tracking_code: String,
    destination_hint: Option<String>,
    length_cm: Option<f64>,
    width_cm: Option<f64>,
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    status: String,
    order_link_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
    active_packing: Option<Uuid>,
}

impl WarehouseItemRow {
    fn into_state(self) -> StoreResult<CodeState> {
        let tracking_code = TrackingCode::parse(&self.tracking_code)
            .ok_or_else(|| StoreError::Corrupt("blank tracking code".to_string()))?;
        let status = WarehouseItemStatus::from_code(&self.status)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let dimensions = match (self.length_cm, self.width_cm, self.height_cm) {
            (Some(length_cm), Some(width_cm), Some(height_cm)) => Some(Dimensions {
                length_cm,
                width_cm,
                height_cm,
            }),
            _ => None,
        };

        Ok(CodeState {
            item: WarehouseItem {
                tracking_code,
                destination_hint: self.destination_hint,
                dimensions,
                weight_kg: self.weight_kg,
                status,
                order_link_id: self.order_link_id,
                updated_at: self.updated_at,
            },
            active_packing: self.active_packing,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PackingRow {
    id: Uuid,
    destination: String,
    status: String,
    created_by: String,
    created_at: DateTime<Utc>,
    dispatched_at: Option<DateTime<Utc>>,
}

/// Maps driver errors onto the storage taxonomy.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(db.message().to_string()),
        _ => StoreError::Unavailable(err.to_string()),
    }
}

fn code_strings(codes: &[TrackingCode]) -> Vec<String> {
    codes.iter().map(|c| c.as_str().to_string()).collect()
}

fn rows_to_snapshot(rows: Vec<WarehouseItemRow>) -> StoreResult<CodeSnapshot> {
    rows.into_iter()
        .map(|row| row.into_state().map(|state| (state.item.tracking_code.clone(), state)))
        .collect()
}

async fn fetch_packing(conn: &mut PgConnection, id: Uuid, for_update: bool) -> StoreResult<Option<Packing>> {
    let query = if for_update {
        "SELECT id, destination, status, created_by, created_at, dispatched_at FROM packings WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT id, destination, status, created_by, created_at, dispatched_at FROM packings WHERE id = $1"
    };

    let row: Option<PackingRow> = sqlx::query_as(query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(store_error)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let codes: Vec<(String,)> = sqlx::query_as(
        "SELECT tracking_code FROM packing_codes WHERE packing_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(store_error)?;

    let tracking_codes = codes
        .into_iter()
        .map(|(c,)| TrackingCode::parse(&c).ok_or_else(|| StoreError::Corrupt("blank tracking code".to_string())))
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(Some(Packing {
        id: row.id,
        destination: Destination::parse(&row.destination).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        tracking_codes,
        status: PackingStatus::from_code(&row.status).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_by: ActorRole::new(row.created_by).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_at: row.created_at,
        dispatched_at: row.dispatched_at,
    }))
}

pub struct PgWarehouseStore {
    pool: PgPool,
}

impl PgWarehouseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Intake-side upsert; the packing workflow never calls this.
    pub async fn upsert_item(&self, item: &WarehouseItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouse_items (tracking_code, destination_hint, length_cm, width_cm, height_cm, weight_kg, status, order_link_id, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (tracking_code) DO UPDATE SET
                destination_hint = EXCLUDED.destination_hint,
                length_cm = EXCLUDED.length_cm,
                width_cm = EXCLUDED.width_cm,
                height_cm = EXCLUDED.height_cm,
                weight_kg = EXCLUDED.weight_kg,
                status = EXCLUDED.status,
                order_link_id = EXCLUDED.order_link_id,
                updated_at = NOW()
            "#,
        )
        .bind(item.tracking_code.as_str())
        .bind(item.destination_hint.as_deref())
        .bind(item.dimensions.map(|d| d.length_cm))
        .bind(item.dimensions.map(|d| d.width_cm))
        .bind(item.dimensions.map(|d| d.height_cm))
        .bind(item.weight_kg)
        .bind(item.status.code())
        .bind(item.order_link_id)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl WarehouseStore for PgWarehouseStore {
    async fn snapshot(&self, codes: &[TrackingCode]) -> StoreResult<CodeSnapshot> {
        let sql = format!(
            "SELECT {} FROM warehouse_items w WHERE w.tracking_code = ANY($1)",
            ITEM_COLUMNS
        );
        let rows: Vec<WarehouseItemRow> = sqlx::query_as(&sql)
            .bind(code_strings(codes))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        rows_to_snapshot(rows)
    }

    async fn get_item(&self, code: &TrackingCode) -> StoreResult<Option<WarehouseItem>> {
        let snapshot = self.snapshot(std::slice::from_ref(code)).await?;
        Ok(snapshot.into_values().next().map(|state| state.item))
    }

    async fn get_packing(&self, id: Uuid) -> StoreResult<Option<Packing>> {
        let mut conn = self.pool.acquire().await.map_err(store_error)?;
        fetch_packing(&mut conn, id, false).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn WarehouseTransaction>> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(PgWarehouseTransaction { tx }))
    }
}

/// Row-locking unit of work. Rolled back by sqlx when dropped uncommitted.
pub struct PgWarehouseTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl WarehouseTransaction for PgWarehouseTransaction {
    async fn lock_codes(&mut self, codes: &[TrackingCode]) -> StoreResult<CodeSnapshot> {
        // Stable lock order keeps overlapping batches from deadlocking
        let sql = format!(
            "SELECT {} FROM warehouse_items w WHERE w.tracking_code = ANY($1) ORDER BY w.tracking_code FOR UPDATE OF w",
            ITEM_COLUMNS
        );
        let rows: Vec<WarehouseItemRow> = sqlx::query_as(&sql)
            .bind(code_strings(codes))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;
        rows_to_snapshot(rows)
    }

    async fn lock_packing(&mut self, id: Uuid) -> StoreResult<Option<Packing>> {
        fetch_packing(&mut self.tx, id, true).await
    }

    async fn insert_packing(&mut self, packing: &Packing) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO packings (id, destination, status, created_by, created_at, dispatched_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(packing.id)
        .bind(packing.destination.as_str())
        .bind(packing.status.code())
        .bind(packing.created_by.as_str())
        .bind(packing.created_at)
        .bind(packing.dispatched_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;

        for (position, code) in packing.tracking_codes.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO packing_codes (packing_id, tracking_code, position, active)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(packing.id)
            .bind(code.as_str())
            .bind(position as i32)
            .bind(packing.is_active())
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        }

        Ok(())
    }

    async fn update_packing_status(
        &mut self,
        id: Uuid,
        status: PackingStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let dispatched_at = (status == PackingStatus::Dispatched).then_some(at);
        let result = sqlx::query(
            "UPDATE packings SET status = $1, dispatched_at = COALESCE($2, dispatched_at) WHERE id = $3",
        )
        .bind(status.code())
        .bind(dispatched_at)
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("packing {}", id)));
        }

        sqlx::query("UPDATE packing_codes SET active = $1 WHERE packing_id = $2")
            .bind(status == PackingStatus::Created)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn update_item_status(
        &mut self,
        code: &TrackingCode,
        status: WarehouseItemStatus,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE warehouse_items SET status = $1, updated_at = NOW() WHERE tracking_code = $2",
        )
        .bind(status.code())
        .bind(code.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(code.to_string()));
        }
        Ok(())
    }

    async fn append_log(&mut self, entry: &ProcessLogEntry) -> StoreResult<()> {
        insert_log_entry(&mut *self.tx, entry).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }
}
