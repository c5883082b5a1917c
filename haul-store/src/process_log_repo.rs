use async_trait::async_trait;
use chrono::{DateTime, Utc};
use haul_core::{
    ActionCode, ActorRole, ProcessLogEntry, ProcessLogRepository, StatusDomain, StoreError,
    StoreResult, Subject, TransitionDetail,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::warehouse_repo::store_error;

#[derive(sqlx::FromRow)]
struct ProcessLogRow {
    id: Uuid,
    action: String,
    actor_role: String,
    subject_domain: String,
    subject_id: String,
    transition_from: Option<String>,
    transition_to: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<ProcessLogRow> for ProcessLogEntry {
    type Error = StoreError;

    fn try_from(row: ProcessLogRow) -> Result<Self, Self::Error> {
        let action = ActionCode::from_code(&row.action)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown action {}", row.action)))?;
        let domain: StatusDomain = row.subject_domain.parse().map_err(StoreError::Corrupt)?;
        let actor_role = ActorRole::new(row.actor_role).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let transition = row
            .transition_to
            .map(|to| TransitionDetail { from: row.transition_from, to });

        Ok(ProcessLogEntry {
            id: row.id,
            action,
            actor_role,
            subject: Subject::new(domain, row.subject_id),
            transition,
            recorded_at: row.recorded_at,
        })
    }
}

/// Shared by the standalone repository and by warehouse transactions so both
/// paths write identical rows.
pub(crate) async fn insert_log_entry<'e, E>(executor: E, entry: &ProcessLogEntry) -> StoreResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO process_log (id, action, actor_role, subject_domain, subject_id, transition_from, transition_to, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry.id)
    .bind(entry.action.as_str())
    .bind(entry.actor_role.as_str())
    .bind(entry.subject.domain.as_str())
    .bind(entry.subject.id.as_str())
    .bind(entry.transition.as_ref().and_then(|t| t.from.as_deref()))
    .bind(entry.transition.as_ref().map(|t| t.to.as_str()))
    .bind(entry.recorded_at)
    .execute(executor)
    .await
    .map_err(store_error)?;
    Ok(())
}

pub struct PgProcessLogRepository {
    pool: PgPool,
}

impl PgProcessLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessLogRepository for PgProcessLogRepository {
    async fn append(&self, entry: &ProcessLogEntry) -> StoreResult<()> {
        insert_log_entry(&self.pool, entry).await
    }

    async fn history(&self, subject: &Subject) -> StoreResult<Vec<ProcessLogEntry>> {
        let rows: Vec<ProcessLogRow> = sqlx::query_as(
            r#"
            SELECT id, action, actor_role, subject_domain, subject_id, transition_from, transition_to, recorded_at
            FROM process_log
            WHERE subject_domain = $1 AND subject_id = $2
            ORDER BY seq
            "#,
        )
        .bind(subject.domain.as_str())
        .bind(subject.id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(ProcessLogEntry::try_from).collect()
    }
}
