use crate::database::{model::access_event::AccessEventRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    access::{
        event::{AccessEventRange, RecordAccess},
        AccessEvent,
    },
    id::AccessEventId,
};
use kernel::repository::access_event::AccessEventRepository;
use shared::error::{AppError, AppResult};
use sqlx::PgConnection;

#[derive(new)]
pub struct AccessEventRepositoryImpl {
    db: ConnectionPool,
}

// 他のリポジトリのトランザクション内からも追記できるよう接続を受け取る
pub(crate) async fn insert_access_event(
    conn: &mut PgConnection,
    event: &RecordAccess,
) -> AppResult<AccessEventId> {
    let access_event_id = AccessEventId::new();
    let res = sqlx::query(
        r#"
            INSERT INTO access_events
            (access_event_id, occurred_at, subject_kind, subject_id,
            method, success, details, vehicle_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(access_event_id)
    .bind(event.occurred_at)
    .bind(event.subject_kind.as_ref())
    .bind(event.subject_id)
    .bind(event.method.as_ref())
    .bind(event.success)
    .bind(&event.details)
    .bind(event.vehicle_id)
    .execute(conn)
    .await
    .map_err(AppError::from_query)?;

    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(
            "No access event record has been created".into(),
        ));
    }
    Ok(access_event_id)
}

#[async_trait]
impl AccessEventRepository for AccessEventRepositoryImpl {
    async fn record(&self, event: RecordAccess) -> AppResult<AccessEventId> {
        let mut conn = self
            .db
            .inner_ref()
            .acquire()
            .await
            .map_err(AppError::from_query)?;
        insert_access_event(&mut *conn, &event).await
    }

    async fn find_in_range(&self, range: AccessEventRange) -> AppResult<Vec<AccessEvent>> {
        // 時刻順の並びだけを保証する
        let rows: Vec<AccessEventRow> = sqlx::query_as(
            r#"
                SELECT
                    access_event_id,
                    occurred_at,
                    subject_kind,
                    subject_id,
                    method,
                    success,
                    details,
                    vehicle_id
                FROM access_events
                WHERE ($1::timestamptz IS NULL OR occurred_at >= $1)
                  AND ($2::timestamptz IS NULL OR occurred_at < $2)
                  AND ($3::text IS NULL OR subject_kind = $3)
                ORDER BY occurred_at ASC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .bind(range.subject_kind.as_ref().map(|k| k.as_ref()))
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::from_query)?;

        rows.into_iter().map(AccessEvent::try_from).collect()
    }
}
