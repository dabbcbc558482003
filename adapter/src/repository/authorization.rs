use crate::{
    database::{
        model::authorization::{AuthorizationRow, AUTHORIZATION_SELECT},
        ConnectionPool,
    },
    qr,
    repository::access_event::insert_access_event,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use derive_new::new;
use kernel::model::{
    access::{event::RecordAccess, SubjectKind, VerificationMethod},
    authorization::{
        check_family_quota,
        event::{
            AuthorizationListOptions, CancelAuthorization, CreateAuthorization,
            ExtendAuthorization, VerifyAccess,
        },
        validate_new_window, AuthorizationCode, AuthorizationStatus, VisitAuthorization,
    },
    id::{AuthorizationId, FamilyId, VisitorId},
    visitor::Visitor,
};
use kernel::repository::{
    authorization::{AuthorizationRepository, Extended, VerificationOutcome},
    config::ConfigRepository,
};
use serde_json::json;
use shared::error::{AppError, AppResult};
use sqlx::PgConnection;
use std::sync::Arc;

// 生成したコードが既存と衝突した場合に引き直す回数
const CODE_ATTEMPTS: usize = 5;

#[derive(new)]
pub struct AuthorizationRepositoryImpl {
    db: ConnectionPool,
    config: Arc<dyn ConfigRepository>,
}

fn not_found(code: &AuthorizationCode) -> AppError {
    AppError::EntityNotFound(format!("認可（{code}）が見つかりませんでした。"))
}

// 認可の行をロックして取得する。照合・延長・取消はこの行単位で直列化される。
async fn lock_by_code(
    conn: &mut PgConnection,
    code: &AuthorizationCode,
) -> AppResult<VisitAuthorization> {
    let sql = format!("{AUTHORIZATION_SELECT} WHERE a.code = $1 FOR UPDATE OF a");
    let row: Option<AuthorizationRow> = sqlx::query_as(&sql)
        .bind(code.as_str())
        .fetch_optional(conn)
        .await
        .map_err(AppError::from_query)?;

    row.map(VisitAuthorization::try_from)
        .transpose()?
        .ok_or_else(|| not_found(code))
}

// 変化しうる列だけを書き戻す
async fn persist_state(
    conn: &mut PgConnection,
    authorization: &VisitAuthorization,
) -> AppResult<()> {
    let res = sqlx::query(
        r#"
            UPDATE visit_authorizations
            SET
                ends_at = $2,
                status = $3,
                entries_consumed = $4,
                is_inside = $5
            WHERE authorization_id = $1
        "#,
    )
    .bind(authorization.authorization_id)
    .bind(authorization.window.ends_at())
    .bind(authorization.status.as_ref())
    .bind(authorization.entries_consumed)
    .bind(authorization.is_inside)
    .execute(conn)
    .await
    .map_err(AppError::from_query)?;

    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(
            "No visit authorization record has been updated".into(),
        ));
    }
    Ok(())
}

// 期限切れの一括更新。is_stale と同じ条件を SQL で表したもの。
async fn sweep_with(
    conn: &mut PgConnection,
    now: DateTime<Utc>,
    exit_grace: Duration,
    family_id: Option<FamilyId>,
) -> AppResult<u64> {
    let res = sqlx::query(
        r#"
            UPDATE visit_authorizations
            SET status = 'EXPIRED', is_inside = FALSE
            WHERE status = 'ACTIVE'
              AND ends_at < $1
              AND (NOT is_inside OR ends_at + make_interval(secs => $2) < $1)
              AND ($3::uuid IS NULL OR family_id = $3)
        "#,
    )
    .bind(now)
    .bind(exit_grace.num_seconds() as f64)
    .bind(family_id)
    .execute(conn)
    .await
    .map_err(AppError::from_query)?;

    Ok(res.rows_affected())
}

impl AuthorizationRepositoryImpl {
    // 同じ住民が同じ身分証で登録した訪問者がいれば使い回す
    async fn upsert_visitor(
        &self,
        conn: &mut PgConnection,
        event: &CreateAuthorization,
    ) -> AppResult<Visitor> {
        let visitor = &event.visitor;
        let existing: Option<VisitorId> = match &visitor.document_id {
            Some(document_id) => sqlx::query_scalar(
                r#"
                    SELECT visitor_id FROM visitors
                    WHERE authorized_by = $1 AND document_id = $2
                    ORDER BY created_at DESC
                    LIMIT 1
                "#,
            )
            .bind(event.issued_by)
            .bind(document_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(AppError::from_query)?,
            None => None,
        };

        let visitor_id = match existing {
            Some(visitor_id) => {
                sqlx::query(
                    "UPDATE visitors SET full_name = $2, access_mode = $3 WHERE visitor_id = $1",
                )
                .bind(visitor_id)
                .bind(&visitor.full_name)
                .bind(visitor.access_mode.as_ref())
                .execute(&mut *conn)
                .await
                .map_err(AppError::from_query)?;
                visitor_id
            }
            None => {
                let visitor_id = VisitorId::new();
                sqlx::query(
                    r#"
                        INSERT INTO visitors
                        (visitor_id, full_name, document_id, access_mode, authorized_by)
                        VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(visitor_id)
                .bind(&visitor.full_name)
                .bind(&visitor.document_id)
                .bind(visitor.access_mode.as_ref())
                .bind(event.issued_by)
                .execute(&mut *conn)
                .await
                .map_err(AppError::from_query)?;
                visitor_id
            }
        };

        Ok(Visitor {
            visitor_id,
            full_name: visitor.full_name.clone(),
            document_id: visitor.document_id.clone(),
            access_mode: visitor.access_mode,
            authorized_by: event.issued_by,
        })
    }

    async fn unused_code(
        &self,
        conn: &mut PgConnection,
        now: DateTime<Utc>,
        attempts: usize,
    ) -> AppResult<AuthorizationCode> {
        for _ in 0..attempts {
            let code = AuthorizationCode::generate(now);
            let taken: Option<i32> =
                sqlx::query_scalar("SELECT 1 FROM visit_authorizations WHERE code = $1")
                    .bind(code.as_str())
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(AppError::from_query)?;
            if taken.is_none() {
                return Ok(code);
            }
        }
        Err(AppError::CodeGenerationExhausted { attempts })
    }
}

#[async_trait]
impl AuthorizationRepository for AuthorizationRepositoryImpl {
    async fn create(&self, event: CreateAuthorization) -> AppResult<VisitAuthorization> {
        let settings = self.config.current();
        let now = event.requested_at;
        validate_new_window(&event.window, now, settings.max_visit_duration())?;

        let mut tx = self.db.begin().await?;

        // 家族の行をロックし、同じ家族からの同時発行を直列化する
        {
            let family: Option<FamilyId> =
                sqlx::query_scalar("SELECT family_id FROM families WHERE family_id = $1 FOR UPDATE")
                    .bind(event.family_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(AppError::from_query)?;
            if family.is_none() {
                return Err(AppError::EntityNotFound(format!(
                    "家族（{}）が見つかりませんでした。",
                    event.family_id
                )));
            }

            // 期限切れのまま残っている認可を数えないよう、先にこの家族分を掃除する
            sweep_with(&mut tx, now, settings.exit_grace(), Some(event.family_id)).await?;

            let active: i64 = sqlx::query_scalar(
                r#"
                    SELECT COUNT(*) FROM visit_authorizations
                    WHERE family_id = $1 AND status = 'ACTIVE'
                "#,
            )
            .bind(event.family_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from_query)?;

            check_family_quota(active, settings.max_authorizations_per_family())?;
        }

        let visitor = self.upsert_visitor(&mut tx, &event).await?;
        let code = self.unused_code(&mut tx, now, CODE_ATTEMPTS).await?;
        let qr_image = qr::render_data_uri(code.as_str())?;
        let entries_allowed = event.entries_allowed.max(1);

        let authorization_id = AuthorizationId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO visit_authorizations
                (authorization_id, code, visitor_id, authorized_by, family_id,
                starts_at, ends_at, status, entries_allowed, entries_consumed,
                is_inside, qr_image, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'ACTIVE', $8, 0, FALSE, $9, $10)
            "#,
        )
        .bind(authorization_id)
        .bind(code.as_str())
        .bind(visitor.visitor_id)
        .bind(event.issued_by)
        .bind(event.family_id)
        .bind(event.window.starts_at())
        .bind(event.window.ends_at())
        .bind(entries_allowed)
        .bind(&qr_image)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from_query)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No visit authorization record has been created".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(
            code = %code,
            issued_by = %event.issued_by,
            family_id = %event.family_id,
            starts_at = %event.window.starts_at(),
            ends_at = %event.window.ends_at(),
            "認可を発行しました"
        );

        Ok(VisitAuthorization {
            authorization_id,
            code,
            visitor,
            authorized_by: event.issued_by,
            family_id: Some(event.family_id),
            window: event.window,
            status: AuthorizationStatus::Active,
            entries_allowed,
            entries_consumed: 0,
            is_inside: false,
            qr_image: Some(qr_image),
            created_at: now,
        })
    }

    async fn extend(&self, event: ExtendAuthorization) -> AppResult<Extended> {
        let settings = self.config.current();
        let mut tx = self.db.begin().await?;

        let mut authorization = lock_by_code(&mut tx, &event.code).await?;
        let extended_by =
            authorization.extend(event.request, settings.max_extension(), event.requested_at)?;
        persist_state(&mut tx, &authorization).await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(
            code = %event.code,
            extended_by_minutes = extended_by.num_minutes(),
            ends_at = %authorization.window.ends_at(),
            "認可を延長しました"
        );
        Ok(Extended {
            authorization,
            extended_by,
        })
    }

    async fn cancel(&self, event: CancelAuthorization) -> AppResult<VisitAuthorization> {
        let mut tx = self.db.begin().await?;

        let mut authorization = lock_by_code(&mut tx, &event.code).await?;
        authorization.cancel()?;
        persist_state(&mut tx, &authorization).await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(code = %event.code, requested_by = %event.requested_by, "認可を取り消しました");
        Ok(authorization)
    }

    async fn verify(&self, event: VerifyAccess) -> AppResult<VerificationOutcome> {
        let settings = self.config.current();
        let mut tx = self.db.begin().await?;

        let mut authorization = lock_by_code(&mut tx, &event.code).await?;
        let previous = authorization.status;
        let verdict = authorization.apply(event.event, event.presented_at, settings.exit_grace());

        // 拒否された場合でも期限切れへの遷移は保存する
        if verdict.is_ok() || authorization.status != previous {
            persist_state(&mut tx, &authorization).await?;
        }

        let details = match &verdict {
            Ok(decision) => json!({
                "code": event.code,
                "event": decision.event,
                "remaining": decision.remaining,
                "status": decision.status.as_ref(),
            }),
            Err(e) => json!({
                "code": event.code,
                "event": event.event,
                "reason": e.kind(),
                "status": authorization.status.as_ref(),
            }),
        };
        insert_access_event(
            &mut tx,
            &RecordAccess::new(
                event.presented_at,
                SubjectKind::Visitor,
                authorization.visitor.visitor_id.raw(),
                VerificationMethod::Credential,
                verdict.is_ok(),
                details,
                None,
            ),
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        match &verdict {
            Ok(decision) => tracing::info!(
                code = %event.code,
                event = %decision.event,
                remaining = decision.remaining,
                status = %decision.status,
                "入退場を許可しました"
            ),
            Err(e) => tracing::info!(
                code = %event.code,
                event = %event.event,
                reason = e.kind(),
                status = %authorization.status,
                "入退場を拒否しました"
            ),
        }

        Ok(VerificationOutcome {
            authorization,
            verdict,
        })
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let settings = self.config.current();
        let mut conn = self
            .db
            .inner_ref()
            .acquire()
            .await
            .map_err(AppError::from_query)?;
        let expired = sweep_with(&mut conn, now, settings.exit_grace(), None).await?;
        if expired > 0 {
            tracing::info!(expired, "期限切れの認可を更新しました");
        }
        Ok(expired)
    }

    async fn find_by_code(&self, code: &AuthorizationCode) -> AppResult<Option<VisitAuthorization>> {
        let sql = format!("{AUTHORIZATION_SELECT} WHERE a.code = $1");
        let row: Option<AuthorizationRow> = sqlx::query_as(&sql)
            .bind(code.as_str())
            .fetch_optional(self.db.inner_ref())
            .await
            .map_err(AppError::from_query)?;

        row.map(VisitAuthorization::try_from).transpose()
    }

    async fn find_all(&self, options: AuthorizationListOptions) -> AppResult<Vec<VisitAuthorization>> {
        let sql = format!(
            r#"{AUTHORIZATION_SELECT}
            WHERE ($1::uuid IS NULL OR a.family_id = $1)
              AND ($2::text IS NULL OR a.status = $2)
              AND ($3::timestamptz IS NULL OR (a.starts_at <= $3 AND a.ends_at >= $3))
            ORDER BY a.created_at DESC"#
        );
        let rows: Vec<AuthorizationRow> = sqlx::query_as(&sql)
            .bind(options.family_id)
            .bind(options.status.as_ref().map(|s| s.as_ref()))
            .bind(options.valid_at)
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::from_query)?;

        rows.into_iter().map(VisitAuthorization::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::config::ConfigRepositoryImpl;
    use chrono::TimeZone;
    use kernel::model::{
        access::GateEvent,
        authorization::ExtensionRequest,
        id::ResidentId,
        visitor::{event::NewVisitor, AccessMode},
        window::TimeWindow,
    };

    struct Fixture {
        repo: AuthorizationRepositoryImpl,
        resident_id: ResidentId,
        family_id: FamilyId,
    }

    async fn fixture(pool: sqlx::PgPool) -> anyhow::Result<Fixture> {
        let family_id = FamilyId::new();
        let resident_id = ResidentId::new();
        sqlx::query("INSERT INTO families (family_id, family_name) VALUES ($1, 'Paz')")
            .bind(family_id)
            .execute(&pool)
            .await?;
        sqlx::query(
            "INSERT INTO residents (resident_id, family_id, full_name, kind) VALUES ($1, $2, 'Ana Paz', 'PRINCIPAL')",
        )
        .bind(resident_id)
        .bind(family_id)
        .execute(&pool)
        .await?;

        let db = ConnectionPool::new(pool);
        let config = Arc::new(ConfigRepositoryImpl::new(db.clone()));
        config.reload().await?;
        Ok(Fixture {
            repo: AuthorizationRepositoryImpl::new(db, config),
            resident_id,
            family_id,
        })
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn create_event(f: &Fixture, hours: i64, entries: i32) -> CreateAuthorization {
        CreateAuthorization::new(
            f.resident_id,
            f.family_id,
            NewVisitor::new("Luis Paz".into(), Some("DNI-1".into()), AccessMode::Pedestrian),
            TimeWindow::new(t0(), t0() + Duration::hours(hours)).unwrap(),
            entries,
            t0(),
        )
    }

    #[sqlx::test]
    async fn single_entry_visit_ends_used(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let f = fixture(pool).await?;
        let issued = f.repo.create(create_event(&f, 4, 1)).await?;
        assert!(issued.qr_image.is_some());

        let enter = VerifyAccess::new(issued.code.clone(), GateEvent::Enter, t0() + Duration::hours(1));
        let outcome = f.repo.verify(enter).await?;
        assert_eq!(outcome.verdict?.remaining, 0);

        let again = VerifyAccess::new(issued.code.clone(), GateEvent::Enter, t0() + Duration::hours(1));
        let outcome = f.repo.verify(again).await?;
        assert!(matches!(outcome.verdict, Err(AppError::AlreadyInside)));

        let exit = VerifyAccess::new(issued.code.clone(), GateEvent::Exit, t0() + Duration::hours(2));
        let outcome = f.repo.verify(exit).await?;
        assert_eq!(outcome.verdict?.status, AuthorizationStatus::Used);

        let stored = f.repo.find_by_code(&issued.code).await?.unwrap();
        assert_eq!(stored.status, AuthorizationStatus::Used);
        assert!(!stored.is_inside);
        Ok(())
    }

    #[sqlx::test]
    async fn late_entry_expires_and_is_persisted(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let f = fixture(pool.clone()).await?;
        let issued = f.repo.create(create_event(&f, 1, 1)).await?;

        let late = VerifyAccess::new(issued.code.clone(), GateEvent::Enter, t0() + Duration::hours(2));
        let outcome = f.repo.verify(late).await?;
        assert!(matches!(outcome.verdict, Err(AppError::Expired)));

        let stored = f.repo.find_by_code(&issued.code).await?.unwrap();
        assert_eq!(stored.status, AuthorizationStatus::Expired);

        let denials: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM access_events WHERE success = FALSE")
                .fetch_one(&pool)
                .await?;
        assert_eq!(denials, 1);
        Ok(())
    }

    #[sqlx::test]
    async fn concurrent_entries_admit_exactly_one(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let f = fixture(pool).await?;
        let issued = f.repo.create(create_event(&f, 4, 3)).await?;
        let at = t0() + Duration::minutes(5);

        let (a, b) = tokio::join!(
            f.repo.verify(VerifyAccess::new(issued.code.clone(), GateEvent::Enter, at)),
            f.repo.verify(VerifyAccess::new(issued.code.clone(), GateEvent::Enter, at)),
        );
        let verdicts = [a?.verdict, b?.verdict];
        let accepted = verdicts.iter().filter(|v| v.is_ok()).count();
        let already_inside = verdicts
            .iter()
            .filter(|v| matches!(v, Err(AppError::AlreadyInside)))
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(already_inside, 1);

        let stored = f.repo.find_by_code(&issued.code).await?.unwrap();
        assert_eq!(stored.entries_consumed, 1);
        Ok(())
    }

    #[sqlx::test]
    async fn family_quota_is_enforced(pool: sqlx::PgPool) -> anyhow::Result<()> {
        sqlx::query("UPDATE access_settings SET value = 2 WHERE key = 'MAX_AUTORIZACIONES_POR_FAMILIA'")
            .execute(&pool)
            .await?;
        let f = fixture(pool).await?;

        f.repo.create(create_event(&f, 4, 1)).await?;
        f.repo.create(create_event(&f, 4, 1)).await?;
        let third = f.repo.create(create_event(&f, 4, 1)).await;
        assert!(matches!(third, Err(AppError::QuotaExceeded { limit: 2 })));
        Ok(())
    }

    #[sqlx::test]
    async fn visitor_with_same_document_is_reused(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let f = fixture(pool).await?;
        let first = f.repo.create(create_event(&f, 4, 1)).await?;
        let second = f.repo.create(create_event(&f, 4, 1)).await?;
        assert_eq!(first.visitor.visitor_id, second.visitor.visitor_id);
        assert_ne!(first.code, second.code);
        Ok(())
    }

    #[sqlx::test]
    async fn extend_then_cancel(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let f = fixture(pool).await?;
        let issued = f.repo.create(create_event(&f, 4, 1)).await?;

        let extended = f
            .repo
            .extend(ExtendAuthorization::new(
                issued.code.clone(),
                ExtensionRequest::Hours(3),
                t0(),
            ))
            .await?;
        assert_eq!(extended.extended_by, Duration::hours(3));
        assert_eq!(
            extended.authorization.window.ends_at() - issued.window.ends_at(),
            Duration::hours(3)
        );

        let cancelled = f
            .repo
            .cancel(CancelAuthorization::new(issued.code.clone(), f.resident_id))
            .await?;
        assert_eq!(cancelled.status, AuthorizationStatus::Cancelled);

        let again = f
            .repo
            .cancel(CancelAuthorization::new(issued.code.clone(), f.resident_id))
            .await;
        assert!(matches!(again, Err(AppError::InvalidState(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn sweep_is_idempotent(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let f = fixture(pool).await?;
        f.repo.create(create_event(&f, 1, 1)).await?;
        f.repo.create(create_event(&f, 6, 1)).await?;

        let now = t0() + Duration::hours(2);
        assert_eq!(f.repo.sweep_expired(now).await?, 1);
        assert_eq!(f.repo.sweep_expired(now).await?, 0);

        let active = f
            .repo
            .find_all(AuthorizationListOptions {
                status: Some(AuthorizationStatus::Active),
                ..Default::default()
            })
            .await?;
        assert_eq!(active.len(), 1);
        Ok(())
    }

    #[sqlx::test]
    async fn sweep_keeps_inside_visitor_until_grace_elapses(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let f = fixture(pool).await?;
        let issued = f.repo.create(create_event(&f, 1, 1)).await?;
        f.repo
            .verify(VerifyAccess::new(
                issued.code.clone(),
                GateEvent::Enter,
                t0() + Duration::minutes(30),
            ))
            .await?
            .verdict?;

        // 猶予は既定の 30 分
        assert_eq!(f.repo.sweep_expired(t0() + Duration::minutes(75)).await?, 0);
        assert_eq!(f.repo.sweep_expired(t0() + Duration::minutes(95)).await?, 1);

        let swept = f.repo.find_by_code(&issued.code).await?.unwrap();
        assert_eq!(swept.status, AuthorizationStatus::Expired);
        assert!(!swept.is_inside);
        Ok(())
    }

    #[sqlx::test]
    async fn running_out_of_code_attempts_is_a_server_error(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let f = fixture(pool).await?;
        let mut conn = f.repo.db.inner_ref().acquire().await?;
        let res = f.repo.unused_code(&mut conn, t0(), 0).await;
        assert!(matches!(
            res,
            Err(AppError::CodeGenerationExhausted { attempts: 0 })
        ));

        let code = f.repo.unused_code(&mut conn, t0(), CODE_ATTEMPTS).await?;
        assert!(code.as_str().starts_with("AV-20250601090000-"));
        Ok(())
    }
}
