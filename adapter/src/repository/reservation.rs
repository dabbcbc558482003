use crate::{
    database::{
        model::{
            amenity::ShiftRow,
            reservation::{ReservationRow, ShiftHoldRow, UnitHoldRow, RESERVATION_SELECT},
        },
        ConnectionPool,
    },
    repository::amenity::find_amenity,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    amenity::{Amenity, Shift},
    id::{AmenityId, ReservationId, ShiftId, UnitId},
    reservation::{
        event::{
            CreateReservation, ReservationListOptions, UpdateReservation, ValidateReservation,
        },
        validation::{check_shift_capacity, check_unit_availability, ShiftHold, UnitHold},
        Reservation, ReservationClaim, ReservationStatus,
    },
    window::TimeWindow,
};
use kernel::repository::reservation::ReservationRepository;
use shared::error::{AppError, AppResult};
use sqlx::PgConnection;

#[derive(new)]
pub struct ReservationRepositoryImpl {
    db: ConnectionPool,
}

fn ensure_open(amenity: &Amenity) -> AppResult<()> {
    if !amenity.is_active {
        return Err(AppError::InvalidState("INACTIVE".into()));
    }
    Ok(())
}

// 区画をロックしてから、その区画の有効な予約と重ならないか確認する
async fn check_unit_claim(
    conn: &mut PgConnection,
    amenity_id: AmenityId,
    unit_id: UnitId,
    window: &TimeWindow,
    status: ReservationStatus,
    excluding: Option<ReservationId>,
) -> AppResult<()> {
    let unit_active: Option<bool> = sqlx::query_scalar(
        r#"
            SELECT is_active FROM amenity_units
            WHERE unit_id = $1 AND amenity_id = $2
            FOR UPDATE
        "#,
    )
    .bind(unit_id)
    .bind(amenity_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(AppError::from_query)?;
    // 停止中の区画は新規の占有だけを拒否し、取消は通す
    match unit_active {
        Some(true) => {}
        Some(false) if !status.holds_capacity() => {}
        _ => {
            return Err(AppError::EntityNotFound(format!(
                "区画（{unit_id}）が見つかりませんでした。"
            )))
        }
    }

    let rows: Vec<UnitHoldRow> = sqlx::query_as(
        r#"
            SELECT reservation_id, starts_at, ends_at, status
            FROM reservations
            WHERE unit_id = $1
              AND status IN ('PENDING', 'CONFIRMED')
              AND starts_at < $3
              AND ends_at > $2
        "#,
    )
    .bind(unit_id)
    .bind(window.starts_at())
    .bind(window.ends_at())
    .fetch_all(&mut *conn)
    .await
    .map_err(AppError::from_query)?;

    let holds = rows
        .into_iter()
        .map(UnitHold::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    check_unit_availability(window, status, &holds, excluding)
}

// 時間枠をロックしてから、定員を超えないか確認する
async fn check_quota_claim(
    conn: &mut PgConnection,
    amenity_id: AmenityId,
    shift_id: ShiftId,
    headcount: i32,
    status: ReservationStatus,
    excluding: Option<ReservationId>,
) -> AppResult<()> {
    let shift: Option<ShiftRow> = sqlx::query_as(
        r#"
            SELECT shift_id, amenity_id, title, starts_at, ends_at, capacity, is_active
            FROM amenity_shifts
            WHERE shift_id = $1 AND amenity_id = $2
            FOR UPDATE
        "#,
    )
    .bind(shift_id)
    .bind(amenity_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(AppError::from_query)?;
    let shift = shift.map(Shift::try_from).transpose()?.ok_or_else(|| {
        AppError::EntityNotFound(format!("時間枠（{shift_id}）が見つかりませんでした。"))
    })?;

    let rows: Vec<ShiftHoldRow> = sqlx::query_as(
        r#"
            SELECT reservation_id, headcount, status
            FROM reservations
            WHERE shift_id = $1 AND status IN ('PENDING', 'CONFIRMED')
        "#,
    )
    .bind(shift_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(AppError::from_query)?;

    let holds = rows
        .into_iter()
        .map(ShiftHold::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    check_shift_capacity(&shift, &holds, headcount, status, excluding)
}

async fn check_claim(
    conn: &mut PgConnection,
    amenity_id: AmenityId,
    claim: &ReservationClaim,
    status: ReservationStatus,
    excluding: Option<ReservationId>,
) -> AppResult<()> {
    let checked = match claim {
        ReservationClaim::Unit { unit_id, window } => {
            check_unit_claim(conn, amenity_id, *unit_id, window, status, excluding).await
        }
        ReservationClaim::Quota {
            shift_id,
            headcount,
        } => check_quota_claim(conn, amenity_id, *shift_id, *headcount, status, excluding).await,
    };
    if let Err(e) = &checked {
        tracing::info!(amenity_id = %amenity_id, reason = e.kind(), "予約を受け付けませんでした");
    }
    checked
}

// 予約の列を区画予約・時間枠予約のどちらかの形で並べる
fn claim_columns(
    claim: &ReservationClaim,
) -> (
    Option<UnitId>,
    Option<chrono::DateTime<chrono::Utc>>,
    Option<chrono::DateTime<chrono::Utc>>,
    Option<ShiftId>,
    Option<i32>,
) {
    match claim {
        ReservationClaim::Unit { unit_id, window } => (
            Some(*unit_id),
            Some(window.starts_at()),
            Some(window.ends_at()),
            None,
            None,
        ),
        ReservationClaim::Quota {
            shift_id,
            headcount,
        } => (None, None, None, Some(*shift_id), Some(*headcount)),
    }
}

async fn fetch_reservation(
    conn: &mut PgConnection,
    reservation_id: ReservationId,
    lock: bool,
) -> AppResult<Option<Reservation>> {
    let sql = if lock {
        format!("{RESERVATION_SELECT} WHERE r.reservation_id = $1 FOR UPDATE OF r")
    } else {
        format!("{RESERVATION_SELECT} WHERE r.reservation_id = $1")
    };
    let row: Option<ReservationRow> = sqlx::query_as(&sql)
        .bind(reservation_id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::from_query)?;

    row.map(Reservation::try_from).transpose()
}

fn reservation_not_found(reservation_id: ReservationId) -> AppError {
    AppError::EntityNotFound(format!("予約（{reservation_id}）が見つかりませんでした。"))
}

#[async_trait]
impl ReservationRepository for ReservationRepositoryImpl {
    async fn create(&self, event: CreateReservation) -> AppResult<Reservation> {
        let mut tx = self.db.begin().await?;

        let amenity = find_amenity(&mut tx, event.amenity_id).await?;
        ensure_open(&amenity)?;
        let claim = event.claim.resolve(amenity.model, None)?;
        check_claim(&mut tx, amenity.amenity_id, &claim, event.status, None).await?;

        let reservation_id = ReservationId::new();
        let (unit_id, starts_at, ends_at, shift_id, headcount) = claim_columns(&claim);
        let res = sqlx::query(
            r#"
                INSERT INTO reservations
                (reservation_id, amenity_id, resident_id, family_id, status,
                unit_id, starts_at, ends_at, shift_id, headcount, notes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(reservation_id)
        .bind(amenity.amenity_id)
        .bind(event.resident_id)
        .bind(event.family_id)
        .bind(event.status.as_ref())
        .bind(unit_id)
        .bind(starts_at)
        .bind(ends_at)
        .bind(shift_id)
        .bind(headcount)
        .bind(&event.notes)
        .bind(event.requested_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from_query)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been created".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(
            reservation_id = %reservation_id,
            amenity_id = %amenity.amenity_id,
            resident_id = %event.resident_id,
            "予約を登録しました"
        );

        Ok(Reservation {
            reservation_id,
            amenity_id: amenity.amenity_id,
            amenity_name: amenity.name,
            resident_id: event.resident_id,
            family_id: event.family_id,
            status: event.status,
            claim,
            notes: event.notes,
            created_at: event.requested_at,
        })
    }

    async fn update(&self, event: UpdateReservation) -> AppResult<Reservation> {
        let mut tx = self.db.begin().await?;

        let current = fetch_reservation(&mut tx, event.reservation_id, true)
            .await?
            .ok_or_else(|| reservation_not_found(event.reservation_id))?;
        let amenity = find_amenity(&mut tx, current.amenity_id).await?;

        let claim = event.claim.resolve(amenity.model, Some(&current.claim))?;
        let status = event.status.unwrap_or(current.status);
        let notes = event.notes.unwrap_or(current.notes);
        // 取り消し以外の更新は、施設が利用可能であることを求める
        if status.holds_capacity() {
            ensure_open(&amenity)?;
        }
        check_claim(
            &mut tx,
            amenity.amenity_id,
            &claim,
            status,
            Some(current.reservation_id),
        )
        .await?;

        let (unit_id, starts_at, ends_at, shift_id, headcount) = claim_columns(&claim);
        let res = sqlx::query(
            r#"
                UPDATE reservations
                SET
                    status = $2,
                    unit_id = $3,
                    starts_at = $4,
                    ends_at = $5,
                    shift_id = $6,
                    headcount = $7,
                    notes = $8
                WHERE reservation_id = $1
            "#,
        )
        .bind(current.reservation_id)
        .bind(status.as_ref())
        .bind(unit_id)
        .bind(starts_at)
        .bind(ends_at)
        .bind(shift_id)
        .bind(headcount)
        .bind(&notes)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from_query)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been updated".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(reservation_id = %current.reservation_id, status = %status, "予約を更新しました");

        Ok(Reservation {
            status,
            claim,
            notes,
            ..current
        })
    }

    async fn cancel(&self, reservation_id: ReservationId) -> AppResult<Reservation> {
        let mut tx = self.db.begin().await?;

        let current = fetch_reservation(&mut tx, reservation_id, true)
            .await?
            .ok_or_else(|| reservation_not_found(reservation_id))?;
        if current.status == ReservationStatus::Cancelled {
            return Err(AppError::InvalidState(current.status.to_string()));
        }

        sqlx::query("UPDATE reservations SET status = 'CANCELLED' WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_query)?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(reservation_id = %reservation_id, "予約を取り消しました");
        Ok(Reservation {
            status: ReservationStatus::Cancelled,
            ..current
        })
    }

    async fn validate(&self, event: ValidateReservation) -> AppResult<()> {
        // 書き込みはしないが、本番と同じロックの下で判定する。コミットせずに破棄する。
        let mut tx = self.db.begin().await?;

        let amenity = find_amenity(&mut tx, event.amenity_id).await?;
        ensure_open(&amenity)?;
        let current = match event.excluding {
            Some(reservation_id) => fetch_reservation(&mut tx, reservation_id, false).await?,
            None => None,
        };
        let claim = event
            .claim
            .resolve(amenity.model, current.as_ref().map(|r| &r.claim))?;
        check_claim(
            &mut tx,
            amenity.amenity_id,
            &claim,
            event.status,
            event.excluding,
        )
        .await
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        let mut conn = self
            .db
            .inner_ref()
            .acquire()
            .await
            .map_err(AppError::from_query)?;
        fetch_reservation(&mut conn, reservation_id, false).await
    }

    async fn find_all(&self, options: ReservationListOptions) -> AppResult<Vec<Reservation>> {
        let sql = format!(
            r#"{RESERVATION_SELECT}
            WHERE ($1::uuid IS NULL OR r.amenity_id = $1)
              AND ($2::uuid IS NULL OR r.resident_id = $2)
              AND ($3::uuid IS NULL OR r.family_id = $3)
              AND ($4::text IS NULL OR r.status = $4)
            ORDER BY r.created_at DESC"#
        );
        let rows: Vec<ReservationRow> = sqlx::query_as(&sql)
            .bind(options.amenity_id)
            .bind(options.resident_id)
            .bind(options.family_id)
            .bind(options.status.as_ref().map(|s| s.as_ref()))
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::from_query)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::amenity::AmenityRepositoryImpl;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use kernel::model::{
        amenity::{
            event::{CreateAmenity, CreateShift, CreateUnit},
            AllocationModel,
        },
        id::{FamilyId, ResidentId},
        reservation::ClaimRequest,
    };
    use kernel::repository::amenity::AmenityRepository;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap()
    }

    async fn resident(pool: &sqlx::PgPool) -> anyhow::Result<(ResidentId, FamilyId)> {
        let family_id = FamilyId::new();
        let resident_id = ResidentId::new();
        sqlx::query("INSERT INTO families (family_id, family_name) VALUES ($1, 'Rojas')")
            .bind(family_id)
            .execute(pool)
            .await?;
        sqlx::query(
            "INSERT INTO residents (resident_id, family_id, full_name, can_reserve_amenities) VALUES ($1, $2, 'Eva Rojas', TRUE)",
        )
        .bind(resident_id)
        .bind(family_id)
        .execute(pool)
        .await?;
        Ok((resident_id, family_id))
    }

    #[sqlx::test]
    async fn shift_capacity_is_enforced(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let (resident_id, family_id) = resident(&pool).await?;
        let db = ConnectionPool::new(pool);
        let amenities = AmenityRepositoryImpl::new(db.clone());
        let repo = ReservationRepositoryImpl::new(db);

        let amenity = amenities
            .create(CreateAmenity::new(
                "Piscina".into(),
                AllocationModel::Quota,
                "".into(),
                "".into(),
                None,
                None,
            ))
            .await?;
        let shift = amenities
            .add_shift(CreateShift::new(
                amenity.amenity_id,
                "Mañana".into(),
                TimeWindow::new(at(8), at(10)).unwrap(),
                20,
            ))
            .await?;

        let book = |headcount: i32| {
            CreateReservation::new(
                amenity.amenity_id,
                resident_id,
                Some(family_id),
                ClaimRequest {
                    shift_id: Some(shift.shift_id),
                    headcount: Some(headcount),
                    ..Default::default()
                },
                ReservationStatus::Confirmed,
                "".into(),
                at(7),
            )
        };

        let mut booked = Vec::new();
        for _ in 0..4 {
            booked.push(repo.create(book(5)).await?);
        }
        let overflow = repo.create(book(1)).await;
        assert!(matches!(
            overflow,
            Err(AppError::CapacityExceeded {
                requested: 1,
                available: 0
            })
        ));

        repo.cancel(booked[0].reservation_id).await?;
        repo.create(book(1)).await?;
        Ok(())
    }

    #[sqlx::test]
    async fn unit_windows_do_not_overlap(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let (resident_id, family_id) = resident(&pool).await?;
        let db = ConnectionPool::new(pool);
        let amenities = AmenityRepositoryImpl::new(db.clone());
        let repo = ReservationRepositoryImpl::new(db);

        let amenity = amenities
            .create(CreateAmenity::new(
                "Parrillas".into(),
                AllocationModel::Unit,
                "".into(),
                "".into(),
                None,
                None,
            ))
            .await?;
        let unit = amenities
            .add_unit(CreateUnit::new(amenity.amenity_id, "Parrilla 1".into(), "".into()))
            .await?;

        let book = |from: u32, to: u32| {
            CreateReservation::new(
                amenity.amenity_id,
                resident_id,
                Some(family_id),
                ClaimRequest {
                    unit_id: Some(unit.unit_id),
                    starts_at: Some(at(from)),
                    ends_at: Some(at(to)),
                    ..Default::default()
                },
                ReservationStatus::Confirmed,
                "".into(),
                at(7),
            )
        };

        let first = repo.create(book(9, 12)).await?;
        assert!(matches!(repo.create(book(11, 13)).await, Err(AppError::Overlap(_))));
        repo.create(book(12, 14)).await?;

        // 自分自身とは重複しない
        let moved = repo
            .update(UpdateReservation::new(
                first.reservation_id,
                ClaimRequest {
                    starts_at: Some(at(8)),
                    ..Default::default()
                },
                None,
                None,
            ))
            .await?;
        let ReservationClaim::Unit { window, .. } = moved.claim else {
            panic!("expected a unit claim");
        };
        assert_eq!(window.starts_at(), at(8));
        assert_eq!(window.ends_at(), at(12));

        let dry_run = repo
            .validate(ValidateReservation::new(
                amenity.amenity_id,
                ClaimRequest {
                    unit_id: Some(unit.unit_id),
                    starts_at: Some(at(13)),
                    ends_at: Some(at(15)),
                    ..Default::default()
                },
                ReservationStatus::Confirmed,
                None,
            ))
            .await;
        assert!(matches!(dry_run, Err(AppError::Overlap(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn missing_unit_is_reported(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool);
        let amenities = AmenityRepositoryImpl::new(db.clone());
        let repo = ReservationRepositoryImpl::new(db);
        let amenity = amenities
            .create(CreateAmenity::new(
                "Parrillas".into(),
                AllocationModel::Unit,
                "".into(),
                "".into(),
                None,
                None,
            ))
            .await?;

        let res = repo
            .validate(ValidateReservation::new(
                amenity.amenity_id,
                ClaimRequest {
                    starts_at: Some(at(9)),
                    ends_at: Some(at(10)),
                    ..Default::default()
                },
                ReservationStatus::Confirmed,
                None,
            ))
            .await;
        assert!(matches!(res, Err(AppError::MissingField(f)) if f == "unit"));

        let res = repo
            .validate(ValidateReservation::new(
                amenity.amenity_id,
                ClaimRequest {
                    unit_id: Some(UnitId::new()),
                    starts_at: Some(at(9)),
                    ends_at: Some(at(10)),
                    ..Default::default()
                },
                ReservationStatus::Confirmed,
                None,
            ))
            .await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));
        Ok(())
    }

    async fn quota_amenity(
        amenities: &AmenityRepositoryImpl,
        capacity: i32,
    ) -> anyhow::Result<(AmenityId, ShiftId)> {
        let amenity = amenities
            .create(CreateAmenity::new(
                "Gimnasio".into(),
                AllocationModel::Quota,
                "".into(),
                "".into(),
                None,
                None,
            ))
            .await?;
        let shift = amenities
            .add_shift(CreateShift::new(
                amenity.amenity_id,
                "Tarde".into(),
                TimeWindow::new(at(16), at(18)).unwrap(),
                capacity,
            ))
            .await?;
        Ok((amenity.amenity_id, shift.shift_id))
    }

    fn shift_booking(
        amenity_id: AmenityId,
        shift_id: ShiftId,
        resident_id: ResidentId,
        family_id: FamilyId,
        headcount: i32,
    ) -> CreateReservation {
        CreateReservation::new(
            amenity_id,
            resident_id,
            Some(family_id),
            ClaimRequest {
                shift_id: Some(shift_id),
                headcount: Some(headcount),
                ..Default::default()
            },
            ReservationStatus::Confirmed,
            "".into(),
            at(7),
        )
    }

    #[sqlx::test]
    async fn concurrent_overlapping_unit_claims_admit_one(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let (resident_id, family_id) = resident(&pool).await?;
        let db = ConnectionPool::new(pool);
        let amenities = AmenityRepositoryImpl::new(db.clone());
        let repo = ReservationRepositoryImpl::new(db);

        let amenity = amenities
            .create(CreateAmenity::new(
                "Parrillas".into(),
                AllocationModel::Unit,
                "".into(),
                "".into(),
                None,
                None,
            ))
            .await?;
        let unit = amenities
            .add_unit(CreateUnit::new(amenity.amenity_id, "Parrilla 2".into(), "".into()))
            .await?;
        let book = |from: u32, to: u32| {
            CreateReservation::new(
                amenity.amenity_id,
                resident_id,
                Some(family_id),
                ClaimRequest {
                    unit_id: Some(unit.unit_id),
                    starts_at: Some(at(from)),
                    ends_at: Some(at(to)),
                    ..Default::default()
                },
                ReservationStatus::Confirmed,
                "".into(),
                at(7),
            )
        };

        let (a, b) = tokio::join!(repo.create(book(9, 12)), repo.create(book(10, 13)));
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::Overlap(_)))));
        Ok(())
    }

    #[sqlx::test]
    async fn concurrent_shift_claims_never_exceed_capacity(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let (resident_id, family_id) = resident(&pool).await?;
        let db = ConnectionPool::new(pool);
        let amenities = AmenityRepositoryImpl::new(db.clone());
        let repo = ReservationRepositoryImpl::new(db);
        let (amenity_id, shift_id) = quota_amenity(&amenities, 3).await?;

        let (a, b) = tokio::join!(
            repo.create(shift_booking(amenity_id, shift_id, resident_id, family_id, 2)),
            repo.create(shift_booking(amenity_id, shift_id, resident_id, family_id, 2)),
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(AppError::CapacityExceeded {
                requested: 2,
                available: 1
            })
        )));
        Ok(())
    }

    #[sqlx::test]
    async fn reservation_on_inactive_shift_can_still_be_cancelled(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let (resident_id, family_id) = resident(&pool).await?;
        let db = ConnectionPool::new(pool.clone());
        let amenities = AmenityRepositoryImpl::new(db.clone());
        let repo = ReservationRepositoryImpl::new(db);
        let (amenity_id, shift_id) = quota_amenity(&amenities, 5).await?;

        let booked = repo
            .create(shift_booking(amenity_id, shift_id, resident_id, family_id, 2))
            .await?;
        sqlx::query("UPDATE amenity_shifts SET is_active = FALSE WHERE shift_id = $1")
            .bind(shift_id)
            .execute(&pool)
            .await?;

        // 停止中の時間枠への新規予約は拒否される
        let rejected = repo
            .create(shift_booking(amenity_id, shift_id, resident_id, family_id, 1))
            .await;
        assert!(matches!(rejected, Err(AppError::EntityNotFound(_))));

        let cancelled = repo
            .update(UpdateReservation::new(
                booked.reservation_id,
                ClaimRequest::default(),
                Some(ReservationStatus::Cancelled),
                None,
            ))
            .await?;
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        Ok(())
    }
}
