use crate::database::{
    model::amenity::{AmenityRow, ShiftOccupancyRow, ShiftRow, UnitBookingRow, UnitRow},
    ConnectionPool,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    amenity::{
        event::{AmenityListOptions, CalendarRange, CreateAmenity, CreateShift, CreateUnit},
        AllocationModel, Amenity, AmenityCalendar, AmenityDetail, Shift, ShiftOccupancy, Unit,
        UnitBooking,
    },
    id::{AmenityId, ShiftId, UnitId},
};
use kernel::repository::amenity::AmenityRepository;
use shared::error::{AppError, AppResult};
use sqlx::PgConnection;

#[derive(new)]
pub struct AmenityRepositoryImpl {
    db: ConnectionPool,
}

pub(crate) async fn find_amenity(
    conn: &mut PgConnection,
    amenity_id: AmenityId,
) -> AppResult<Amenity> {
    let row: Option<AmenityRow> = sqlx::query_as(
        r#"
            SELECT
                amenity_id,
                name,
                allocation_model,
                description,
                rules,
                is_active,
                opens_at,
                closes_at
            FROM amenities
            WHERE amenity_id = $1
        "#,
    )
    .bind(amenity_id)
    .fetch_optional(conn)
    .await
    .map_err(AppError::from_query)?;

    row.map(Amenity::try_from).transpose()?.ok_or_else(|| {
        AppError::EntityNotFound(format!("共用施設（{amenity_id}）が見つかりませんでした。"))
    })
}

impl AmenityRepositoryImpl {
    async fn expect_model(
        &self,
        amenity_id: AmenityId,
        model: AllocationModel,
    ) -> AppResult<Amenity> {
        let mut conn = self
            .db
            .inner_ref()
            .acquire()
            .await
            .map_err(AppError::from_query)?;
        let amenity = find_amenity(&mut conn, amenity_id).await?;
        if amenity.model != model {
            return Err(AppError::InvalidState(amenity.model.to_string()));
        }
        Ok(amenity)
    }
}

#[async_trait]
impl AmenityRepository for AmenityRepositoryImpl {
    async fn create(&self, event: CreateAmenity) -> AppResult<Amenity> {
        let amenity_id = AmenityId::new();
        sqlx::query(
            r#"
                INSERT INTO amenities
                (amenity_id, name, allocation_model, description, rules, opens_at, closes_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(amenity_id)
        .bind(&event.name)
        .bind(event.model.as_ref())
        .bind(&event.description)
        .bind(&event.rules)
        .bind(event.opens_at)
        .bind(event.closes_at)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::from_query)?;

        tracing::info!(amenity_id = %amenity_id, model = %event.model, "共用施設を登録しました");

        let CreateAmenity {
            name,
            model,
            description,
            rules,
            opens_at,
            closes_at,
        } = event;
        Ok(Amenity {
            amenity_id,
            name,
            model,
            description,
            rules,
            is_active: true,
            opens_at,
            closes_at,
        })
    }

    async fn add_unit(&self, event: CreateUnit) -> AppResult<Unit> {
        self.expect_model(event.amenity_id, AllocationModel::Unit).await?;

        let unit_id = UnitId::new();
        sqlx::query(
            r#"
                INSERT INTO amenity_units (unit_id, amenity_id, name, description)
                VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(unit_id)
        .bind(event.amenity_id)
        .bind(&event.name)
        .bind(&event.description)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::from_query)?;

        Ok(Unit {
            unit_id,
            amenity_id: event.amenity_id,
            name: event.name,
            description: event.description,
            is_active: true,
        })
    }

    async fn add_shift(&self, event: CreateShift) -> AppResult<Shift> {
        self.expect_model(event.amenity_id, AllocationModel::Quota).await?;
        if event.capacity < 1 {
            return Err(AppError::MissingField("capacity".into()));
        }

        let shift_id = ShiftId::new();
        sqlx::query(
            r#"
                INSERT INTO amenity_shifts
                (shift_id, amenity_id, title, starts_at, ends_at, capacity)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(shift_id)
        .bind(event.amenity_id)
        .bind(&event.title)
        .bind(event.window.starts_at())
        .bind(event.window.ends_at())
        .bind(event.capacity)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::from_query)?;

        Ok(Shift {
            shift_id,
            amenity_id: event.amenity_id,
            title: event.title,
            window: event.window,
            capacity: event.capacity,
            is_active: true,
        })
    }

    async fn find_all(&self, options: AmenityListOptions) -> AppResult<Vec<Amenity>> {
        let rows: Vec<AmenityRow> = sqlx::query_as(
            r#"
                SELECT
                    amenity_id,
                    name,
                    allocation_model,
                    description,
                    rules,
                    is_active,
                    opens_at,
                    closes_at
                FROM amenities
                WHERE ($1::boolean IS NULL OR is_active = $1)
                  AND ($2::text IS NULL OR allocation_model = $2)
                ORDER BY name ASC
            "#,
        )
        .bind(options.is_active)
        .bind(options.model.as_ref().map(|m| m.as_ref()))
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::from_query)?;

        rows.into_iter().map(Amenity::try_from).collect()
    }

    async fn find_by_id(&self, amenity_id: AmenityId) -> AppResult<Option<AmenityDetail>> {
        let mut conn = self
            .db
            .inner_ref()
            .acquire()
            .await
            .map_err(AppError::from_query)?;
        let amenity = match find_amenity(&mut conn, amenity_id).await {
            Ok(amenity) => amenity,
            Err(AppError::EntityNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let units: Vec<UnitRow> = sqlx::query_as(
            r#"
                SELECT unit_id, amenity_id, name, description, is_active
                FROM amenity_units
                WHERE amenity_id = $1
                ORDER BY name ASC
            "#,
        )
        .bind(amenity_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(AppError::from_query)?;

        let shifts: Vec<ShiftRow> = sqlx::query_as(
            r#"
                SELECT shift_id, amenity_id, title, starts_at, ends_at, capacity, is_active
                FROM amenity_shifts
                WHERE amenity_id = $1
                ORDER BY starts_at ASC
            "#,
        )
        .bind(amenity_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(AppError::from_query)?;

        Ok(Some(AmenityDetail {
            amenity,
            units: units.into_iter().map(Unit::from).collect(),
            shifts: shifts
                .into_iter()
                .map(Shift::try_from)
                .collect::<AppResult<Vec<_>>>()?,
        }))
    }

    async fn calendar(&self, amenity_id: AmenityId, range: CalendarRange) -> AppResult<AmenityCalendar> {
        let mut conn = self
            .db
            .inner_ref()
            .acquire()
            .await
            .map_err(AppError::from_query)?;
        let amenity = find_amenity(&mut conn, amenity_id).await?;

        match amenity.model {
            AllocationModel::Unit => {
                let rows: Vec<UnitBookingRow> = sqlx::query_as(
                    r#"
                        SELECT
                            r.reservation_id,
                            r.unit_id,
                            u.name AS unit_name,
                            r.starts_at,
                            r.ends_at,
                            r.status,
                            r.resident_id
                        FROM reservations AS r
                        INNER JOIN amenity_units AS u ON r.unit_id = u.unit_id
                        WHERE r.amenity_id = $1
                          AND r.status IN ('PENDING', 'CONFIRMED')
                          AND ($2::timestamptz IS NULL OR r.ends_at > $2)
                          AND ($3::timestamptz IS NULL OR r.starts_at < $3)
                        ORDER BY u.name ASC, r.starts_at ASC
                    "#,
                )
                .bind(amenity_id)
                .bind(range.from)
                .bind(range.to)
                .fetch_all(&mut *conn)
                .await
                .map_err(AppError::from_query)?;

                rows.into_iter()
                    .map(UnitBooking::try_from)
                    .collect::<AppResult<Vec<_>>>()
                    .map(AmenityCalendar::Units)
            }
            AllocationModel::Quota => {
                let rows: Vec<ShiftOccupancyRow> = sqlx::query_as(
                    r#"
                        SELECT
                            s.shift_id,
                            s.amenity_id,
                            s.title,
                            s.starts_at,
                            s.ends_at,
                            s.capacity,
                            s.is_active,
                            COALESCE(
                                SUM(r.headcount) FILTER (WHERE r.status IN ('PENDING', 'CONFIRMED')),
                                0
                            )::BIGINT AS occupied
                        FROM amenity_shifts AS s
                        LEFT JOIN reservations AS r ON r.shift_id = s.shift_id
                        WHERE s.amenity_id = $1
                          AND s.is_active
                          AND ($2::timestamptz IS NULL OR s.ends_at > $2)
                          AND ($3::timestamptz IS NULL OR s.starts_at < $3)
                        GROUP BY s.shift_id
                        ORDER BY s.starts_at ASC
                    "#,
                )
                .bind(amenity_id)
                .bind(range.from)
                .bind(range.to)
                .fetch_all(&mut *conn)
                .await
                .map_err(AppError::from_query)?;

                rows.into_iter()
                    .map(ShiftOccupancy::try_from)
                    .collect::<AppResult<Vec<_>>>()
                    .map(AmenityCalendar::Shifts)
            }
        }
    }
}
