use chrono::{DateTime, NaiveTime, Utc};
use garde::Validate;
use kernel::model::{
    amenity::{
        event::{AmenityListOptions, CalendarRange, CreateAmenity, CreateShift, CreateUnit},
        AllocationModel, Amenity, AmenityCalendar, AmenityDetail, Shift, ShiftOccupancy, Unit,
        UnitBooking,
    },
    id::{AmenityId, ReservationId, ResidentId, ShiftId, UnitId},
    window::TimeWindow,
};
use serde::{Deserialize, Serialize};
use shared::error::AppResult;

use super::reservation::ReservationStatusName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationModelName {
    Unit,
    Quota,
}

impl From<AllocationModel> for AllocationModelName {
    fn from(value: AllocationModel) -> Self {
        match value {
            AllocationModel::Unit => Self::Unit,
            AllocationModel::Quota => Self::Quota,
        }
    }
}

impl From<AllocationModelName> for AllocationModel {
    fn from(value: AllocationModelName) -> Self {
        match value {
            AllocationModelName::Unit => Self::Unit,
            AllocationModelName::Quota => Self::Quota,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmenityRequest {
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(skip)]
    pub model: AllocationModelName,
    #[garde(skip)]
    #[serde(default)]
    pub description: String,
    #[garde(skip)]
    #[serde(default)]
    pub rules: String,
    #[garde(skip)]
    pub opens_at: Option<NaiveTime>,
    #[garde(skip)]
    pub closes_at: Option<NaiveTime>,
}

impl From<CreateAmenityRequest> for CreateAmenity {
    fn from(value: CreateAmenityRequest) -> Self {
        let CreateAmenityRequest {
            name,
            model,
            description,
            rules,
            opens_at,
            closes_at,
        } = value;
        CreateAmenity::new(name, model.into(), description, rules, opens_at, closes_at)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnitRequest {
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(skip)]
    #[serde(default)]
    pub description: String,
}

impl CreateUnitRequest {
    pub fn into_event(self, amenity_id: AmenityId) -> CreateUnit {
        CreateUnit::new(amenity_id, self.name, self.description)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShiftRequest {
    #[garde(length(min = 1, max = 255))]
    pub title: String,
    #[garde(skip)]
    pub starts_at: DateTime<Utc>,
    #[garde(skip)]
    pub ends_at: DateTime<Utc>,
    #[garde(range(min = 1))]
    pub capacity: i32,
}

impl CreateShiftRequest {
    pub fn into_event(self, amenity_id: AmenityId) -> AppResult<CreateShift> {
        Ok(CreateShift::new(
            amenity_id,
            self.title,
            TimeWindow::new(self.starts_at, self.ends_at)?,
            self.capacity,
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenityListQuery {
    pub is_active: Option<bool>,
    pub model: Option<AllocationModelName>,
}

impl From<AmenityListQuery> for AmenityListOptions {
    fn from(value: AmenityListQuery) -> Self {
        AmenityListOptions {
            is_active: value.is_active,
            model: value.model.map(AllocationModel::from),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<CalendarQuery> for CalendarRange {
    fn from(value: CalendarQuery) -> Self {
        CalendarRange::new(value.from, value.to)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenityResponse {
    pub amenity_id: AmenityId,
    pub name: String,
    pub model: AllocationModelName,
    pub description: String,
    pub rules: String,
    pub is_active: bool,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
}

impl From<Amenity> for AmenityResponse {
    fn from(value: Amenity) -> Self {
        let Amenity {
            amenity_id,
            name,
            model,
            description,
            rules,
            is_active,
            opens_at,
            closes_at,
        } = value;
        Self {
            amenity_id,
            name,
            model: model.into(),
            description,
            rules,
            is_active,
            opens_at,
            closes_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenitiesResponse {
    pub items: Vec<AmenityResponse>,
}

impl From<Vec<Amenity>> for AmenitiesResponse {
    fn from(value: Vec<Amenity>) -> Self {
        Self {
            items: value.into_iter().map(AmenityResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitResponse {
    pub unit_id: UnitId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

impl From<Unit> for UnitResponse {
    fn from(value: Unit) -> Self {
        let Unit {
            unit_id,
            amenity_id: _,
            name,
            description,
            is_active,
        } = value;
        Self {
            unit_id,
            name,
            description,
            is_active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftResponse {
    pub shift_id: ShiftId,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i32,
    pub is_active: bool,
}

impl From<Shift> for ShiftResponse {
    fn from(value: Shift) -> Self {
        let Shift {
            shift_id,
            amenity_id: _,
            title,
            window,
            capacity,
            is_active,
        } = value;
        Self {
            shift_id,
            title,
            starts_at: window.starts_at(),
            ends_at: window.ends_at(),
            capacity,
            is_active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenityDetailResponse {
    #[serde(flatten)]
    pub amenity: AmenityResponse,
    pub units: Vec<UnitResponse>,
    pub shifts: Vec<ShiftResponse>,
}

impl From<AmenityDetail> for AmenityDetailResponse {
    fn from(value: AmenityDetail) -> Self {
        let AmenityDetail {
            amenity,
            units,
            shifts,
        } = value;
        Self {
            amenity: amenity.into(),
            units: units.into_iter().map(UnitResponse::from).collect(),
            shifts: shifts.into_iter().map(ShiftResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBookingResponse {
    pub reservation_id: ReservationId,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ReservationStatusName,
    pub resident_id: ResidentId,
}

impl From<UnitBooking> for UnitBookingResponse {
    fn from(value: UnitBooking) -> Self {
        let UnitBooking {
            reservation_id,
            unit_id,
            unit_name,
            window,
            status,
            resident_id,
        } = value;
        Self {
            reservation_id,
            unit_id,
            unit_name,
            starts_at: window.starts_at(),
            ends_at: window.ends_at(),
            status: status.into(),
            resident_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftOccupancyResponse {
    #[serde(flatten)]
    pub shift: ShiftResponse,
    pub occupied: i64,
    pub available: i64,
}

impl From<ShiftOccupancy> for ShiftOccupancyResponse {
    fn from(value: ShiftOccupancy) -> Self {
        let available = value.available();
        Self {
            shift: value.shift.into(),
            occupied: value.occupied,
            available,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "model", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarResponse {
    Unit { bookings: Vec<UnitBookingResponse> },
    Quota { shifts: Vec<ShiftOccupancyResponse> },
}

impl From<AmenityCalendar> for CalendarResponse {
    fn from(value: AmenityCalendar) -> Self {
        match value {
            AmenityCalendar::Units(bookings) => Self::Unit {
                bookings: bookings.into_iter().map(UnitBookingResponse::from).collect(),
            },
            AmenityCalendar::Shifts(shifts) => Self::Quota {
                shifts: shifts.into_iter().map(ShiftOccupancyResponse::from).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn quota_calendar_reports_availability() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let shift = Shift {
            shift_id: ShiftId::new(),
            amenity_id: AmenityId::new(),
            title: "Mañana".into(),
            window: TimeWindow::new(start, start + Duration::hours(2)).unwrap(),
            capacity: 20,
            is_active: true,
        };
        let calendar = AmenityCalendar::Shifts(vec![ShiftOccupancy {
            shift,
            occupied: 18,
        }]);
        let json = serde_json::to_value(CalendarResponse::from(calendar)).unwrap();
        assert_eq!(json["model"], "QUOTA");
        assert_eq!(json["shifts"][0]["capacity"], 20);
        assert_eq!(json["shifts"][0]["available"], 2);
    }
}
