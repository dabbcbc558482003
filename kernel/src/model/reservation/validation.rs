use crate::model::{
    amenity::Shift,
    id::ReservationId,
    reservation::ReservationStatus,
    window::TimeWindow,
};
use shared::error::{AppError, AppResult};

/// 同じ区画に入っている既存予約
#[derive(Debug, Clone, Copy)]
pub struct UnitHold {
    pub reservation_id: ReservationId,
    pub window: TimeWindow,
    pub status: ReservationStatus,
}

/// 同じ時間枠に入っている既存予約
#[derive(Debug, Clone, Copy)]
pub struct ShiftHold {
    pub reservation_id: ReservationId,
    pub headcount: i32,
    pub status: ReservationStatus,
}

/// Rejects a unit claim whose window overlaps a live reservation of the same unit.
/// Touching boundaries are not an overlap.
pub fn check_unit_availability(
    candidate: &TimeWindow,
    status: ReservationStatus,
    existing: &[UnitHold],
    excluding: Option<ReservationId>,
) -> AppResult<()> {
    // 取消済みの予約は何も占有しない
    if !status.holds_capacity() {
        return Ok(());
    }
    let clash = existing.iter().find(|hold| {
        Some(hold.reservation_id) != excluding
            && hold.status.holds_capacity()
            && hold.window.overlaps(candidate)
    });
    match clash {
        Some(hold) => Err(AppError::Overlap(format!(
            "区画は {} から {} まですでに予約されています。",
            hold.window.starts_at(),
            hold.window.ends_at()
        ))),
        None => Ok(()),
    }
}

/// Seats still free in `shift`, ignoring the reservation being edited.
pub fn shift_available(shift: &Shift, existing: &[ShiftHold], excluding: Option<ReservationId>) -> i64 {
    let occupied: i64 = existing
        .iter()
        .filter(|hold| Some(hold.reservation_id) != excluding && hold.status.holds_capacity())
        .map(|hold| i64::from(hold.headcount))
        .sum();
    (i64::from(shift.capacity) - occupied).max(0)
}

pub fn check_shift_capacity(
    shift: &Shift,
    existing: &[ShiftHold],
    headcount: i32,
    status: ReservationStatus,
    excluding: Option<ReservationId>,
) -> AppResult<()> {
    // 取消は定員を使わないので、停止中の時間枠でも受け付ける
    if !status.holds_capacity() {
        return Ok(());
    }
    if !shift.is_active {
        return Err(AppError::EntityNotFound(format!(
            "時間枠（{}）は利用できません。",
            shift.shift_id
        )));
    }
    let available = shift_available(shift, existing, excluding);
    let requested = i64::from(headcount);
    if requested > available {
        return Err(AppError::CapacityExceeded {
            requested,
            available,
        });
    }
    Ok(())
}
