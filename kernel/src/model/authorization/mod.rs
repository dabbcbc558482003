use crate::model::{
    access::GateEvent,
    id::{AuthorizationId, FamilyId, ResidentId},
    visitor::Visitor,
    window::TimeWindow,
};
use chrono::{DateTime, Duration, Utc};
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, Display, EnumString};

pub mod code;
pub mod event;

pub use code::AuthorizationCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatus {
    Active,
    Expired,
    Cancelled,
    Used,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitAuthorization {
    pub authorization_id: AuthorizationId,
    pub code: AuthorizationCode,
    pub visitor: Visitor,
    pub authorized_by: ResidentId,
    pub family_id: Option<FamilyId>,
    pub window: TimeWindow,
    pub status: AuthorizationStatus,
    pub entries_allowed: i32,
    pub entries_consumed: i32,
    pub is_inside: bool,
    pub qr_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of an accepted gate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub event: GateEvent,
    pub remaining: i32,
    pub status: AuthorizationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionRequest {
    Hours(i64),
    NewEndsAt(DateTime<Utc>),
}

impl VisitAuthorization {
    pub fn remaining_entries(&self) -> i32 {
        (self.entries_allowed - self.entries_consumed).max(0)
    }

    fn ensure_active(&self) -> AppResult<()> {
        if self.status != AuthorizationStatus::Active {
            return Err(AppError::InvalidState(self.status.to_string()));
        }
        Ok(())
    }

    // 退場のみ、終了後も猶予時間内であれば受け付ける
    fn admits(&self, event: GateEvent, now: DateTime<Utc>, exit_grace: Duration) -> bool {
        if now < self.window.starts_at() {
            return false;
        }
        if now <= self.window.ends_at() {
            return true;
        }
        event == GateEvent::Exit && now - self.window.ends_at() <= exit_grace
    }

    fn expire(&mut self) {
        self.status = AuthorizationStatus::Expired;
        self.is_inside = false;
    }

    /// Applies a gate event.
    ///
    /// When `now` falls outside the validity window the authorization is moved
    /// to `Expired` before `AppError::Expired` is returned, so the caller must
    /// persist the record on that failure as well.
    pub fn apply(
        &mut self,
        event: GateEvent,
        now: DateTime<Utc>,
        exit_grace: Duration,
    ) -> AppResult<AccessDecision> {
        self.ensure_active()?;

        if !self.admits(event, now, exit_grace) {
            self.expire();
            return Err(AppError::Expired);
        }

        match event {
            GateEvent::Enter => {
                if self.is_inside {
                    return Err(AppError::AlreadyInside);
                }
                if self.entries_consumed >= self.entries_allowed {
                    return Err(AppError::EntriesExhausted);
                }
                self.is_inside = true;
                self.entries_consumed += 1;
            }
            GateEvent::Exit => {
                if !self.is_inside {
                    return Err(AppError::NotInside);
                }
                self.is_inside = false;
                if self.entries_consumed >= self.entries_allowed {
                    self.status = AuthorizationStatus::Used;
                }
            }
        }

        Ok(AccessDecision {
            event,
            remaining: self.remaining_entries(),
            status: self.status,
        })
    }

    /// Moves `ends_at` forward and returns the amount it moved.
    pub fn extend(
        &mut self,
        request: ExtensionRequest,
        max_extension: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<Duration> {
        self.ensure_active()?;

        let current_end = self.window.ends_at();
        let delta = match request {
            ExtensionRequest::Hours(hours) => Duration::try_hours(hours).ok_or_else(|| {
                AppError::InvalidWindow(format!("延長時間（{hours} 時間）が範囲外です。"))
            })?,
            ExtensionRequest::NewEndsAt(ends_at) => ends_at - current_end,
        };
        if delta <= Duration::zero() {
            return Err(AppError::InvalidWindow(
                "延長後の終了時刻は現在の終了時刻より後である必要があります。".into(),
            ));
        }
        if delta > max_extension {
            return Err(AppError::InvalidWindow(format!(
                "延長は最大 {} 時間までです。",
                max_extension.num_hours()
            )));
        }

        let new_end = current_end.checked_add_signed(delta).ok_or_else(|| {
            AppError::InvalidWindow("延長後の終了時刻が範囲外です。".into())
        })?;
        if new_end <= now {
            return Err(AppError::InvalidWindow(
                "延長後の終了時刻は未来である必要があります。".into(),
            ));
        }

        self.window = TimeWindow::new(self.window.starts_at(), new_end)?;
        Ok(delta)
    }

    pub fn cancel(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        self.status = AuthorizationStatus::Cancelled;
        self.is_inside = false;
        Ok(())
    }

    /// Predicate of the expiry sweep. A visitor still inside keeps the
    /// authorization alive until the exit grace period has elapsed.
    pub fn is_stale(&self, now: DateTime<Utc>, exit_grace: Duration) -> bool {
        self.status == AuthorizationStatus::Active
            && self.window.ends_at() < now
            && (!self.is_inside
                || self
                    .window
                    .ends_at()
                    .checked_add_signed(exit_grace)
                    .is_some_and(|limit| limit < now))
    }

    /// In-memory counterpart of the storage sweep.
    pub fn sweep<'a>(
        authorizations: impl IntoIterator<Item = &'a mut VisitAuthorization>,
        now: DateTime<Utc>,
        exit_grace: Duration,
    ) -> usize {
        let mut expired = 0;
        for authorization in authorizations {
            if authorization.is_stale(now, exit_grace) {
                authorization.expire();
                expired += 1;
            }
        }
        expired
    }
}

/// Checks the window of a new authorization against the issuing rules.
pub fn validate_new_window(
    window: &TimeWindow,
    now: DateTime<Utc>,
    max_visit: Duration,
) -> AppResult<()> {
    if window.starts_at() < now {
        return Err(AppError::InvalidWindow(
            "開始時刻に過去の日時は指定できません。".into(),
        ));
    }
    if window.duration() > max_visit {
        return Err(AppError::InvalidWindow(format!(
            "訪問時間は最大 {} 時間までです。",
            max_visit.num_hours()
        )));
    }
    Ok(())
}

pub fn check_family_quota(active: i64, limit: i64) -> AppResult<()> {
    if active >= limit {
        return Err(AppError::QuotaExceeded { limit });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::{id::VisitorId, visitor::AccessMode};

    pub fn authorization(window: TimeWindow, entries_allowed: i32) -> VisitAuthorization {
        let resident = ResidentId::new();
        VisitAuthorization {
            authorization_id: AuthorizationId::new(),
            code: AuthorizationCode::generate(window.starts_at()),
            visitor: Visitor {
                visitor_id: VisitorId::new(),
                full_name: "Luis Paz".into(),
                document_id: None,
                access_mode: AccessMode::Pedestrian,
                authorized_by: resident,
            },
            authorized_by: resident,
            family_id: Some(FamilyId::new()),
            window,
            status: AuthorizationStatus::Active,
            entries_allowed,
            entries_consumed: 0,
            is_inside: false,
            qr_image: None,
            created_at: window.starts_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{fixtures::authorization, *};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 14, 0, 0).unwrap()
    }

    fn grace() -> Duration {
        Duration::minutes(30)
    }

    fn window(hours: i64) -> TimeWindow {
        TimeWindow::new(t0(), t0() + Duration::hours(hours)).unwrap()
    }

    fn assert_invariants(a: &VisitAuthorization) {
        assert!(a.entries_consumed <= a.entries_allowed);
        assert!(!a.is_inside || a.status == AuthorizationStatus::Active);
    }

    #[test]
    fn single_entry_visit_ends_used() {
        let mut a = authorization(window(4), 1);

        let entered = a.apply(GateEvent::Enter, t0() + Duration::hours(1), grace()).unwrap();
        assert_eq!(entered.remaining, 0);
        assert!(a.is_inside);
        assert_invariants(&a);

        let again = a.apply(GateEvent::Enter, t0() + Duration::hours(1), grace());
        assert!(matches!(again, Err(AppError::AlreadyInside)));
        assert_eq!(a.entries_consumed, 1);

        let left = a.apply(GateEvent::Exit, t0() + Duration::hours(2), grace()).unwrap();
        assert_eq!(left.status, AuthorizationStatus::Used);
        assert_eq!(a.status, AuthorizationStatus::Used);
        assert!(!a.is_inside);
        assert_invariants(&a);

        let after = a.apply(GateEvent::Enter, t0() + Duration::hours(3), grace());
        assert!(matches!(after, Err(AppError::InvalidState(s)) if s == "USED"));
    }

    #[test]
    fn late_entry_expires_authorization() {
        let mut a = authorization(window(1), 1);
        let res = a.apply(GateEvent::Enter, t0() + Duration::hours(2), grace());
        assert!(matches!(res, Err(AppError::Expired)));
        assert_eq!(a.status, AuthorizationStatus::Expired);
        assert_eq!(a.entries_consumed, 0);
        assert_invariants(&a);
    }

    #[test]
    fn exit_is_accepted_within_grace_only() {
        let mut inside = authorization(window(2), 1);
        inside
            .apply(GateEvent::Enter, t0() + Duration::hours(1), grace())
            .unwrap();
        let end = inside.window.ends_at();
        let left = inside
            .apply(GateEvent::Exit, end + Duration::minutes(15), grace())
            .unwrap();
        assert_eq!(left.status, AuthorizationStatus::Used);

        let mut outside = authorization(window(2), 1);
        let res = outside.apply(GateEvent::Exit, end + Duration::minutes(45), grace());
        assert!(matches!(res, Err(AppError::Expired)));
        assert_eq!(outside.status, AuthorizationStatus::Expired);
    }

    #[test]
    fn entry_past_end_is_never_graced() {
        let mut a = authorization(window(2), 2);
        let end = a.window.ends_at();
        let res = a.apply(GateEvent::Enter, end + Duration::minutes(1), grace());
        assert!(matches!(res, Err(AppError::Expired)));
    }

    #[test]
    fn expiry_clears_inside_flag() {
        let mut a = authorization(window(2), 1);
        a.apply(GateEvent::Enter, t0(), grace()).unwrap();
        let end = a.window.ends_at();
        let res = a.apply(GateEvent::Exit, end + Duration::hours(1), grace());
        assert!(matches!(res, Err(AppError::Expired)));
        assert!(!a.is_inside);
        assert_invariants(&a);
    }

    #[test]
    fn presenting_before_start_expires() {
        let mut a = authorization(window(2), 1);
        let res = a.apply(GateEvent::Enter, t0() - Duration::minutes(5), grace());
        assert!(matches!(res, Err(AppError::Expired)));
        assert_eq!(a.status, AuthorizationStatus::Expired);
    }

    #[test]
    fn exit_without_entry_is_rejected() {
        let mut a = authorization(window(2), 1);
        let res = a.apply(GateEvent::Exit, t0() + Duration::minutes(5), grace());
        assert!(matches!(res, Err(AppError::NotInside)));
        assert_eq!(a.status, AuthorizationStatus::Active);
    }

    #[test]
    fn multi_entry_counts_down_and_exhausts() {
        let mut a = authorization(window(8), 2);
        let mut now = t0();
        for expected_remaining in [1, 0] {
            let entered = a.apply(GateEvent::Enter, now, grace()).unwrap();
            assert_eq!(entered.remaining, expected_remaining);
            now += Duration::minutes(30);
            let left = a.apply(GateEvent::Exit, now, grace()).unwrap();
            assert_invariants(&a);
            if expected_remaining == 1 {
                assert_eq!(left.status, AuthorizationStatus::Active);
            }
            now += Duration::minutes(30);
        }
        assert_eq!(a.status, AuthorizationStatus::Used);
    }

    #[test]
    fn exhausted_entries_are_reported_while_active() {
        let mut a = authorization(window(8), 1);
        // 退場しないまま USED にならないケースを作る
        a.entries_consumed = 1;
        let res = a.apply(GateEvent::Enter, t0(), grace());
        assert!(matches!(res, Err(AppError::EntriesExhausted)));
    }

    #[test]
    fn extension_by_hours_moves_end_exactly() {
        let mut a = authorization(window(4), 1);
        let old_end = a.window.ends_at();
        let delta = a
            .extend(ExtensionRequest::Hours(3), Duration::hours(24), t0())
            .unwrap();
        assert_eq!(delta, Duration::hours(3));
        assert_eq!(a.window.ends_at() - old_end, Duration::hours(3));
    }

    #[test]
    fn extension_to_new_end_is_bounded() {
        let mut a = authorization(window(4), 1);
        let old_end = a.window.ends_at();
        let too_far = a.extend(
            ExtensionRequest::NewEndsAt(old_end + Duration::hours(25)),
            Duration::hours(24),
            t0(),
        );
        assert!(matches!(too_far, Err(AppError::InvalidWindow(_))));
        let backwards = a.extend(
            ExtensionRequest::NewEndsAt(old_end - Duration::hours(1)),
            Duration::hours(24),
            t0(),
        );
        assert!(matches!(backwards, Err(AppError::InvalidWindow(_))));
        assert_eq!(a.window.ends_at(), old_end);

        let ok = a
            .extend(
                ExtensionRequest::NewEndsAt(old_end + Duration::minutes(90)),
                Duration::hours(24),
                t0(),
            )
            .unwrap();
        assert_eq!(ok, Duration::minutes(90));
    }

    #[test]
    fn out_of_range_extension_is_an_invalid_window() {
        let mut a = authorization(window(4), 1);
        let old_end = a.window.ends_at();
        for hours in [i64::MAX, i64::MIN] {
            let res = a.extend(ExtensionRequest::Hours(hours), Duration::hours(24), t0());
            assert!(matches!(res, Err(AppError::InvalidWindow(_))), "{hours}");
        }
        // 上限を外しても、終了時刻が表現できなければ拒否する
        let res = a.extend(
            ExtensionRequest::Hours(2_000_000_000_000),
            Duration::max_value(),
            t0(),
        );
        assert!(matches!(res, Err(AppError::InvalidWindow(_))));
        assert_eq!(a.window.ends_at(), old_end);
        assert_eq!(a.status, AuthorizationStatus::Active);
    }

    #[test]
    fn extension_must_end_in_the_future() {
        let mut a = authorization(window(1), 1);
        let now = t0() + Duration::hours(5);
        let res = a.extend(ExtensionRequest::Hours(2), Duration::hours(24), now);
        assert!(matches!(res, Err(AppError::InvalidWindow(_))));
    }

    #[test]
    fn only_active_authorizations_extend_or_cancel() {
        let mut a = authorization(window(1), 1);
        a.cancel().unwrap();
        assert_eq!(a.status, AuthorizationStatus::Cancelled);
        assert!(matches!(a.cancel(), Err(AppError::InvalidState(_))));
        assert!(matches!(
            a.extend(ExtensionRequest::Hours(1), Duration::hours(24), t0()),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn sweep_is_idempotent_and_respects_grace_for_inside_visitors() {
        let mut stale = authorization(window(1), 1);
        let mut fresh = authorization(window(6), 1);
        let mut inside = authorization(window(1), 1);
        inside.apply(GateEvent::Enter, t0(), grace()).unwrap();

        let now = t0() + Duration::hours(1) + Duration::minutes(10);
        let mut all = vec![stale.clone(), fresh.clone(), inside.clone()];
        assert_eq!(VisitAuthorization::sweep(all.iter_mut(), now, grace()), 1);
        assert_eq!(VisitAuthorization::sweep(all.iter_mut(), now, grace()), 0);
        assert_eq!(all[0].status, AuthorizationStatus::Expired);
        assert_eq!(all[1].status, AuthorizationStatus::Active);
        assert_eq!(all[2].status, AuthorizationStatus::Active);

        let later = t0() + Duration::hours(2);
        assert_eq!(VisitAuthorization::sweep(all.iter_mut(), later, grace()), 1);
        assert!(!all[2].is_inside);
        all.iter().for_each(assert_invariants);

        stale.status = AuthorizationStatus::Cancelled;
        fresh.status = AuthorizationStatus::Used;
        assert!(!stale.is_stale(later, grace()));
        assert!(!fresh.is_stale(later, grace()));
    }

    #[test]
    fn new_windows_must_start_now_or_later_and_fit_max_visit() {
        let now = t0();
        let past = TimeWindow::new(now - Duration::minutes(1), now + Duration::hours(1)).unwrap();
        assert!(validate_new_window(&past, now, Duration::hours(12)).is_err());
        let long = TimeWindow::new(now, now + Duration::hours(13)).unwrap();
        assert!(validate_new_window(&long, now, Duration::hours(12)).is_err());
        let ok = TimeWindow::new(now, now + Duration::hours(4)).unwrap();
        assert!(validate_new_window(&ok, now, Duration::hours(12)).is_ok());
    }

    #[test]
    fn quota_rejects_at_limit() {
        assert!(check_family_quota(9, 10).is_ok());
        assert!(matches!(
            check_family_quota(10, 10),
            Err(AppError::QuotaExceeded { limit: 10 })
        ));
    }
}
