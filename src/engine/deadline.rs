use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::config::DeadlinePolicy;

/// Instant a shoot starts. A date without a time counts from midnight UTC, so
/// a deadline before it is also before the calendar day itself.
pub fn scheduled_start(date: NaiveDate, time: Option<NaiveTime>) -> DateTime<Utc> {
    date.and_time(time.unwrap_or_default()).and_utc()
}

/// Response deadline for an offer made at `assigned_at`.
///
/// Without a shoot date the photographer gets the full response window. With
/// one, the deadline is the earlier of the window end and `margin` before the
/// shoot; when that leaves no room, the midpoint between assignment and shoot
/// is used. Returns `None` if the shoot does not start after `assigned_at`
/// or the window runs past the representable calendar.
pub fn compute_deadline(
    policy: &DeadlinePolicy,
    assigned_at: DateTime<Utc>,
    shoot_start: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    let window_end = assigned_at.checked_add_signed(policy.response_window)?;

    let Some(start) = shoot_start else {
        return (window_end > assigned_at).then_some(window_end);
    };
    if start <= assigned_at {
        return None;
    }

    let candidate = start
        .checked_sub_signed(policy.margin_before_shoot)
        .map(|latest| window_end.min(latest));
    if let Some(candidate) = candidate.filter(|c| *c > assigned_at && *c < start) {
        return Some(candidate);
    }

    let midpoint = assigned_at + (start - assigned_at) / 2;
    (midpoint > assigned_at && midpoint < start).then_some(midpoint)
}
