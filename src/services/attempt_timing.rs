use time::{Duration, PrimitiveDateTime};

pub(crate) fn attempt_deadline(
    started_at: PrimitiveDateTime,
    time_limit_minutes: i32,
) -> PrimitiveDateTime {
    started_at + Duration::minutes(time_limit_minutes as i64)
}

pub(crate) fn is_overdue(
    deadline: PrimitiveDateTime,
    now: PrimitiveDateTime,
    grace_seconds: u64,
) -> bool {
    now > deadline + Duration::seconds(grace_seconds as i64)
}

/// Whole seconds until the deadline, floored at zero.
pub(crate) fn remaining_seconds(deadline: PrimitiveDateTime, now: PrimitiveDateTime) -> i64 {
    (deadline - now).whole_seconds().max(0)
}

pub(crate) fn time_spent_seconds(
    started_at: PrimitiveDateTime,
    ended_at: PrimitiveDateTime,
) -> i64 {
    (ended_at - started_at).whole_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn deadline_adds_the_time_limit() {
        let started = datetime!(2025-03-01 12:00:00);
        assert_eq!(attempt_deadline(started, 30), datetime!(2025-03-01 12:30:00));
    }

    #[test]
    fn overdue_only_past_deadline_plus_grace() {
        let deadline = datetime!(2025-03-01 12:30:00);
        assert!(!is_overdue(deadline, datetime!(2025-03-01 12:30:00), 0));
        assert!(is_overdue(deadline, datetime!(2025-03-01 12:30:01), 0));
        assert!(!is_overdue(deadline, datetime!(2025-03-01 12:34:59), 300));
        assert!(is_overdue(deadline, datetime!(2025-03-01 12:35:01), 300));
    }

    #[test]
    fn remaining_seconds_floors_at_zero() {
        let deadline = datetime!(2025-03-01 12:30:00);
        assert_eq!(remaining_seconds(deadline, datetime!(2025-03-01 12:29:00)), 60);
        assert_eq!(remaining_seconds(deadline, datetime!(2025-03-01 12:31:00)), 0);
    }

    #[test]
    fn time_spent_never_negative() {
        let started = datetime!(2025-03-01 12:00:00);
        assert_eq!(time_spent_seconds(started, datetime!(2025-03-01 12:01:30)), 90);
        assert_eq!(time_spent_seconds(started, datetime!(2025-03-01 11:59:00)), 0);
    }
}
