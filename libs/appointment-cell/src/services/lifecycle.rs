use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use doctor_cell::models::DoctorAvailability;
use doctor_cell::services::slots::windows_on;

use crate::models::{AppointmentError, AppointmentStatus};

/// Reject dates before today and, for today, times before now.
pub fn ensure_not_past(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> Result<(), AppointmentError> {
    if date < now.date() {
        return Err(AppointmentError::InvalidTime(
            "Appointment date cannot be in the past.".to_string(),
        ));
    }
    if date == now.date() && time < now.time() {
        return Err(AppointmentError::InvalidTime(
            "Appointment time cannot be in the past for today's date.".to_string(),
        ));
    }
    Ok(())
}

/// Booking accepts a start time inside a window, end exclusive.
pub fn booking_window_admits(windows: &[DoctorAvailability], date: NaiveDate, time: NaiveTime) -> bool {
    windows_on(windows, date).any(|w| w.start_time <= time && time < w.end_time)
}

/// Rescheduling accepts any time inside a window, both ends included.
pub fn reschedule_window_admits(windows: &[DoctorAvailability], date: NaiveDate, time: NaiveTime) -> bool {
    windows_on(windows, date).any(|w| w.covers(time))
}

pub fn end_time_for(start: NaiveTime, slot_minutes: i64) -> NaiveTime {
    let (end, _) = start.overflowing_add_signed(Duration::minutes(slot_minutes));
    end
}

/// Completed and cancelled appointments are final; any other status may
/// move to any known status.
pub fn validate_status_transition(
    current: AppointmentStatus,
    next: AppointmentStatus,
) -> Result<(), AppointmentError> {
    debug!("Validating status transition from {} to {}", current, next);

    if current.is_terminal() && current != next {
        warn!("Invalid status transition attempted: {} -> {}", current, next);
        return Err(AppointmentError::InvalidStatusTransition(current));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window(day: i32, start: NaiveTime, end: NaiveTime) -> DoctorAvailability {
        DoctorAvailability {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            day_of_week: day,
            start_time: start,
            end_time: end,
            is_available: true,
            recurring: true,
            valid_from: d(2024, 1, 1),
            valid_to: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn past_dates_and_times_are_rejected() {
        let now = d(2024, 3, 4).and_time(t(10, 0));
        assert_matches!(ensure_not_past(d(2024, 3, 3), t(11, 0), now), Err(AppointmentError::InvalidTime(_)));
        assert_matches!(ensure_not_past(d(2024, 3, 4), t(9, 59), now), Err(AppointmentError::InvalidTime(_)));
        assert!(ensure_not_past(d(2024, 3, 4), t(10, 0), now).is_ok());
        assert!(ensure_not_past(d(2024, 3, 5), t(8, 0), now).is_ok());
    }

    #[test]
    fn window_end_is_exclusive_for_booking_only() {
        // 2024-03-04 is a Monday.
        let windows = vec![window(0, t(9, 0), t(12, 0))];
        assert!(booking_window_admits(&windows, d(2024, 3, 4), t(9, 0)));
        assert!(!booking_window_admits(&windows, d(2024, 3, 4), t(12, 0)));
        assert!(reschedule_window_admits(&windows, d(2024, 3, 4), t(12, 0)));
        assert!(!reschedule_window_admits(&windows, d(2024, 3, 5), t(10, 0)));
    }

    #[test]
    fn end_time_adds_slot_length() {
        assert_eq!(end_time_for(t(9, 30), 30), t(10, 0));
        assert_eq!(end_time_for(t(23, 45), 30), t(0, 15));
    }

    #[test]
    fn terminal_statuses_cannot_change() {
        assert!(validate_status_transition(AppointmentStatus::Pending, AppointmentStatus::Completed).is_ok());
        assert!(validate_status_transition(AppointmentStatus::Completed, AppointmentStatus::Completed).is_ok());
        assert_matches!(
            validate_status_transition(AppointmentStatus::Cancelled, AppointmentStatus::Confirmed),
            Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Cancelled))
        );
    }
}
