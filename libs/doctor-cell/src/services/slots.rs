//! Bookable slot computation from a doctor's availability windows.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{DoctorAvailability, TimeSlot};

/// Appointment statuses that hold a slot.
pub const ACTIVE_APPOINTMENT_STATUSES: [&str; 3] = ["pending", "confirmed", "rescheduled"];

/// Day index used by `doctor_availabilities.day_of_week`.
pub fn weekday_index(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_monday() as i32
}

/// Windows that apply on `date`: same weekday, marked available, and
/// inside their validity range.
pub fn windows_on(windows: &[DoctorAvailability], date: NaiveDate) -> impl Iterator<Item = &DoctorAvailability> {
    let day = weekday_index(date);
    windows
        .iter()
        .filter(move |w| w.day_of_week == day && w.is_available && w.is_valid_on(date))
}

pub fn format_slot(time: NaiveTime) -> TimeSlot {
    TimeSlot {
        start: time.format("%H:%M").to_string(),
        formatted: time.format("%I:%M %p").to_string(),
    }
}

/// Step every applicable window in `slot_minutes` increments
/// (`start <= t < end`), dropping slots already past on today's date and
/// slots held by an active appointment. Sorted and de-duplicated.
pub fn generate_slots(
    windows: &[DoctorAvailability],
    date: NaiveDate,
    now: NaiveDateTime,
    slot_minutes: i64,
    booked: &HashSet<NaiveTime>,
) -> Vec<TimeSlot> {
    let step = Duration::minutes(slot_minutes.max(1));
    let mut slots = BTreeMap::new();

    for window in windows_on(windows, date) {
        let end = date.and_time(window.end_time);
        let mut current = date.and_time(window.start_time);

        while current < end {
            let time = current.time();
            let in_past = date == now.date() && time < now.time();

            if !in_past && !booked.contains(&time) {
                slots.entry(time).or_insert_with(|| format_slot(time));
            }

            current += step;
        }
    }

    slots.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2024-03-04 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
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
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            valid_to: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn starts(slots: &[TimeSlot]) -> Vec<&str> {
        slots.iter().map(|s| s.start.as_str()).collect()
    }

    fn earlier_day() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_time(t(12, 0))
    }

    #[test]
    fn window_is_stepped_half_hourly_excluding_end() {
        let windows = vec![window(0, t(9, 0), t(11, 0))];
        let slots = generate_slots(&windows, monday(), earlier_day(), 30, &HashSet::new());
        assert_eq!(starts(&slots), vec!["09:00", "09:30", "10:00", "10:30"]);
        assert_eq!(slots[0].formatted, "09:00 AM");
    }

    #[test]
    fn booked_and_past_slots_are_removed() {
        let windows = vec![window(0, t(9, 0), t(11, 0))];
        let booked: HashSet<_> = [t(10, 0)].into_iter().collect();
        let now = monday().and_time(t(9, 15));
        let slots = generate_slots(&windows, monday(), now, 30, &booked);
        assert_eq!(starts(&slots), vec!["09:30", "10:30"]);
    }

    #[test]
    fn other_weekdays_and_expired_windows_are_ignored() {
        let mut expired = window(0, t(14, 0), t(15, 0));
        expired.valid_to = NaiveDate::from_ymd_opt(2024, 2, 1);
        let mut off = window(0, t(16, 0), t(17, 0));
        off.is_available = false;
        let windows = vec![window(1, t(9, 0), t(10, 0)), expired, off];
        assert!(generate_slots(&windows, monday(), earlier_day(), 30, &HashSet::new()).is_empty());
    }

    #[test]
    fn overlapping_windows_are_deduplicated_and_sorted() {
        let windows = vec![window(0, t(13, 0), t(14, 0)), window(0, t(9, 0), t(10, 0)), window(0, t(9, 30), t(10, 30))];
        let slots = generate_slots(&windows, monday(), earlier_day(), 30, &HashSet::new());
        assert_eq!(starts(&slots), vec!["09:00", "09:30", "10:00", "13:00", "13:30"]);
        assert_eq!(slots[3].formatted, "01:00 PM");
    }

    #[test]
    fn window_ending_at_midnight_does_not_wrap() {
        let windows = vec![window(0, t(23, 0), t(23, 59))];
        let slots = generate_slots(&windows, monday(), earlier_day(), 30, &HashSet::new());
        assert_eq!(starts(&slots), vec!["23:00", "23:30"]);
    }

    #[test]
    fn weekday_index_starts_on_monday() {
        assert_eq!(weekday_index(monday()), 0);
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()), 6);
    }
}
