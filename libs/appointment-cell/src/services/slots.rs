// libs/appointment-cell/src/services/slots.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{half_hour_floor, DaySchedule, Scheduled, TimeSlot};

pub const SLOT_MINUTES: i64 = 30;
pub const FIRST_SLOT_HOUR: u32 = 8;
/// 08:00 through 18:00 inclusive.
pub const SLOT_COUNT: usize = 21;

/// Start times of the bookable grid, earliest first.
pub fn slot_times() -> impl Iterator<Item = NaiveTime> {
    let first = NaiveTime::from_hms_opt(FIRST_SLOT_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    (0..SLOT_COUNT as i64).map(move |i| first + Duration::minutes(i * SLOT_MINUTES))
}

pub fn slot_labels() -> Vec<String> {
    slot_times().map(|time| time.format("%H:%M").to_string()).collect()
}

/// Buckets the day's appointments into the half-hour grid.
///
/// An appointment lands in the slot whose label equals its start time
/// rounded down to the half hour. Appointments on `day` that start outside
/// the grid go to `outside_hours`; other days are ignored. `now` only marks
/// the current slot.
pub fn generate_day_slots<T, I>(day: NaiveDate, appointments: I, now: NaiveDateTime) -> DaySchedule<T>
where
    T: Scheduled,
    I: IntoIterator<Item = T>,
{
    let mut slots: Vec<TimeSlot<T>> = slot_times()
        .map(|time| TimeSlot {
            label: time.format("%H:%M").to_string(),
            time,
            appointments: Vec::new(),
            is_current: now.date() == day
                && now.time() >= time
                && now.time() < time + Duration::minutes(SLOT_MINUTES),
        })
        .collect();
    let mut outside_hours = Vec::new();

    let mut todays: Vec<T> = appointments
        .into_iter()
        .filter(|appointment| appointment.starts_at().date() == day)
        .collect();
    todays.sort_by_key(|appointment| appointment.starts_at());

    for appointment in todays {
        let label = half_hour_floor(appointment.starts_at().time()).format("%H:%M").to_string();
        match slots.iter_mut().find(|slot| slot.label == label) {
            Some(slot) => slot.appointments.push(appointment),
            None => outside_hours.push(appointment),
        }
    }

    DaySchedule {
        date: day,
        slots,
        outside_hours,
    }
}
