//! Human-facing reference numbers: `<PREFIX>-<YYYYMMDD>-<6 hex chars>`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

fn reference(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), suffix)
}

pub fn appointment_number(now: DateTime<Utc>) -> String {
    reference("APT", now)
}

pub fn invoice_number(now: DateTime<Utc>) -> String {
    reference("INV", now)
}

pub fn transaction_id(now: DateTime<Utc>) -> String {
    reference("TXN", now)
}
