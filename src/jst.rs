use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use once_cell::sync::Lazy;

/// The fixed civil time zone all venues publish in.
pub static JST: Lazy<FixedOffset> = Lazy::new(|| FixedOffset::east_opt(9 * 3600).unwrap());

pub fn now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&*JST)
}

pub fn today() -> NaiveDate {
    now().date_naive()
}
