use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `HH:MM` on the wire, `null` when the time is undetermined.
#[cfg(feature = "serde")]
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_str(&time.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// One normalized day-level event before deduplication. An absent `time`
/// means the listing gave no usable clock time; downstream renders it as
/// "time undetermined" rather than midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventDraft {
    pub date: NaiveDate,
    #[cfg_attr(feature = "serde", serde(with = "hhmm"))]
    pub time: Option<NaiveTime>,
    pub title: String,
    pub venue: String,
}

/// An [`EventDraft`] that survived deduplication, carrying its content hash
/// and the extraction timestamp. Never mutated; the next run supersedes it
/// wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdentifiedEvent {
    pub date: NaiveDate,
    #[cfg_attr(feature = "serde", serde(with = "hhmm"))]
    pub time: Option<NaiveTime>,
    pub title: String,
    pub venue: String,
    pub hash: String,
    pub extracted_at: DateTime<FixedOffset>,
}

impl IdentifiedEvent {
    #[must_use]
    pub fn draft(&self) -> EventDraft {
        EventDraft {
            date: self.date,
            time: self.time,
            title: self.title.clone(),
            venue: self.venue.clone(),
        }
    }
}

/// One concrete `(date, optional time)` slot recognized by the token
/// grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

/// The recognized shape of one raw date/time field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Nothing date-like in the text.
    Empty,
    /// Individual dates, each with its own optional time.
    Slots(Vec<Slot>),
    /// Consecutive calendar days sharing one representative start time.
    Span {
        days: Vec<NaiveDate>,
        start: Option<NaiveTime>,
    },
}

impl Schedule {
    /// Expands the recognized expression into day-level drafts carrying
    /// `title` and `venue` through unchanged.
    #[must_use]
    pub fn materialize(self, title: &str, venue: &str) -> Vec<EventDraft> {
        let draft = |date: NaiveDate, time: Option<NaiveTime>| EventDraft {
            date,
            time,
            title: title.to_string(),
            venue: venue.to_string(),
        };

        match self {
            Schedule::Empty => Vec::new(),
            Schedule::Slots(slots) => slots
                .into_iter()
                .map(|slot| draft(slot.date, slot.time))
                .collect(),
            Schedule::Span { days, start } => {
                days.into_iter().map(|date| draft(date, start)).collect()
            }
        }
    }
}
