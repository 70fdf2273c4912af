mod parser;
mod pipeline;
mod structs;
mod text;

#[cfg(feature = "ics")]
mod ics;

#[cfg(feature = "ics")]
pub use crate::ics::events_to_ics;
pub use parser::parse_schedule;
pub use pipeline::{dedupe_and_hash, sort_events};
pub use structs::{EventDraft, IdentifiedEvent, Schedule, Slot};
pub use text::canonicalize;
