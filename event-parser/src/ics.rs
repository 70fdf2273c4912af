use chrono::Duration;
use ics::components::Parameter;
use ics::properties::{DtEnd, DtStart, Location, Summary, TzName};
use ics::{ICalendar, Standard, TimeZone};

use crate::IdentifiedEvent;

/// JST has no daylight saving, so a single standard block is enough.
fn jst() -> TimeZone<'static> {
    let mut standard = Standard::new("19700101T000000", "+0900", "+0900");
    standard.push(TzName::new("JST"));
    TimeZone::standard("Asia/Tokyo", standard)
}

/// Builds a calendar named `name` over `events`, which should already be
/// deduplicated and sorted.
pub fn events_to_ics<'a, I>(name: &'a str, events: I) -> ICalendar<'a>
where
    I: IntoIterator<Item = &'a IdentifiedEvent>,
{
    let mut icalendar = ICalendar::new("2.0", name);
    icalendar.add_timezone(jst());

    for event in events {
        icalendar.add_event(event.to_ics());
    }

    icalendar
}

impl IdentifiedEvent {
    /// Timed listings become one-hour blocks (the sources publish start
    /// times only); time-undetermined listings become all-day events rather
    /// than pretending to start at midnight.
    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'_> {
        let stamp = self.extracted_at.format("%Y%m%dT%H%M%S").to_string();
        let mut ics_event = ics::Event::new(self.hash.clone(), stamp);

        match self.time {
            Some(time) => {
                let begin = self.date.and_time(time);
                let finish = begin + Duration::hours(1);
                ics_event.push(DtStart::new(begin.format("%Y%m%dT%H%M%S").to_string()));
                ics_event.push(DtEnd::new(finish.format("%Y%m%dT%H%M%S").to_string()));
            }
            None => {
                let mut all_day = DtStart::new(self.date.format("%Y%m%d").to_string());
                all_day.add(Parameter::new("VALUE", "DATE"));
                ics_event.push(all_day);
            }
        }

        ics_event.push(Summary::new(ics::escape_text(self.title.clone())));
        ics_event.push(Location::new(ics::escape_text(self.venue.clone())));

        ics_event
    }
}
