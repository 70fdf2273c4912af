use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

macro_rules! regex {
    ($pattern:expr) => {{
        static RE: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).unwrap());
        &RE
    }};
}

/// How a venue lays out its schedule page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Table rows with the raw date/time text and the title in the first
    /// two cells; card-list fallback for the occasional redesign.
    EventTable,
    /// One table per month under a `YYYY年M月` heading, rows holding a
    /// day-of-month cell plus title and open/start time cells (Sun Palace).
    MonthGrid,
}

pub struct Venue {
    /// Stable one-letter code used in storage file names.
    pub code: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub layout: Layout,
}

pub const VENUES: &[Venue] = &[
    Venue {
        code: "a",
        name: "マリンメッセA館",
        url: "https://www.marinemesse.or.jp/messe/event/",
        layout: Layout::EventTable,
    },
    Venue {
        code: "b",
        name: "マリンメッセB館",
        url: "https://www.marinemesse.or.jp/messe-b/event/",
        layout: Layout::EventTable,
    },
    Venue {
        code: "c",
        name: "福岡国際センター",
        url: "https://www.marinemesse.or.jp/kokusai/event/",
        layout: Layout::EventTable,
    },
    Venue {
        code: "d",
        name: "福岡国際会議場",
        url: "https://www.marinemesse.or.jp/congress/event/",
        layout: Layout::EventTable,
    },
    Venue {
        code: "e",
        name: "福岡サンパレス",
        url: "https://www.f-sunpalace.com/hall/#hallEvent",
        layout: Layout::MonthGrid,
    },
];

/// One listing as scraped, before any date logic runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub datetime_text: String,
    pub title: String,
}

/// Pulls the raw `(datetime_text, title)` rows out of a schedule page.
/// Selector misses yield an empty list, not an error; the page shapes
/// drift without notice and a venue with no recognizable rows is simply
/// reported as empty upstream.
pub fn extract_rows(layout: Layout, html: &str) -> Vec<RawRow> {
    let document = Html::parse_document(html);

    match layout {
        Layout::EventTable => extract_event_table(&document),
        Layout::MonthGrid => extract_month_grid(&document),
    }
}

fn text_of(element: ElementRef) -> String {
    let mut out = String::new();
    for piece in element.text() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out
}

fn extract_event_table(document: &Html) -> Vec<RawRow> {
    let mut rows = Vec::new();

    for row in document.select(selector!("table tr")) {
        let cells: Vec<String> = row.select(selector!("td")).map(text_of).collect();
        if cells.len() >= 2 && !cells[1].is_empty() {
            rows.push(RawRow {
                datetime_text: cells[0].clone(),
                title: cells[1].clone(),
            });
        }
    }

    if !rows.is_empty() {
        return rows;
    }

    // Card-list fallback for layout changes: leading date/time block,
    // dash, title.
    for card in document.select(selector!(".event-list .event, .events .event, .eventItem")) {
        let text = text_of(card);
        if let Some((datetime_text, title)) = [" — ", " – ", " - ", " 〜 "]
            .into_iter()
            .find_map(|sep| text.split_once(sep))
        {
            rows.push(RawRow {
                datetime_text: datetime_text.trim().to_string(),
                title: title.trim().to_string(),
            });
        }
    }

    rows
}

fn extract_month_grid(document: &Html) -> Vec<RawRow> {
    let mut rows = Vec::new();

    for table in document.select(selector!("table")) {
        let Some(month) = month_of(table) else {
            continue;
        };

        for row in table.select(selector!("tr")).skip(1) {
            let cells: Vec<String> = row.select(selector!("td, th")).map(text_of).collect();
            if cells.len() < 4 {
                continue;
            }

            let Some(day) = regex!(r"^(\d{1,2})")
                .captures(cells[0].trim())
                .and_then(|caps| caps[1].parse::<u32>().ok())
            else {
                continue;
            };

            let title = cells[1].trim();
            if title.is_empty() {
                continue;
            }

            // The start time wins over the door-open time.
            let time_text = [cells.get(4), cells.get(3)]
                .into_iter()
                .flatten()
                .find(|cell| regex!(r"\d{1,2}:\d{2}").is_match(cell.as_str()))
                .map(String::as_str)
                .unwrap_or("");

            rows.push(RawRow {
                datetime_text: format!("{month}.{day} {time_text}").trim().to_string(),
                title: title.to_string(),
            });
        }
    }

    rows
}

/// Month of a grid table, read from the nearest preceding `…YYYY年M月…` or
/// `…M月…` heading.
fn month_of(table: ElementRef) -> Option<u32> {
    table
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .take(10)
        .find_map(|element| {
            let text = text_of(element);
            regex!(r"(?:(\d{4})年)?(\d{1,2})月")
                .captures(&text)
                .and_then(|caps| caps[2].parse().ok())
        })
}
