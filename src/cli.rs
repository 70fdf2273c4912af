use std::env;
use std::net::SocketAddr;
use std::process;

use chrono::NaiveDate;
use getopts::{Matches, Options};
use tokio::time::Duration;

pub enum Command {
    Scrape {
        date: Option<NaiveDate>,
        include_future: bool,
    },
    Dispatch {
        date: Option<NaiveDate>,
        dry_run: bool,
    },
    Serve {
        address: SocketAddr,
        enable_cache: bool,
        cache_ttl: Duration,
    },
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "d",
        "date",
        "Target date as YYYY-MM-DD [Default: today in JST]",
        "DATE",
    );
    opts.optflag(
        "F",
        "include-future",
        "scrape: keep events beyond the target date [Default: false]",
    );
    opts.optflag(
        "n",
        "dry-run",
        "dispatch: print the message without sending it [Default: false]",
    );
    opts.optopt(
        "a",
        "address",
        "serve: socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optflag(
        "c",
        "enable-cache",
        "serve: enable caching of aggregated days [Default: false]",
    );
    opts.optopt(
        "t",
        "cache-ttl",
        "serve: time-to-live for cached days [Default: 3600]",
        "SECONDS",
    );
    opts
}

fn usage(opts: &Options) -> String {
    let brief = format!(
        "Usage: {} scrape|dispatch|serve [options]",
        env!("CARGO_PKG_NAME")
    );
    opts.usage(&brief)
}

fn target_date(matches: &Matches) -> Option<NaiveDate> {
    let raw = matches
        .opt_str("date")
        .or_else(|| env::var("EVENT_NOTIFY_TARGET_DATE").ok())?;

    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            eprintln!("Provided value for option 'date' is invalid: {err}");
            process::exit(1);
        }
    }
}

pub fn parse(args: Vec<String>) -> Command {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", usage(&opts));
        process::exit(0);
    }

    match matches.free.first().map(String::as_str) {
        Some("scrape") => Command::Scrape {
            date: target_date(&matches),
            include_future: matches.opt_present("include-future"),
        },

        Some("dispatch") => Command::Dispatch {
            date: target_date(&matches),
            dry_run: matches.opt_present("dry-run"),
        },

        Some("serve") => {
            let address =
                match matches.opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
                {
                    Ok(address) => address,
                    Err(err) => {
                        eprintln!("Provided value for option 'address' is invalid: {err}");
                        process::exit(1);
                    }
                };

            let cache_ttl = match matches.opt_get_default("cache-ttl", 3600) {
                Ok(secs) => Duration::from_secs(secs),
                Err(err) => {
                    eprintln!("Provided value for option 'cache-ttl' is invalid: {err}");
                    process::exit(1);
                }
            };

            Command::Serve {
                address,
                enable_cache: matches.opt_present("enable-cache"),
                cache_ttl,
            }
        }

        Some(other) => {
            eprintln!("Unknown command '{other}'\n\n{}", usage(&opts));
            process::exit(1);
        }

        None => {
            eprintln!("{}", usage(&opts));
            process::exit(1);
        }
    }
}
