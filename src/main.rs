use std::env;
use std::process;

use anyhow::Result;
use log::error;

mod cli;
mod collect;
mod dispatch;
mod fetch;
mod jst;
mod server;
mod storage;
mod venues;

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "event_notify=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}

#[tokio::main]
async fn main() {
    setup_logging();

    let command = cli::parse(env::args().skip(1).collect());

    if let Err(err) = run(command).await {
        error!("{err:#}");
        process::exit(1);
    }
}

async fn run(command: cli::Command) -> Result<()> {
    match command {
        cli::Command::Scrape {
            date,
            include_future,
        } => collect::run(date, include_future).await,

        cli::Command::Dispatch { date, dry_run } => dispatch::run(date, dry_run).await,

        cli::Command::Serve {
            address,
            enable_cache,
            cache_ttl,
        } => server::run(address, enable_cache, cache_ttl).await,
    }
}
