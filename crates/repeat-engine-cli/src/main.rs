//! `nextdate` — compute the next due date of a recurring task.
//!
//! ```text
//! nextdate --date 20240115 --repeat "m -1" --now 20240301
//! 20240331
//! ```
//!
//! Errors go to stderr with a non-zero exit code; stdout only ever carries
//! the result.

use anyhow::{Context, Result};
use clap::Parser;
use repeat_engine::{CalendarDate, Evaluator, EvaluatorConfig, DEFAULT_MONTH_SEARCH_LIMIT};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "nextdate",
    version,
    about = "Compute the next due date of a recurring task"
)]
struct Cli {
    /// Task date (YYYYMMDD)
    #[arg(short, long)]
    date: String,

    /// Repeat rule: "d N", "y", "w 1,3", "m 1,-1 [1,6]"
    #[arg(short, long)]
    repeat: String,

    /// Reference date (YYYYMMDD), defaults to today in local time
    #[arg(short, long)]
    now: Option<String>,

    /// Months a monthly rule may search before giving up
    #[arg(long, default_value_t = DEFAULT_MONTH_SEARCH_LIMIT)]
    month_search_limit: u32,

    /// Print a JSON object instead of the bare date
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct NextDateOutput<'a> {
    date: &'a str,
    repeat: &'a str,
    now: CalendarDate,
    next_date: CalendarDate,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let now = match cli.now.as_deref() {
        Some(now) => CalendarDate::parse(now).context("Invalid --now")?,
        None => chrono::Local::now().date_naive().into(),
    };

    let evaluator = Evaluator::new(EvaluatorConfig {
        month_search_limit: cli.month_search_limit,
    });
    let next = evaluator
        .next_date(&cli.date, now, &cli.repeat)
        .with_context(|| format!("Cannot compute next date for '{}'", cli.repeat))?;

    tracing::debug!(date = %cli.date, repeat = %cli.repeat, %now, %next, "computed next date");

    if cli.json {
        let output = NextDateOutput {
            date: &cli.date,
            repeat: &cli.repeat,
            now,
            next_date: next,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{next}");
    }

    Ok(())
}
