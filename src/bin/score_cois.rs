//! Daily COI scoring run.
//!
//! Usage: `leadqueue-score-cois [--dry-run] [--date YYYY-MM-DD] [--db PATH]`
//!
//! Prints the run envelope as JSON. Exits 0 on success, 2 when the date was
//! already scored, 1 on any other failure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;

use leadqueue_lib::coi::{run_envelope, CoiScorer, DefaultWarmth, RunRequest};
use leadqueue_lib::db::LeadDb;
use leadqueue_lib::state::load_config;

#[derive(Parser)]
#[command(name = "leadqueue-score-cois")]
#[command(about = "Score referral partners and write the daily COI queue", long_about = None)]
struct Args {
    /// Score and print without writing the queue
    #[arg(long)]
    dry_run: bool,
    /// Run date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Database path, overrides the configured one
    #[arg(long)]
    db: Option<PathBuf>,
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = load_config().context("Failed to load leadqueue config")?;

    let db_path = args
        .db
        .or_else(|| config.database_path.as_ref().map(PathBuf::from));
    let db = LeadDb::open_configured(db_path.as_deref()).context("Failed to open database")?;

    let scorer = CoiScorer::new(Box::new(DefaultWarmth {
        value: config.default_warmth,
    }));
    let request = RunRequest {
        dry_run: args.dry_run,
        run_date: args.date,
    };
    let envelope = run_envelope(
        &db,
        &scorer,
        request,
        Local::now().date_naive(),
        config.coi_top_n,
    );

    println!("{}", serde_json::to_string_pretty(&envelope.body)?);
    Ok(match envelope.status {
        200 => ExitCode::SUCCESS,
        409 => ExitCode::from(2),
        _ => ExitCode::from(1),
    })
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_flags_and_date() {
        let args = Args::try_parse_from([
            "leadqueue-score-cois",
            "--dry-run",
            "--date",
            "2024-03-01",
            "--db",
            "/tmp/leads.db",
        ])
        .expect("valid args");
        assert!(args.dry_run);
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(args.db, Some(PathBuf::from("/tmp/leads.db")));

        let bare = Args::try_parse_from(["leadqueue-score-cois"]).expect("no args");
        assert!(!bare.dry_run);
        assert!(bare.date.is_none());
    }

    #[test]
    fn rejects_bad_date_and_unknown_flags() {
        assert!(Args::try_parse_from(["leadqueue-score-cois", "--date", "03/01/2024"]).is_err());
        assert!(Args::try_parse_from(["leadqueue-score-cois", "--force"]).is_err());
    }
}
