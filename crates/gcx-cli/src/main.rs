//! 🚀 gcx-cli — the front door, the bouncer, the maitre d' of gcx.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config,
//! sets up logging, and then lets the library do the heavy lifting.
//! Like a manager. 🦆

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL};
use gcx::{RunOutcome, RunReport};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 📍 Load a county address-points CSV into Elasticsearch.
#[derive(Debug, Parser)]
#[command(name = "gcx", version, about)]
struct Cli {
    /// 🔧 TOML config file. `GCX_*` env vars fill in whatever it leaves out.
    /// Defaults to `gcx.toml` when it exists, env vars only when it doesn't.
    #[arg(env = "GCX_CONFIG")]
    config: Option<PathBuf>,
}

// -- 🔧 the ol' reliable
const DEFAULT_CONFIG_FILE: &str = "gcx.toml";

impl Cli {
    /// 📂 A file you named must exist. The default file is allowed to be missing.
    fn config_file(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        }
    }
}

/// 🚀 main() — where it all begins. The genesis. The big bang.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config (the moment of truth)
/// 4. Run the thing (send it and pray 🙏)
/// 5. Exit 0 on a clean run, 1 on a fatal error or on failed documents
#[tokio::main]
async fn main() -> ExitCode {
    // 📡 Set up tracing, because println! debugging is a lifestyle choice
    // we're trying to move past, like flip phones and cargo shorts. RUST_LOG picks the level.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match load_and_run(&cli).await {
        Ok((report, fail_on_partial_failure)) => {
            print_summary(&report);
            match report.outcome {
                RunOutcome::Success => ExitCode::SUCCESS,
                RunOutcome::PartialFailure if fail_on_partial_failure => {
                    error!("💀 {}", report.summary_line());
                    ExitCode::FAILURE
                }
                RunOutcome::PartialFailure => {
                    info!(
                        "⚠️ {} documents were not indexed, tolerated by configuration",
                        report.stats.num_failed
                    );
                    ExitCode::SUCCESS
                }
            }
        }
        Err(err) => {
            report_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

async fn load_and_run(cli: &Cli) -> Result<(RunReport, bool)> {
    let config_file = cli.config_file();
    let app_config = gcx::load_config(config_file.as_deref()).context(
        "💀 In gcx-cli, main, we couldn't load the config file. Take a look at it, make sure it's correct. \
         If it's a relative path, remember it's relative to wherever you ran this from.",
    )?;
    let fail_on_partial_failure = app_config.runtime.fail_on_partial_failure;
    let report = gcx::run(app_config).await?;
    Ok((report, fail_on_partial_failure))
}

/// 🧅 Peel the onion of sadness, one layer at a time, and hint at the usual suspect.
fn report_fatal(err: &anyhow::Error) {
    error!("💀 error: {}", err);
    let mut the_vibes_are_giving_connection_issues = false;
    for cause in err.chain().skip(1) {
        error!("⚠️  cause: {}", cause);
        let cause_str = cause.to_string();
        if cause_str.contains("error sending request")
            || cause_str.contains("connection refused")
            || cause_str.contains("Connection refused")
            || cause_str.contains("tcp connect error")
            || cause_str.contains("dns error")
        {
            the_vibes_are_giving_connection_issues = true;
        }
    }

    if the_vibes_are_giving_connection_issues {
        error!(
            "🔧 hint: looks like Elasticsearch isn't reachable. \
            Double-check the url in [sink_config] and that the cluster is actually running. \
            If you're using Docker, `docker ps` to see what's up. ☕"
        );
    }
}

fn print_summary(report: &RunReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["📍 gcx", ""]);
    let rows: [(&str, String); 8] = [
        ("rows read", report.pipeline.rows_read.to_string()),
        ("valid rows", report.pipeline.valid.to_string()),
        ("rows rejected", report.pipeline.diagnostics.to_string()),
        ("documents indexed", report.stats.num_indexed.to_string()),
        ("documents failed", report.stats.num_failed.to_string()),
        ("bulk requests", report.stats.num_requests.to_string()),
        ("elapsed", format!("{:.2?}", report.stats.elapsed)),
        ("docs/sec", format!("{:.0}", report.stats.docs_per_second())),
    ];
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    println!("{}", report.summary_line());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn the_one_where_a_named_file_is_taken_at_its_word() {
        let the_cli = Cli::try_parse_from(["gcx", "county.toml"]).expect("parses");
        assert_eq!(the_cli.config_file(), Some(PathBuf::from("county.toml")));
    }

    #[test]
    fn the_one_where_no_argument_means_the_default_or_nothing() {
        let the_cli = Cli { config: None };
        let the_expected = Path::new(DEFAULT_CONFIG_FILE)
            .exists()
            .then(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(the_cli.config_file(), the_expected);
    }
}
