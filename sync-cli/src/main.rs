mod cli;

use std::process::ExitCode;

use clap::Parser;

use avm_sync_core::{self as core, EngineConfig, RunSummary};

use cli::args::Cli;

fn print_summary(summary: &RunSummary) {
    let category = summary.category.unwrap_or("unknown");
    core::report::info(
        category,
        format!(
            "seen={} filtered_in={} filtered_out={} fetch_failures={} prs_created={} prs_skipped_clean={} errors={}",
            summary.seen,
            summary.filtered_in,
            summary.filtered_out,
            summary.fetch_failures,
            summary.prs_created,
            summary.prs_skipped_clean,
            summary.errors,
        ),
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    core::report::set_debug(cli.debug);

    let config = match EngineConfig::build(cli.into()) {
        Ok(config) => config,
        Err(err) => {
            core::report::error("startup", err.to_string());
            return ExitCode::FAILURE;
        }
    };

    let summaries = match core::orchestrator::run(&config).await {
        Ok(summaries) => summaries,
        Err(err) => {
            // Destination-repo-open failure is startup-fatal per spec.md §6/§7,
            // distinct from the per-module errors folded into each RunSummary.
            core::report::error("startup", err.to_string());
            return ExitCode::FAILURE;
        }
    };
    for summary in &summaries {
        print_summary(summary);
    }

    // Per spec.md §6 "Exit codes": 0 on normal completion even if some
    // modules failed; only startup-level errors (handled above) are non-zero.
    ExitCode::SUCCESS
}
