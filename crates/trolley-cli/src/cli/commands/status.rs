use super::exit_codes;
use crate::cli::args::{DeleteArgs, RescoreArgs, StatusArgs};
use std::path::Path;
use trolley_core::engine::rescore_run;
use trolley_core::errors::StoreError;
use trolley_core::report::console;
use trolley_core::score;
use trolley_core::storage::VoteStore;

pub fn cmd_status(args: StatusArgs, db: &Path) -> anyhow::Result<i32> {
    let store = super::open_store(db)?;

    let Some(run_id) = args.run else {
        let runs = store.list_runs(&[])?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&runs)?);
        } else {
            let stats = store.stats_best_effort();
            println!(
                "{} problems, {} runs, {} votes (schema v{})",
                stats.problems,
                stats.runs,
                stats.votes,
                stats.version.as_deref().unwrap_or("?")
            );
            console::print_runs(&runs);
        }
        return Ok(exit_codes::OK);
    };

    let Some(run) = store.get_run(run_id)? else {
        eprintln!("run #{} not found", run_id);
        return Ok(exit_codes::RUN_FAILED);
    };
    let votes = store.list_votes(run_id)?;
    let report = score::report(&store.scored_votes(run_id)?);

    if args.json {
        let out = serde_json::json!({
            "run": run,
            "consensus_hits": report.consensus_hits,
            "votes": votes,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        console::print_run_detail(&run, &votes, &report);
    }
    Ok(exit_codes::OK)
}

pub fn cmd_rescore(args: RescoreArgs, db: &Path) -> anyhow::Result<i32> {
    let store = super::open_store(db)?;
    match rescore_run(&store, args.run) {
        Ok(report) => {
            println!(
                "run #{} score {:.1} ({} votes, {} consensus hits)",
                args.run, report.score, report.included, report.consensus_hits
            );
            Ok(exit_codes::OK)
        }
        Err(StoreError::RunDeleted(_)) => {
            eprintln!("run #{} not found", args.run);
            Ok(exit_codes::RUN_FAILED)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn cmd_delete(args: DeleteArgs, db: &Path) -> anyhow::Result<i32> {
    let store = super::open_store(db)?;
    if store.delete_run(args.run)? {
        println!("deleted run #{}", args.run);
        Ok(exit_codes::OK)
    } else {
        eprintln!("run #{} not found", args.run);
        Ok(exit_codes::RUN_FAILED)
    }
}
