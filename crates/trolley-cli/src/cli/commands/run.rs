use super::exit_codes;
use crate::cli::args::{BackfillArgs, RunArgs};
use std::path::Path;
use std::time::Duration;
use trolley_core::config::EngineConfig;
use trolley_core::engine::RunEnd;
use trolley_core::model::{NewRun, ReasoningEffort};
use trolley_core::report::console;
use trolley_core::score;
use trolley_core::storage::VoteStore;

pub async fn cmd_run(args: RunArgs, db: &Path, cfg: &EngineConfig) -> anyhow::Result<i32> {
    let reasoning_effort = match args.effort.as_deref() {
        None => None,
        Some(raw) => match ReasoningEffort::parse(raw) {
            Some(e) => Some(e),
            None => {
                eprintln!("invalid --effort '{}': expected low, medium or high", raw);
                return Ok(exit_codes::CONFIG_ERROR);
            }
        },
    };

    let store = super::open_store(db)?;
    if store.list_problems()?.is_empty() {
        eprintln!("no problems in {}; run `trolley import` first", db.display());
        return Ok(exit_codes::CONFIG_ERROR);
    }
    if let Some(pid) = args.provider_id.as_deref() {
        if store.get_provider(pid)?.is_none() {
            eprintln!("unknown provider '{}'", pid);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    }

    let orch = match super::build_orchestrator(&store, args.llm, cfg) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let started = orch.start_run(NewRun {
        display_name: args.name.unwrap_or_else(|| args.model.clone()),
        model: args.model,
        reasoning_effort,
        provider_id: args.provider_id,
    })?;
    let run_id = started.run_id();
    eprintln!("started run #{}", run_id);

    let mut task = started.task;
    let mut ticker = tokio::time::interval(Duration::from_millis(args.poll_ms.max(50)));
    let end = loop {
        tokio::select! {
            res = &mut task => break res?,
            _ = ticker.tick() => {
                if let Ok(Some(run)) = store.get_run(run_id) {
                    eprintln!("{}", console::format_progress(&run));
                }
            }
        }
    };

    match end {
        RunEnd::Completed { .. } => {
            let Some(run) = store.get_run(run_id)? else {
                return Ok(exit_codes::RUN_FAILED);
            };
            let votes = store.list_votes(run_id)?;
            let report = score::report(&store.scored_votes(run_id)?);
            console::print_run_detail(&run, &votes, &report);
            Ok(exit_codes::OK)
        }
        RunEnd::Halted => {
            eprintln!("run #{} was deleted during evaluation", run_id);
            Ok(exit_codes::RUN_FAILED)
        }
        RunEnd::Failed(msg) => {
            eprintln!("run #{} failed: {}", run_id, msg);
            Ok(exit_codes::RUN_FAILED)
        }
    }
}

pub async fn cmd_backfill(
    args: BackfillArgs,
    db: &Path,
    cfg: &EngineConfig,
) -> anyhow::Result<i32> {
    let store = super::open_store(db)?;
    let orch = match super::build_orchestrator(&store, args.llm, cfg) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let created = match args.problem.as_deref() {
        Some(problem_id) => {
            if store.get_problem(problem_id)?.is_none() {
                eprintln!("unknown problem '{}'", problem_id);
                return Ok(exit_codes::CONFIG_ERROR);
            }
            orch.run_missing(problem_id).await?
        }
        None => orch.run_missing_all().await?,
    };

    println!("backfilled {} votes", created);
    Ok(exit_codes::OK)
}
