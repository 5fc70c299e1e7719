use super::exit_codes;
use crate::cli::args::ImportArgs;
use std::path::Path;
use trolley_core::config;

pub fn cmd_import(args: ImportArgs, db: &Path) -> anyhow::Result<i32> {
    let set = match config::load_problems(&args.problems) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let store = super::open_store(db)?;
    for provider in &set.providers {
        store.upsert_provider(provider)?;
    }
    for problem in &set.problems {
        store.upsert_problem(problem)?;
    }

    tracing::info!(
        event = "problems.imported",
        problems = set.problems.len(),
        providers = set.providers.len(),
        db = %db.display()
    );
    println!(
        "imported {} problems, {} providers",
        set.problems.len(),
        set.providers.len()
    );
    Ok(exit_codes::OK)
}
