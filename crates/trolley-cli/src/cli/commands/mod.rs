pub mod import;
pub mod run;
pub mod status;

use super::args::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use trolley_core::config::{self, EngineConfig};
use trolley_core::decision::ModelClient;
use trolley_core::engine::{Orchestrator, ProblemRunner};
use trolley_core::errors::ConfigError;
use trolley_core::providers::llm::fake::FakeClient;
use trolley_core::providers::llm::openai::OpenAIClient;
use trolley_core::providers::llm::LlmClient;
use trolley_core::storage::{Store, VoteStore};

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const RUN_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

/// Exit code for an error that escaped a command: configuration problems
/// exit 2, everything else (storage, I/O, task failures) exits 1.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.chain().any(|c| c.is::<ConfigError>()) {
        exit_codes::CONFIG_ERROR
    } else {
        exit_codes::RUN_FAILED
    }
}

pub async fn dispatch(cli: Cli, cfg: EngineConfig) -> anyhow::Result<i32> {
    let db = cli.db.unwrap_or_else(|| cfg.db_path.clone());
    match cli.cmd {
        Command::Init(args) => cmd_init(args),
        Command::Import(args) => import::cmd_import(args, &db),
        Command::Run(args) => run::cmd_run(args, &db, &cfg).await,
        Command::Backfill(args) => run::cmd_backfill(args, &db, &cfg).await,
        Command::Status(args) => status::cmd_status(args, &db),
        Command::Rescore(args) => status::cmd_rescore(args, &db),
        Command::Delete(args) => status::cmd_delete(args, &db),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if args.problems.exists() {
        eprintln!("exists: {}", args.problems.display());
        return Ok(exit_codes::OK);
    }
    if let Some(parent) = args.problems.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
    }
    config::write_sample_problems(&args.problems)?;
    eprintln!("created: {}", args.problems.display());
    Ok(exit_codes::OK)
}

pub(crate) fn open_store(db: &Path) -> anyhow::Result<Store> {
    let store = Store::open(db)?;
    store.init_schema()?;
    Ok(store)
}

fn build_llm(
    backend: LlmBackend,
    cfg: &EngineConfig,
) -> Result<Arc<dyn LlmClient>, ConfigError> {
    match backend {
        LlmBackend::Fake => Ok(Arc::new(FakeClient::new())),
        LlmBackend::Openai => {
            let key = cfg.api_key.clone().ok_or_else(|| {
                ConfigError("missing API key (set TROLLEY_API_KEY or OPENAI_API_KEY)".into())
            })?;
            let client = OpenAIClient::new(cfg.api_base.clone(), key, cfg.timeout())
                .map_err(|e| ConfigError(format!("failed to build HTTP client: {}", e)))?;
            Ok(Arc::new(client))
        }
    }
}

pub(crate) fn build_orchestrator(
    store: &Store,
    backend: LlmBackend,
    cfg: &EngineConfig,
) -> Result<Orchestrator, ConfigError> {
    let llm = build_llm(backend, cfg)?;
    // the HTTP client carries the same timeout; this one also bounds parsing
    let timeout = cfg.timeout() + Duration::from_secs(5);
    let shared: Arc<dyn VoteStore> = Arc::new(store.clone());
    let runner = ProblemRunner::new(shared.clone(), ModelClient::new(llm, timeout));
    Ok(Orchestrator::new(shared, Arc::new(runner)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trolley_core::errors::StoreError;

    #[test]
    fn only_config_errors_exit_2() {
        let cfg = anyhow::Error::new(ConfigError("bad problems file".into()));
        assert_eq!(exit_code_for(&cfg), exit_codes::CONFIG_ERROR);

        let wrapped = anyhow::Error::new(ConfigError("x".into())).context("import");
        assert_eq!(exit_code_for(&wrapped), exit_codes::CONFIG_ERROR);

        let store = anyhow::Error::new(StoreError::RunDeleted(3));
        assert_eq!(exit_code_for(&store), exit_codes::RUN_FAILED);

        let io = anyhow::anyhow!("disk full");
        assert_eq!(exit_code_for(&io), exit_codes::RUN_FAILED);
    }
}
