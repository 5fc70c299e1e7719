use crate::errors::StoreResult;
use crate::model::{ModelRun, NewRun, NewVote, Problem, Provider, RunStatus, ScoredVote, Vote};

pub mod schema;
pub mod store;

pub use store::Store;

/// Repository contract the pipeline runs against.
///
/// Implementations must enforce vote uniqueness per (run, problem) atomically and
/// report it as `StoreError::Duplicate`. Writes that reference a run which no
/// longer exists report `StoreError::RunDeleted`.
pub trait VoteStore: Send + Sync {
    fn create_run(&self, run: &NewRun, total_problems: u64) -> StoreResult<ModelRun>;
    fn get_run(&self, run_id: i64) -> StoreResult<Option<ModelRun>>;
    /// Runs in any of `statuses`; all runs when empty.
    fn list_runs(&self, statuses: &[RunStatus]) -> StoreResult<Vec<ModelRun>>;
    fn update_run_status(&self, run_id: i64, status: RunStatus) -> StoreResult<()>;
    fn update_run_score(&self, run_id: i64, score: f64) -> StoreResult<()>;
    fn increment_completed(&self, run_id: i64) -> StoreResult<()>;

    fn create_vote(&self, vote: &NewVote) -> StoreResult<Vote>;
    fn find_vote(&self, run_id: i64, problem_id: &str) -> StoreResult<Option<Vote>>;
    fn list_votes(&self, run_id: i64) -> StoreResult<Vec<Vote>>;
    /// Votes of a run joined with their problem's human counts.
    fn scored_votes(&self, run_id: i64) -> StoreResult<Vec<ScoredVote>>;

    fn list_problems(&self) -> StoreResult<Vec<Problem>>;
    fn get_problem(&self, problem_id: &str) -> StoreResult<Option<Problem>>;
    fn get_provider(&self, provider_id: &str) -> StoreResult<Option<Provider>>;
}
