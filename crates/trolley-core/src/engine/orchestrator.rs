use super::runner::{HaltReason, ProblemOutcome, ProblemRunner};
use crate::errors::StoreError;
use crate::model::{ModelRun, NewRun, Problem, RunStatus};
use crate::score::{self, ScoreReport};
use crate::storage::VoteStore;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// How a run's evaluation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEnd {
    Completed { score: f64, voted: usize },
    /// The run record disappeared; nothing further was written.
    Halted,
    Failed(String),
}

/// Handle to a background run. Dropping it detaches the task.
pub struct StartedRun {
    pub run: ModelRun,
    pub task: JoinHandle<RunEnd>,
}

impl StartedRun {
    pub fn run_id(&self) -> i64 {
        self.run.id
    }
}

enum LoopEnd {
    Finished { voted: usize },
    Halted,
}

/// Recomputes a run's score from its persisted votes and stores it.
pub fn rescore_run(store: &dyn VoteStore, run_id: i64) -> Result<ScoreReport, StoreError> {
    let votes = store.scored_votes(run_id)?;
    let report = score::report(&votes);
    store.update_run_score(run_id, report.score)?;
    Ok(report)
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn VoteStore>,
    runner: Arc<ProblemRunner>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn VoteStore>, runner: Arc<ProblemRunner>) -> Self {
        Self { store, runner }
    }

    pub fn store(&self) -> &Arc<dyn VoteStore> {
        &self.store
    }

    /// Creates the run and evaluates it on a background task. Must be called
    /// from within a tokio runtime.
    pub fn start_run(&self, new_run: NewRun) -> anyhow::Result<StartedRun> {
        let problems = self.store.list_problems()?;
        let run = self.store.create_run(&new_run, problems.len() as u64)?;

        tracing::info!(
            event = "run.started",
            run_id = run.id,
            model = %run.model,
            provider = self.runner.client.provider_name(),
            display_name = %run.display_name,
            reasoning_effort = run.reasoning_effort.map(|e| e.as_str()).unwrap_or("unset"),
            total_problems = run.total_problems
        );

        let this = self.clone();
        let task_run = run.clone();
        let task = tokio::spawn(async move { this.evaluate(task_run, problems).await });

        Ok(StartedRun { run, task })
    }

    /// Evaluates an existing run over the current problem set, in the calling task.
    pub async fn evaluate_run(&self, run_id: i64) -> anyhow::Result<RunEnd> {
        let Some(run) = self.store.get_run(run_id)? else {
            return Ok(RunEnd::Halted);
        };
        let problems = self.store.list_problems()?;
        Ok(self.evaluate(run, problems).await)
    }

    async fn evaluate(&self, run: ModelRun, problems: Vec<Problem>) -> RunEnd {
        let run_id = run.id;

        // The loop runs on its own task so a panic inside it surfaces as a join error.
        let this = self.clone();
        let inner = tokio::spawn(async move {
            let looped = this.problem_loop(&run, &problems).await;
            match looped {
                LoopEnd::Halted => Ok(RunEnd::Halted),
                LoopEnd::Finished { voted } => this.finalize(run.id, voted),
            }
        });

        let failure = match inner.await {
            Ok(Ok(end)) => {
                match &end {
                    RunEnd::Completed { score, voted } => tracing::info!(
                        event = "run.completed",
                        run_id,
                        score = *score,
                        voted = *voted
                    ),
                    RunEnd::Halted => tracing::info!(event = "run.halted", run_id),
                    RunEnd::Failed(_) => {}
                }
                return end;
            }
            Ok(Err(e)) => e.to_string(),
            Err(join) => format!("evaluation task aborted: {}", join),
        };

        tracing::error!(event = "run.failed", run_id, error = %failure);
        if let Err(e) = self.store.update_run_status(run_id, RunStatus::Failed) {
            tracing::warn!(event = "run.fail_status_not_written", run_id, error = %e);
        }
        RunEnd::Failed(failure)
    }

    async fn problem_loop(&self, run: &ModelRun, problems: &[Problem]) -> LoopEnd {
        let mut voted = 0usize;
        // Strictly sequential: the upstream endpoint rate-limits per account.
        for problem in problems {
            match self.runner.run_one(run, problem).await {
                ProblemOutcome::Voted(_) => voted += 1,
                ProblemOutcome::Skipped(_) => {}
                ProblemOutcome::Halt(HaltReason::RunDeleted) => return LoopEnd::Halted,
            }
        }
        LoopEnd::Finished { voted }
    }

    fn finalize(&self, run_id: i64, voted: usize) -> anyhow::Result<RunEnd> {
        let report = match self.rescore(run_id) {
            Ok(r) => r,
            Err(StoreError::RunDeleted(_)) => return Ok(RunEnd::Halted),
            Err(e) => return Err(e.into()),
        };
        match self.store.update_run_status(run_id, RunStatus::Completed) {
            Ok(()) => Ok(RunEnd::Completed {
                score: report.score,
                voted,
            }),
            Err(StoreError::RunDeleted(_)) => Ok(RunEnd::Halted),
            Err(e) => Err(e.into()),
        }
    }

    pub fn rescore(&self, run_id: i64) -> Result<ScoreReport, StoreError> {
        rescore_run(self.store.as_ref(), run_id)
    }

    /// Back-fills `problem_id` for every running or completed run that has no
    /// vote on it, rescoring each run touched. Returns the number of new votes.
    pub async fn run_missing(&self, problem_id: &str) -> anyhow::Result<usize> {
        let problem = self
            .store
            .get_problem(problem_id)?
            .ok_or_else(|| StoreError::NotFound(format!("problem {}", problem_id)))?;

        let runs = self
            .store
            .list_runs(&[RunStatus::Running, RunStatus::Completed])?;

        let mut created = 0usize;
        for run in runs {
            if self.store.find_vote(run.id, &problem.id)?.is_some() {
                continue;
            }

            match self.runner.run_one(&run, &problem).await {
                ProblemOutcome::Voted(_) => created += 1,
                ProblemOutcome::Skipped(_) => {}
                ProblemOutcome::Halt(HaltReason::RunDeleted) => continue,
            }

            match self.rescore(run.id) {
                Ok(report) => tracing::info!(
                    event = "run.rescored",
                    run_id = run.id,
                    problem_id = %problem.id,
                    score = report.score
                ),
                Err(StoreError::RunDeleted(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(event = "backfill.done", problem_id = %problem.id, created);
        Ok(created)
    }

    /// `run_missing` over every known problem.
    pub async fn run_missing_all(&self) -> anyhow::Result<usize> {
        let mut created = 0;
        for problem in self.store.list_problems()? {
            created += self.run_missing(&problem.id).await?;
        }
        Ok(created)
    }
}
