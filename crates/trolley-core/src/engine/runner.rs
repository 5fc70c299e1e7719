use crate::decision::ModelClient;
use crate::errors::{ClientError, StoreError};
use crate::model::{ModelRun, NewVote, Problem, Vote};
use crate::providers::tts::Synthesizer;
use crate::storage::VoteStore;
use std::sync::Arc;

#[derive(Debug)]
pub enum SkipReason {
    /// A vote for this (run, problem) already exists.
    AlreadyVoted,
    Client(ClientError),
    Store(StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    RunDeleted,
}

/// Result of a single model-vs-problem attempt.
#[derive(Debug)]
pub enum ProblemOutcome {
    Voted(Vote),
    Skipped(SkipReason),
    Halt(HaltReason),
}

impl ProblemOutcome {
    pub fn is_voted(&self) -> bool {
        matches!(self, ProblemOutcome::Voted(_))
    }
}

pub struct ProblemRunner {
    pub store: Arc<dyn VoteStore>,
    pub client: ModelClient,
    pub synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl ProblemRunner {
    pub fn new(store: Arc<dyn VoteStore>, client: ModelClient) -> Self {
        Self {
            store,
            client,
            synthesizer: None,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Evaluates one problem for one run. Recoverable failures come back as
    /// `Skipped`; only a vanished run stops the caller.
    pub async fn run_one(&self, run: &ModelRun, problem: &Problem) -> ProblemOutcome {
        let decision = match self
            .client
            .decide(problem, &run.model, run.reasoning_effort)
            .await
        {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(
                    event = "problem.client_error",
                    run_id = run.id,
                    problem_id = %problem.id,
                    model = %run.model,
                    kind = e.kind(),
                    error = %e,
                    "model call failed, skipping problem"
                );
                return ProblemOutcome::Skipped(SkipReason::Client(e));
            }
        };

        tracing::debug!(
            event = "model.response",
            run_id = run.id,
            problem_id = %problem.id,
            bytes = decision.raw_text.len()
        );

        let audio_url = self.audio_for(run, problem, &decision.parsed.reasoning).await;

        let new_vote = NewVote {
            run_id: run.id,
            problem_id: problem.id.clone(),
            choice: decision.parsed.choice,
            reasoning: decision.parsed.reasoning,
            principles: decision.parsed.principles,
            assumptions: decision.parsed.assumptions,
            request_payload: decision.request_payload,
            audio_url,
        };

        let vote = match self.store.create_vote(&new_vote) {
            Ok(v) => v,
            Err(StoreError::Duplicate { .. }) => {
                tracing::debug!(
                    event = "problem.already_voted",
                    run_id = run.id,
                    problem_id = %problem.id
                );
                return ProblemOutcome::Skipped(SkipReason::AlreadyVoted);
            }
            Err(StoreError::RunDeleted(_)) => {
                tracing::info!(event = "run.deleted", run_id = run.id, problem_id = %problem.id);
                return ProblemOutcome::Halt(HaltReason::RunDeleted);
            }
            Err(e) => {
                tracing::error!(
                    event = "problem.store_error",
                    run_id = run.id,
                    problem_id = %problem.id,
                    error = %e,
                    "failed to persist vote"
                );
                return ProblemOutcome::Skipped(SkipReason::Store(e));
            }
        };

        match self.store.increment_completed(run.id) {
            Ok(()) => {}
            Err(StoreError::RunDeleted(_)) => {
                tracing::info!(event = "run.deleted", run_id = run.id, problem_id = %problem.id);
                return ProblemOutcome::Halt(HaltReason::RunDeleted);
            }
            Err(e) => {
                // the vote stands; only the progress counter lags
                tracing::error!(
                    event = "problem.progress_error",
                    run_id = run.id,
                    problem_id = %problem.id,
                    error = %e
                );
            }
        }

        tracing::info!(
            event = "vote.recorded",
            run_id = run.id,
            problem_id = %problem.id,
            choice = %vote.choice,
            principles = vote.principles.len()
        );
        ProblemOutcome::Voted(vote)
    }

    async fn audio_for(&self, run: &ModelRun, problem: &Problem, text: &str) -> Option<String> {
        let synth = self.synthesizer.as_ref()?;
        let provider_id = run.provider_id.as_deref()?;

        let voice_id = match self.store.get_provider(provider_id) {
            Ok(Some(p)) => p.voice_id?,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(event = "tts.provider_lookup_failed", provider_id, error = %e);
                return None;
            }
        };

        match synth.synthesize(text, &voice_id).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    event = "tts.failed",
                    run_id = run.id,
                    problem_id = %problem.id,
                    voice_id = %voice_id,
                    error = %e,
                    "audio synthesis failed, recording vote without audio"
                );
                None
            }
        }
    }
}
