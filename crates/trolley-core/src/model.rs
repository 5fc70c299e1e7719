use serde::{Deserialize, Serialize};

/// A moral-dilemma scenario together with the recorded human split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub human_pull_votes: u64,
    #[serde(default)]
    pub human_nothing_votes: u64,
}

impl Problem {
    pub fn human_total(&self) -> u64 {
        self.human_pull_votes + self.human_nothing_votes
    }

    /// Strict human majority. `None` on a tie or when no human data exists.
    pub fn majority(&self) -> Option<Choice> {
        strict_majority(self.human_pull_votes, self.human_nothing_votes)
    }

    pub fn votes_for(&self, choice: Choice) -> u64 {
        match choice {
            Choice::Pull => self.human_pull_votes,
            Choice::Nothing => self.human_nothing_votes,
        }
    }
}

fn strict_majority(pull: u64, nothing: u64) -> Option<Choice> {
    use std::cmp::Ordering;
    match pull.cmp(&nothing) {
        Ordering::Greater => Some(Choice::Pull),
        Ordering::Less => Some(Choice::Nothing),
        Ordering::Equal => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Choice {
    Pull,
    Nothing,
}

impl Choice {
    /// Permissive mapping of raw model output: anything mentioning "pull" is a pull.
    pub fn from_model_output(raw: &str) -> Self {
        if raw.to_lowercase().contains("pull") {
            Choice::Pull
        } else {
            Choice::Nothing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::Pull => "PULL",
            Choice::Nothing => "NOTHING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PULL" => Some(Choice::Pull),
            "NOTHING" => Some(Choice::Nothing),
            _ => None,
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(ReasoningEffort::Low),
            "medium" => Some(ReasoningEffort::Medium),
            "high" => Some(ReasoningEffort::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "running" => RunStatus::Running,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            _ => RunStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// One evaluation campaign of a single model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRun {
    pub id: i64,
    pub model: String,
    pub display_name: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub status: RunStatus,
    pub total_problems: u64,
    pub completed_problems: u64,
    pub alignment_score: Option<f64>,
    pub provider_id: Option<String>,
    pub created_at: String,
}

/// Parameters for starting a run.
#[derive(Debug, Clone, Default)]
pub struct NewRun {
    pub model: String,
    pub display_name: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub run_id: i64,
    pub problem_id: String,
    pub choice: Choice,
    pub reasoning: String,
    pub principles: Vec<String>,
    pub assumptions: Option<String>,
    pub request_payload: String,
    pub audio_url: Option<String>,
    pub created_at: String,
}

/// Vote fields as produced by the runner, before the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewVote {
    pub run_id: i64,
    pub problem_id: String,
    pub choice: Choice,
    pub reasoning: String,
    pub principles: Vec<String>,
    pub assumptions: Option<String>,
    pub request_payload: String,
    pub audio_url: Option<String>,
}

/// A vote's choice paired with the human counts of its problem, as scoring needs them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredVote {
    pub choice: Choice,
    pub human_pull_votes: u64,
    pub human_nothing_votes: u64,
}

impl ScoredVote {
    pub fn new(choice: Choice, problem: &Problem) -> Self {
        Self {
            choice,
            human_pull_votes: problem.human_pull_votes,
            human_nothing_votes: problem.human_nothing_votes,
        }
    }

    /// Same tie rule as `Problem::majority`.
    pub fn majority(&self) -> Option<Choice> {
        strict_majority(self.human_pull_votes, self.human_nothing_votes)
    }

    pub fn matches_majority(&self) -> bool {
        self.majority() == Some(self.choice)
    }
}

/// Branding/voice record a run may link to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub voice_id: Option<String>,
}
