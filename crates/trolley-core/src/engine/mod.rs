pub mod orchestrator;
pub mod runner;

pub use orchestrator::{rescore_run, Orchestrator, RunEnd, StartedRun};
pub use runner::{HaltReason, ProblemOutcome, ProblemRunner, SkipReason};
