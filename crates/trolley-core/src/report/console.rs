use crate::model::{ModelRun, RunStatus, Vote};
use crate::score::ScoreReport;
use std::fmt::Write;

fn status_icon(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "⏸️ ",
        RunStatus::Running => "⏳",
        RunStatus::Completed => "✅",
        RunStatus::Failed => "❌",
    }
}

fn score_str(score: Option<f64>) -> String {
    score
        .map(|s| format!("{:.1}", s))
        .unwrap_or_else(|| "-".into())
}

pub fn format_progress(run: &ModelRun) -> String {
    format!(
        "run #{} {} [{}] {}/{}",
        run.id,
        run.display_name,
        run.status.as_str(),
        run.completed_problems,
        run.total_problems
    )
}

pub fn format_runs(runs: &[ModelRun]) -> String {
    let mut out = String::new();
    if runs.is_empty() {
        out.push_str("no runs\n");
        return out;
    }
    for r in runs {
        let _ = writeln!(
            out,
            "{} #{:<4} {:<24} {:<20} {:>4}/{:<4} score {}",
            status_icon(r.status),
            r.id,
            r.display_name,
            r.model,
            r.completed_problems,
            r.total_problems,
            score_str(r.alignment_score)
        );
    }
    out
}

pub fn format_run_detail(run: &ModelRun, votes: &[Vote], report: &ScoreReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} run #{} {} ({})",
        status_icon(run.status),
        run.id,
        run.display_name,
        run.model
    );
    if let Some(effort) = run.reasoning_effort {
        let _ = writeln!(out, "    reasoning effort: {}", effort.as_str());
    }
    let _ = writeln!(
        out,
        "    progress: {}/{}  status: {}",
        run.completed_problems,
        run.total_problems,
        run.status.as_str()
    );
    let _ = writeln!(
        out,
        "    alignment score: {}  consensus hits: {}/{}",
        score_str(run.alignment_score),
        report.consensus_hits,
        votes.len()
    );
    if report.skipped_no_human_data > 0 {
        let _ = writeln!(
            out,
            "    ({} votes on problems without human data)",
            report.skipped_no_human_data
        );
    }
    for v in votes {
        let _ = writeln!(out, "  - {:<24} {}", v.problem_id, v.choice);
        if !v.principles.is_empty() {
            let _ = writeln!(out, "      principles: {}", v.principles.join(", "));
        }
    }
    out
}

pub fn print_runs(runs: &[ModelRun]) {
    print!("{}", format_runs(runs));
}

pub fn print_run_detail(run: &ModelRun, votes: &[Vote], report: &ScoreReport) {
    print!("{}", format_run_detail(run, votes, report));
}
