use thiserror::Error;

/// Failure of a single model call. Always carries the model and problem it was for.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("model {model} on problem {problem_id}: API error: {message}")]
    Api {
        model: String,
        problem_id: String,
        message: String,
    },

    #[error("model {model} on problem {problem_id}: HTTP {status}: {body}")]
    Status {
        model: String,
        problem_id: String,
        status: u16,
        body: String,
    },

    #[error("model {model} on problem {problem_id}: response has no content")]
    EmptyContent { model: String, problem_id: String },

    #[error("model {model} on problem {problem_id}: invalid JSON in response: {source}")]
    Parse {
        model: String,
        problem_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model {model} on problem {problem_id}: transport error: {message}")]
    Transport {
        model: String,
        problem_id: String,
        message: String,
    },

    #[error("model {model} on problem {problem_id}: timed out after {secs}s")]
    Timeout {
        model: String,
        problem_id: String,
        secs: u64,
    },
}

impl ClientError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Api { .. } => "api",
            ClientError::Status { .. } => "status",
            ClientError::EmptyContent { .. } => "empty_content",
            ClientError::Parse { .. } => "parse",
            ClientError::Transport { .. } => "transport",
            ClientError::Timeout { .. } => "timeout",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A vote for this (run, problem) pair already exists.
    #[error("vote already recorded for run {run_id} on problem {problem_id}")]
    Duplicate { run_id: i64, problem_id: String },

    /// The run row is gone, either via foreign-key failure or an update matching nothing.
    #[error("run {0} no longer exists")]
    RunDeleted(i64),

    #[error("{0} not found")]
    NotFound(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
#[error("ConfigError: {0}")]
pub struct ConfigError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_names_model_and_problem() {
        let err = ClientError::EmptyContent {
            model: "gpt-4o".into(),
            problem_id: "classic".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("gpt-4o"));
        assert!(msg.contains("classic"));
        assert_eq!(err.kind(), "empty_content");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError("no problems".into());
        assert_eq!(err.to_string(), "ConfigError: no problems");
    }
}
