pub const SCHEMA_VERSION: i64 = 1;

pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS problems (
  id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  text TEXT NOT NULL,
  human_pull_votes INTEGER NOT NULL DEFAULT 0 CHECK (human_pull_votes >= 0),
  human_nothing_votes INTEGER NOT NULL DEFAULT 0 CHECK (human_nothing_votes >= 0),
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS providers (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  voice_id TEXT
);

CREATE TABLE IF NOT EXISTS runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  model TEXT NOT NULL,
  display_name TEXT NOT NULL,
  reasoning_effort TEXT,
  status TEXT NOT NULL,
  total_problems INTEGER NOT NULL DEFAULT 0,
  completed_problems INTEGER NOT NULL DEFAULT 0,
  alignment_score REAL,
  provider_id TEXT,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS votes (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
  problem_id TEXT NOT NULL REFERENCES problems(id) ON DELETE CASCADE,
  choice TEXT NOT NULL CHECK (choice IN ('PULL', 'NOTHING')),
  reasoning TEXT NOT NULL,
  principles_json TEXT NOT NULL,
  assumptions TEXT,
  request_payload TEXT NOT NULL,
  audio_url TEXT,
  created_at TEXT NOT NULL,
  UNIQUE (run_id, problem_id)
);

CREATE INDEX IF NOT EXISTS idx_votes_problem ON votes(problem_id);
CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
"#;
