//! SQL schema for the Rubriq SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    profile_id    TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,   -- lower-cased
    display_name  TEXT NOT NULL,
    plan          TEXT NOT NULL DEFAULT 'free',
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Append-only; the latest row per profile is the current subscription.
CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id    TEXT PRIMARY KEY,
    profile_id         TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    plan               TEXT NOT NULL,
    status             TEXT NOT NULL,  -- 'active' | 'trialing' | 'past_due' | 'canceled'
    external_ref       TEXT,
    current_period_end TEXT,
    recorded_at        TEXT NOT NULL
);

-- One row per completed grading; counted against the monthly allowance.
-- essay_id has no foreign key so usage outlives the essay.
CREATE TABLE IF NOT EXISTS usage_events (
    usage_id    TEXT PRIMARY KEY,
    teacher_id  TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    essay_id    TEXT,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id TEXT PRIMARY KEY,
    teacher_id TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    class_name TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rubrics (
    rubric_id     TEXT PRIMARY KEY,
    teacher_id    TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    subject       TEXT NOT NULL DEFAULT '',
    exam_board    TEXT,
    grading_scale TEXT NOT NULL DEFAULT 'points',
    criteria_json TEXT NOT NULL,   -- [{\"category\":...,\"maxPoints\":...}]
    version       INTEGER NOT NULL DEFAULT 1,
    parent_id     TEXT REFERENCES rubrics(rubric_id) ON DELETE SET NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS essays (
    essay_id   TEXT PRIMARY KEY,
    teacher_id TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    title      TEXT NOT NULL,
    content    TEXT NOT NULL,
    word_count INTEGER NOT NULL,
    rubric_id  TEXT REFERENCES rubrics(rubric_id) ON DELETE SET NULL,
    student_id TEXT REFERENCES students(student_id) ON DELETE SET NULL,
    status     TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);

-- At most one feedback row per essay; regrading replaces it.
CREATE TABLE IF NOT EXISTS feedback (
    feedback_id           TEXT PRIMARY KEY,
    essay_id              TEXT NOT NULL UNIQUE REFERENCES essays(essay_id) ON DELETE CASCADE,
    summary               TEXT NOT NULL,
    strengths_json        TEXT NOT NULL DEFAULT '[]',
    improvements_json     TEXT NOT NULL DEFAULT '[]',
    grammar_issues_json   TEXT NOT NULL DEFAULT '[]',
    score_awarded         REAL,
    score_out_of          REAL,
    criterion_scores_json TEXT NOT NULL DEFAULT '[]',
    band                  INTEGER,
    model                 TEXT NOT NULL,
    raw_text              TEXT NOT NULL,
    created_at            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS subscriptions_profile_idx ON subscriptions(profile_id, recorded_at);
CREATE INDEX IF NOT EXISTS usage_teacher_idx         ON usage_events(teacher_id, recorded_at);
CREATE INDEX IF NOT EXISTS students_teacher_idx      ON students(teacher_id);
CREATE INDEX IF NOT EXISTS rubrics_teacher_idx       ON rubrics(teacher_id);
CREATE INDEX IF NOT EXISTS essays_teacher_idx        ON essays(teacher_id, created_at);

PRAGMA user_version = 1;
";
