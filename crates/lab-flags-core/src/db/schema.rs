//! SQLite schema definition.

/// Complete database schema for lab-flags.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    local_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    cpf TEXT NOT NULL UNIQUE,
    birth_date TEXT,                             -- DD/MM/YYYY as printed
    gender TEXT,
    rg TEXT,
    insurance TEXT,
    os_code TEXT,
    appointment_date TEXT,
    doctor TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

-- ============================================================================
-- Exam Groups (exam id -> patient + laboratory)
-- ============================================================================

CREATE TABLE IF NOT EXISTS exam_groups (
    group_id TEXT PRIMARY KEY,
    exam_id TEXT NOT NULL,
    patient_id TEXT NOT NULL REFERENCES patients(local_id),
    lab_name TEXT,
    lab_crm TEXT,
    lab_cnes TEXT,
    lab_responsible TEXT,
    lab_address TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_exam_groups_exam ON exam_groups(exam_id);
CREATE INDEX IF NOT EXISTS idx_exam_groups_patient ON exam_groups(patient_id);

-- ============================================================================
-- Blood Tests (one row per test or sub-test)
-- ============================================================================

CREATE TABLE IF NOT EXISTS blood_tests (
    test_id TEXT PRIMARY KEY,
    exam_id TEXT NOT NULL,
    group_id TEXT NOT NULL REFERENCES exam_groups(group_id),
    parent_id TEXT REFERENCES blood_tests(test_id),  -- NULL for top-level tests
    position INTEGER NOT NULL,                       -- order among siblings
    name TEXT NOT NULL,
    result TEXT NOT NULL DEFAULT '',
    unit TEXT NOT NULL DEFAULT '',
    collected_at TEXT,
    released_at TEXT,
    method TEXT,
    material TEXT,
    reference_ranges TEXT NOT NULL DEFAULT '[]',     -- JSON array of ReferenceRange
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_blood_tests_exam ON blood_tests(exam_id);
CREATE INDEX IF NOT EXISTS idx_blood_tests_parent ON blood_tests(parent_id);
"#;
