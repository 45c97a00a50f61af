//! Exam group and test database operations.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::patients::{find_or_insert_patient, get_patient};
use super::{Database, DbError, DbResult};
use crate::classifier::AbnormalFilter;
use crate::models::{
    AnnotatedTestResult, ExamGroup, ExamReport, Laboratory, Patient, ReferenceRange, TestResult,
};

/// Outcome of saving a structured exam.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedExam {
    pub exam_id: String,
    pub group_id: String,
    /// Stored patient (the pre-existing record when the CPF was known)
    pub patient: Patient,
    pub patient_created: bool,
    /// Tests stored, sub-tests included
    pub test_count: usize,
}

/// An exam loaded back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedExam {
    pub group: ExamGroup,
    pub patient: Patient,
    pub tests: Vec<TestResult>,
}

/// Raw test row from database.
struct TestRow {
    test_id: String,
    parent_id: Option<String>,
    position: i64,
    name: String,
    result: String,
    unit: String,
    collected_at: Option<String>,
    released_at: Option<String>,
    method: Option<String>,
    material: Option<String>,
    reference_ranges: String,
}

impl TryFrom<TestRow> for TestResult {
    type Error = DbError;

    fn try_from(row: TestRow) -> Result<Self, Self::Error> {
        let reference_ranges: Vec<ReferenceRange> = serde_json::from_str(&row.reference_ranges)?;
        Ok(TestResult {
            name: row.name,
            result: row.result,
            unit: row.unit,
            collected_at: row.collected_at,
            released_at: row.released_at,
            method: row.method,
            material: row.material,
            reference_ranges,
            sub_tests: Vec::new(),
        })
    }
}

fn insert_group(conn: &Connection, group: &ExamGroup) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO exam_groups (
            group_id, exam_id, patient_id, lab_name, lab_crm,
            lab_cnes, lab_responsible, lab_address, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            group.group_id,
            group.exam_id,
            group.patient_id,
            group.laboratory.name,
            group.laboratory.crm,
            group.laboratory.cnes,
            group.laboratory.responsible,
            group.laboratory.address,
            group.created_at,
        ],
    )?;
    Ok(())
}

/// Insert a test and its sub-tests (parent first).
fn insert_test(
    conn: &Connection,
    group: &ExamGroup,
    parent_id: Option<&str>,
    position: usize,
    test: &TestResult,
) -> DbResult<()> {
    let test_id = uuid::Uuid::new_v4().to_string();
    let reference_ranges_json = serde_json::to_string(&test.reference_ranges)?;

    conn.execute(
        r#"
        INSERT INTO blood_tests (
            test_id, exam_id, group_id, parent_id, position, name, result, unit,
            collected_at, released_at, method, material, reference_ranges
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            test_id,
            group.exam_id,
            group.group_id,
            parent_id,
            position as i64,
            test.name,
            test.result,
            test.unit,
            test.collected_at,
            test.released_at,
            test.method,
            test.material,
            reference_ranges_json,
        ],
    )?;

    for (i, sub) in test.sub_tests.iter().enumerate() {
        insert_test(conn, group, Some(&test_id), i, sub)?;
    }
    Ok(())
}

/// Rebuild test trees from rows stored parent-first.
fn assemble_tests(rows: Vec<TestRow>) -> DbResult<Vec<TestResult>> {
    let index: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.test_id.clone(), i))
        .collect();

    let mut children: Vec<Vec<(i64, usize)>> = vec![Vec::new(); rows.len()];
    let mut roots = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match row.parent_id.as_ref().and_then(|p| index.get(p)) {
            Some(&parent) => children[parent].push((row.position, i)),
            None => roots.push(i),
        }
    }
    for siblings in &mut children {
        siblings.sort_by_key(|(position, _)| *position);
    }

    let mut nodes: Vec<Option<TestResult>> = rows
        .into_iter()
        .map(|row| TestResult::try_from(row).map(Some))
        .collect::<DbResult<_>>()?;

    Ok(roots
        .into_iter()
        .map(|root| take_subtree(root, &mut nodes, &children))
        .collect())
}

fn take_subtree(
    idx: usize,
    nodes: &mut [Option<TestResult>],
    children: &[Vec<(i64, usize)>],
) -> TestResult {
    let mut test = nodes[idx].take().unwrap_or_default();
    test.sub_tests = children[idx]
        .iter()
        .map(|&(_, child)| take_subtree(child, nodes, children))
        .collect();
    test
}

impl Database {
    /// Save a structured exam under `exam_id`.
    ///
    /// The patient is looked up by CPF and created only if unknown; an
    /// existing patient record is not modified. Everything is written in one
    /// transaction.
    pub fn save_exam_report(&mut self, exam_id: &str, report: &ExamReport) -> DbResult<SavedExam> {
        let tx = self.conn.transaction()?;

        let (patient, patient_created) = find_or_insert_patient(&tx, &report.patient)?;
        let group = ExamGroup::new(
            exam_id.to_string(),
            patient.local_id.clone(),
            report.laboratory.clone(),
        );
        insert_group(&tx, &group)?;

        for (i, test) in report.tests.iter().enumerate() {
            insert_test(&tx, &group, None, i, test)?;
        }

        tx.commit()?;

        let test_count = report.test_count();

        info!(
            exam_id,
            patient = %patient.local_id,
            patient_created,
            test_count,
            "saved exam"
        );

        Ok(SavedExam {
            exam_id: exam_id.to_string(),
            group_id: group.group_id,
            patient,
            patient_created,
            test_count,
        })
    }

    /// Get the exam group for an exam (the first one saved).
    pub fn get_exam_group(&self, exam_id: &str) -> DbResult<Option<ExamGroup>> {
        self.conn
            .query_row(
                r#"
                SELECT group_id, exam_id, patient_id, lab_name, lab_crm,
                       lab_cnes, lab_responsible, lab_address, created_at
                FROM exam_groups
                WHERE exam_id = ?
                ORDER BY rowid
                LIMIT 1
                "#,
                [exam_id],
                |row| {
                    Ok(ExamGroup {
                        group_id: row.get(0)?,
                        exam_id: row.get(1)?,
                        patient_id: row.get(2)?,
                        laboratory: Laboratory {
                            name: row.get(3)?,
                            crm: row.get(4)?,
                            cnes: row.get(5)?,
                            responsible: row.get(6)?,
                            address: row.get(7)?,
                        },
                        created_at: row.get(8)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Load every test stored for an exam, as trees in insertion order.
    pub fn load_exam_tests(&self, exam_id: &str) -> DbResult<Vec<TestResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT test_id, parent_id, position, name, result, unit,
                   collected_at, released_at, method, material, reference_ranges
            FROM blood_tests
            WHERE exam_id = ?
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt
            .query_map([exam_id], |row| {
                Ok(TestRow {
                    test_id: row.get(0)?,
                    parent_id: row.get(1)?,
                    position: row.get(2)?,
                    name: row.get(3)?,
                    result: row.get(4)?,
                    unit: row.get(5)?,
                    collected_at: row.get(6)?,
                    released_at: row.get(7)?,
                    method: row.get(8)?,
                    material: row.get(9)?,
                    reference_ranges: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        assemble_tests(rows)
    }

    /// Load an exam with its patient and tests.
    pub fn load_exam(&self, exam_id: &str) -> DbResult<LoadedExam> {
        let group = self
            .get_exam_group(exam_id)?
            .ok_or_else(|| DbError::NotFound(format!("exam group for exam {}", exam_id)))?;
        let patient = get_patient(&self.conn, &group.patient_id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", group.patient_id)))?;
        let tests = self.load_exam_tests(exam_id)?;

        Ok(LoadedExam {
            group,
            patient,
            tests,
        })
    }

    /// Abnormal tests of a stored exam, classified as of `today`.
    pub fn abnormal_tests_by_exam_id(
        &self,
        exam_id: &str,
        filter: &AbnormalFilter,
        today: NaiveDate,
    ) -> DbResult<Vec<AnnotatedTestResult>> {
        let exam = self.load_exam(exam_id)?;
        Ok(filter.filter(&exam.patient, &exam.tests, today)?)
    }
}
