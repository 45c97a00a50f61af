//! Patient database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Patient;

const PATIENT_COLUMNS: &str = r#"
    local_id, name, cpf, birth_date, gender, rg, insurance,
    os_code, appointment_date, doctor, created_at, updated_at
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        local_id: row.get(0)?,
        name: row.get(1)?,
        cpf: row.get(2)?,
        birth_date: row.get(3)?,
        gender: row.get(4)?,
        rg: row.get(5)?,
        insurance: row.get(6)?,
        os_code: row.get(7)?,
        appointment_date: row.get(8)?,
        doctor: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub(super) fn insert_patient(conn: &Connection, patient: &Patient) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO patients (
            local_id, name, cpf, birth_date, gender, rg, insurance,
            os_code, appointment_date, doctor, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            patient.local_id,
            patient.name,
            patient.cpf,
            patient.birth_date,
            patient.gender,
            patient.rg,
            patient.insurance,
            patient.os_code,
            patient.appointment_date,
            patient.doctor,
            patient.created_at,
            patient.updated_at,
        ],
    )?;
    Ok(())
}

pub(super) fn get_patient(conn: &Connection, local_id: &str) -> DbResult<Option<Patient>> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE local_id = ?"),
        [local_id],
        patient_from_row,
    )
    .optional()
    .map_err(Into::into)
}

pub(super) fn get_patient_by_cpf(conn: &Connection, cpf: &str) -> DbResult<Option<Patient>> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE cpf = ?"),
        [cpf],
        patient_from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Return the stored patient with this CPF, inserting `patient` if none exists.
///
/// An existing record is returned unchanged. The flag is `true` when a new
/// row was inserted.
pub(super) fn find_or_insert_patient(conn: &Connection, patient: &Patient) -> DbResult<(Patient, bool)> {
    if let Some(existing) = get_patient_by_cpf(conn, &patient.cpf)? {
        return Ok((existing, false));
    }
    insert_patient(conn, patient)?;
    Ok((patient.clone(), true))
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        insert_patient(&self.conn, patient)
    }

    /// Get a patient by local ID.
    pub fn get_patient(&self, local_id: &str) -> DbResult<Option<Patient>> {
        get_patient(&self.conn, local_id)
    }

    /// Get a patient by CPF.
    pub fn get_patient_by_cpf(&self, cpf: &str) -> DbResult<Option<Patient>> {
        get_patient_by_cpf(&self.conn, cpf)
    }

    /// Search patients by name (prefix match).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", query);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE name LIKE ? ORDER BY name LIMIT ?"
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
