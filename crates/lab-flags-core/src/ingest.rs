//! Ingestion of structured exam JSON.
//!
//! The extraction step returns a JSON document with Portuguese keys
//! (`paciente`, `laboratorio`, `exames`, ...), sometimes wrapped in prose.
//! This module validates it and turns it into [`ExamReport`], so nothing
//! downstream handles loosely-typed JSON.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::models::{ExamReport, Laboratory, Patient, ReferenceRange, TestResult};

/// Ingestion errors.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid payload format: {0}")]
    InvalidFormat(String),

    #[error("Patient is missing: {0}")]
    MissingPatientField(String),
}

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(default)]
    paciente: Option<RawPatient>,
    #[serde(default)]
    laboratorio: Option<RawLaboratory>,
    #[serde(default)]
    exames: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPatient {
    #[serde(default, deserialize_with = "lenient_text")]
    nome: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    cpf: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    data_nascimento: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    genero: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    rg: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    convenio: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    codigo_os: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    atendimento: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    medico: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLaboratory {
    #[serde(default, deserialize_with = "lenient_text")]
    nome: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    crm: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    cnes: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    responsavel_tecnico: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    endereco: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTest {
    #[serde(default, deserialize_with = "lenient_text")]
    nome: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    resultado: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    unidade: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    data_coleta: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    data_liberacao: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    metodo: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    material: Option<String>,
    #[serde(default)]
    valor_referencia: Option<Value>,
    #[serde(default)]
    subexames: Option<Value>,
}

/// Accept strings, numbers and booleans as text; everything else is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_text))
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a structured exam, tolerating prose around the JSON object.
pub fn parse_exam_payload(text: &str) -> IngestResult<ExamReport> {
    let json_start = text.find('{').ok_or_else(|| {
        IngestError::InvalidFormat("No JSON object found in payload".into())
    })?;
    let json_end = text.rfind('}').ok_or_else(|| {
        IngestError::InvalidFormat("No closing brace found in payload".into())
    })?;
    if json_end < json_start {
        return Err(IngestError::InvalidFormat("Closing brace precedes opening brace".into()));
    }

    let raw: RawPayload = serde_json::from_str(&text[json_start..=json_end])?;
    raw.into_report()
}

impl RawPayload {
    fn into_report(self) -> IngestResult<ExamReport> {
        let patient = self.paciente.unwrap_or_default().into_patient()?;
        let laboratory = self.laboratorio.unwrap_or_default().into_laboratory();
        let tests = convert_tests(self.exames, "exames");

        Ok(ExamReport {
            patient,
            laboratory,
            tests,
        })
    }
}

impl RawPatient {
    fn into_patient(self) -> IngestResult<Patient> {
        let name = non_blank(self.nome);
        let cpf = non_blank(self.cpf);

        let (name, cpf) = match (name, cpf) {
            (Some(name), Some(cpf)) => (name, cpf),
            (name, cpf) => {
                let missing: Vec<&str> = [(name.is_none(), "nome"), (cpf.is_none(), "cpf")]
                    .into_iter()
                    .filter_map(|(absent, field)| absent.then_some(field))
                    .collect();
                return Err(IngestError::MissingPatientField(missing.join(" e ")));
            }
        };

        let mut patient = Patient::new(name, cpf);
        patient.birth_date = non_blank(self.data_nascimento);
        patient.gender = non_blank(self.genero);
        patient.rg = self.rg;
        patient.insurance = self.convenio;
        patient.os_code = self.codigo_os;
        patient.appointment_date = self.atendimento;
        patient.doctor = self.medico;
        Ok(patient)
    }
}

impl RawLaboratory {
    fn into_laboratory(self) -> Laboratory {
        Laboratory {
            name: self.nome,
            crm: self.crm,
            cnes: self.cnes,
            responsible: self.responsavel_tecnico,
            address: self.endereco,
        }
    }
}

impl RawTest {
    fn into_test(self) -> TestResult {
        let reference_ranges = match self.valor_referencia {
            Some(Value::Array(items)) => items.iter().filter_map(convert_reference).collect(),
            _ => Vec::new(),
        };

        TestResult {
            name: self.nome.unwrap_or_default(),
            result: self.resultado.unwrap_or_default(),
            unit: self.unidade.unwrap_or_default(),
            collected_at: self.data_coleta,
            released_at: self.data_liberacao,
            method: self.metodo,
            material: self.material,
            reference_ranges,
            sub_tests: convert_tests(self.subexames, "subexames"),
        }
    }
}

/// Convert a JSON array of tests; anything that is not a test object is dropped.
fn convert_tests(value: Option<Value>, field: &str) -> Vec<TestResult> {
    let items = match value {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => return Vec::new(),
        Some(other) => {
            warn!(field, kind = json_kind(&other), "expected an array of tests");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawTest>(item) {
            Ok(raw) => Some(raw.into_test()),
            Err(e) => {
                warn!(field, error = %e, "dropping malformed test entry");
                None
            }
        })
        .collect()
}

/// Convert one reference entry; non-object entries are dropped.
fn convert_reference(value: &Value) -> Option<ReferenceRange> {
    let Value::Object(map) = value else {
        warn!(kind = json_kind(value), "dropping non-object reference entry");
        return None;
    };

    let field = |key: &str| map.get(key).and_then(value_to_text).unwrap_or_default();
    Some(ReferenceRange {
        gender_tag: field("sexo"),
        age_tag: field("idade"),
        range_text: field("valores"),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
