use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::dates::parse_calendar_date;
use crate::scores::SubjectScores;
use crate::subject::Subject;

/// A result row as submitted, before derived fields are filled in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultRow {
    pub student_name: String,
    pub roll: String,
    pub class: String,
    pub section: String,
    pub year: String,
    pub scores: SubjectScores,
    /// `None` when absent or not numeric.
    pub total_marks: Option<i32>,
    pub merit_position: Option<i32>,
    pub failed_subjects: Option<String>,
    pub publish_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("Row must be an object")]
    NotAnObject,
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Invalid publish_date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

enum Field {
    StudentName,
    Roll,
    Class,
    Section,
    Year,
    PublishDate,
    TotalMarks,
    MeritPosition,
    FailedSubjects,
    Score(Subject),
}

fn classify(key: &str) -> Option<Field> {
    let field = match key.trim().to_ascii_lowercase().as_str() {
        "student_name" => Field::StudentName,
        "roll" => Field::Roll,
        "class" => Field::Class,
        "section" => Field::Section,
        "year" => Field::Year,
        "publish_date" => Field::PublishDate,
        "total_marks" => Field::TotalMarks,
        "merit_position" => Field::MeritPosition,
        "failed_subjects" => Field::FailedSubjects,
        other => return Subject::from_field_name(other).map(Field::Score),
    };
    Some(field)
}

impl ResultRow {
    /// Parse a heterogeneous row object.
    ///
    /// Keys are matched case-insensitively; unknown keys are ignored. Subject
    /// values that are not whole numbers within 0-100 are treated as absent.
    /// Identity fields may be strings or numbers.
    pub fn from_value(value: &Value) -> Result<Self, RowError> {
        let obj = value.as_object().ok_or(RowError::NotAnObject)?;
        Self::from_map(obj)
    }

    pub fn from_map(obj: &Map<String, Value>) -> Result<Self, RowError> {
        let mut row = ResultRow::default();
        let (mut roll, mut class, mut section, mut year) = (None, None, None, None);

        for (key, value) in obj {
            let Some(field) = classify(key) else {
                continue;
            };
            match field {
                Field::StudentName => row.student_name = as_text(value).unwrap_or_default(),
                Field::Roll => roll = as_text(value),
                Field::Class => class = as_text(value),
                Field::Section => section = as_text(value),
                Field::Year => year = as_text(value),
                Field::PublishDate => {
                    row.publish_date = match as_text(value) {
                        Some(text) => Some(
                            parse_calendar_date(&text).ok_or(RowError::InvalidDate(text))?,
                        ),
                        None => None,
                    }
                }
                Field::TotalMarks => row.total_marks = as_whole_number(value),
                Field::MeritPosition => row.merit_position = as_whole_number(value),
                Field::FailedSubjects => {
                    row.failed_subjects = value.as_str().map(|s| s.trim().to_string())
                }
                Field::Score(subject) => row.scores.set(subject, as_whole_number(value)),
            }
        }

        row.roll = roll.ok_or(RowError::MissingField("roll"))?;
        row.class = class.ok_or(RowError::MissingField("class"))?;
        row.section = section.ok_or(RowError::MissingField("section"))?;
        row.year = year.ok_or(RowError::MissingField("year"))?;
        Ok(row)
    }
}

/// Non-empty trimmed text from a string or number.
fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => {
                let f = n.as_f64()?;
                if f.fract() == 0.0 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
        },
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Whole number from a JSON number or numeric string.
fn as_whole_number(value: &Value) -> Option<i32> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !f.is_finite() || f.fract() != 0.0 || f < i32::MIN as f64 || f > i32::MAX as f64 {
        return None;
    }
    Some(f as i32)
}
