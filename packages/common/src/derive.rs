use chrono::NaiveDate;

use crate::result_row::ResultRow;
use crate::scores::SubjectScores;

/// A result row with every derived field resolved, ready to be stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedResult {
    pub student_name: String,
    pub roll: String,
    pub class: String,
    pub section: String,
    pub year: String,
    pub scores: SubjectScores,
    pub total_marks: i32,
    pub merit_position: Option<i32>,
    pub failed_subjects: String,
    pub publish_date: NaiveDate,
}

/// Comma-joined names of the failed subjects, empty when none failed.
pub fn failed_subjects_list(scores: &SubjectScores) -> String {
    scores
        .failed()
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Fill `total_marks`, `failed_subjects` and `publish_date` where the row
/// leaves them out. Values supplied by the caller are kept as given.
pub fn derive(row: ResultRow, today: NaiveDate) -> DerivedResult {
    let total_marks = row.total_marks.unwrap_or_else(|| row.scores.total());
    let failed_subjects = row
        .failed_subjects
        .unwrap_or_else(|| failed_subjects_list(&row.scores));

    DerivedResult {
        student_name: row.student_name,
        roll: row.roll,
        class: row.class,
        section: row.section,
        year: row.year,
        scores: row.scores,
        total_marks,
        merit_position: row.merit_position,
        failed_subjects,
        publish_date: row.publish_date.unwrap_or(today),
    }
}

impl From<DerivedResult> for ResultRow {
    fn from(d: DerivedResult) -> Self {
        Self {
            student_name: d.student_name,
            roll: d.roll,
            class: d.class,
            section: d.section,
            year: d.year,
            scores: d.scores,
            total_marks: Some(d.total_marks),
            merit_position: d.merit_position,
            failed_subjects: Some(d.failed_subjects),
            publish_date: Some(d.publish_date),
        }
    }
}
