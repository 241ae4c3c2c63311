use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::subject::{MAX_SCORE, MIN_SCORE, PASS_MARK, Subject};

/// One optional score per subject, indexed in canonical subject order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubjectScores([Option<i32>; Subject::COUNT]);

impl SubjectScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, subject: Subject) -> Option<i32> {
        self.0[subject.index()]
    }

    /// Store a score. Values outside 0-100 are discarded.
    pub fn set(&mut self, subject: Subject, score: Option<i32>) {
        self.0[subject.index()] = score.filter(|s| (MIN_SCORE..=MAX_SCORE).contains(s));
    }

    pub fn with(mut self, subject: Subject, score: i32) -> Self {
        self.set(subject, Some(score));
        self
    }

    /// Present scores in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Subject, i32)> + '_ {
        Subject::ALL
            .iter()
            .filter_map(|&s| self.get(s).map(|score| (s, score)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn total(&self) -> i32 {
        self.iter().map(|(_, score)| score).sum()
    }

    /// Subjects scoring below the pass mark, in canonical order.
    pub fn failed(&self) -> Vec<Subject> {
        self.iter()
            .filter(|&(_, score)| score < PASS_MARK)
            .map(|(s, _)| s)
            .collect()
    }
}

/// Serializes as a map of every subject name to its score or `null`.
impl Serialize for SubjectScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Subject::COUNT))?;
        for subject in Subject::ALL {
            map.serialize_entry(subject.as_str(), &self.get(subject))?;
        }
        map.end()
    }
}
