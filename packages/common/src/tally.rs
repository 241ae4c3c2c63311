use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use crate::attendance_status::AttendanceStatus;

/// Per-status attendance counts for one student over a date range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct AttendanceTally {
    pub total_present: u32,
    pub total_absent: u32,
    pub total_late: u32,
    pub total_excused: u32,
    /// Number of attendance rows counted, not calendar days.
    pub total_days: u32,
}

impl AttendanceTally {
    pub fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.total_present += 1,
            AttendanceStatus::Absent => self.total_absent += 1,
            AttendanceStatus::Late => self.total_late += 1,
            AttendanceStatus::Excused => self.total_excused += 1,
        }
        self.total_days += 1;
    }
}

/// Tally entries per student.
///
/// Every key in `roster` gets a tally, zeroed when it has no entries. Entries
/// for keys outside the roster are dropped. Output follows roster order.
pub fn tally_roster<K, R, E>(roster: R, entries: E) -> Vec<(K, AttendanceTally)>
where
    K: Eq + Hash + Clone,
    R: IntoIterator<Item = K>,
    E: IntoIterator<Item = (K, AttendanceStatus)>,
{
    let roster: Vec<K> = roster.into_iter().collect();
    let mut tallies: HashMap<K, AttendanceTally> = roster
        .iter()
        .cloned()
        .map(|k| (k, AttendanceTally::default()))
        .collect();

    for (key, status) in entries {
        if let Some(tally) = tallies.get_mut(&key) {
            tally.record(status);
        }
    }

    roster
        .into_iter()
        .map(|k| {
            let tally = tallies.get(&k).copied().unwrap_or_default();
            (k, tally)
        })
        .collect()
}
