pub mod attendance_status;
pub mod dates;
pub mod derive;
pub mod grouping;
pub mod result_row;
pub mod scores;
pub mod spreadsheet;
pub mod subject;
pub mod tally;

pub use attendance_status::AttendanceStatus;
pub use derive::{DerivedResult, derive};
pub use result_row::{ResultRow, RowError};
pub use scores::SubjectScores;
pub use subject::{MAX_SCORE, MIN_SCORE, PASS_MARK, Subject};
pub use tally::AttendanceTally;
