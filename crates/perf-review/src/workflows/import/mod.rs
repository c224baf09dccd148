//! Offline snapshots assembled from CSV table exports.

mod parser;

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::workflows::review::domain::{
    Assessment, CommitteeDecision, ManagerReview, PeerReview, User,
};
use crate::workflows::review::ReviewSnapshot;

use parser::{
    parse_rows, AssessmentRow, CommitteeDecisionRow, ManagerReviewRow, PeerReviewRow,
    ReviewCycleRow, UserRow,
};

/// One exported table and the file it is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTable {
    Users,
    ReviewCycles,
    Assessments,
    PeerReviews,
    CommitteeDecisions,
    ManagerReviews,
}

impl SnapshotTable {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Users,
            Self::ReviewCycles,
            Self::Assessments,
            Self::PeerReviews,
            Self::CommitteeDecisions,
            Self::ManagerReviews,
        ]
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Users => "users.csv",
            Self::ReviewCycles => "review_cycles.csv",
            Self::Assessments => "self_assessments.csv",
            Self::PeerReviews => "peer_reviewers.csv",
            Self::CommitteeDecisions => "committee_decisions.csv",
            Self::ManagerReviews => "manager_reviews.csv",
        }
    }
}

impl fmt::Display for SnapshotTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug)]
pub enum SnapshotImportError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv {
        table: SnapshotTable,
        source: csv::Error,
    },
    InvalidDate {
        table: SnapshotTable,
        column: &'static str,
        value: String,
    },
}

impl fmt::Display for SnapshotImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotImportError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            SnapshotImportError::Csv { table, source } => {
                write!(f, "invalid CSV data in {}: {}", table, source)
            }
            SnapshotImportError::InvalidDate {
                table,
                column,
                value,
            } => write!(f, "{table}: column {column} has unparseable date '{value}'"),
        }
    }
}

impl std::error::Error for SnapshotImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotImportError::Io { source, .. } => Some(source),
            SnapshotImportError::Csv { source, .. } => Some(source),
            SnapshotImportError::InvalidDate { .. } => None,
        }
    }
}

pub struct SnapshotImporter;

impl SnapshotImporter {
    /// Reads every table export found in `dir`. Missing files leave their collection empty.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<ReviewSnapshot, SnapshotImportError> {
        let dir = dir.as_ref();
        let mut snapshot = ReviewSnapshot::default();

        for table in SnapshotTable::ordered() {
            let path = dir.join(table.file_name());
            if !path.is_file() {
                debug!(table = %table, path = %path.display(), "table export not present");
                continue;
            }

            let file = std::fs::File::open(&path).map_err(|source| SnapshotImportError::Io {
                path: path.clone(),
                source,
            })?;
            Self::read_table(&mut snapshot, table, file)?;
        }

        info!(
            dir = %dir.display(),
            users = snapshot.users.len(),
            assessments = snapshot.assessments.len(),
            peer_reviews = snapshot.peer_reviews.len(),
            committee_decisions = snapshot.committee_decisions.len(),
            "snapshot imported"
        );
        Ok(snapshot)
    }

    /// Appends the rows of one table export to `snapshot`.
    pub fn read_table<R: Read>(
        snapshot: &mut ReviewSnapshot,
        table: SnapshotTable,
        reader: R,
    ) -> Result<(), SnapshotImportError> {
        match table {
            SnapshotTable::Users => {
                let rows: Vec<UserRow> = parse_rows(table, reader)?;
                snapshot.users.extend(rows.into_iter().map(User::from));
            }
            SnapshotTable::ReviewCycles => {
                let rows: Vec<ReviewCycleRow> = parse_rows(table, reader)?;
                for row in rows {
                    snapshot.review_cycles.push(row.into_cycle()?);
                }
            }
            SnapshotTable::Assessments => {
                let rows: Vec<AssessmentRow> = parse_rows(table, reader)?;
                snapshot
                    .assessments
                    .extend(rows.into_iter().map(Assessment::from));
            }
            SnapshotTable::PeerReviews => {
                let rows: Vec<PeerReviewRow> = parse_rows(table, reader)?;
                snapshot
                    .peer_reviews
                    .extend(rows.into_iter().map(PeerReview::from));
            }
            SnapshotTable::CommitteeDecisions => {
                let rows: Vec<CommitteeDecisionRow> = parse_rows(table, reader)?;
                snapshot
                    .committee_decisions
                    .extend(rows.into_iter().map(CommitteeDecision::from));
            }
            SnapshotTable::ManagerReviews => {
                let rows: Vec<ManagerReviewRow> = parse_rows(table, reader)?;
                snapshot
                    .manager_reviews
                    .extend(rows.into_iter().map(ManagerReview::from));
            }
        }

        Ok(())
    }
}
