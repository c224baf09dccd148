use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::{SnapshotImportError, SnapshotTable};
use crate::workflows::review::domain::{
    AchievementsCategory, Assessment, AssessmentId, AssessmentStatus, CommitteeDecision,
    CommitteeVerdict, DecisionId, GradeLevel, ManagerReview, ManagerReviewId,
    ManagerReviewStatus, PeerReview, PeerReviewId, PeerReviewStatus, ReviewCycle, ReviewCycleId,
    User, UserId, UserRole,
};

pub(crate) fn parse_rows<T, R>(
    table: SnapshotTable,
    reader: R,
) -> Result<Vec<T>, SnapshotImportError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<T>()
        .map(|row| row.map_err(|source| SnapshotImportError::Csv { table, source }))
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRow {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    department: String,
    #[serde(default)]
    role: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    manager_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    current_grade: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            position: row.position,
            department: row.department,
            role: UserRole::parse(&row.role),
            manager_id: row.manager_id.map(UserId),
            current_grade: row.current_grade.as_deref().map(GradeLevel::parse),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewCycleRow {
    id: String,
    #[serde(default)]
    cycle_name: String,
    start_date: String,
    end_date: String,
    #[serde(default)]
    status: String,
}

impl ReviewCycleRow {
    pub(crate) fn into_cycle(self) -> Result<ReviewCycle, SnapshotImportError> {
        let start_date = required_date("start_date", &self.start_date)?;
        let end_date = required_date("end_date", &self.end_date)?;
        Ok(ReviewCycle {
            active: self.status.trim().eq_ignore_ascii_case("active"),
            name: if self.cycle_name.is_empty() {
                self.id.clone()
            } else {
                self.cycle_name
            },
            id: ReviewCycleId(self.id),
            start_date,
            end_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssessmentRow {
    id: String,
    employee_id: String,
    review_cycle_id: String,
    #[serde(default)]
    achievements: String,
    #[serde(default)]
    achievements_category: String,
    #[serde(default)]
    self_evaluation: String,
    #[serde(default)]
    current_grade: String,
    #[serde(default)]
    target_grade: String,
    #[serde(default)]
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    submitted_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    updated_at: Option<String>,
}

impl From<AssessmentRow> for Assessment {
    fn from(row: AssessmentRow) -> Self {
        Assessment {
            id: AssessmentId(row.id),
            employee_id: UserId(row.employee_id),
            review_cycle_id: ReviewCycleId(row.review_cycle_id),
            achievements: row.achievements,
            category: category_from_label(&row.achievements_category),
            self_evaluation: row.self_evaluation,
            current_grade: GradeLevel::parse(&row.current_grade),
            target_grade: GradeLevel::parse(&row.target_grade),
            status: AssessmentStatus::parse(&row.status),
            submitted_at: row.submitted_at.as_deref().and_then(parse_datetime),
            created_at: row.created_at.as_deref().and_then(parse_datetime),
            updated_at: row.updated_at.as_deref().and_then(parse_datetime),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeerReviewRow {
    id: String,
    self_assessment_id: String,
    reviewer_id: String,
    #[serde(default)]
    review_order: Option<u32>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    feedback: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    confirmed_grade: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    review_date: Option<String>,
}

impl From<PeerReviewRow> for PeerReview {
    fn from(row: PeerReviewRow) -> Self {
        PeerReview {
            id: PeerReviewId(row.id),
            assessment_id: AssessmentId(row.self_assessment_id),
            reviewer_id: UserId(row.reviewer_id),
            order: row.review_order.unwrap_or_default(),
            status: PeerReviewStatus::parse(&row.status),
            feedback: row.feedback,
            confirmed_grade: row.confirmed_grade.as_deref().map(GradeLevel::parse),
            review_date: row.review_date.as_deref().and_then(parse_datetime),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitteeDecisionRow {
    id: String,
    self_assessment_id: String,
    #[serde(default)]
    committee_member_id: String,
    #[serde(default)]
    decision: String,
    #[serde(default)]
    final_grade: String,
    #[serde(default)]
    comments: String,
    #[serde(default)]
    recommendations: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    decision_date: Option<String>,
}

impl From<CommitteeDecisionRow> for CommitteeDecision {
    fn from(row: CommitteeDecisionRow) -> Self {
        CommitteeDecision {
            id: DecisionId(row.id),
            assessment_id: AssessmentId(row.self_assessment_id),
            committee_member_id: UserId(row.committee_member_id),
            decision: CommitteeVerdict::parse(&row.decision),
            final_grade: GradeLevel::parse(&row.final_grade),
            comments: row.comments,
            recommendations: row.recommendations,
            decision_date: row.decision_date.as_deref().and_then(parse_datetime),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManagerReviewRow {
    id: String,
    self_assessment_id: String,
    manager_id: String,
    #[serde(default)]
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    approved_grade: Option<String>,
    #[serde(default)]
    feedback: String,
}

impl From<ManagerReviewRow> for ManagerReview {
    fn from(row: ManagerReviewRow) -> Self {
        ManagerReview {
            id: ManagerReviewId(row.id),
            assessment_id: AssessmentId(row.self_assessment_id),
            manager_id: UserId(row.manager_id),
            status: ManagerReviewStatus::parse(&row.status),
            recommended_grade: row.approved_grade.as_deref().map(GradeLevel::parse),
            comments: row.feedback,
        }
    }
}

/// Accepts the snake_case keys and the localized labels older rows carry.
fn category_from_label(value: &str) -> AchievementsCategory {
    match value.trim() {
        "Ответственность" => AchievementsCategory::Responsibility,
        "Взаимодействие" => AchievementsCategory::Interaction,
        "Лидерство" => AchievementsCategory::Leadership,
        other => AchievementsCategory::parse(other),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn required_date(column: &'static str, value: &str) -> Result<NaiveDate, SnapshotImportError> {
    parse_datetime(value)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| SnapshotImportError::InvalidDate {
            table: SnapshotTable::ReviewCycles,
            column,
            value: value.to_string(),
        })
}

pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}
