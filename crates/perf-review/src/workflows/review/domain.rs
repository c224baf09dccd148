use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Declares a string-backed enum that never fails to parse: unrecognized
/// values (including case and whitespace variants the store hands back)
/// land on `Unknown` instead of rejecting the whole snapshot.
macro_rules! lenient_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Unknown,
        }

        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Unknown => "unknown",
                }
            }

            /// False for values that did not match any known label.
            pub const fn is_known(self) -> bool {
                !matches!(self, Self::Unknown)
            }

            pub fn parse(value: &str) -> Self {
                let trimmed = value.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($label) {
                        return Self::$variant;
                    }
                )+
                Self::Unknown
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::parse(&value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

lenient_enum! {
    /// Role string supplied by the identity provider. `Unknown` carries no permissions.
    pub enum UserRole {
        Employee => "employee",
        Manager => "manager",
        Hr => "hr",
        Admin => "admin",
        CommitteeMember => "committee_member",
    }
}

impl UserRole {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Employee,
            Self::Manager,
            Self::Hr,
            Self::Admin,
            Self::CommitteeMember,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::Manager => "Manager",
            Self::Hr => "HR",
            Self::Admin => "Administrator",
            Self::CommitteeMember => "Committee Member",
            Self::Unknown => "Unknown",
        }
    }
}

lenient_enum! {
    pub enum GradeLevel {
        L1 => "L1",
        L2 => "L2",
        L3 => "L3",
        L4 => "L4",
        L5 => "L5",
    }
}

lenient_enum! {
    pub enum AchievementsCategory {
        Responsibility => "responsibility",
        Interaction => "interaction",
        Leadership => "leadership",
    }
}

lenient_enum! {
    /// Status persisted on the assessment row. Only `Submitted` opens review queues.
    pub enum AssessmentStatus {
        Draft => "draft",
        Submitted => "submitted",
        UnderReview => "under_review",
        Completed => "completed",
    }
}

lenient_enum! {
    pub enum PeerReviewStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Rejected => "rejected",
    }
}

lenient_enum! {
    pub enum CommitteeVerdict {
        Approved => "approved",
        Rejected => "rejected",
        Conditional => "conditional",
        Pending => "pending",
    }
}

lenient_enum! {
    pub enum ManagerReviewStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

record_id!(UserId);
record_id!(AssessmentId);
record_id!(ReviewCycleId);
record_id!(PeerReviewId);
record_id!(DecisionId);
record_id!(ManagerReviewId);

/// The acting user as reported by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: UserId::new(id),
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub department: String,
    pub role: UserRole,
    #[serde(default)]
    pub manager_id: Option<UserId>,
    #[serde(default)]
    pub current_grade: Option<GradeLevel>,
}

impl User {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.id.0.clone()
        } else {
            name.to_string()
        }
    }
}

/// Bounded period during which assessments are collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCycle {
    pub id: ReviewCycleId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub active: bool,
}

/// An employee's self-assessment for one review cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub employee_id: UserId,
    pub review_cycle_id: ReviewCycleId,
    #[serde(default)]
    pub achievements: String,
    pub category: AchievementsCategory,
    #[serde(default)]
    pub self_evaluation: String,
    pub current_grade: GradeLevel,
    pub target_grade: GradeLevel,
    pub status: AssessmentStatus,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerReview {
    pub id: PeerReviewId,
    pub assessment_id: AssessmentId,
    pub reviewer_id: UserId,
    /// Sequential position among the assessment's reviews, starting at 1.
    pub order: u32,
    pub status: PeerReviewStatus,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub confirmed_grade: Option<GradeLevel>,
    #[serde(default)]
    pub review_date: Option<DateTime<Utc>>,
}

impl PeerReview {
    pub fn is_confirmed(&self) -> bool {
        self.status == PeerReviewStatus::Confirmed
    }
}

/// Final ruling on an assessment. Its presence makes the assessment terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeDecision {
    pub id: DecisionId,
    pub assessment_id: AssessmentId,
    pub committee_member_id: UserId,
    pub decision: CommitteeVerdict,
    pub final_grade: GradeLevel,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub recommendations: String,
    #[serde(default)]
    pub decision_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerReview {
    pub id: ManagerReviewId,
    pub assessment_id: AssessmentId,
    pub manager_id: UserId,
    pub status: ManagerReviewStatus,
    #[serde(default)]
    pub recommended_grade: Option<GradeLevel>,
    #[serde(default)]
    pub comments: String,
}
