use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::domain::{
    Assessment, AssessmentId, CommitteeDecision, ManagerReview, PeerReview, ReviewCycle, User,
    UserId,
};
use super::policy::ReviewTally;

/// Everything the store returned on the latest fetch. Missing collections read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSnapshot {
    pub users: Vec<User>,
    pub review_cycles: Vec<ReviewCycle>,
    pub assessments: Vec<Assessment>,
    pub peer_reviews: Vec<PeerReview>,
    pub committee_decisions: Vec<CommitteeDecision>,
    pub manager_reviews: Vec<ManagerReview>,
}

impl ReviewSnapshot {
    pub fn assessment(&self, id: &AssessmentId) -> Option<&Assessment> {
        self.assessments.iter().find(|assessment| &assessment.id == id)
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|user| &user.id == id)
    }

    pub fn active_cycle(&self) -> Option<&ReviewCycle> {
        self.review_cycles.iter().find(|cycle| cycle.active)
    }

    pub fn index(&self) -> SnapshotIndex<'_> {
        SnapshotIndex::build(
            &self.peer_reviews,
            &self.committee_decisions,
            &self.manager_reviews,
        )
    }
}

/// Reviews and decisions grouped by assessment, already deduplicated.
#[derive(Debug, Default)]
pub struct SnapshotIndex<'a> {
    peer_reviews: HashMap<&'a AssessmentId, Vec<&'a PeerReview>>,
    decisions: HashMap<&'a AssessmentId, &'a CommitteeDecision>,
    manager_reviews: HashMap<&'a AssessmentId, Vec<&'a ManagerReview>>,
}

impl<'a> SnapshotIndex<'a> {
    pub fn build(
        peer_reviews: &'a [PeerReview],
        committee_decisions: &'a [CommitteeDecision],
        manager_reviews: &'a [ManagerReview],
    ) -> Self {
        let mut grouped_reviews: HashMap<&'a AssessmentId, Vec<&'a PeerReview>> = HashMap::new();
        for review in unique_peer_reviews(peer_reviews) {
            grouped_reviews
                .entry(&review.assessment_id)
                .or_default()
                .push(review);
        }

        let mut grouped_decisions: HashMap<&'a AssessmentId, Vec<&'a CommitteeDecision>> =
            HashMap::new();
        for decision in committee_decisions {
            grouped_decisions
                .entry(&decision.assessment_id)
                .or_default()
                .push(decision);
        }
        let decisions = grouped_decisions
            .into_iter()
            .filter_map(|(id, group)| effective_decision(id, group).map(|decision| (id, decision)))
            .collect();

        let mut grouped_manager: HashMap<&'a AssessmentId, Vec<&'a ManagerReview>> =
            HashMap::new();
        for review in manager_reviews {
            grouped_manager
                .entry(&review.assessment_id)
                .or_default()
                .push(review);
        }

        Self {
            peer_reviews: grouped_reviews,
            decisions,
            manager_reviews: grouped_manager,
        }
    }

    pub fn peer_reviews_for(&self, id: &AssessmentId) -> &[&'a PeerReview] {
        self.peer_reviews
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn decision_for(&self, id: &AssessmentId) -> Option<&'a CommitteeDecision> {
        self.decisions.get(id).copied()
    }

    pub fn manager_reviews_for(&self, id: &AssessmentId) -> &[&'a ManagerReview] {
        self.manager_reviews
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Collapses repeated (assessment, reviewer) pairs to the most recent write.
///
/// "Most recent" is the latest `review_date`, then the higher `order`, then the
/// higher id, so the result does not depend on input order. Output is sorted by
/// assessment and `order`.
pub fn unique_peer_reviews<'a, I>(reviews: I) -> Vec<&'a PeerReview>
where
    I: IntoIterator<Item = &'a PeerReview>,
{
    let mut latest: BTreeMap<(&'a AssessmentId, &'a UserId), &'a PeerReview> = BTreeMap::new();
    for review in reviews {
        latest
            .entry((&review.assessment_id, &review.reviewer_id))
            .and_modify(|current| {
                if review_supersedes(review, current) {
                    *current = review;
                }
            })
            .or_insert(review);
    }

    let mut unique: Vec<&'a PeerReview> = latest.into_values().collect();
    unique.sort_by(|a, b| {
        a.assessment_id
            .cmp(&b.assessment_id)
            .then(a.order.cmp(&b.order))
            .then(a.id.cmp(&b.id))
    });
    unique
}

/// Counts the deduplicated reviews recorded against `assessment_id`.
pub fn tally_for<'a, I>(assessment_id: &AssessmentId, reviews: I) -> ReviewTally
where
    I: IntoIterator<Item = &'a PeerReview>,
{
    let matching = reviews
        .into_iter()
        .filter(|review| &review.assessment_id == assessment_id);

    unique_peer_reviews(matching)
        .into_iter()
        .fold(ReviewTally::default(), |mut tally, review| {
            tally.total += 1;
            if review.is_confirmed() {
                tally.confirmed += 1;
            }
            tally
        })
}

/// The earliest decision recorded for `assessment_id`, if any.
pub fn effective_decision<'a, I>(
    assessment_id: &AssessmentId,
    decisions: I,
) -> Option<&'a CommitteeDecision>
where
    I: IntoIterator<Item = &'a CommitteeDecision>,
{
    decisions
        .into_iter()
        .filter(|decision| &decision.assessment_id == assessment_id)
        .fold(None, |best: Option<&'a CommitteeDecision>, decision| match best {
            Some(current) if !decision_precedes(decision, current) => Some(current),
            _ => Some(decision),
        })
}

fn review_supersedes(candidate: &PeerReview, current: &PeerReview) -> bool {
    (candidate.review_date, candidate.order, &candidate.id)
        > (current.review_date, current.order, &current.id)
}

fn decision_precedes(candidate: &CommitteeDecision, current: &CommitteeDecision) -> bool {
    // Undated decisions sort after dated ones.
    let key = |decision: &CommitteeDecision| {
        (
            decision.decision_date.is_none(),
            decision.decision_date,
            decision.id.clone(),
        )
    };
    key(candidate) < key(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::review::domain::{
        CommitteeVerdict, DecisionId, GradeLevel, PeerReviewId, PeerReviewStatus,
    };
    use chrono::{TimeZone, Utc};

    fn review(
        id: &str,
        reviewer: &str,
        order: u32,
        day: u32,
        status: PeerReviewStatus,
    ) -> PeerReview {
        PeerReview {
            id: PeerReviewId::new(id),
            assessment_id: AssessmentId::new("sa-1"),
            reviewer_id: UserId::new(reviewer),
            order,
            status,
            feedback: "solid delivery".to_string(),
            confirmed_grade: None,
            review_date: Some(Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()),
        }
    }

    #[test]
    fn duplicate_reviewer_keeps_latest_write_regardless_of_order() {
        let older = review("pr-1", "u-2", 1, 1, PeerReviewStatus::Rejected);
        let newer = review("pr-3", "u-2", 3, 5, PeerReviewStatus::Confirmed);
        let other = review("pr-2", "u-3", 2, 2, PeerReviewStatus::Confirmed);

        let forward = vec![older.clone(), other.clone(), newer.clone()];
        let backward = vec![newer.clone(), other.clone(), older.clone()];

        let ids = |reviews: &[PeerReview]| -> Vec<PeerReviewId> {
            unique_peer_reviews(reviews)
                .iter()
                .map(|review| review.id.clone())
                .collect()
        };
        let forward_ids = ids(&forward);

        assert_eq!(forward_ids, ids(&backward));
        assert_eq!(
            forward_ids,
            vec![PeerReviewId::new("pr-2"), PeerReviewId::new("pr-3")]
        );

        let tally = tally_for(&AssessmentId::new("sa-1"), &forward);
        assert_eq!(tally, ReviewTally { total: 2, confirmed: 2 });
    }

    #[test]
    fn index_keeps_the_earliest_decision_per_assessment() {
        let decision = |id: &str, assessment: &str, day: Option<u32>| CommitteeDecision {
            id: DecisionId::new(id),
            assessment_id: AssessmentId::new(assessment),
            committee_member_id: UserId::new("u-cm"),
            decision: CommitteeVerdict::Approved,
            final_grade: GradeLevel::L3,
            comments: String::new(),
            recommendations: String::new(),
            decision_date: day.map(|day| Utc.with_ymd_and_hms(2025, 4, day, 9, 0, 0).unwrap()),
        };
        let decisions = vec![
            decision("cd-3", "sa-1", None),
            decision("cd-2", "sa-1", Some(9)),
            decision("cd-1", "sa-1", Some(4)),
            decision("cd-4", "sa-2", None),
        ];

        let index = SnapshotIndex::build(&[], &decisions, &[]);

        let first = index.decision_for(&AssessmentId::new("sa-1")).map(|d| d.id.clone());
        assert_eq!(first, Some(DecisionId::new("cd-1")));
        let undated = index.decision_for(&AssessmentId::new("sa-2")).map(|d| d.id.clone());
        assert_eq!(undated, Some(DecisionId::new("cd-4")));
        assert!(index.decision_for(&AssessmentId::new("sa-3")).is_none());
    }

    #[test]
    fn missing_collections_deserialize_as_empty() {
        let snapshot: ReviewSnapshot =
            serde_json::from_str(r#"{ "assessments": [] }"#).expect("partial snapshot parses");
        assert!(snapshot.peer_reviews.is_empty());
        assert!(snapshot.committee_decisions.is_empty());
        assert!(snapshot.users.is_empty());
    }
}
