use serde::{Deserialize, Serialize};

use crate::config::ReviewPolicyConfig;

pub const DEFAULT_MIN_PEER_REVIEWS: usize = 2;
pub const DEFAULT_MIN_CONFIRMED_REVIEWS: usize = 2;

/// Thresholds an assessment must clear before the committee may rule on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    min_peer_reviews: usize,
    min_confirmed_reviews: usize,
}

impl LifecyclePolicy {
    /// Zero thresholds fall back to the defaults, so the committee never rules on an
    /// unreviewed assessment.
    pub fn new(min_peer_reviews: usize, min_confirmed_reviews: usize) -> Self {
        let min_peer_reviews = if min_peer_reviews == 0 {
            DEFAULT_MIN_PEER_REVIEWS
        } else {
            min_peer_reviews
        };
        let min_confirmed_reviews = if min_confirmed_reviews == 0 {
            DEFAULT_MIN_CONFIRMED_REVIEWS
        } else {
            min_confirmed_reviews
        };

        Self {
            min_peer_reviews,
            min_confirmed_reviews,
        }
    }

    pub fn min_peer_reviews(&self) -> usize {
        self.min_peer_reviews
    }

    pub fn min_confirmed_reviews(&self) -> usize {
        self.min_confirmed_reviews
    }

    pub fn has_quorum(&self, tally: &ReviewTally) -> bool {
        tally.total >= self.min_peer_reviews && tally.confirmed >= self.min_confirmed_reviews
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PEER_REVIEWS, DEFAULT_MIN_CONFIRMED_REVIEWS)
    }
}

impl From<&ReviewPolicyConfig> for LifecyclePolicy {
    fn from(config: &ReviewPolicyConfig) -> Self {
        Self::new(config.min_peer_reviews, config.min_confirmed_reviews)
    }
}

/// Peer review counts for one assessment after per-reviewer deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewTally {
    pub total: usize,
    pub confirmed: usize,
}
