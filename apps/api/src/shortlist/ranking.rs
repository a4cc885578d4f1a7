use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shortlist::normalize::RankedCandidate;

pub const HIGH_SCORE: f64 = 70.0;
pub const MEDIUM_SCORE: f64 = 50.0;

/// Sorts by score, highest first. Equal scores keep their input order and
/// pending candidates go last.
pub fn rank(mut candidates: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
    candidates.sort_by(|a, b| match (a.score(), b.score()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    candidates
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl FromStr for ScoreFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(ScoreFilter::All),
            "high" => Ok(ScoreFilter::High),
            "medium" => Ok(ScoreFilter::Medium),
            "low" => Ok(ScoreFilter::Low),
            other => Err(format!("Unknown score filter '{other}'")),
        }
    }
}

impl ScoreFilter {
    /// Pending candidates only appear under `All`.
    pub fn matches(&self, score: Option<f64>) -> bool {
        match (self, score) {
            (ScoreFilter::All, _) => true,
            (_, None) => false,
            (ScoreFilter::High, Some(s)) => s >= HIGH_SCORE,
            (ScoreFilter::Medium, Some(s)) => (MEDIUM_SCORE..HIGH_SCORE).contains(&s),
            (ScoreFilter::Low, Some(s)) => s < MEDIUM_SCORE,
        }
    }
}

/// Keeps the candidates matching `filter`, preserving order.
pub fn filter(candidates: &[RankedCandidate], filter: ScoreFilter) -> Vec<RankedCandidate> {
    candidates
        .iter()
        .filter(|c| filter.matches(c.score()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortlistSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub pending: usize,
}

pub fn summary(candidates: &[RankedCandidate]) -> ShortlistSummary {
    let count = |f: ScoreFilter| candidates.iter().filter(|c| f.matches(c.score())).count();
    ShortlistSummary {
        total: candidates.len(),
        high: count(ScoreFilter::High),
        medium: count(ScoreFilter::Medium),
        low: count(ScoreFilter::Low),
        pending: candidates.iter().filter(|c| c.score().is_none()).count(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::application::Application;
    use crate::shortlist::normalize::{ai_entries, join};

    fn ranked() -> Vec<RankedCandidate> {
        let applications = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| Application::from_value(&json!({ "id": id })).unwrap())
            .collect();
        let ai = ai_entries(&json!([
            { "candidateId": "a", "score": 45 },
            { "candidateId": "b", "score": 88 },
            { "candidateId": "c", "score": 62 },
            { "candidateId": "e", "score": 62 }
        ]));
        rank(join(applications, ai))
    }

    fn ids(candidates: &[RankedCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.application.id.as_str()).collect()
    }

    #[test]
    fn test_rank_descending_stable_pending_last() {
        assert_eq!(ids(&ranked()), vec!["b", "c", "e", "a", "d"]);
    }

    #[test]
    fn test_filters_partition_scored_candidates() {
        let sorted = ranked();
        assert_eq!(ids(&filter(&sorted, ScoreFilter::High)), vec!["b"]);
        assert_eq!(ids(&filter(&sorted, ScoreFilter::Medium)), vec!["c", "e"]);
        assert_eq!(ids(&filter(&sorted, ScoreFilter::Low)), vec!["a"]);
    }

    #[test]
    fn test_filter_is_idempotent_and_all_restores() {
        let sorted = ranked();
        for f in [ScoreFilter::High, ScoreFilter::Medium, ScoreFilter::Low, ScoreFilter::All] {
            let once = filter(&sorted, f);
            assert_eq!(filter(&once, f), once);
        }
        assert_eq!(filter(&sorted, ScoreFilter::All), sorted);
    }

    #[test]
    fn test_summary_counts() {
        assert_eq!(
            summary(&ranked()),
            ShortlistSummary {
                total: 5,
                high: 1,
                medium: 2,
                low: 1,
                pending: 1
            }
        );
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("HIGH".parse::<ScoreFilter>(), Ok(ScoreFilter::High));
        assert_eq!("".parse::<ScoreFilter>(), Ok(ScoreFilter::All));
        assert!("top".parse::<ScoreFilter>().is_err());
    }
}
