//! Normalization boundary for shortlist data.
//!
//! The shortlisting service has answered in several shapes over time
//! (`candidate_id` vs `candidateId`, `overall_score` vs `score`, a bare list
//! vs `{ shortlist }` vs `{ data: { shortlist } }`). Everything is folded into
//! `AiCandidate` here and joined onto the applications by id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::application::Application;
use crate::models::{first_f64, first_id, first_list, first_str, first_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongHire,
    Hire,
    Maybe,
    Reject,
    ReviewManually,
}

impl Recommendation {
    /// Reads the labels the service has used, including the older
    /// `HIGHLY_RECOMMENDED` / `RECOMMENDED` / `CONSIDER` family.
    pub fn parse(raw: &str) -> Self {
        let label = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        if label.starts_with("STRONG_HIRE") || label.starts_with("HIGHLY_RECOMMENDED") {
            Recommendation::StrongHire
        } else if label.starts_with("NOT_RECOMMENDED")
            || label.starts_with("REJECT")
            || label.starts_with("NO_HIRE")
        {
            Recommendation::Reject
        } else if label.starts_with("HIRE") || label.starts_with("RECOMMENDED") {
            Recommendation::Hire
        } else if label.starts_with("MAYBE") || label.starts_with("CONSIDER") {
            Recommendation::Maybe
        } else {
            Recommendation::ReviewManually
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessedWith {
    Ai,
    QuickScore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub skills: f64,
    pub experience: f64,
    pub projects: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub score: f64,
    pub recommendation: Recommendation,
    pub breakdown: ScoreBreakdown,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub key_skills_found: Vec<String>,
    pub missing_critical_skills: Vec<String>,
    pub reasoning: Option<String>,
    pub processed_with: ProcessedWith,
}

/// AI data for one candidate. Candidates the service did not return stay pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AiAssessment {
    Scored(Assessment),
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiCandidate {
    pub candidate_id: String,
    pub assessment: Assessment,
}

const CANDIDATE_ID_KEYS: &[&str] = &["candidateId", "candidate_id", "applicationId", "id", "_id"];
const SCORE_KEYS: &[&str] = &["score", "overall_score", "overallScore", "aiScore"];

/// Normalizes one AI entry. Entries without an id or a score are dropped.
pub fn normalize_ai_entry(entry: &Value) -> Option<AiCandidate> {
    let candidate_id = first_id(entry, CANDIDATE_ID_KEYS)?;
    let score = first_f64(entry, SCORE_KEYS)?;

    let breakdown = ScoreBreakdown {
        skills: first_f64(
            entry,
            &["breakdown.skills", "skillsMatch", "skills_score", "skill_match_score"],
        )
        .unwrap_or(0.0),
        experience: first_f64(
            entry,
            &["breakdown.experience", "experienceMatch", "experience_score"],
        )
        .unwrap_or(0.0),
        projects: first_f64(entry, &["breakdown.projects", "projectsScore", "projects_score"])
            .unwrap_or(0.0),
        overall: first_f64(entry, &["breakdown.overall"]).unwrap_or(score),
    };

    Some(AiCandidate {
        candidate_id,
        assessment: Assessment {
            score,
            recommendation: first_str(entry, &["recommendation"])
                .map(|r| Recommendation::parse(&r))
                .unwrap_or(Recommendation::ReviewManually),
            breakdown,
            strengths: first_list(entry, &["strengths"]),
            weaknesses: first_list(entry, &["weaknesses"]),
            key_skills_found: first_list(
                entry,
                &["keySkillsFound", "key_skills_found", "criteria_analysis.technical_skills.found_skills"],
            ),
            missing_critical_skills: first_list(
                entry,
                &[
                    "missingCriticalSkills",
                    "missing_critical_skills",
                    "criteria_analysis.technical_skills.missing_skills",
                ],
            ),
            reasoning: first_str(entry, &["reasoning", "detailed_analysis"]),
            processed_with: ProcessedWith::Ai,
        },
    })
}

/// Pulls the candidate list out of any known response envelope.
pub fn ai_entries(response: &Value) -> Vec<AiCandidate> {
    let list = match response {
        Value::Array(_) => Some(response),
        _ => first_value(
            response,
            &[
                "shortlist",
                "data.shortlist",
                "rankedCandidates",
                "data.rankedCandidates",
                "candidates",
                "data.candidates",
            ],
        ),
    };

    list.and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_ai_entry).collect())
        .unwrap_or_default()
}

/// An application joined with its AI assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub application: Application,
    pub ai: AiAssessment,
}

impl RankedCandidate {
    pub fn score(&self) -> Option<f64> {
        match &self.ai {
            AiAssessment::Scored(a) => Some(a.score),
            AiAssessment::Pending => None,
        }
    }
}

/// Joins applications with AI data by id. Applications the AI did not score
/// are kept as pending; AI entries with no matching application are dropped.
pub fn join(applications: Vec<Application>, ai: Vec<AiCandidate>) -> Vec<RankedCandidate> {
    let mut by_id: HashMap<String, Assessment> = ai
        .into_iter()
        .map(|c| (c.candidate_id, c.assessment))
        .collect();

    applications
        .into_iter()
        .map(|application| {
            let ai = by_id
                .remove(&application.id)
                .map(AiAssessment::Scored)
                .unwrap_or(AiAssessment::Pending);
            RankedCandidate { application, ai }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn application(id: &str) -> Application {
        Application::from_value(&json!({ "_id": id, "applicantName": format!("Applicant {id}") }))
            .unwrap()
    }

    #[test]
    fn test_recommendation_labels() {
        assert_eq!(Recommendation::parse("STRONG_HIRE"), Recommendation::StrongHire);
        assert_eq!(Recommendation::parse("highly recommended"), Recommendation::StrongHire);
        assert_eq!(Recommendation::parse("RECOMMENDED"), Recommendation::Hire);
        assert_eq!(Recommendation::parse("NOT_RECOMMENDED"), Recommendation::Reject);
        assert_eq!(Recommendation::parse("Consider"), Recommendation::Maybe);
        assert_eq!(
            Recommendation::parse("Manual review recommended - AI service unavailable"),
            Recommendation::ReviewManually
        );
    }

    #[test]
    fn test_entry_shapes() {
        let snake = normalize_ai_entry(&json!({
            "candidate_id": "a1",
            "overall_score": 82,
            "skill_match_score": 90,
            "experience_score": 70,
            "recommendation": "HIRE"
        }))
        .unwrap();
        assert_eq!(snake.candidate_id, "a1");
        assert_eq!(snake.assessment.score, 82.0);
        assert_eq!(snake.assessment.breakdown.skills, 90.0);
        assert_eq!(snake.assessment.breakdown.overall, 82.0);

        let camel = normalize_ai_entry(&json!({
            "candidateId": "a2",
            "score": "64",
            "breakdown": { "skills": 60, "experience": 80, "projects": 40, "overall": 64 }
        }))
        .unwrap();
        assert_eq!(camel.assessment.breakdown.projects, 40.0);
        assert_eq!(camel.assessment.recommendation, Recommendation::ReviewManually);

        assert!(normalize_ai_entry(&json!({ "candidateId": "a3" })).is_none());
    }

    #[test]
    fn test_ai_entries_envelopes() {
        let entry = json!({ "candidateId": "a1", "score": 50 });
        assert_eq!(ai_entries(&json!([entry.clone()])).len(), 1);
        assert_eq!(ai_entries(&json!({ "shortlist": [entry.clone()] })).len(), 1);
        assert_eq!(ai_entries(&json!({ "data": { "shortlist": [entry] } })).len(), 1);
        assert!(ai_entries(&json!({ "message": "nothing" })).is_empty());
    }

    #[test]
    fn test_join_marks_unscored_as_pending() {
        let ai = ai_entries(&json!([
            { "candidateId": "a1", "score": 70 },
            { "candidateId": "ghost", "score": 99 }
        ]));
        let joined = join(vec![application("a1"), application("a2")], ai);

        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].score(), Some(70.0));
        assert_eq!(joined[1].ai, AiAssessment::Pending);
    }
}
