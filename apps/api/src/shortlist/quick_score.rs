//! Local keyword scoring, used only when the shortlisting service is down.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::application::Applicant;
use crate::shortlist::normalize::{Assessment, ProcessedWith, Recommendation, ScoreBreakdown};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickScore {
    pub total: u32,
    pub skills: u32,
    pub experience: u32,
    pub keywords: f64,
    pub matched_skills: usize,
}

fn years_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)(\d+)[\s-]*(?:years?|yrs?)").ok())
        .as_ref()
}

/// Years of experience a title implies. Later keywords win, so
/// "Junior Lead" expects 1.
pub fn expected_years(job_title: &str) -> f64 {
    let title = job_title.to_lowercase();
    let mut years = 3.0;
    if title.contains("senior") {
        years = 5.0;
    }
    if title.contains("lead") || title.contains("principal") {
        years = 7.0;
    }
    if title.contains("junior") || title.contains("entry") {
        years = 1.0;
    }
    years
}

pub fn experience_score(resume_text: &str, job_title: &str) -> u32 {
    let max_years = years_pattern()
        .map(|re| {
            re.captures_iter(resume_text)
                .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0) as f64;
    let expected = expected_years(job_title);

    if max_years >= expected {
        100
    } else if max_years >= expected * 0.7 {
        80
    } else if max_years >= expected * 0.5 {
        60
    } else if max_years > 0.0 {
        40
    } else {
        20
    }
}

fn keyword_score(resume_text: &str, job_title: &str, requirements: &[String]) -> f64 {
    let keywords: Vec<String> = job_title
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .chain(normalized(requirements))
        .collect();
    if keywords.is_empty() {
        return 0.0;
    }
    let found = keywords.iter().filter(|k| resume_text.contains(k.as_str())).count();
    (found as f64 / keywords.len() as f64 * 100.0).min(100.0)
}

/// Lowercased and trimmed. Blank entries would match every string, so they are dropped.
fn normalized(values: &[String]) -> impl Iterator<Item = String> + '_ {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Skills 50%, experience 30%, keywords 20%.
pub fn quick_score(applicant: &Applicant, requirements: &[String], job_title: &str) -> QuickScore {
    let resume_text = applicant
        .resume_text
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let skills: Vec<String> = normalized(&applicant.skills).collect();
    let wanted: Vec<String> = normalized(requirements).collect();

    let per_requirement = 100.0 / wanted.len().max(1) as f64;
    let matched_skills = wanted
        .iter()
        .filter(|req| {
            skills
                .iter()
                .any(|s| s.contains(req.as_str()) || req.contains(s.as_str()))
                || resume_text.contains(req.as_str())
        })
        .count();
    let skills_score = matched_skills as f64 * per_requirement;

    let experience = experience_score(&resume_text, job_title);
    let keywords = keyword_score(&resume_text, job_title, requirements);

    let total = (skills_score * 0.5 + f64::from(experience) * 0.3 + keywords * 0.2).round();

    QuickScore {
        total: total as u32,
        skills: skills_score.round() as u32,
        experience,
        keywords,
        matched_skills,
    }
}

impl QuickScore {
    pub fn into_assessment(self) -> Assessment {
        let score = f64::from(self.total);
        Assessment {
            score,
            recommendation: if score >= 70.0 {
                Recommendation::Hire
            } else {
                Recommendation::Maybe
            },
            breakdown: ScoreBreakdown {
                skills: f64::from(self.skills),
                experience: f64::from(self.experience),
                projects: 0.0,
                overall: score,
            },
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            key_skills_found: Vec::new(),
            missing_critical_skills: Vec::new(),
            reasoning: Some(format!(
                "AI analysis unavailable. Quick score from {} matched requirement(s).",
                self.matched_skills
            )),
            processed_with: ProcessedWith::QuickScore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant(skills: &[&str], resume: &str) -> Applicant {
        Applicant {
            name: "Ada".into(),
            email: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            resume_text: Some(resume.to_string()),
        }
    }

    #[test]
    fn test_expected_years_by_title() {
        assert_eq!(expected_years("Senior Backend Engineer"), 5.0);
        assert_eq!(expected_years("Principal Engineer"), 7.0);
        assert_eq!(expected_years("Junior Developer"), 1.0);
        assert_eq!(expected_years("Backend Engineer"), 3.0);
    }

    #[test]
    fn test_experience_tiers() {
        assert_eq!(experience_score("6 years of rust", "Senior Engineer"), 100);
        assert_eq!(experience_score("4 yrs rust", "Senior Engineer"), 80);
        assert_eq!(experience_score("3-years", "Senior Engineer"), 60);
        assert_eq!(experience_score("1 year", "Senior Engineer"), 40);
        assert_eq!(experience_score("no numbers", "Senior Engineer"), 20);
    }

    #[test]
    fn test_quick_score_weights() {
        let requirements = vec!["Rust".to_string(), "Postgres".to_string()];
        let score = quick_score(
            &applicant(&["rust"], "built services in rust and postgres for 5 years as an engineer"),
            &requirements,
            "Backend Engineer",
        );

        assert_eq!(score.matched_skills, 2);
        assert_eq!(score.skills, 100);
        assert_eq!(score.experience, 100);
        // "backend" is missing: 3 of 4 keywords.
        assert_eq!(score.keywords, 75.0);
        assert_eq!(score.total, 95);
    }

    #[test]
    fn test_blank_skills_match_nothing() {
        let requirements = vec!["Kubernetes".to_string(), " ".to_string(), "Terraform".to_string()];
        let score = quick_score(
            &applicant(&["", "   "], "no relevant experience"),
            &requirements,
            "Engineer",
        );

        assert_eq!(score.matched_skills, 0);
        assert_eq!(score.skills, 0);
        assert_eq!(score.keywords, 0.0);
    }

    #[test]
    fn test_assessment_marks_quick_score() {
        let assessment = quick_score(&applicant(&[], ""), &[], "Engineer").into_assessment();
        assert_eq!(assessment.processed_with, ProcessedWith::QuickScore);
        assert_eq!(assessment.recommendation, Recommendation::Maybe);
        assert_eq!(assessment.score, 6.0);
    }
}
