//! Resume-to-job match analysis.
//!
//! The RAG service answers with either a structured analysis or a single
//! `comprehensiveAnalysis` text, wrapped in `{ data: { analysis } }`,
//! `{ data }` or nothing at all. `normalize_analysis` is the only place that
//! knows about those shapes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{first_f64, first_list, first_str, first_value};

pub const MISSING_SKILLS_TITLE: &str = "Skills You Need to Develop";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub resume_filename: String,
    #[serde(default)]
    pub job_id: Option<String>,
    pub job_title: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    /// When set, a chat session is opened for this user and job.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AnalyzeRequest {
    pub fn to_body(&self, resume_text: &str) -> Value {
        json!({
            "action": "analyze",
            "jobId": self.job_id,
            "jobTitle": self.job_title,
            "jobDescription": self.job_description,
            "requirements": self.requirements,
            "resumePath": self.resume_filename,
            "resumeText": resume_text,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAnalysis {
    pub overall_score: f64,
    pub level: String,
    pub summary: String,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub key_strengths: Vec<String>,
    pub improvement_suggestions: Vec<String>,
    /// Free-text analysis, when the service produced one.
    pub comprehensive_analysis: Option<String>,
}

fn level_for(score: f64) -> &'static str {
    if score >= 80.0 {
        "Excellent Match"
    } else if score >= 60.0 {
        "Good Match"
    } else if score >= 40.0 {
        "Fair Match"
    } else {
        "Needs Improvement"
    }
}

/// Skill lists live under `structuredAnalysis`, `skillsAnalysis` or the root.
fn skill_list(analysis: &Value, names: &[&str]) -> Vec<String> {
    let keys: Vec<String> = ["structuredAnalysis.", "skillsAnalysis.", ""]
        .iter()
        .flat_map(|prefix| names.iter().map(move |name| format!("{prefix}{name}")))
        .collect();
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    first_list(analysis, &keys)
}

pub fn normalize_analysis(response: &Value) -> MatchAnalysis {
    let analysis = first_value(response, &["data.analysis", "data"]).unwrap_or(response);

    let overall_score = first_f64(
        analysis,
        &[
            "overallMatch.score",
            "overallScore",
            "overall_score",
            "matchScore",
            "score",
            "structuredAnalysis.overallScore",
        ],
    )
    .unwrap_or(0.0)
    .clamp(0.0, 100.0);

    MatchAnalysis {
        overall_score,
        level: first_str(analysis, &["overallMatch.level", "level", "matchLevel"])
            .unwrap_or_else(|| level_for(overall_score).to_string()),
        summary: first_str(
            analysis,
            &["overallMatch.summary", "summary", "executiveSummary"],
        )
        .unwrap_or_default(),
        matching_skills: skill_list(analysis, &["matchingSkills", "matching_skills", "matching"]),
        missing_skills: skill_list(analysis, &["missingSkills", "missing_skills", "missing"]),
        key_strengths: skill_list(analysis, &["keyStrengths", "strengths"]),
        improvement_suggestions: skill_list(
            analysis,
            &["improvementSuggestions", "recommendations", "suggestions"],
        ),
        comprehensive_analysis: first_str(analysis, &["comprehensiveAnalysis"]),
    }
}

/// The panel listing the skills the applicant still lacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsPanel {
    pub title: &'static str,
    pub count: usize,
    pub entries: Vec<String>,
}

pub fn missing_skills_panel(analysis: &MatchAnalysis) -> SkillsPanel {
    SkillsPanel {
        title: MISSING_SKILLS_TITLE,
        count: analysis.missing_skills.len(),
        entries: analysis.missing_skills.clone(),
    }
}

pub fn welcome_message(job_title: &str) -> String {
    format!(
        "Hello! I've analyzed your resume against the \"{job_title}\" position. I can answer \
         questions about your match, skills, experience, and provide interview tips. What \
         would you like to know?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_structured_analysis() {
        let response = json!({
            "success": true,
            "data": { "analysis": {
                "overallMatch": { "score": 72, "summary": "Solid backend fit" },
                "structuredAnalysis": {
                    "matchingSkills": ["Rust", { "skill": "PostgreSQL" }],
                    "missingSkills": ["Kubernetes", "GraphQL"]
                },
                "keyStrengths": ["Systems design"]
            }}
        });
        let analysis = normalize_analysis(&response);

        assert_eq!(analysis.overall_score, 72.0);
        assert_eq!(analysis.level, "Good Match");
        assert_eq!(analysis.summary, "Solid backend fit");
        assert_eq!(analysis.matching_skills, vec!["Rust", "PostgreSQL"]);
        assert_eq!(analysis.key_strengths, vec!["Systems design"]);

        let panel = missing_skills_panel(&analysis);
        assert_eq!(panel.title, "Skills You Need to Develop");
        assert_eq!(panel.count, 2);
        assert_eq!(panel.entries, vec!["Kubernetes", "GraphQL"]);
    }

    #[test]
    fn test_flat_and_text_shapes() {
        let flat = normalize_analysis(&json!({
            "overall_score": "45%",
            "skillsAnalysis": { "missing": [{ "skill": "Go" }] },
            "comprehensiveAnalysis": "## Match report"
        }));
        assert_eq!(flat.overall_score, 45.0);
        assert_eq!(flat.level, "Fair Match");
        assert_eq!(flat.missing_skills, vec!["Go"]);
        assert_eq!(flat.comprehensive_analysis.as_deref(), Some("## Match report"));

        let empty = normalize_analysis(&json!({ "data": {} }));
        assert_eq!(empty.overall_score, 0.0);
        assert!(empty.missing_skills.is_empty());
    }

    #[test]
    fn test_request_body_carries_action_and_text() {
        let req = AnalyzeRequest {
            resume_filename: "resume_1_abc.pdf".into(),
            job_id: Some("job-1".into()),
            job_title: "Backend Engineer".into(),
            job_description: "Build APIs".into(),
            requirements: vec!["Rust".into()],
            user_id: None,
        };
        let body = req.to_body("resume text");
        assert_eq!(body["action"], "analyze");
        assert_eq!(body["resumePath"], "resume_1_abc.pdf");
        assert_eq!(body["resumeText"], "resume text");
    }
}
