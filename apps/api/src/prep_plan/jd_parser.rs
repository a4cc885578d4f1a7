//! JD parser: turns a job description into the skill inventory a prep plan is
//! built from.
//!
//! The AI parser is tried first. When it fails or answers with something
//! unusable, a keyword-pattern parser runs locally with lower confidence.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::ai_client::{AiClient, PARSE_JOB_DESCRIPTION_PATH};
use crate::errors::AppError;
use crate::models::job::{Job, WorkMode};
use crate::models::{first_f64, first_list, first_str, first_value};
use crate::persistence::{ClientStore, StoreKey};

/// Confidence attached to the pattern-based result.
pub const RULES_CONFIDENCE: f64 = 0.75;
const MUST_LEARN_COUNT: usize = 5;

const TECH_PATTERNS: &[(&str, &str)] = &[
    ("javascript", r"\b(javascript|js|node\.?js|react|vue|angular|typescript|ts)\b"),
    ("python", r"\b(python|django|flask|fastapi|pandas|numpy|pytorch|tensorflow)\b"),
    ("java", r"\b(java|spring|hibernate|maven|gradle)\b"),
    ("c#", r"(c#|\.net\b|\basp\.net\b|\bentity framework\b)"),
    ("php", r"\b(php|laravel|symfony|wordpress)\b"),
    ("ruby", r"\b(ruby|rails|sinatra)\b"),
    ("go", r"\b(golang|go)\b"),
    ("rust", r"\b(rust)\b"),
    ("sql", r"\b(sql|mysql|postgresql|mongodb|redis|elasticsearch)\b"),
    ("aws", r"\b(aws|amazon web services|ec2|s3|lambda|dynamodb)\b"),
    ("docker", r"\b(docker|kubernetes|containerization)\b"),
    ("git", r"\b(git|github|gitlab|version control)\b"),
    ("testing", r"\b(testing|unit test|integration test|jest|pytest|junit)\b"),
];

const FRAMEWORK_PATTERNS: &[(&str, &str)] = &[
    ("react", r"\b(react|reactjs|next\.?js|gatsby)\b"),
    ("angular", r"\b(angular|angularjs)\b"),
    ("vue", r"\b(vue|vuejs|nuxt)\b"),
    ("express", r"\b(express|expressjs)\b"),
    ("django", r"\b(django|drf)\b"),
    ("flask", r"\b(flask)\b"),
    ("spring", r"\b(spring|spring boot)\b"),
    ("laravel", r"\b(laravel)\b"),
];

const SOFT_PATTERNS: &[(&str, &str)] = &[
    ("communication", r"\b(communication|communicate|presentation|writing)\b"),
    ("teamwork", r"\b(team|collaboration|collaborative|cross-functional)\b"),
    ("leadership", r"\b(leadership|leading|mentor|mentoring)\b"),
    ("problem-solving", r"\b(problem.solving|analytical|critical thinking)\b"),
    ("adaptability", r"\b(adaptable|flexible|learning agility)\b"),
];

const LANGUAGES: &[&str] = &["javascript", "python", "java", "c#", "php", "ruby", "go", "rust"];
const TOOLS: &[&str] = &["git", "docker", "aws"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    #[default]
    Mid,
    Senior,
    Lead,
}

impl ExperienceLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "entry" | "junior" => Some(ExperienceLevel::Entry),
            "mid" | "intermediate" => Some(ExperienceLevel::Mid),
            "senior" => Some(ExperienceLevel::Senior),
            "lead" | "principal" | "staff" => Some(ExperienceLevel::Lead),
            _ => None,
        }
    }

    /// Default year range for the level.
    fn years(self) -> (u32, u32) {
        match self {
            ExperienceLevel::Entry => (0, 2),
            ExperienceLevel::Mid => (0, 5),
            ExperienceLevel::Senior => (5, 10),
            ExperienceLevel::Lead => (10, 15),
        }
    }

    pub fn difficulty(self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "beginner",
            ExperienceLevel::Mid => "intermediate",
            ExperienceLevel::Senior | ExperienceLevel::Lead => "advanced",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequiredSkills {
    pub critical: Vec<String>,
    pub technical: Vec<String>,
    pub soft: Vec<String>,
    pub tools: Vec<String>,
    pub frameworks: Vec<String>,
    pub languages: Vec<String>,
    pub databases: Vec<String>,
    pub cloud: Vec<String>,
}

impl RequiredSkills {
    pub fn is_empty(&self) -> bool {
        [
            &self.critical,
            &self.technical,
            &self.soft,
            &self.tools,
            &self.frameworks,
            &self.languages,
            &self.databases,
            &self.cloud,
        ]
        .iter()
        .all(|list| list.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub min_years: u32,
    pub max_years: u32,
    pub level: ExperienceLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningPath {
    pub must_learn: Vec<String>,
    pub nice_to_have: Vec<String>,
    pub priority_order: Vec<String>,
    pub difficulty_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterviewPrep {
    pub technical_topics: Vec<String>,
    pub system_design: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseSource {
    Ai,
    Rules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSkills {
    pub required_skills: RequiredSkills,
    pub experience: Experience,
    pub learning_path: LearningPath,
    pub interview_prep: InterviewPrep,
    pub work_type: WorkMode,
    pub confidence: f64,
    pub source: ParseSource,
}

fn compile(table: &[(&'static str, &str)]) -> Vec<(&'static str, Regex)> {
    table
        .iter()
        .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (*name, re)))
        .collect()
}

fn tech_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(TECH_PATTERNS))
}

fn framework_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(FRAMEWORK_PATTERNS))
}

fn soft_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(SOFT_PATTERNS))
}

fn regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn matching(patterns: &[(&'static str, Regex)], text: &str) -> Vec<String> {
    patterns
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    regex(cell, pattern).is_some_and(|re| re.is_match(text))
}

fn experience_from_text(text: &str) -> Experience {
    static ENTRY: OnceLock<Option<Regex>> = OnceLock::new();
    static SENIOR: OnceLock<Option<Regex>> = OnceLock::new();
    static LEAD: OnceLock<Option<Regex>> = OnceLock::new();
    static YEARS: OnceLock<Option<Regex>> = OnceLock::new();

    let level = if matches(&ENTRY, r"\b(entry|junior|0-2 years|graduate|intern)\b", text) {
        ExperienceLevel::Entry
    } else if matches(&SENIOR, r"\b(senior|lead|architect)\b|\b(5|7)\+ years\b", text) {
        ExperienceLevel::Senior
    } else if matches(&LEAD, r"\b(principal|staff|director)\b|\b10\+ years\b", text) {
        ExperienceLevel::Lead
    } else {
        ExperienceLevel::Mid
    };

    // Explicit year mentions override the level's default range.
    let years: Vec<u32> = regex(&YEARS, r"(\d+)\+?\s*years?")
        .map(|re| {
            re.captures_iter(text)
                .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
                .collect()
        })
        .unwrap_or_default();
    let (min_years, max_years) = match (years.iter().min(), years.iter().max()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => level.years(),
    };

    Experience {
        min_years,
        max_years,
        level,
    }
}

fn work_type_from_text(text: &str) -> WorkMode {
    static REMOTE: OnceLock<Option<Regex>> = OnceLock::new();
    static HYBRID: OnceLock<Option<Regex>> = OnceLock::new();

    if matches(&REMOTE, r"\b(remote|work from home|wfh)\b", text) {
        WorkMode::Remote
    } else if matches(&HYBRID, r"\b(hybrid|flexible)\b", text) {
        WorkMode::Hybrid
    } else {
        WorkMode::Onsite
    }
}

/// Keyword-pattern parser used when the AI parser is unavailable.
pub fn parse_with_rules(description: &str, title: &str) -> ParsedSkills {
    let text = format!("{title} {description}").to_lowercase();

    let technical = matching(tech_patterns(), &text);
    let frameworks = matching(framework_patterns(), &text);
    let soft = matching(soft_patterns(), &text);
    let experience = experience_from_text(&text);

    let must_learn: Vec<String> = technical.iter().take(MUST_LEARN_COUNT).cloned().collect();
    let nice_to_have: Vec<String> = frameworks
        .iter()
        .chain(technical.iter().skip(MUST_LEARN_COUNT))
        .cloned()
        .collect();
    let priority_order = must_learn
        .iter()
        .chain(nice_to_have.iter().take(3))
        .cloned()
        .collect();

    ParsedSkills {
        required_skills: RequiredSkills {
            tools: only(&technical, TOOLS),
            languages: only(&technical, LANGUAGES),
            technical,
            soft,
            frameworks,
            ..Default::default()
        },
        learning_path: LearningPath {
            must_learn,
            nice_to_have,
            priority_order,
            difficulty_level: Some(experience.level.difficulty().to_string()),
        },
        experience,
        interview_prep: InterviewPrep::default(),
        work_type: work_type_from_text(&text),
        confidence: RULES_CONFIDENCE,
        source: ParseSource::Rules,
    }
}

fn only(skills: &[String], allowed: &[&str]) -> Vec<String> {
    skills
        .iter()
        .filter(|s| allowed.contains(&s.as_str()))
        .cloned()
        .collect()
}

/// Normalizes the AI parser's answer. Returns `None` when it carries no skills.
pub fn from_ai_value(response: &Value) -> Option<ParsedSkills> {
    let root = first_value(response, &["data.parsedData", "parsedData", "data"]).unwrap_or(response);
    let skills = first_value(root, &["requiredSkills"])?;

    let list = |key: &str| first_list(skills, &[key]);
    let required_skills = RequiredSkills {
        critical: list("critical"),
        technical: list("technical"),
        soft: list("soft"),
        tools: list("tools"),
        frameworks: list("frameworks"),
        languages: list("languages"),
        databases: list("databases"),
        cloud: list("cloud"),
    };
    if required_skills.is_empty() {
        return None;
    }

    let level = first_str(root, &["experience.level"])
        .and_then(|raw| ExperienceLevel::parse(&raw))
        .unwrap_or_default();
    let (default_min, default_max) = level.years();
    let experience = Experience {
        min_years: first_f64(root, &["experience.minYears"])
            .map(|y| y.max(0.0) as u32)
            .unwrap_or(default_min),
        max_years: first_f64(root, &["experience.maxYears"])
            .map(|y| y.max(0.0) as u32)
            .unwrap_or(default_max),
        level,
    };

    Some(ParsedSkills {
        required_skills,
        experience,
        learning_path: LearningPath {
            must_learn: first_list(root, &["learningPath.mustLearn"]),
            nice_to_have: first_list(root, &["learningPath.niceToHave"]),
            priority_order: first_list(
                root,
                &["learningPath.learningOrder", "learningPath.priorityOrder"],
            ),
            difficulty_level: first_str(root, &["learningPath.difficultyLevel", "difficulty"]),
        },
        interview_prep: InterviewPrep {
            technical_topics: first_list(root, &["interviewPrep.technicalTopics"]),
            system_design: first_list(root, &["interviewPrep.systemDesign"]),
        },
        work_type: first_str(root, &["jobInsights.workType", "workType"])
            .and_then(|raw| WorkMode::parse(&raw))
            .unwrap_or(WorkMode::Onsite),
        confidence: first_f64(root, &["confidence"]).unwrap_or(1.0),
        source: ParseSource::Ai,
    })
}

/// Returns the parsed skills for `job`, from cache when available.
pub async fn parse_job_description(
    ai: &AiClient,
    store: &Arc<dyn ClientStore>,
    job: &Job,
) -> Result<ParsedSkills, AppError> {
    let key = StoreKey::ParsedSkills(job.id.clone());
    if let Some(cached) = store.get_json::<ParsedSkills>(&key).await? {
        return Ok(cached);
    }

    let body = json!({
        "jobId": job.id,
        "jobTitle": job.title,
        "companyName": job.company_name,
        "jobDescription": job.description,
        "requirements": job.requirements,
    });
    let parsed = match ai.call_value(PARSE_JOB_DESCRIPTION_PATH, &body).await {
        Ok(response) => from_ai_value(&response),
        Err(e) => {
            warn!("AI job description parsing failed for {}: {e}", job.id);
            None
        }
    };

    let parsed = match parsed {
        Some(parsed) => parsed,
        None => {
            info!("Falling back to rule-based parsing for job {}", job.id);
            let text = format!("{}\n{}", job.description, job.requirements.join("\n"));
            parse_with_rules(&text, &job.title)
        }
    };

    store.set_json(&key, &parsed).await?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKEND_JD: &str = "We are a remote-first team looking for a Senior Backend Engineer. \
        You will build services in Python and Django, manage PostgreSQL and Redis, deploy with \
        Docker on AWS and keep everything under Git. Strong communication and mentoring skills. \
        5+ years of experience required, ideally 7 years.";

    #[test]
    fn test_rules_extract_skills_in_table_order() {
        let parsed = parse_with_rules(BACKEND_JD, "Senior Backend Engineer");

        assert_eq!(
            parsed.required_skills.technical,
            vec!["python", "sql", "aws", "docker", "git"]
        );
        assert_eq!(parsed.required_skills.frameworks, vec!["django"]);
        assert_eq!(parsed.required_skills.languages, vec!["python"]);
        assert_eq!(parsed.required_skills.tools, vec!["aws", "docker", "git"]);
        assert_eq!(
            parsed.required_skills.soft,
            vec!["communication", "teamwork", "leadership"]
        );
        assert_eq!(parsed.source, ParseSource::Rules);
        assert_eq!(parsed.confidence, RULES_CONFIDENCE);
    }

    #[test]
    fn test_rules_experience_and_work_type() {
        let parsed = parse_with_rules(BACKEND_JD, "Senior Backend Engineer");
        assert_eq!(parsed.experience.level, ExperienceLevel::Senior);
        assert_eq!((parsed.experience.min_years, parsed.experience.max_years), (5, 7));
        assert_eq!(parsed.work_type, WorkMode::Remote);
        assert_eq!(parsed.learning_path.difficulty_level.as_deref(), Some("advanced"));
    }

    #[test]
    fn test_rules_learning_path_caps_must_learn() {
        let parsed = parse_with_rules(
            "javascript python java php ruby golang rust sql, react",
            "Polyglot Developer",
        );
        assert_eq!(parsed.learning_path.must_learn.len(), MUST_LEARN_COUNT);
        assert_eq!(parsed.learning_path.nice_to_have[0], "react");
        assert!(parsed.learning_path.nice_to_have.contains(&"go".to_string()));
        assert_eq!(parsed.learning_path.priority_order.len(), 8);
    }

    #[test]
    fn test_rules_defaults_to_mid_onsite() {
        let parsed = parse_with_rules("Maintain our internal tools.", "Developer");
        assert_eq!(parsed.experience.level, ExperienceLevel::Mid);
        assert_eq!((parsed.experience.min_years, parsed.experience.max_years), (0, 5));
        assert_eq!(parsed.work_type, WorkMode::Onsite);
    }

    #[test]
    fn test_from_ai_value_reads_wrapped_payload() {
        let parsed = from_ai_value(&json!({
            "success": true,
            "data": {
                "requiredSkills": { "critical": ["Rust"], "databases": [{ "name": "PostgreSQL" }] },
                "experience": { "minYears": 3, "level": "senior" },
                "learningPath": { "mustLearn": ["Rust", "Tokio"] },
                "interviewPrep": { "systemDesign": ["Rate limiter"] },
                "jobInsights": { "workType": "hybrid" }
            }
        }))
        .unwrap();

        assert_eq!(parsed.required_skills.critical, vec!["Rust"]);
        assert_eq!(parsed.required_skills.databases, vec!["PostgreSQL"]);
        assert_eq!(parsed.experience.min_years, 3);
        assert_eq!(parsed.experience.max_years, 10);
        assert_eq!(parsed.work_type, WorkMode::Hybrid);
        assert_eq!(parsed.source, ParseSource::Ai);
    }

    #[test]
    fn test_from_ai_value_rejects_empty_skills() {
        assert!(from_ai_value(&json!({ "data": { "requiredSkills": {} } })).is_none());
        assert!(from_ai_value(&json!({ "error": "quota" })).is_none());
    }
}
