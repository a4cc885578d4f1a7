use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{first_f64, first_id, first_list, first_str, first_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    Remote,
    Hybrid,
    Onsite,
}

impl WorkMode {
    /// Reads free-form labels such as "Remote", "on-site", "Hybrid (2 days)".
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.to_ascii_lowercase();
        if raw.contains("hybrid") {
            Some(WorkMode::Hybrid)
        } else if raw.contains("remote") || raw.contains("anywhere") {
            Some(WorkMode::Remote)
        } else if raw.contains("onsite") || raw.contains("on-site") || raw.contains("office") {
            Some(WorkMode::Onsite)
        } else {
            None
        }
    }
}

/// A job posting. Read-only in this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company_name: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub work_mode: Option<WorkMode>,
    pub department: Option<String>,
    pub level: Option<String>,
}

impl Job {
    /// Normalizes a backend, Jobicy or Remotive payload.
    /// Returns `None` when no id can be found.
    pub fn from_feed_value(value: &Value) -> Option<Self> {
        let id = first_id(value, &["id", "_id", "jobId"])?;

        let company_name = first_str(
            value,
            &["companyName", "company_name", "company", "company.name"],
        )
        .unwrap_or_else(|| "Unknown Company".to_string());

        let work_mode = first_str(value, &["workMode", "work_mode", "jobType", "job_type"])
            .and_then(|raw| WorkMode::parse(&raw))
            .or_else(|| match first_value(value, &["remote", "isRemote"]) {
                Some(Value::Bool(true)) => Some(WorkMode::Remote),
                _ => None,
            });

        Some(Job {
            id,
            title: first_str(value, &["title", "jobTitle", "position"])
                .unwrap_or_else(|| "Untitled role".to_string()),
            company_name,
            description: first_str(
                value,
                &["description", "jobDescription", "jobExcerpt", "summary"],
            )
            .unwrap_or_default(),
            requirements: first_list(value, &["requirements", "skills", "tags"]),
            salary_min: first_f64(value, &["salaryMin", "salary_min", "minSalary", "annualSalaryMin"]),
            salary_max: first_f64(value, &["salaryMax", "salary_max", "maxSalary", "annualSalaryMax"]),
            salary_currency: first_str(value, &["salaryCurrency", "salary_currency", "currency"]),
            work_mode,
            department: first_str(value, &["department", "jobIndustry", "category"]),
            level: first_str(value, &["level", "jobLevel", "experienceLevel"]),
        })
    }
}
