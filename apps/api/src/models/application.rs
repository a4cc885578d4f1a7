use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{first_id, first_list, first_str};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewing,
    Interview,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "reviewing" | "reviewed" | "under_review" => Ok(ApplicationStatus::Reviewing),
            "interview" | "interviewing" | "shortlisted" => Ok(ApplicationStatus::Interview),
            "accepted" | "hired" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("Unknown application status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub name: String,
    pub email: Option<String>,
    pub skills: Vec<String>,
    pub resume_text: Option<String>,
}

/// A job application. Only `status` is ever mutated, through the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub job_id: Option<String>,
    pub applicant: Applicant,
    pub resume_path: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: Option<String>,
}

impl Application {
    /// Normalizes an application payload. Returns `None` when no id can be found.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = first_id(value, &["id", "_id", "applicationId"])?;

        let applicant = Applicant {
            name: first_str(
                value,
                &[
                    "applicant.name",
                    "applicant.fullName",
                    "candidate.name",
                    "applicantName",
                    "candidateName",
                    "name",
                    "applicant.userData.personal.name",
                ],
            )
            .unwrap_or_else(|| "Anonymous".to_string()),
            email: first_str(
                value,
                &["applicant.email", "candidate.email", "applicantEmail", "email"],
            ),
            skills: first_list(value, &["applicant.skills", "candidate.skills", "skills"]),
            resume_text: first_str(value, &["resumeText", "applicant.resumeText"]),
        };

        Some(Application {
            id,
            job_id: first_id(value, &["jobId", "job_id", "job._id", "job.id"]),
            applicant,
            resume_path: first_str(
                value,
                &["resumePath", "resume_path", "resume", "applicant.resumePath"],
            ),
            status: first_str(value, &["status"])
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            applied_at: first_str(value, &["appliedAt", "applied_at", "createdAt"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ApplicationStatus::Interview).unwrap(),
            json!("interview")
        );
        assert_eq!(
            "Reviewing".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::Reviewing
        );
        assert!("archived".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_nested_applicant_shape() {
        let app = Application::from_value(&json!({
            "_id": "app-1",
            "jobId": "job-9",
            "applicant": { "name": "Ada", "email": "ada@example.com", "skills": ["Rust"] },
            "resumePath": "resume_1.pdf",
            "status": "reviewing"
        }))
        .unwrap();

        assert_eq!(app.id, "app-1");
        assert_eq!(app.applicant.name, "Ada");
        assert_eq!(app.applicant.skills, vec!["Rust"]);
        assert_eq!(app.status, ApplicationStatus::Reviewing);
    }

    #[test]
    fn test_flat_shape_defaults_to_pending() {
        let app = Application::from_value(&json!({
            "applicationId": 7,
            "applicantName": "Grace",
            "skills": "go, sql"
        }))
        .unwrap();

        assert_eq!(app.id, "7");
        assert_eq!(app.applicant.name, "Grace");
        assert_eq!(app.applicant.skills, vec!["go", "sql"]);
        assert_eq!(app.status, ApplicationStatus::Pending);
    }
}
