//! Prep plan generation.
//!
//! A plan is built in up to four phases from the parsed skill inventory.
//! Phase durations are fractions of the chosen length, rounded up.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;
use crate::models::job::Job;
use crate::prep_plan::jd_parser::ParsedSkills;

pub const DEFAULT_WEEKS: u32 = 12;
pub const MAX_WEEKS: u32 = 52;

#[derive(Debug, Error)]
pub enum PrepPlanError {
    #[error("Duration must be between 1 and {MAX_WEEKS} weeks, got {0}")]
    InvalidDuration(u32),

    #[error("Topic {0} is not part of this plan")]
    UnknownTopic(u32),
}

impl From<PrepPlanError> for AppError {
    fn from(e: PrepPlanError) -> Self {
        match e {
            PrepPlanError::InvalidDuration(_) => AppError::Validation(e.to_string()),
            PrepPlanError::UnknownTopic(_) => AppError::NotFound(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub url: String,
}

impl Resource {
    fn new(kind: &str, title: impl Into<String>, url: &str) -> Self {
        Self {
            kind: kind.to_string(),
            title: title.into(),
            url: url.to_string(),
        }
    }

    fn placeholder(kind: &str, title: impl Into<String>) -> Self {
        Self::new(kind, title, "#")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub estimated_hours: u32,
    pub resources: Vec<Resource>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: u32,
    pub title: String,
    pub duration: String,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub estimated_time_weeks: u32,
    pub difficulty_level: String,
    pub total_topics: usize,
    pub completed_topics: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepPlan {
    pub overview: Overview,
    pub phases: Vec<Phase>,
}

impl PrepPlan {
    fn new(weeks: u32, difficulty_level: String, phases: Vec<Phase>) -> Self {
        let mut plan = Self {
            overview: Overview {
                estimated_time_weeks: weeks,
                difficulty_level,
                total_topics: 0,
                completed_topics: 0,
            },
            phases,
        };
        plan.refresh_overview();
        plan
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.phases.iter().flat_map(|p| p.topics.iter())
    }

    /// Recounts the overview from the topics. Client-supplied counts are never trusted.
    pub(crate) fn refresh_overview(&mut self) {
        self.overview.total_topics = self.topics().count();
        self.overview.completed_topics = self.topics().filter(|t| t.completed).count();
    }

    /// Completed topics as a percentage of all topics. An empty plan is 0.
    pub fn progress_percent(&self) -> f64 {
        let total = self.topics().count();
        if total == 0 {
            return 0.0;
        }
        let completed = self.topics().filter(|t| t.completed).count();
        completed as f64 / total as f64 * 100.0
    }

    /// Flips a topic's completion. Returns the new state.
    pub fn toggle_topic(&mut self, topic_id: u32) -> Result<bool, PrepPlanError> {
        let topic = self
            .phases
            .iter_mut()
            .flat_map(|p| p.topics.iter_mut())
            .find(|t| t.id == topic_id)
            .ok_or(PrepPlanError::UnknownTopic(topic_id))?;
        topic.completed = !topic.completed;
        let completed = topic.completed;
        self.refresh_overview();
        Ok(completed)
    }

    /// Marks exactly the topics in `ids` as completed. Unknown ids are ignored.
    pub fn apply_completed(&mut self, ids: &BTreeSet<u32>) {
        for topic in self.phases.iter_mut().flat_map(|p| p.topics.iter_mut()) {
            topic.completed = ids.contains(&topic.id);
        }
        self.refresh_overview();
    }
}

pub fn validate_weeks(weeks: u32) -> Result<u32, PrepPlanError> {
    if (1..=MAX_WEEKS).contains(&weeks) {
        Ok(weeks)
    } else {
        Err(PrepPlanError::InvalidDuration(weeks))
    }
}

/// `percent` of `weeks`, rounded up.
fn phase_duration(weeks: u32, percent: u32) -> String {
    format!("{} weeks", (weeks * percent).div_ceil(100))
}

#[derive(Debug, Clone, Copy)]
enum Track {
    Foundation,
    Advanced,
    Framework,
    Database,
    Tool,
    Cloud,
}

fn resources_for(skill: &str, track: Track) -> Vec<Resource> {
    let entries: [(&str, String); 3] = match track {
        Track::Foundation => [
            ("course", format!("{skill} Complete Guide")),
            ("documentation", format!("Official {skill} Documentation")),
            ("practice", format!("{skill} Practice Problems")),
        ],
        Track::Advanced => [
            ("course", format!("Advanced {skill} Concepts")),
            ("book", format!("{skill} Best Practices")),
            ("project", format!("Build Advanced {skill} Project")),
        ],
        Track::Framework => [
            ("course", format!("{skill} Complete Course")),
            ("project", format!("Build App with {skill}")),
            ("documentation", format!("{skill} Official Docs")),
        ],
        Track::Database => [
            ("course", format!("{skill} Database Course")),
            ("practice", format!("{skill} Query Practice")),
            ("project", format!("Design Schema with {skill}")),
        ],
        Track::Tool => [
            ("course", format!("{skill} Tutorial")),
            ("documentation", format!("{skill} User Guide")),
            ("hands-on", format!("{skill} Hands-on Practice")),
        ],
        Track::Cloud => [
            ("course", format!("{skill} Certification Course")),
            ("hands-on", format!("{skill} Hands-on Labs")),
            ("documentation", format!("{skill} Service Documentation")),
        ],
    };
    entries
        .into_iter()
        .map(|(kind, title)| Resource::placeholder(kind, title))
        .collect()
}

/// Hands out sequential topic ids across phases.
struct TopicIds(u32);

impl TopicIds {
    fn topic(
        &mut self,
        title: String,
        description: String,
        estimated_hours: u32,
        resources: Vec<Resource>,
    ) -> Topic {
        self.0 += 1;
        Topic {
            id: self.0,
            title,
            description,
            estimated_hours,
            resources,
            completed: false,
        }
    }
}

fn push_phase(phases: &mut Vec<Phase>, id: u32, title: &str, duration: String, topics: Vec<Topic>) {
    if !topics.is_empty() {
        phases.push(Phase {
            id,
            title: title.to_string(),
            duration,
            topics,
        });
    }
}

/// Builds a plan from parsed skills, or the fixed fallback plan when there
/// is nothing to build from.
pub fn generate_prep_plan(job: &Job, parsed: Option<&ParsedSkills>, weeks: u32) -> PrepPlan {
    let Some(parsed) = parsed.filter(|p| !p.required_skills.is_empty()) else {
        return fallback_plan(job, weeks);
    };
    let skills = &parsed.required_skills;
    let mut ids = TopicIds(0);
    let mut phases = Vec::new();

    let mut critical: Vec<&String> = Vec::new();
    for skill in skills.critical.iter().chain(&parsed.learning_path.must_learn) {
        if !critical.contains(&skill) {
            critical.push(skill);
        }
    }
    let foundation = critical
        .into_iter()
        .map(|skill| {
            ids.topic(
                format!("{skill} Fundamentals"),
                format!("Master the core concepts and fundamentals of {skill}"),
                12,
                resources_for(skill, Track::Foundation),
            )
        })
        .collect();
    push_phase(
        &mut phases,
        1,
        "Foundation & Critical Skills",
        phase_duration(weeks, 30),
        foundation,
    );

    let mut technical = Vec::new();
    for lang in &skills.languages {
        technical.push(ids.topic(
            format!("{lang} Advanced Concepts"),
            format!("Deep dive into {lang} - advanced features, best practices, and optimization"),
            15,
            resources_for(lang, Track::Advanced),
        ));
    }
    for framework in &skills.frameworks {
        technical.push(ids.topic(
            format!("{framework} Development"),
            format!("Build production-ready applications using {framework}"),
            18,
            resources_for(framework, Track::Framework),
        ));
    }
    for db in &skills.databases {
        technical.push(ids.topic(
            format!("{db} Database Management"),
            format!("Design, optimize, and manage {db} databases"),
            12,
            resources_for(db, Track::Database),
        ));
    }
    push_phase(
        &mut phases,
        2,
        "Technical Skills Development",
        phase_duration(weeks, 40),
        technical,
    );

    let mut tooling = Vec::new();
    for tool in &skills.tools {
        tooling.push(ids.topic(
            format!("{tool} Proficiency"),
            format!("Master {tool} for development workflow and productivity"),
            8,
            resources_for(tool, Track::Tool),
        ));
    }
    for cloud in &skills.cloud {
        tooling.push(ids.topic(
            format!("{cloud} Cloud Services"),
            format!("Deploy and manage applications using {cloud}"),
            15,
            resources_for(cloud, Track::Cloud),
        ));
    }
    push_phase(
        &mut phases,
        3,
        "Tools & DevOps",
        phase_duration(weeks, 20),
        tooling,
    );

    let prep = &parsed.interview_prep;
    let mut interview = vec![ids.topic(
        "Technical Interview Practice".to_string(),
        format!("Focus on: {}", prep.technical_topics.join(", ")),
        10,
        vec![
            Resource::new("practice", "LeetCode Problems", "https://leetcode.com"),
            Resource::new("practice", "HackerRank Challenges", "https://hackerrank.com"),
            Resource::placeholder("course", "Cracking the Coding Interview"),
        ],
    )];
    if !prep.system_design.is_empty() {
        interview.push(ids.topic(
            "System Design Preparation".to_string(),
            format!("Study: {}", prep.system_design.join(", ")),
            12,
            vec![
                Resource::placeholder("course", "System Design Interview Course"),
                Resource::placeholder("book", "Designing Data-Intensive Applications"),
                Resource::placeholder("practice", "Design Popular Systems"),
            ],
        ));
    }
    let company = &job.company_name;
    interview.push(ids.topic(
        "Company-Specific Preparation".to_string(),
        format!("Research {company} culture, recent projects, and interview process"),
        6,
        vec![
            Resource::placeholder("research", format!("{company} Engineering Blog")),
            Resource::placeholder("networking", "Connect with current employees"),
            Resource::placeholder("research", "Glassdoor Interview Experiences"),
        ],
    ));
    push_phase(
        &mut phases,
        4,
        "Interview Preparation",
        phase_duration(weeks, 10),
        interview,
    );

    let difficulty = parsed
        .learning_path
        .difficulty_level
        .clone()
        .or_else(|| job.level.clone())
        .unwrap_or_else(|| "Intermediate".to_string());
    PrepPlan::new(weeks, difficulty, phases)
}

/// Generic three-phase plan for when no skills could be parsed.
pub fn fallback_plan(job: &Job, weeks: u32) -> PrepPlan {
    let topic = |id, title: &str, description: &str, hours, resources| Topic {
        id,
        title: title.to_string(),
        description: description.to_string(),
        estimated_hours: hours,
        resources,
        completed: false,
    };
    let title = &job.title;

    let phases = vec![
        Phase {
            id: 1,
            title: "Foundation Skills".to_string(),
            duration: "3 weeks".to_string(),
            topics: vec![
                topic(
                    1,
                    "Core Programming Concepts",
                    "Strengthen fundamental programming skills",
                    15,
                    vec![
                        Resource::placeholder("course", "Programming Fundamentals"),
                        Resource::placeholder("practice", "Coding Challenges"),
                    ],
                ),
                topic(
                    2,
                    "Data Structures & Algorithms",
                    "Master essential DSA concepts",
                    20,
                    vec![
                        Resource::placeholder("course", "DSA Complete Course"),
                        Resource::placeholder("practice", "Algorithm Practice"),
                    ],
                ),
            ],
        },
        Phase {
            id: 2,
            title: "Job-Specific Skills".to_string(),
            duration: "4 weeks".to_string(),
            topics: vec![topic(
                3,
                &format!("{title} Role Preparation"),
                &format!("Prepare for {title} position requirements"),
                25,
                vec![
                    Resource::placeholder("research", "Role Requirements Research"),
                    Resource::placeholder("project", "Relevant Project Building"),
                ],
            )],
        },
        Phase {
            id: 3,
            title: "Interview Preparation".to_string(),
            duration: "1 week".to_string(),
            topics: vec![topic(
                4,
                "Technical Interview Prep",
                "Prepare for technical interviews",
                10,
                vec![
                    Resource::placeholder("practice", "Mock Interviews"),
                    Resource::placeholder("course", "Interview Techniques"),
                ],
            )],
        },
    ];

    let difficulty = job.level.clone().unwrap_or_else(|| "Intermediate".to_string());
    PrepPlan::new(weeks, difficulty, phases)
}
