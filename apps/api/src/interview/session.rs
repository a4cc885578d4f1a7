//! Mock interview question loop.
//!
//! The session alternates between asking and answering until
//! `total_questions` have been answered (or the candidate stops early), then
//! waits for analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{first_f64, first_value};

pub const DEFAULT_QUESTIONS: u32 = 5;
pub const MAX_QUESTIONS: u32 = 20;

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("Question count must be between 1 and {MAX_QUESTIONS}, got {0}")]
    InvalidQuestionCount(u32),

    #[error("A job description is required")]
    MissingJobDescription,

    #[error("The interview is not waiting for an answer")]
    NotAwaitingAnswer,

    #[error("The interview has already been analyzed")]
    AlreadyAnalyzed,

    #[error("Invalid question received from the interview service")]
    InvalidQuestion,

    #[error("Invalid analysis received from the interview service")]
    InvalidAnalysis,
}

impl From<InterviewError> for AppError {
    fn from(e: InterviewError) -> Self {
        match e {
            InterviewError::InvalidQuestionCount(_) | InterviewError::MissingJobDescription => {
                AppError::Validation(e.to_string())
            }
            InterviewError::NotAwaitingAnswer | InterviewError::AlreadyAnalyzed => {
                AppError::Conflict(e.to_string())
            }
            InterviewError::InvalidQuestion | InterviewError::InvalidAnalysis => {
                AppError::Ai(e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterviewStatus {
    InProgress,
    ReadyForAnalysis,
    Analyzed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnalysis {
    pub score: Option<f64>,
    pub analysis: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSession {
    pub id: Uuid,
    pub job_description: String,
    pub total_questions: u32,
    pub current_index: u32,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub status: InterviewStatus,
    pub started_at: DateTime<Utc>,
    pub analysis: Option<InterviewAnalysis>,
}

impl InterviewSession {
    pub fn new(job_description: &str, total_questions: Option<u32>) -> Result<Self, InterviewError> {
        let job_description = job_description.trim();
        if job_description.is_empty() {
            return Err(InterviewError::MissingJobDescription);
        }
        let total_questions = total_questions.unwrap_or(DEFAULT_QUESTIONS);
        if !(1..=MAX_QUESTIONS).contains(&total_questions) {
            return Err(InterviewError::InvalidQuestionCount(total_questions));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            job_description: job_description.to_string(),
            total_questions,
            current_index: 0,
            questions: Vec::new(),
            answers: Vec::new(),
            status: InterviewStatus::InProgress,
            started_at: Utc::now(),
            analysis: None,
        })
    }

    /// The question for `current_index`, once it has been generated.
    pub fn current_question(&self) -> Option<&Question> {
        if self.status != InterviewStatus::InProgress {
            return None;
        }
        self.questions.get(self.current_index as usize)
    }

    pub fn needs_question(&self) -> bool {
        self.status == InterviewStatus::InProgress
            && self.questions.len() <= self.current_index as usize
    }

    pub fn progress_percent(&self) -> f64 {
        self.current_index as f64 / self.total_questions as f64 * 100.0
    }

    /// Body for the question generator.
    pub fn question_request(&self) -> Value {
        json!({
            "jobDescription": self.job_description,
            "questionHistory": self.questions.iter().map(|q| &q.text).collect::<Vec<_>>(),
            "currentQuestionIndex": self.current_index,
            "totalQuestions": self.total_questions,
        })
    }

    /// Records the generator's answer as the current question.
    pub fn push_question(&mut self, response: &Value) -> Result<(), InterviewError> {
        if !self.needs_question() {
            return Err(InterviewError::NotAwaitingAnswer);
        }
        let text = first_value(response, &["question", "data.question"])
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(InterviewError::InvalidQuestion)?;
        self.questions.push(Question {
            text: text.to_string(),
            asked_at: Utc::now(),
        });
        Ok(())
    }

    /// Saves a non-blank answer to the current question, then moves on.
    pub fn record_answer(&mut self, answer: &str) -> Result<(), InterviewError> {
        let question = self
            .current_question()
            .map(|q| q.text.clone())
            .ok_or(InterviewError::NotAwaitingAnswer)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            self.answers.push(Answer {
                question,
                answer: answer.to_string(),
                answered_at: Utc::now(),
            });
        }
        self.advance();
        Ok(())
    }

    fn advance(&mut self) {
        self.current_index += 1;
        if self.current_index >= self.total_questions {
            self.status = InterviewStatus::ReadyForAnalysis;
        }
    }

    /// Ends the question loop early.
    pub fn finish(&mut self) -> Result<(), InterviewError> {
        match self.status {
            InterviewStatus::Analyzed => Err(InterviewError::AlreadyAnalyzed),
            _ => {
                self.status = InterviewStatus::ReadyForAnalysis;
                Ok(())
            }
        }
    }

    pub fn analysis_request(&self, now: DateTime<Utc>) -> Value {
        json!({
            "jobDescription": self.job_description,
            "questionHistory": self.questions.iter().map(|q| json!({
                "text": q.text,
                "timestamp": q.asked_at,
            })).collect::<Vec<_>>(),
            "answerHistory": self.answers,
            "interviewDuration": (now - self.started_at).num_milliseconds(),
        })
    }

    /// Stores the analysis. A response with neither a score nor an analysis is rejected.
    pub fn set_analysis(&mut self, response: &Value) -> Result<(), InterviewError> {
        let score = first_f64(response, &["score", "data.score"]);
        let analysis = first_value(response, &["analysis", "data.analysis"]).cloned();
        if score.is_none() && analysis.is_none() {
            return Err(InterviewError::InvalidAnalysis);
        }
        self.analysis = Some(InterviewAnalysis {
            score,
            analysis: analysis.unwrap_or(Value::Null),
        });
        self.status = InterviewStatus::Analyzed;
        Ok(())
    }
}
