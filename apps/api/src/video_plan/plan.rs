use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;
use crate::video_plan::duration::{format_duration, parse_duration, youtube_video_id};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub url: String,
    pub title: String,
    /// Display duration as delivered by the video feed (`"12:30"`).
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Video {
    pub fn minutes(&self) -> f64 {
        parse_duration(&self.duration)
    }

    pub fn youtube_id(&self) -> Option<String> {
        youtube_video_id(&self.url)
    }
}

/// The learner's selected plan. The watched set is kept beside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoPlan {
    pub title: String,
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub videos: Vec<Video>,
    /// Minutes. Recomputed on every mutation.
    pub total_duration: f64,
}

pub type WatchedSet = BTreeSet<String>;

#[derive(Debug, Error, PartialEq)]
pub enum VideoPlanError {
    #[error("Video {0} is not part of this plan")]
    UnknownVideo(String),

    #[error("Video {0} has no completion record; complete it before marking it watched")]
    NotCompleted(String),
}

impl From<VideoPlanError> for AppError {
    fn from(e: VideoPlanError) -> Self {
        match e {
            VideoPlanError::UnknownVideo(_) => AppError::NotFound(e.to_string()),
            VideoPlanError::NotCompleted(_) => AppError::Conflict(e.to_string()),
        }
    }
}

impl VideoPlan {
    pub fn new(title: impl Into<String>, videos: Vec<Video>) -> Self {
        let mut plan = Self {
            title: title.into(),
            videos,
            ..Default::default()
        };
        plan.recompute();
        plan
    }

    pub fn recompute(&mut self) {
        self.total_duration = self.total_duration();
    }

    pub fn total_duration(&self) -> f64 {
        self.videos.iter().map(Video::minutes).sum()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.videos.iter().any(|v| v.url == url)
    }

    pub fn remaining_duration(&self, watched: &WatchedSet) -> f64 {
        self.videos
            .iter()
            .filter(|v| !watched.contains(&v.url))
            .map(Video::minutes)
            .sum()
    }

    pub fn progress_percent(&self, watched: &WatchedSet) -> f64 {
        if self.videos.is_empty() {
            return 0.0;
        }
        let done = self.videos.iter().filter(|v| watched.contains(&v.url)).count();
        done as f64 / self.videos.len() as f64 * 100.0
    }

    /// Unmarking is always allowed. Marking requires a completion record,
    /// so a video is never watched without passing the completion gate.
    /// Returns whether the video is watched afterwards.
    pub fn toggle_watched(
        &self,
        watched: &mut WatchedSet,
        url: &str,
        has_completion: bool,
    ) -> Result<bool, VideoPlanError> {
        if watched.remove(url) {
            return Ok(false);
        }
        if !self.contains(url) {
            return Err(VideoPlanError::UnknownVideo(url.to_string()));
        }
        if !has_completion {
            return Err(VideoPlanError::NotCompleted(url.to_string()));
        }
        watched.insert(url.to_string());
        Ok(true)
    }

    /// Drops the video from the plan and the watched set.
    pub fn remove_video(&mut self, watched: &mut WatchedSet, url: &str) -> Result<(), VideoPlanError> {
        if !self.contains(url) {
            return Err(VideoPlanError::UnknownVideo(url.to_string()));
        }
        self.videos.retain(|v| v.url != url);
        watched.remove(url);
        self.recompute();
        Ok(())
    }

    /// Drops watched entries whose video is no longer in the plan.
    pub fn prune_watched(&self, watched: &mut WatchedSet) {
        watched.retain(|url| self.contains(url));
    }

    pub fn summary(&self, watched: &WatchedSet) -> PlanSummary {
        let remaining = self.remaining_duration(watched);
        PlanSummary {
            video_count: self.videos.len(),
            watched_count: self.videos.iter().filter(|v| watched.contains(&v.url)).count(),
            total_duration: self.total_duration,
            total_duration_label: format_duration(self.total_duration),
            remaining_duration: remaining,
            remaining_duration_label: format_duration(remaining),
            progress_percent: self.progress_percent(watched),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub video_count: usize,
    pub watched_count: usize,
    pub total_duration: f64,
    pub total_duration_label: String,
    pub remaining_duration: f64,
    pub remaining_duration_label: String,
    pub progress_percent: f64,
}
