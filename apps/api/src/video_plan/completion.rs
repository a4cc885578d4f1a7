//! Completion gate for plan videos.
//!
//! A video counts as watched only when at least 75% of it was actually
//! watched and the watch quality score is at least 60. Forced completion
//! bypasses the gate at the cost of a payout penalty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_PROGRESS: f64 = 75.0;
pub const MIN_QUALITY: f64 = 60.0;
pub const MAX_HIGH_SPEED_WARNINGS: u32 = 3;

/// Raw watch telemetry reported by the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchMetrics {
    pub video_duration_secs: f64,
    pub watch_duration_secs: f64,
    /// Playback speed samples, one per play/rate change.
    pub speed_samples: Vec<f64>,
    pub pause_count: u32,
    pub focus_secs: f64,
    pub blur_secs: f64,
    /// Distinct seconds of the video that were on screen.
    pub watched_segments: u32,
}

/// Recomputes a 0..=100 quality score from watch telemetry.
pub fn quality_score(m: &WatchMetrics) -> f64 {
    if m.video_duration_secs <= 0.0 {
        return 0.0;
    }
    let mut score = (m.watch_duration_secs / m.video_duration_secs * 100.0).min(25.0);

    if !m.speed_samples.is_empty() {
        let avg_speed = m.speed_samples.iter().sum::<f64>() / m.speed_samples.len() as f64;
        if avg_speed > 1.5 {
            score -= 20.0;
        } else if avg_speed < 0.9 {
            score -= 10.0;
        }
    }

    if f64::from(m.pause_count) > m.video_duration_secs / 60.0 {
        score -= 15.0;
    }

    let attention = m.focus_secs + m.blur_secs;
    if attention > 0.0 && m.focus_secs / attention < 0.8 {
        score -= 25.0;
    }

    if f64::from(m.watched_segments) / m.video_duration_secs > 0.9 {
        score += 15.0;
    }

    score.clamp(0.0, 100.0)
}

/// Payout bonus earned by a quality score. `None` means the score is too low
/// for the video to count at all.
pub fn quality_bonus(quality: f64) -> Option<f64> {
    if quality >= 90.0 {
        Some(0.5)
    } else if quality >= 75.0 {
        Some(0.25)
    } else if quality >= MIN_QUALITY {
        Some(0.0)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionAttempt {
    /// Percentage of the video actually watched.
    pub actual_progress: f64,
    pub quality_score: f64,
    pub high_speed_warnings: u32,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub actual_progress: f64,
    pub quality_score: f64,
    pub quality_bonus: f64,
    pub forced: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompletionBlocked {
    #[error("Watched {progress:.0}% of the video; need {missing:.0}% more to reach 75%")]
    Progress { progress: f64, missing: f64 },

    #[error("Quality score {quality:.0} is below the required 60; need {missing:.0} more points")]
    Quality { quality: f64, missing: f64 },

    #[error("Too many high-speed playback warnings ({count}); watch at normal speed to complete")]
    Speed { count: u32 },
}

/// Decides whether a video may be marked complete.
pub fn evaluate(attempt: &CompletionAttempt) -> Result<CompletionRecord, CompletionBlocked> {
    if attempt.force {
        return Ok(CompletionRecord {
            actual_progress: attempt.actual_progress,
            quality_score: attempt.quality_score,
            quality_bonus: 0.0,
            forced: true,
            completed_at: Utc::now(),
        });
    }

    if attempt.actual_progress < MIN_PROGRESS {
        return Err(CompletionBlocked::Progress {
            progress: attempt.actual_progress,
            missing: MIN_PROGRESS - attempt.actual_progress,
        });
    }
    let Some(bonus) = quality_bonus(attempt.quality_score) else {
        return Err(CompletionBlocked::Quality {
            quality: attempt.quality_score,
            missing: MIN_QUALITY - attempt.quality_score,
        });
    };
    if attempt.high_speed_warnings >= MAX_HIGH_SPEED_WARNINGS {
        return Err(CompletionBlocked::Speed {
            count: attempt.high_speed_warnings,
        });
    }

    Ok(CompletionRecord {
        actual_progress: attempt.actual_progress,
        quality_score: attempt.quality_score,
        quality_bonus: bonus,
        forced: false,
        completed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(progress: f64, quality: f64) -> CompletionAttempt {
        CompletionAttempt {
            actual_progress: progress,
            quality_score: quality,
            ..Default::default()
        }
    }

    #[test]
    fn test_gate_requires_progress_and_quality() {
        assert!(evaluate(&attempt(75.0, 60.0)).is_ok());
        assert!(evaluate(&attempt(74.9, 95.0)).is_err());
        assert!(evaluate(&attempt(100.0, 59.0)).is_err());
    }

    #[test]
    fn test_progress_shortfall_message() {
        let err = evaluate(&attempt(40.0, 90.0)).unwrap_err();
        assert!(err.to_string().contains("need 35% more"), "{err}");
    }

    #[test]
    fn test_quality_shortfall_message() {
        let err = evaluate(&attempt(80.0, 50.0)).unwrap_err();
        assert_eq!(
            err,
            CompletionBlocked::Quality {
                quality: 50.0,
                missing: 10.0
            }
        );
        assert!(err.to_string().contains("below the required 60"));
    }

    #[test]
    fn test_bonus_tiers() {
        assert_eq!(quality_bonus(95.0), Some(0.5));
        assert_eq!(quality_bonus(80.0), Some(0.25));
        assert_eq!(quality_bonus(65.0), Some(0.0));
        assert_eq!(quality_bonus(50.0), None);
    }

    #[test]
    fn test_force_always_succeeds_without_bonus() {
        let record = evaluate(&CompletionAttempt {
            actual_progress: 5.0,
            quality_score: 95.0,
            force: true,
            ..Default::default()
        })
        .unwrap();
        assert!(record.forced);
        assert_eq!(record.quality_bonus, 0.0);
    }

    #[test]
    fn test_high_speed_warnings_block() {
        let mut a = attempt(90.0, 90.0);
        a.high_speed_warnings = 3;
        assert_eq!(
            evaluate(&a).unwrap_err(),
            CompletionBlocked::Speed { count: 3 }
        );
    }

    #[test]
    fn test_quality_score_from_metrics() {
        let attentive = WatchMetrics {
            video_duration_secs: 600.0,
            watch_duration_secs: 600.0,
            speed_samples: vec![1.0, 1.25],
            pause_count: 2,
            focus_secs: 590.0,
            blur_secs: 10.0,
            watched_segments: 580,
        };
        assert_eq!(quality_score(&attentive), 40.0);

        let skimmed = WatchMetrics {
            speed_samples: vec![2.0],
            focus_secs: 100.0,
            blur_secs: 500.0,
            watched_segments: 100,
            ..attentive
        };
        assert_eq!(quality_score(&skimmed), 0.0);
    }
}
