use std::collections::BTreeMap;

use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::video_plan::VideoPlanRow;
use crate::video_plan::completion::CompletionRecord;
use crate::video_plan::plan::{Video, VideoPlan};

/// Completion records keyed by video URL.
pub type CompletionMap = BTreeMap<String, CompletionRecord>;

/// Saves the user's custom plan, replacing the previous one. Completion
/// records survive the replacement.
pub async fn save_plan(
    pool: &PgPool,
    user_id: &str,
    plan: &VideoPlan,
) -> Result<VideoPlanRow, sqlx::Error> {
    let row: VideoPlanRow = sqlx::query_as(
        r#"
        INSERT INTO video_plans (id, user_id, title, job_id, job_title, company_name, videos)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE
            SET title = EXCLUDED.title,
                job_id = EXCLUDED.job_id,
                job_title = EXCLUDED.job_title,
                company_name = EXCLUDED.company_name,
                videos = EXCLUDED.videos,
                updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&plan.title)
    .bind(&plan.job_id)
    .bind(&plan.job_title)
    .bind(&plan.company_name)
    .bind(Json(&plan.videos))
    .fetch_one(pool)
    .await?;

    info!("Saved video plan for {user_id} ({} videos)", plan.videos.len());
    Ok(row)
}

pub async fn find_plan(pool: &PgPool, user_id: &str) -> Result<Option<VideoPlanRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM video_plans WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Rebuilds a `VideoPlan` from its stored row.
pub fn plan_from_row(row: &VideoPlanRow) -> VideoPlan {
    let videos: Vec<Video> = serde_json::from_value(row.videos.clone()).unwrap_or_else(|e| {
        warn!("Stored videos for {} are unreadable: {e}", row.user_id);
        Vec::new()
    });
    let mut plan = VideoPlan::new(row.title.clone(), videos);
    plan.job_id = row.job_id.clone();
    plan.job_title = row.job_title.clone();
    plan.company_name = row.company_name.clone();
    plan
}

pub fn completions_from_row(row: &VideoPlanRow) -> CompletionMap {
    serde_json::from_value(row.completion_data.clone()).unwrap_or_default()
}

/// Merges one completion record into the user's plan row, creating the row
/// when the plan was never saved.
pub async fn record_completion(
    pool: &PgPool,
    user_id: &str,
    video_url: &str,
    record: &CompletionRecord,
) -> Result<(), sqlx::Error> {
    let mut entry = CompletionMap::new();
    entry.insert(video_url.to_string(), record.clone());

    sqlx::query(
        r#"
        INSERT INTO video_plans (id, user_id, title, completion_data)
        VALUES ($1, $2, '', $3)
        ON CONFLICT (user_id) DO UPDATE
            SET completion_data = video_plans.completion_data || EXCLUDED.completion_data,
                updated_at = NOW()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(Json(&entry))
    .execute(pool)
    .await?;

    info!(
        "Recorded completion of {video_url} for {user_id} (forced: {})",
        record.forced
    );
    Ok(())
}

/// Drops the completion record of a video removed from the plan.
pub async fn remove_completion(
    pool: &PgPool,
    user_id: &str,
    video_url: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE video_plans
        SET completion_data = completion_data - $2,
            updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(video_url)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_completions(pool: &PgPool, user_id: &str) -> Result<CompletionMap, sqlx::Error> {
    Ok(find_plan(pool, user_id)
        .await?
        .map(|row| completions_from_row(&row))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn row(videos: serde_json::Value) -> VideoPlanRow {
        VideoPlanRow {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            title: "Kubernetes basics".into(),
            job_id: Some("job-7".into()),
            job_title: Some("Platform Engineer".into()),
            company_name: Some("Acme".into()),
            videos,
            completion_data: json!({
                "https://youtu.be/abc": {
                    "actualProgress": 95.0,
                    "qualityScore": 88.0,
                    "qualityBonus": 10.0,
                    "forced": false,
                    "completedAt": Utc::now(),
                }
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_from_row_keeps_job_fields() {
        let plan = plan_from_row(&row(json!([
            { "url": "https://youtu.be/abc", "title": "Pods", "duration": "10:00" }
        ])));

        assert_eq!(plan.job_id.as_deref(), Some("job-7"));
        assert_eq!(plan.job_title.as_deref(), Some("Platform Engineer"));
        assert_eq!(plan.company_name.as_deref(), Some("Acme"));
        assert_eq!(plan.videos.len(), 1);
    }

    #[test]
    fn test_unreadable_videos_give_an_empty_plan() {
        let plan = plan_from_row(&row(json!({ "not": "a list" })));
        assert!(plan.videos.is_empty());
        assert_eq!(plan.title, "Kubernetes basics");
    }

    #[test]
    fn test_completions_from_row() {
        let completions = completions_from_row(&row(json!([])));
        assert!(completions.contains_key("https://youtu.be/abc"));
    }
}
