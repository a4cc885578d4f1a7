use std::future::Future;
use std::time::Duration;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

/// Upper bound on each dependency check.
const CHECK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Up,
    Down,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub dev_mode: bool,
    pub client_store: Reachability,
    pub database: Reachability,
}

impl HealthReport {
    fn new(dev_mode: bool, client_store: Reachability, database: Reachability) -> Self {
        let healthy = client_store == Reachability::Up && database == Reachability::Up;
        Self {
            status: if healthy { "ok" } else { "degraded" },
            service: "hirepath-api",
            version: env!("CARGO_PKG_VERSION"),
            dev_mode,
            client_store,
            database,
        }
    }
}

async fn check<E: std::fmt::Display>(
    name: &str,
    fut: impl Future<Output = Result<(), E>>,
) -> Reachability {
    match tokio::time::timeout(CHECK_TIMEOUT, fut).await {
        Ok(Ok(())) => Reachability::Up,
        Ok(Err(e)) => {
            warn!("Health check: {name} unreachable: {e}");
            Reachability::Down
        }
        Err(_) => {
            warn!("Health check: {name} timed out");
            Reachability::Down
        }
    }
}

/// GET /health
/// Always 200. A failing dependency shows up as `"degraded"`.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    let store = check("client store", state.store.ping());
    let database = check("database", async {
        sqlx::query("SELECT 1").execute(&state.db).await.map(|_| ())
    });
    let (store, database) = tokio::join!(store, database);
    Json(HealthReport::new(state.config.dev_mode, store, database))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_unreachable_dependency_degrades() {
        let report = HealthReport::new(false, Reachability::Up, Reachability::Up);
        assert_eq!(report.status, "ok");

        let report = HealthReport::new(true, Reachability::Up, Reachability::Down);
        assert_eq!(report.status, "degraded");
        assert!(report.dev_mode);
    }

    #[tokio::test]
    async fn test_slow_check_times_out() {
        let slow = async {
            tokio::time::sleep(CHECK_TIMEOUT * 2).await;
            Ok::<(), String>(())
        };
        assert_eq!(check("slow", slow).await, Reachability::Down);
        assert_eq!(check("fast", async { Ok::<(), String>(()) }).await, Reachability::Up);
    }
}
