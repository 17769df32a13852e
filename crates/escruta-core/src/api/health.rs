//! Service banner and health checks

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use super::AppState;

/// Payload of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}

impl ServiceInfo {
    pub fn current() -> Self {
        Self {
            name: "escruta".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// A single health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
}

/// Overall health of the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub checks: Vec<HealthCheck>,
    pub timestamp: String,
}

impl HealthReport {
    pub fn from_checks(checks: Vec<HealthCheck>) -> Self {
        let status = if checks.iter().all(|c| c.status == HealthStatus::Ok) {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };

        Self {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Ok => StatusCode::OK,
            HealthStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::current())
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = match state.db.health_check().await {
        Ok(()) => HealthCheck {
            name: "database".to_string(),
            status: HealthStatus::Ok,
            message: None,
        },
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            HealthCheck {
                name: "database".to_string(),
                status: HealthStatus::Degraded,
                message: Some("Database is unreachable".to_string()),
            }
        }
    };

    let report = HealthReport::from_checks(vec![database]);
    (report.status_code(), Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: HealthStatus) -> HealthCheck {
        HealthCheck {
            name: "database".to_string(),
            status,
            message: None,
        }
    }

    #[test]
    fn test_report_ok_when_all_checks_pass() {
        let report = HealthReport::from_checks(vec![check(HealthStatus::Ok)]);
        assert_eq!(report.status, HealthStatus::Ok);
        assert_eq!(report.status_code(), StatusCode::OK);
    }

    #[test]
    fn test_report_degraded_on_failed_check() {
        let report =
            HealthReport::from_checks(vec![check(HealthStatus::Ok), check(HealthStatus::Degraded)]);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_service_info_serializes_name() {
        let json = serde_json::to_value(ServiceInfo::current()).unwrap();
        assert_eq!(json["name"], "escruta");
    }
}
