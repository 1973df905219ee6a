//! Planning service API client
//!
//! The planning service turns a free-text super goal into a structured
//! 90-day plan. Requests are blocking; async callers go through
//! `spawn_blocking`.

use crate::error::{ServiceError, ServiceResult};
use crate::plan::PlanResponse;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Anything that can produce a plan for a goal.
pub trait PlanSource: Send + Sync {
    fn generate_plan(&self, goal: &str) -> ServiceResult<PlanResponse>;
}

/// Planning service client
pub struct PlannerClient {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub base_url: String,
    pub api_key: String,
}

impl PlannerClient {
    pub fn new(config: PlannerConfig) -> ServiceResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ServiceError::Config(
                "planning service API key is not set (MOMENTUM_API_KEY)".to_string(),
            ));
        }
        let base_url = if config.base_url.starts_with("http") {
            config.base_url
        } else {
            format!("https://{}", config.base_url)
        };
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            agent: ureq::AgentBuilder::new().timeout(DEFAULT_TIMEOUT).build(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/generate-plan", self.base_url)
    }
}

impl PlanSource for PlannerClient {
    fn generate_plan(&self, goal: &str) -> ServiceResult<PlanResponse> {
        let url = self.endpoint();
        tracing::info!(%url, "requesting plan");

        let response = self
            .agent
            .get(&url)
            .query("text", goal)
            .set("X-API-KEY", &self.api_key)
            .set("Content-Type", "application/json")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => {
                    ServiceError::ApiError(format!("planning service returned status: {code}"))
                }
                ureq::Error::Transport(t) => {
                    ServiceError::NetworkError(format!("Failed to reach planning service: {t}"))
                }
            })?;

        let plan: PlanResponse = response.into_json().map_err(|e| {
            ServiceError::NetworkError(format!("Failed to read plan response: {}", e))
        })?;

        if !plan.success {
            tracing::warn!(goal, "planning service reported failure");
            return Err(ServiceError::ApiError("Failed to generate plan".to_string()));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PlannerClient::new(PlannerConfig {
            base_url: "http://localhost:8000/".to_string(),
            api_key: "test-key".to_string(),
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
        assert_eq!(client.endpoint(), "http://localhost:8000/generate-plan");
    }

    #[test]
    fn test_scheme_is_added() {
        let client = PlannerClient::new(PlannerConfig {
            base_url: "planner.example.com".to_string(),
            api_key: "key".to_string(),
        })
        .unwrap();
        assert_eq!(client.base_url, "https://planner.example.com");
    }

    #[test]
    fn test_missing_api_key() {
        let result = PlannerClient::new(PlannerConfig {
            base_url: "http://localhost:8000".to_string(),
            api_key: "  ".to_string(),
        });
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[test]
    fn test_unreachable_service_is_network_error() {
        let client = PlannerClient::new(PlannerConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "key".to_string(),
        })
        .unwrap();
        assert!(matches!(
            client.generate_plan("Learn Rust"),
            Err(ServiceError::NetworkError(_))
        ));
    }
}
