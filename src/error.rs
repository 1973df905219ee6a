use rmcp::ErrorData as RpcError;
use serde_json::json;

use thiserror::Error;
use tokio::io;

use crate::storage::StorageError;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    RpcError(#[from] RpcError),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("planning service error: {0}")]
    ApiError(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl From<ServiceError> for RpcError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::RpcError(inner) => inner,
            ServiceError::Storage(StorageError::AdventureNotFound(id)) => RpcError::resource_not_found(
                "Adventure not found",
                Some(json!({ "adventure_id": id })),
            ),
            ServiceError::Storage(StorageError::QuestNotFound(number)) => {
                RpcError::resource_not_found("Quest not found", Some(json!({ "quest_number": number })))
            }
            ServiceError::Storage(StorageError::Forbidden) => RpcError::invalid_request("Forbidden", None),
            ServiceError::Storage(StorageError::EmptyGoal) => {
                RpcError::invalid_params("Super goal cannot be empty", None)
            }
            ServiceError::Storage(StorageError::QuestListMismatch(reason)) => {
                RpcError::invalid_params("Quest list does not match the roadmap", Some(json!({ "reason": reason })))
            }
            ServiceError::NetworkError(msg) | ServiceError::ApiError(msg) => {
                RpcError::internal_error(format!("Failed to generate plan: {msg}"), None)
            }
            other => RpcError::internal_error(other.to_string(), None),
        }
    }
}
