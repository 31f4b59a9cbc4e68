use tonic::Status;
use tracing::error;

use super::ServiceError;

/// Extension trait for converting ServiceError to gRPC Status with proper codes
pub trait IntoGrpcStatus {
    fn into_grpc_status(self) -> Status;
}

impl IntoGrpcStatus for ServiceError {
    fn into_grpc_status(self) -> Status {
        match self {
            ServiceError::NotFound(msg) => Status::not_found(msg),
            ServiceError::InvalidInput(msg) => Status::invalid_argument(msg),
            ServiceError::Unauthorized(msg) => Status::unauthenticated(msg),
            ServiceError::InsufficientStock(msg) => Status::failed_precondition(msg),
            ServiceError::StoreError { message, source } => {
                error!(error = %source, "{}", message);
                Status::internal(message)
            }
            ServiceError::DatabaseError(err) => {
                error!("Database error: {}", err);
                Status::internal("Database operation failed")
            }
            ServiceError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                Status::internal("Internal server error")
            }
        }
    }
}

/// Helper function to map Result<T, ServiceError> to Result<T, Status>
pub fn map_service_error<T>(result: Result<T, ServiceError>) -> Result<T, Status> {
    result.map_err(|e| e.into_grpc_status())
}
