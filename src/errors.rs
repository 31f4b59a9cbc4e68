use sea_orm::error::DbErr;

// gRPC error mapping module
pub mod grpc;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    /// Store failure annotated with the generic message the caller gets to see.
    #[error("{message}: {source}")]
    StoreError {
        message: &'static str,
        #[source]
        source: DbErr,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Replaces raw store failures with `message`, leaving every other kind as is.
    ///
    /// Handlers call this on gateway results so that a failed insert reads
    /// "failed to add product" to the caller while `NotFound` and friends keep
    /// their own meaning.
    pub fn store_context(self, message: &'static str) -> Self {
        match self {
            ServiceError::DatabaseError(source) => ServiceError::StoreError { message, source },
            other => other,
        }
    }

    /// Returns the error message suitable for the RPC caller.
    /// Store and internal failures return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database operation failed".to_string(),
            Self::StoreError { message, .. } => (*message).to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            Self::NotFound(msg)
            | Self::InvalidInput(msg)
            | Self::Unauthorized(msg)
            | Self::InsufficientStock(msg) => msg.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// Result extensions for easier error handling
pub trait ResultExt<T> {
    /// Shorthand for `map_err(|e| e.store_context(message))`.
    fn or_store_error(self, message: &'static str) -> Result<T, ServiceError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ServiceError>,
{
    fn or_store_error(self, message: &'static str) -> Result<T, ServiceError> {
        self.map_err(|e| e.into().store_context(message))
    }
}
