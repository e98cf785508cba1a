// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Engine Error Types
 * Session-level error taxonomy with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use thiserror::Error;

/// Storage gateway errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Storage query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Unknown session: {session_id}")]
    UnknownSession { session_id: String },
}

impl From<tokio_postgres::Error> for StorageError {
    fn from(err: tokio_postgres::Error) -> Self {
        StorageError::QueryFailed {
            reason: err.to_string(),
        }
    }
}

impl From<deadpool_postgres::PoolError> for StorageError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StorageError::ConnectionFailed {
            reason: err.to_string(),
        }
    }
}

/// Session-level error taxonomy.
///
/// Only two categories abort a session and surface to the caller:
/// validation before any invocation starts, and persistence after
/// execution. Per-invocation and advisory-AI faults are recovered
/// locally and encoded in the data model instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),
}

/// Result type for session-level operations
pub type EngineResult<T> = Result<T, EngineError>;
