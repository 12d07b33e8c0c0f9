//! Boundary to the record store used by protected operations.
//!
//! Protected handlers persist GNSS records through a [`RecordStore`]. Any
//! storage failure rolls back the in-flight transaction, releases the
//! connection and surfaces as a generic [`PepError::Unprocessable`] (422)
//! without exposing the underlying cause.

use async_trait::async_trait;

use crate::error::{PepError, Result};

/// Failure reported by the record store
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("record not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("storage error: {0}")]
    Other(String),
}

/// Transactional record store (one session per request)
#[async_trait]
pub trait RecordStore<R: Sync>: Send {
    async fn insert(&mut self, record: &R) -> std::result::Result<(), StorageError>;

    async fn update(&mut self, record: &R) -> std::result::Result<(), StorageError>;

    async fn delete(&mut self, record: &R) -> std::result::Result<(), StorageError>;

    /// Abandon the in-flight transaction
    async fn rollback(&mut self);

    /// Return the connection to its pool
    async fn release(&mut self);
}

/// Write operation applied to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Insert,
    Update,
    Delete,
}

/// Apply `mutation` to `record`; on failure roll back, release and return
/// [`PepError::Unprocessable`].
pub async fn persist<R, S>(store: &mut S, mutation: Mutation, record: &R) -> Result<()>
where
    R: Sync,
    S: RecordStore<R> + ?Sized,
{
    let outcome = match mutation {
        Mutation::Insert => store.insert(record).await,
        Mutation::Update => store.update(record).await,
        Mutation::Delete => store.delete(record).await,
    };

    if let Err(e) = outcome {
        tracing::error!(?mutation, "Persistence failed, rolling back: {}", e);
        store.rollback().await;
        store.release().await;
        return Err(PepError::Unprocessable);
    }

    Ok(())
}
