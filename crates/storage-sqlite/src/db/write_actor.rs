//! Single-writer actor serializing all database writes.
//!
//! SQLite allows one writer at a time; instead of letting pooled
//! connections contend for the write lock, one background task owns a
//! dedicated connection and processes write jobs serially, each inside an
//! immediate transaction.

use std::any::Any;

use diesel::SqliteConnection;
use tokio::sync::{mpsc, oneshot};

use tallyfolio_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

// A job takes the writer's connection and returns a boxed result; the box
// erases the job's concrete return type so one channel serves all callers.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;
type JobEnvelope = (
    Job<Box<dyn Any + Send + 'static>>,
    oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
);

const WRITE_QUEUE_CAPACITY: usize = 1024;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<JobEnvelope>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// The job runs inside an immediate transaction: it either commits as a
    /// whole or leaves the database untouched.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| {
                Error::Database(DatabaseError::Internal(
                    "Writer actor is no longer running".to_string(),
                ))
            })?;

        let boxed = ret_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Writer actor dropped the reply channel".to_string(),
            ))
        })??;

        boxed.downcast::<T>().map(|v| *v).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Writer actor returned an unexpected result type".to_string(),
            ))
        })
    }
}

/// Spawns the background writer task.
///
/// The actor holds one connection from the pool for its whole lifetime and
/// terminates when the last `WriteHandle` is dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<JobEnvelope>(WRITE_QUEUE_CAPACITY);

    tokio::spawn(async move {
        let mut conn = pool
            .get()
            .expect("Failed to get a connection from the DB pool for the writer actor");

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| {
                    job(c).map_err(StorageError::from)
                })
                .map_err(|e: StorageError| e.into());

            // The receiver may have been dropped (caller cancelled); that
            // is not the actor's problem.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}
