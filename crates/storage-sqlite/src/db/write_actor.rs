use super::DbPool;
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::{debug, error};
use marketfeed_core::errors::Result;
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// A write job runs against the actor's connection inside one transaction.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type Reply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

const QUEUE_DEPTH: usize = 1024;

/// Handle for sending jobs to the writer actor.
///
/// All cache writes go through one connection so SQLite never sees two
/// concurrent writers.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, Reply)>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// Fails with a storage error when the actor has stopped.
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
            .map_err(|_| StorageError::WriterClosed("job channel closed".to_string()))?;

        let boxed = ret_rx
            .await
            .map_err(|_| StorageError::WriterClosed("reply dropped".to_string()))??;

        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| StorageError::CoreError("writer result had an unexpected type".to_string()).into())
    }
}

/// Spawns a background Tokio task that acts as the single writer to the database.
///
/// The actor holds one pooled connection for its whole life and runs each job
/// in an immediate transaction. It ends when every [`WriteHandle`] is dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, Reply)>(QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                // dropping rx makes every exec() fail with WriterClosed
                error!("Writer actor could not get a connection: {}", e);
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(|e: StorageError| e.into());

            // requester may have gone away
            let _ = reply_tx.send(result);
        }
        debug!("Writer actor stopped");
    });

    WriteHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, init, run_migrations};
    use diesel::sql_query;
    use diesel::RunQueryDsl;
    use marketfeed_core::errors::{DatabaseError, Error};

    fn pool_in(dir: &tempfile::TempDir) -> DbPool {
        let path = dir.path().join("writer.db");
        let path = init(path.to_str().unwrap()).unwrap();
        let pool = create_pool(&path).unwrap();
        run_migrations(&pool).unwrap();
        (*pool).clone()
    }

    #[tokio::test]
    async fn test_exec_returns_job_value() {
        let dir = tempfile::tempdir().unwrap();
        let writer = spawn_writer(pool_in(&dir));

        let value = writer.exec(|_conn| Ok(42_usize)).await.unwrap();

        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_failed_job_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_in(&dir);
        let writer = spawn_writer(pool.clone());

        let result = writer
            .exec(|conn| {
                sql_query(
                    "INSERT INTO cached_records (symbol, kind, payload, fetched_at) \
                     VALUES ('AAPL', 'quote', '{}', '2024-01-01T00:00:00Z')",
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Err::<(), _>(Error::Unexpected("abort".to_string()))
            })
            .await;
        assert!(matches!(result, Err(Error::Database(DatabaseError::Internal(_)))));

        let count = writer
            .exec(|conn| {
                sql_query("DELETE FROM cached_records")
                    .execute(conn)
                    .map_err(|e| StorageError::from(e).into())
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
