//! A small fixed-size connection pool over `tokio_postgres::Client`.
//!
//! Opens `pool_size` connections up front and hands callers a checked-out
//! client through an RAII guard, so returning a connection to the pool on
//! every exit path is structural rather than a convention someone has to
//! remember.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, Semaphore};
use tokio_postgres::{Client, NoTls};

use crate::error::StoreError;

struct Inner {
    // A plain std mutex: checkout/return both hold it only long enough to
    // push/pop, never across an `.await`, which is what lets `Drop` return
    // a connection synchronously instead of needing to spawn a task.
    idle: StdMutex<VecDeque<Client>>,
    permits: Semaphore,
}

/// Owns every live connection to the store. Cloning a `PgPool` is cheap —
/// clones share the same underlying connections.
#[derive(Clone)]
pub struct PgPool {
    inner: Arc<Inner>,
    /// Serializes mutating operations (submit/rollback) under a
    /// single-writer discipline. Readers never take this lock.
    write_lock: Arc<Mutex<()>>,
}

impl PgPool {
    /// Opens `pool_size` connections to `database_url`, spawning each
    /// connection's background I/O task, and returns a pool ready for use.
    pub async fn connect(database_url: &str, pool_size: usize) -> Result<Self, StoreError> {
        let mut idle = VecDeque::with_capacity(pool_size);
        for _ in 0..pool_size {
            let (client, connection) = tokio_postgres::connect(database_url, NoTls)
                .await
                .map_err(StoreError::Query)?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "postgres connection task exited with error");
                }
            });
            idle.push_back(client);
        }

        Ok(Self {
            inner: Arc::new(Inner { idle: StdMutex::new(idle), permits: Semaphore::new(pool_size) }),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Checks out one connection. Blocks if every connection is currently
    /// in use. The connection is returned to the pool when the guard drops.
    pub async fn checkout(&self) -> PooledClient {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("pool semaphore never closes");
        let client = self
            .inner
            .idle
            .lock()
            .unwrap()
            .pop_front()
            .expect("permit implies an idle connection");
        PooledClient { client: Some(client), pool: self.inner.clone(), _permit: permit }
    }

    /// Acquires the process-wide write lock for the duration of a mutating
    /// engine operation (submit_block / rollback_to).
    pub async fn acquire_write_lock(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.write_lock.clone().lock_owned().await
    }
}

/// An RAII-checked-out connection. Derefs to `&Client`; returns itself to
/// the pool's idle queue on drop.
pub struct PooledClient {
    client: Option<Client>,
    pool: Arc<Inner>,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl std::ops::Deref for PooledClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().expect("client taken only on drop")
    }
}

impl std::ops::DerefMut for PooledClient {
    fn deref_mut(&mut self) -> &mut Client {
        self.client.as_mut().expect("client taken only on drop")
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.idle.lock().unwrap().push_back(client);
        }
        // `_permit` drops right after, waking the next waiting `checkout`.
    }
}
