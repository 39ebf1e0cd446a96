//! # Write Transactions
//!
//! Every mutation in this crate runs inside a [`WriteTx`].
//!
//! ## Why BEGIN IMMEDIATE
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN (deferred)                  BEGIN IMMEDIATE                      │
//! │  ────────────────                  ───────────────                      │
//! │  read stock = 1   (snapshot)       take RESERVED lock ─┐ waits up to    │
//! │  ...                               read stock = 1      │ busy_timeout   │
//! │  UPDATE → SQLITE_BUSY_SNAPSHOT     UPDATE              │ then Busy      │
//! │  (another writer got there first)  COMMIT ─────────────┘                │
//! │                                                                         │
//! │  Two cashiers selling the last unit: the second BEGIN IMMEDIATE waits   │
//! │  for the first COMMIT, then reads the committed stock (0) and rejects.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite has no row locks. The write lock taken by `BEGIN IMMEDIATE` covers
//! every product and customer row the operation touches, so reads inside the
//! transaction are never stale and writers are serialised.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// An open `BEGIN IMMEDIATE` transaction on a pooled connection.
///
/// Use it as an executor through `&mut *tx`. Finish it with
/// [`commit`](WriteTx::commit) or [`rollback`](WriteTx::rollback). If it is
/// dropped while still open (early return, panic, cancelled future) the
/// connection is closed instead of returned to the pool, which makes SQLite
/// discard the transaction.
#[derive(Debug)]
pub struct WriteTx {
    conn: PoolConnection<Sqlite>,
    open: bool,
}

impl WriteTx {
    /// Acquires a connection and takes the database write lock.
    ///
    /// Fails with `DbError::Busy` when the lock is not granted within the
    /// connection's `busy_timeout`, or no connection is free within the
    /// pool's acquire timeout.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        debug!("write transaction started");
        Ok(WriteTx { conn, open: true })
    }

    /// Makes every change visible.
    pub async fn commit(mut self) -> DbResult<()> {
        sqlx::query("COMMIT").execute(&mut *self.conn).await?;
        self.open = false;
        debug!("write transaction committed");
        Ok(())
    }

    /// Discards every change.
    pub async fn rollback(mut self) -> DbResult<()> {
        sqlx::query("ROLLBACK").execute(&mut *self.conn).await?;
        self.open = false;
        debug!("write transaction rolled back");
        Ok(())
    }

    /// Rolls back, logging instead of returning a rollback failure.
    ///
    /// For error paths where the original error is what the caller needs.
    pub async fn abandon(self) {
        if let Err(err) = self.rollback().await {
            warn!(error = %err, "rollback failed; connection discarded");
        }
    }

    /// Commits on `Ok`, rolls back on `Err`.
    ///
    /// ```rust,ignore
    /// let mut tx = WriteTx::begin(&pool).await?;
    /// let result = insert_product(&mut tx, tenant_id, &product).await;
    /// tx.finish(result).await
    /// ```
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                self.abandon().await;
                Err(err)
            }
        }
    }
}

impl Deref for WriteTx {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for WriteTx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if self.open {
            warn!("write transaction dropped while open; closing connection");
            self.conn.close_on_drop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn scratch_table(db: &Database) {
        sqlx::query("CREATE TABLE scratch (v INTEGER NOT NULL)")
            .execute(db.pool())
            .await
            .unwrap();
    }

    async fn count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM scratch")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        scratch_table(&db).await;

        let mut tx = WriteTx::begin(db.pool()).await.unwrap();
        sqlx::query("INSERT INTO scratch (v) VALUES (1)")
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        scratch_table(&db).await;

        let mut tx = WriteTx::begin(db.pool()).await.unwrap();
        sqlx::query("INSERT INTO scratch (v) VALUES (1)")
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(count(&db).await, 0);
    }
}
