//! Fixed-size connection pool backing the demo login form.
//!
//! The original server's SQL connection pool is an opaque collaborator outside this
//! system's scope, and no schema or wire protocol survived into the retained source to
//! ground a real MySQL client against. This models the pool *mechanics* only — a fixed
//! number of slots, checkout blocks when exhausted, checkin returns a slot — using the
//! same bounded-channel shape as `crate::pool::WorkerPool`, with a RAII guard so a
//! checked-out connection always returns to the pool even if a handler panics.

use crossbeam_channel::{bounded, Receiver, Sender};

/// A placeholder database connection. Stands in for a real driver handle; `authenticate`
/// is a fixed in-memory check rather than a query.
pub struct DbConnection {
    id: usize,
}

impl DbConnection {
    /// Checks a username/password pair. No real backing store exists in this demo
    /// scope; `admin`/`admin` is the single accepted credential pair, matching the
    /// original demo form's seeded row.
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        username == "admin" && password == "admin"
    }
}

/// Bounded pool of [`DbConnection`]s.
pub struct DbPool {
    sender: Sender<DbConnection>,
    receiver: Receiver<DbConnection>,
}

impl DbPool {
    /// Creates a pool of `size` connections, `size` from `conn_pool_num`.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = bounded(size);
        for id in 0..size {
            sender
                .send(DbConnection { id })
                .expect("pool channel sized for `size` sends");
        }
        Self { sender, receiver }
    }

    /// Checks out a connection, blocking the calling worker thread until one is free.
    pub fn checkout(&self) -> PooledConnection<'_> {
        let conn = self
            .receiver
            .recv()
            .expect("DbPool sender half never dropped while self is alive");
        PooledConnection {
            conn: Some(conn),
            pool: self,
        }
    }
}

/// A checked-out connection. Returned to the pool automatically on drop.
pub struct PooledConnection<'a> {
    conn: Option<DbConnection>,
    pool: &'a DbPool,
}

impl std::ops::Deref for PooledConnection<'_> {
    type Target = DbConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection taken only on drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = self.pool.sender.send(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_returns_connection_to_pool_on_drop() {
        let pool = DbPool::new(1);
        {
            let conn = pool.checkout();
            assert!(conn.authenticate("admin", "admin"));
        }
        let conn = pool.checkout();
        assert!(!conn.authenticate("admin", "wrong"));
    }

    #[test]
    fn pool_has_exactly_size_connections() {
        let pool = DbPool::new(2);
        let a = pool.checkout();
        let b = pool.checkout();
        assert_eq!(0, pool.receiver.len());
        drop(a);
        drop(b);
        assert_eq!(2, pool.receiver.len());
    }
}
