use crate::db::DbPool;
use crate::error::FeedError;
use crate::friendships::FollowGraph;
use crate::settings::settings;
use crate::store::{insert_entries, NewFeedEntry};
use crate::tweets::Tweet;
use crate::utils::logs;
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Feed entries actually written. 0 on a fully retried delivery.
    pub delivered: usize,
    /// Insert statements issued. Bounded by ceil(audience / batch_size).
    pub batches: usize,
}

/// Writes a tweet into the inbox of every audience member (author plus
/// followers) as a handful of bulk inserts.
pub struct FanoutEngine {
    pool: DbPool,
    graph: Arc<dyn FollowGraph>,
}

impl FanoutEngine {
    pub fn new(pool: DbPool, graph: Arc<dyn FollowGraph>) -> Self {
        Self { pool, graph }
    }

    /// Delivers `tweet` to its audience. Safe to call again after a
    /// failure: the (viewer, tweet) uniqueness makes re-delivery a no-op
    /// per row, and the whole delivery runs in one transaction so a
    /// mid-batch storage error leaves nothing behind.
    pub fn deliver(&self, tweet: &Tweet) -> Result<FanoutReport, FeedError> {
        let mut audience = self.graph.followers_of(tweet.user_id)?;
        if !audience.contains(&tweet.user_id) {
            audience.push(tweet.user_id);
        }

        let now = Utc::now().timestamp();
        let entries: Vec<NewFeedEntry> = audience
            .into_iter()
            .map(|viewer| NewFeedEntry {
                user_id: viewer,
                tweet_id: tweet.id,
                created_at: now,
            })
            .collect();

        let batch_size = settings().fanout.batch_size.max(1);
        let mut pooled = self.pool.get()?;
        let conn = &mut *pooled;

        let report = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let mut report = FanoutReport::default();
            for chunk in entries.chunks(batch_size) {
                report.delivered += insert_entries(conn, chunk)?;
                report.batches += 1;
            }
            Ok(report)
        })?;

        logs::log_fanout_done(tweet.id, report.delivered, report.batches);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;
    use crate::friendships::{follow, DieselFollowGraph};
    use crate::store::entries_for_viewer;
    use crate::tweets::create_tweet;
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::sqlite::SqliteConnection;

    // A single-connection pool over one in-memory database, shared by the
    // engine and the assertions below.
    fn test_pool() -> DbPool {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        run_migrations(&mut pool.get().unwrap());
        pool
    }

    fn engine(pool: &DbPool) -> FanoutEngine {
        let graph = Arc::new(DieselFollowGraph::new(pool.clone()));
        FanoutEngine::new(pool.clone(), graph)
    }

    fn inbox(pool: &DbPool, viewer: i64) -> Vec<i64> {
        entries_for_viewer(&mut pool.get().unwrap(), viewer, None, 100)
            .unwrap()
            .iter()
            .map(|e| e.tweet_id)
            .collect()
    }

    #[test]
    fn test_delivers_to_author_and_followers_only() {
        let pool = test_pool();
        {
            let mut conn = pool.get().unwrap();
            follow(&mut conn, 2, 1).unwrap();
            follow(&mut conn, 3, 1).unwrap();
            // user 4 follows someone else entirely
            follow(&mut conn, 4, 9).unwrap();
        }
        let tweet = create_tweet(&mut pool.get().unwrap(), 1, "shipping the fanout engine").unwrap();

        let report = engine(&pool).deliver(&tweet).unwrap();
        assert_eq!(report.delivered, 3);

        assert_eq!(inbox(&pool, 1), vec![tweet.id]);
        assert_eq!(inbox(&pool, 2), vec![tweet.id]);
        assert_eq!(inbox(&pool, 3), vec![tweet.id]);
        assert!(inbox(&pool, 4).is_empty());
    }

    #[test]
    fn test_delivery_is_idempotent() {
        let pool = test_pool();
        follow(&mut pool.get().unwrap(), 2, 1).unwrap();
        let tweet = create_tweet(&mut pool.get().unwrap(), 1, "retry me please").unwrap();

        let eng = engine(&pool);
        let first = eng.deliver(&tweet).unwrap();
        let second = eng.deliver(&tweet).unwrap();

        assert_eq!(first.delivered, 2);
        assert_eq!(second.delivered, 0);
        assert_eq!(inbox(&pool, 1).len(), 1);
        assert_eq!(inbox(&pool, 2).len(), 1);
    }

    #[test]
    fn test_author_sees_newest_tweet_first() {
        let pool = test_pool();
        let eng = engine(&pool);

        let t1 = create_tweet(&mut pool.get().unwrap(), 1, "first tweet here").unwrap();
        let t2 = create_tweet(&mut pool.get().unwrap(), 1, "second tweet here").unwrap();
        eng.deliver(&t1).unwrap();
        eng.deliver(&t2).unwrap();

        assert_eq!(inbox(&pool, 1), vec![t2.id, t1.id]);
    }

    #[test]
    fn test_large_audience_is_chunked() {
        let pool = test_pool();
        {
            let mut conn = pool.get().unwrap();
            for follower in 2..=10_001 {
                follow(&mut conn, follower, 1).unwrap();
            }
        }
        let tweet = create_tweet(&mut pool.get().unwrap(), 1, "hello ten thousand").unwrap();

        let report = engine(&pool).deliver(&tweet).unwrap();
        let batch_size = settings().fanout.batch_size;

        assert_eq!(report.delivered, 10_001);
        assert_eq!(report.batches, (10_001 + batch_size - 1) / batch_size);
        assert_eq!(inbox(&pool, 5_000), vec![tweet.id]);
    }
}
