use crate::db::DbPool;
use crate::error::FeedError;
use crate::settings::settings;
use crate::store::{entries_for_viewer, FeedEntry};
use crate::tweets::{tweets_by_ids, Tweet};
use crate::utils::logs;
use serde::Serialize;
use std::collections::HashMap;

/// Keyset position inside a viewer's feed: the (delivery time, entry id)
/// of the last row already returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: i64,
    pub entry_id: i64,
}

impl Cursor {
    /// Token handed to API callers. Opaque to them; callers must round-trip
    /// it unmodified.
    pub fn encode(&self) -> String {
        format!("{}-{}", self.created_at, self.entry_id)
    }

    pub fn decode(token: &str) -> Result<Cursor, FeedError> {
        let malformed = || FeedError::InvalidCursor(token.to_string());

        let (ts, id) = token.split_once('-').ok_or_else(malformed)?;
        Ok(Cursor {
            created_at: ts.parse().map_err(|_| malformed())?,
            entry_id: id.parse().map_err(|_| malformed())?,
        })
    }
}

/// One rendered feed row: the inbox entry hydrated with its tweet.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub tweet_id: i64,
    /// Users are opaque ids to this subsystem, so the author field carries
    /// the id on the wire.
    #[serde(rename = "author")]
    pub author_id: i64,
    pub content: String,
    pub created_at: i64,
    pub delivered_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
}

pub struct FeedService {
    pool: DbPool,
}

impl FeedService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// A viewer's feed page, newest delivery first. Unknown viewers get an
    /// empty page, not an error; a malformed cursor is the caller's bug
    /// and is surfaced.
    pub fn feed_for(
        &self,
        viewer_id: i64,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> Result<FeedPage, FeedError> {
        let s = settings();
        let cursor = cursor.map(Cursor::decode).transpose()?;
        let limit = limit.unwrap_or(s.feed.default_limit).min(s.feed.max_limit);

        let mut conn = self.pool.get()?;
        let entries = entries_for_viewer(&mut conn, viewer_id, cursor, limit)?;

        // keyset from the raw page, before hydration drops anything
        let next_cursor = if entries.len() == limit {
            entries.last().map(|e| {
                Cursor {
                    created_at: e.created_at,
                    entry_id: e.id,
                }
                .encode()
            })
        } else {
            None
        };

        let items = hydrate(&mut conn, &entries)?;

        logs::log_feed_served(viewer_id, items.len(), next_cursor.as_deref());

        Ok(FeedPage { items, next_cursor })
    }
}

/// One batched lookup for the whole page. Entries whose tweet was removed
/// while the page was being read are silently dropped; the cascade delete
/// is about to take them anyway.
fn hydrate(
    conn: &mut diesel::SqliteConnection,
    entries: &[FeedEntry],
) -> Result<Vec<FeedItem>, FeedError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = entries.iter().map(|e| e.tweet_id).collect();
    let tweets: HashMap<i64, Tweet> = tweets_by_ids(conn, &ids)?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    Ok(entries
        .iter()
        .filter_map(|entry| {
            tweets.get(&entry.tweet_id).map(|tweet| FeedItem {
                tweet_id: tweet.id,
                author_id: tweet.user_id,
                content: tweet.content.clone(),
                created_at: tweet.created_at,
                delivered_at: entry.created_at,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;
    use crate::fanout::FanoutEngine;
    use crate::friendships::{follow, DieselFollowGraph};
    use crate::tweets::create_tweet;
    use diesel::prelude::*;
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::sqlite::SqliteConnection;
    use std::sync::Arc;

    fn test_pool() -> DbPool {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        run_migrations(&mut pool.get().unwrap());
        pool
    }

    fn publish(pool: &DbPool, author: i64, content: &str) -> Tweet {
        let tweet = create_tweet(&mut pool.get().unwrap(), author, content).unwrap();
        let graph = Arc::new(DieselFollowGraph::new(pool.clone()));
        FanoutEngine::new(pool.clone(), graph).deliver(&tweet).unwrap();
        tweet
    }

    #[test]
    fn test_cursor_round_trip() {
        let c = Cursor {
            created_at: 1700000000,
            entry_id: 37,
        };
        assert_eq!(Cursor::decode(&c.encode()).unwrap(), c);
    }

    #[test]
    fn test_malformed_cursor_is_rejected() {
        for token in ["", "abc", "12:34", "12-", "-7", "12-x", "9999999999999999999999-1"] {
            assert!(matches!(
                Cursor::decode(token),
                Err(FeedError::InvalidCursor(_))
            ));
        }
    }

    #[test]
    fn test_unknown_viewer_gets_empty_page() {
        let pool = test_pool();
        let page = FeedService::new(pool).feed_for(999, None, None).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_feed_is_hydrated_with_tweets() {
        let pool = test_pool();
        follow(&mut pool.get().unwrap(), 2, 1).unwrap();
        let tweet = publish(&pool, 1, "a tweet worth reading");

        let page = FeedService::new(pool).feed_for(2, None, None).unwrap();
        assert_eq!(page.items.len(), 1);

        let item = &page.items[0];
        assert_eq!(item.tweet_id, tweet.id);
        assert_eq!(item.author_id, 1);
        assert_eq!(item.content, "a tweet worth reading");
        assert!(item.delivered_at >= item.created_at);
    }

    #[test]
    fn test_feed_item_json_shape() {
        let pool = test_pool();
        let tweet = publish(&pool, 1, "json boundary check");

        let page = FeedService::new(pool).feed_for(1, None, None).unwrap();
        let json = serde_json::to_value(&page.items[0]).unwrap();

        assert_eq!(json["tweet_id"], tweet.id);
        assert_eq!(json["author"], 1);
        assert!(json.get("author_id").is_none());
        assert_eq!(json["content"], "json boundary check");
        assert!(json["created_at"].is_i64());
        assert!(json["delivered_at"].is_i64());
    }

    #[test]
    fn test_pagination_walks_whole_feed_once() {
        let pool = test_pool();
        let mut published = Vec::new();
        for i in 0..7 {
            published.push(publish(&pool, 1, &format!("tweet number {i}")).id);
        }

        let service = FeedService::new(pool);
        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = service
                .feed_for(1, cursor.as_deref(), Some(3))
                .unwrap();
            seen.extend(page.items.iter().map(|i| i.tweet_id));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        published.reverse();
        assert_eq!(seen, published);
    }

    #[test]
    fn test_limit_is_clamped_to_max() {
        let pool = test_pool();
        for i in 0..3 {
            publish(&pool, 1, &format!("clamp check {i}"));
        }

        let service = FeedService::new(pool);
        let max = settings().feed.max_limit;
        let page = service.feed_for(1, None, Some(max + 1000)).unwrap();
        assert!(page.items.len() <= max);
    }

    #[test]
    fn test_vanished_tweet_is_dropped_from_page() {
        let pool = test_pool();
        let tweet = publish(&pool, 1, "soon to disappear");
        publish(&pool, 1, "still standing here");

        {
            use crate::schema::tweets;
            let mut conn = pool.get().unwrap();
            diesel::delete(tweets::table.filter(tweets::id.eq(tweet.id)))
                .execute(&mut conn)
                .unwrap();
        }

        let page = FeedService::new(pool).feed_for(1, None, None).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].content, "still standing here");
    }
}
