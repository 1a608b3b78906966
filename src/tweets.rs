use crate::error::FeedError;
use crate::queue::enqueue_fanout;
use crate::schema::tweets;
use crate::store::delete_entries_for_tweet;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

pub const CONTENT_MIN_CHARS: usize = 6;
pub const CONTENT_MAX_CHARS: usize = 140;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = tweets)]
pub struct Tweet {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tweets)]
pub struct NewTweet {
    pub user_id: i64,
    pub content: String,
    pub created_at: i64,
}

/// Inserts a validated tweet and returns the stored row.
pub fn create_tweet(
    conn: &mut SqliteConnection,
    user_id: i64,
    content: &str,
) -> Result<Tweet, FeedError> {
    let chars = content.chars().count();
    if !(CONTENT_MIN_CHARS..=CONTENT_MAX_CHARS).contains(&chars) {
        return Err(FeedError::InvalidContent {
            min: CONTENT_MIN_CHARS,
            max: CONTENT_MAX_CHARS,
            got: chars,
        });
    }

    let new_tweet = NewTweet {
        user_id,
        content: content.to_string(),
        created_at: Utc::now().timestamp(),
    };

    Ok(diesel::insert_into(tweets::table)
        .values(&new_tweet)
        .get_result(conn)?)
}

/// Boundary with the tweet-creation workflow: record that `tweet` exists
/// and owes its audience a delivery. Enqueueing twice for the same tweet
/// is a no-op.
pub fn on_tweet_created(conn: &mut SqliteConnection, tweet: &Tweet) -> Result<(), FeedError> {
    enqueue_fanout(conn, tweet.id)?;
    Ok(())
}

/// Batched lookup for feed hydration. One query however long the page is.
pub fn tweets_by_ids(conn: &mut SqliteConnection, ids: &[i64]) -> QueryResult<Vec<Tweet>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    tweets::table.filter(tweets::id.eq_any(ids)).load(conn)
}

/// A single author's tweets, newest first. Served by the
/// (user_id, created_at) index.
pub fn tweets_of_user(conn: &mut SqliteConnection, user_id: i64) -> QueryResult<Vec<Tweet>> {
    tweets::table
        .filter(tweets::user_id.eq(user_id))
        .order((tweets::created_at.desc(), tweets::id.desc()))
        .load(conn)
}

/// Removes a tweet and every inbox copy of it, atomically. The cascade
/// stops there.
pub fn delete_tweet(conn: &mut SqliteConnection, tweet_id: i64) -> Result<usize, FeedError> {
    let removed = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        delete_entries_for_tweet(conn, tweet_id)?;
        diesel::delete(tweets::table.filter(tweets::id.eq(tweet_id))).execute(conn)
    })?;
    Ok(removed)
}
