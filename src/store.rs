use crate::feed::Cursor;
use crate::schema::newsfeeds;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = newsfeeds)]
pub struct FeedEntry {
    pub id: i64,
    pub user_id: i64,
    pub tweet_id: i64,
    pub created_at: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = newsfeeds)]
pub struct NewFeedEntry {
    pub user_id: i64,
    pub tweet_id: i64,
    pub created_at: i64,
}

/// Bulk insert, skipping rows that would violate the (user_id, tweet_id)
/// uniqueness. Returns how many rows were actually written, so a retried
/// delivery reports 0.
pub fn insert_entries(conn: &mut SqliteConnection, entries: &[NewFeedEntry]) -> QueryResult<usize> {
    if entries.is_empty() {
        return Ok(0);
    }

    diesel::insert_or_ignore_into(newsfeeds::table)
        .values(entries)
        .execute(conn)
}

/// A viewer's inbox page, newest delivery first. Ties on created_at are
/// broken by id descending so keyset pagination stays deterministic.
pub fn entries_for_viewer(
    conn: &mut SqliteConnection,
    viewer_id: i64,
    cursor: Option<Cursor>,
    limit: usize,
) -> QueryResult<Vec<FeedEntry>> {
    let mut query = newsfeeds::table
        .filter(newsfeeds::user_id.eq(viewer_id))
        .into_boxed();

    if let Some(c) = cursor {
        query = query.filter(
            newsfeeds::created_at.lt(c.created_at).or(newsfeeds::created_at
                .eq(c.created_at)
                .and(newsfeeds::id.lt(c.entry_id))),
        );
    }

    query
        .order((newsfeeds::created_at.desc(), newsfeeds::id.desc()))
        .limit(limit as i64)
        .load::<FeedEntry>(conn)
}

/// Cascade for a removed tweet: its inbox copies go with it, nothing else.
pub fn delete_entries_for_tweet(conn: &mut SqliteConnection, tweet: i64) -> QueryResult<usize> {
    diesel::delete(newsfeeds::table.filter(newsfeeds::tweet_id.eq(tweet))).execute(conn)
}

/// Cascade for a removed viewer account: their inbox is dropped wholesale.
pub fn delete_entries_for_viewer(conn: &mut SqliteConnection, viewer: i64) -> QueryResult<usize> {
    diesel::delete(newsfeeds::table.filter(newsfeeds::user_id.eq(viewer))).execute(conn)
}
