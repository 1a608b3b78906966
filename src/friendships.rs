use crate::db::DbPool;
use crate::error::FeedError;
use crate::schema::friendships;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = friendships)]
#[allow(dead_code)]
pub struct Friendship {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub created_at: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = friendships)]
pub struct NewFriendship {
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub created_at: i64,
}

/// Read-only view of the follow graph, injected into the fan-out engine so
/// a cached or sharded implementation can be swapped in without touching
/// delivery logic.
pub trait FollowGraph: Send + Sync {
    /// All users following `user_id`. One indexed query, never one per row.
    fn followers_of(&self, user_id: i64) -> Result<Vec<i64>, FeedError>;
}

pub struct DieselFollowGraph {
    pool: DbPool,
}

impl DieselFollowGraph {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl FollowGraph for DieselFollowGraph {
    fn followers_of(&self, user_id: i64) -> Result<Vec<i64>, FeedError> {
        let mut conn = self.pool.get()?;
        Ok(get_followers(&mut conn, user_id)?)
    }
}

/// Follower ids only. Hits the (to_user_id, created_at) index; hydrating
/// each follower row here would reintroduce the N+1 pattern this exists
/// to avoid.
pub fn get_followers(conn: &mut SqliteConnection, user_id: i64) -> QueryResult<Vec<i64>> {
    friendships::table
        .filter(friendships::to_user_id.eq(user_id))
        .select(friendships::from_user_id)
        .load(conn)
}

/// Ids of everyone `user_id` follows, in follow order.
pub fn get_following(conn: &mut SqliteConnection, user_id: i64) -> QueryResult<Vec<i64>> {
    friendships::table
        .filter(friendships::from_user_id.eq(user_id))
        .order(friendships::created_at.asc())
        .select(friendships::to_user_id)
        .load(conn)
}

/// Records that `from_user` follows `to_user`. Following twice is a no-op.
pub fn follow(conn: &mut SqliteConnection, from_user: i64, to_user: i64) -> QueryResult<usize> {
    let edge = NewFriendship {
        from_user_id: from_user,
        to_user_id: to_user,
        created_at: Utc::now().timestamp(),
    };

    diesel::insert_or_ignore_into(friendships::table)
        .values(&edge)
        .execute(conn)
}

pub fn unfollow(conn: &mut SqliteConnection, from_user: i64, to_user: i64) -> QueryResult<usize> {
    diesel::delete(
        friendships::table
            .filter(friendships::from_user_id.eq(from_user))
            .filter(friendships::to_user_id.eq(to_user)),
    )
    .execute(conn)
}
