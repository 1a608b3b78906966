pub mod db;
pub mod error;
pub mod fanout;
pub mod feed;
pub mod friendships;
pub mod queue;
pub mod schema;
pub mod settings;
pub mod store;
pub mod tweets;
pub mod utils;

pub use db::{configure_connection, establish_pool, run_migrations, DbPool};
pub use error::FeedError;
pub use fanout::{FanoutEngine, FanoutReport};
pub use feed::{Cursor, FeedItem, FeedPage, FeedService};
pub use friendships::{DieselFollowGraph, FollowGraph};
pub use queue::FanoutWorker;
pub use tweets::{create_tweet, delete_tweet, on_tweet_created, Tweet};
