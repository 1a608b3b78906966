use crate::db::DbPool;
use crate::error::FeedError;
use crate::fanout::FanoutEngine;
use crate::friendships::FollowGraph;
use crate::schema::fanout_jobs;
use crate::settings::settings;
use crate::tweets::tweets_by_ids;
use crate::utils::logs;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = fanout_jobs)]
pub struct FanoutJob {
    pub id: i64,
    pub tweet_id: i64,
    pub attempts: i32,
    pub created_at: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = fanout_jobs)]
struct NewFanoutJob {
    tweet_id: i64,
    created_at: i64,
}

/// Durable "this tweet owes its audience a delivery" marker. One job per
/// tweet id, so re-announcing a tweet never queues a second delivery.
pub fn enqueue_fanout(conn: &mut SqliteConnection, tweet_id: i64) -> QueryResult<usize> {
    let job = NewFanoutJob {
        tweet_id,
        created_at: Utc::now().timestamp(),
    };

    diesel::insert_or_ignore_into(fanout_jobs::table)
        .values(&job)
        .execute(conn)
}

/// Oldest runnable jobs after `after_id`, excluding jobs already past the
/// retry budget.
pub fn claim_jobs(
    conn: &mut SqliteConnection,
    after_id: i64,
    limit: usize,
    max_attempts: i32,
) -> QueryResult<Vec<FanoutJob>> {
    fanout_jobs::table
        .filter(fanout_jobs::id.gt(after_id))
        .filter(fanout_jobs::attempts.lt(max_attempts))
        .order(fanout_jobs::id.asc())
        .limit(limit as i64)
        .load(conn)
}

pub fn complete_job(conn: &mut SqliteConnection, job_id: i64) -> QueryResult<usize> {
    diesel::delete(fanout_jobs::table.filter(fanout_jobs::id.eq(job_id))).execute(conn)
}

pub fn record_failure(conn: &mut SqliteConnection, job_id: i64) -> QueryResult<usize> {
    diesel::update(fanout_jobs::table.filter(fanout_jobs::id.eq(job_id)))
        .set(fanout_jobs::attempts.eq(fanout_jobs::attempts + 1))
        .execute(conn)
}

/// Background consumer of the fan-out queue. Polls on an interval and can
/// be nudged right after a publish so delivery latency stays decoupled
/// from the publish request without feeling sluggish.
#[derive(Clone)]
pub struct FanoutWorker {
    notify: Arc<Notify>,
}

impl FanoutWorker {
    pub fn spawn(pool: DbPool, graph: Arc<dyn FollowGraph>) -> Self {
        let notify = Arc::new(Notify::new());
        let wakeup = notify.clone();

        tokio::spawn(async move {
            let engine = FanoutEngine::new(pool.clone(), graph);
            let poll = Duration::from_secs(settings().fanout.poll_interval_secs.max(1));

            loop {
                tokio::select! {
                    _ = wakeup.notified() => {}
                    _ = tokio::time::sleep(poll) => {}
                }

                if let Err(e) = drain_queue(&pool, &engine) {
                    tracing::warn!("fanout queue pass failed: {e}");
                }
            }
        });

        Self { notify }
    }

    /// Wakes the worker ahead of the next poll tick.
    pub fn nudge(&self) {
        self.notify.notify_one();
    }
}

/// One pass over the queue. Failed jobs keep their row with a bumped
/// attempt count and are retried whole on a later pass; entry insertion is
/// idempotent, so re-delivery after a partial write is harmless.
pub fn drain_queue(pool: &DbPool, engine: &FanoutEngine) -> Result<usize, FeedError> {
    let s = settings();
    let mut delivered_jobs = 0;
    let mut after_id = 0;

    loop {
        let jobs = {
            let mut conn = pool.get()?;
            claim_jobs(&mut conn, after_id, s.fanout.claim_size, s.fanout.max_attempts)?
        };
        let Some(last) = jobs.last() else {
            break;
        };
        after_id = last.id;

        for job in jobs {
            let tweet = {
                let mut conn = pool.get()?;
                tweets_by_ids(&mut conn, &[job.tweet_id])?.into_iter().next()
            };

            // tweet deleted before delivery ran; nothing owed anymore
            let Some(tweet) = tweet else {
                let mut conn = pool.get()?;
                complete_job(&mut conn, job.id)?;
                continue;
            };

            match engine.deliver(&tweet) {
                Ok(_) => {
                    let mut conn = pool.get()?;
                    complete_job(&mut conn, job.id)?;
                    delivered_jobs += 1;
                }
                Err(err) => {
                    let mut conn = pool.get()?;
                    record_failure(&mut conn, job.id)?;
                    if job.attempts + 1 >= s.fanout.max_attempts {
                        logs::log_job_parked(job.tweet_id, job.attempts + 1);
                    } else {
                        logs::log_job_retry(job.tweet_id, job.attempts + 1);
                    }
                    tracing::warn!("fanout of tweet {} failed: {err}", job.tweet_id);
                }
            }
        }
    }

    Ok(delivered_jobs)
}
