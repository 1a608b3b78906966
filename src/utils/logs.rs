use console::Style;

pub fn dim() -> Style {
    Style::new().dim()
}

fn blue() -> Style {
    Style::new().blue()
}

fn cyan() -> Style {
    Style::new().cyan()
}

fn green() -> Style {
    Style::new().green()
}

fn yellow() -> Style {
    Style::new().yellow()
}

fn red() -> Style {
    Style::new().red()
}

fn bold() -> Style {
    Style::new().bold()
}

fn init_prefix() -> String {
    blue().apply_to("[INIT]").to_string()
}

pub fn log_init(database_url: &str) {
    println!(
        "{} starting newsfeed worker on {}...",
        init_prefix(),
        cyan().apply_to(database_url)
    );
}

pub fn log_db_ready() {
    println!("{} database ready.", init_prefix());
}

pub fn log_fanout_done(tweet_id: i64, delivered: usize, batches: usize) {
    println!(
        "{} tweet {} to {} inboxes ({} batches)",
        green().apply_to("delivered"),
        dim().apply_to(tweet_id),
        bold().apply_to(delivered),
        dim().apply_to(batches)
    );
}

pub fn log_feed_served(viewer_id: i64, count: usize, cursor: Option<&str>) {
    let cursor_info = match cursor {
        Some(c) => format!(" (cursor: {})", dim().apply_to(c)),
        None => String::new(),
    };
    println!(
        "{} {} entries to viewer {}{}",
        cyan().apply_to("served"),
        bold().apply_to(count),
        dim().apply_to(viewer_id),
        cursor_info
    );
}

pub fn log_job_retry(tweet_id: i64, attempts: i32) {
    println!(
        "{} fanout of tweet {} (attempt {})",
        yellow().apply_to("retrying"),
        dim().apply_to(tweet_id),
        bold().apply_to(attempts)
    );
}

pub fn log_job_parked(tweet_id: i64, attempts: i32) {
    println!(
        "{} fanout of tweet {} after {} attempts",
        red().apply_to("parked"),
        dim().apply_to(tweet_id),
        bold().apply_to(attempts)
    );
}
