use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub feed: Feed,
    pub fanout: Fanout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fanout {
    /// Max feed entries written per insert statement during delivery.
    pub batch_size: usize,
    /// Jobs claimed from the queue per worker wakeup.
    pub claim_size: usize,
    /// A job that fails this many times is parked instead of retried.
    pub max_attempts: i32,
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed: Feed {
                default_limit: 20,
                max_limit: 100,
            },
            fanout: Fanout {
                batch_size: 500,
                claim_size: 16,
                max_attempts: 5,
                poll_interval_secs: 5,
            },
        }
    }
}

impl Settings {
    pub fn load() -> &'static Settings {
        SETTINGS.get_or_init(|| Self::load_from_files())
    }

    fn load_from_files() -> Settings {
        let default_path = Path::new("settings.default.ron");
        let override_path = Path::new("settings.ron");

        let mut settings = if default_path.exists() {
            fs::read_to_string(default_path)
                .ok()
                .and_then(|content| ron::from_str(&content).ok())
                .unwrap_or_default()
        } else {
            Settings::default()
        };

        if override_path.exists() {
            if let Ok(content) = fs::read_to_string(override_path) {
                if let Ok(overrides) = ron::from_str::<Settings>(&content) {
                    settings = overrides;
                }
            }
        }

        settings
    }
}

pub fn settings() -> &'static Settings {
    Settings::load()
}
