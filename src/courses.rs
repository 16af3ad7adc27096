//! Simulated course catalog source. Stands in for a remote fetch: it waits a
//! fixed delay, then either returns the catalog or fails like a flaky network.

use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_FAILURE_RATE: f64 = 0.1;

const CATALOG: &[(i64, &str)] = &[
    (1, "React Fundamentals"),
    (2, "Advanced JavaScript"),
    (3, "CSS Mastery"),
    (4, "Node.js Backend"),
    (5, "TypeScript Essentials"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The simulated transport dropped the request.
    #[error("{0}")]
    Network(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchSettings {
    pub delay: Duration,
    /// Probability in `[0, 1]` that a fetch fails.
    pub failure_rate: f64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            delay: DEFAULT_FETCH_DELAY,
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

pub fn catalog() -> Vec<Course> {
    CATALOG
        .iter()
        .map(|(id, name)| Course {
            id: *id,
            name: (*name).to_string(),
        })
        .collect()
}

pub fn fetch_courses<R: Rng>(
    settings: &FetchSettings,
    rng: &mut R,
) -> Result<Vec<Course>, FetchError> {
    if !settings.delay.is_zero() {
        std::thread::sleep(settings.delay);
    }
    let rate = settings.failure_rate.clamp(0.0, 1.0);
    if rng.random_bool(rate) {
        warn!("simulated course fetch failure");
        return Err(FetchError::Network(
            "Failed to fetch courses. Please try again later.".into(),
        ));
    }
    debug!(count = CATALOG.len(), "courses fetched");
    Ok(catalog())
}
