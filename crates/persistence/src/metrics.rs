//! Database metrics: query latency and pool occupancy.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Histogram of query (and whole-transaction) latency, labelled by name.
pub const QUERY_DURATION_METRIC: &str = "database_query_duration_seconds";

pub fn record_query_duration(query_name: &'static str, duration_secs: f64) {
    histogram!(QUERY_DURATION_METRIC, "query" => query_name).record(duration_secs);
}

/// Publishes pool gauges. Called on every `/metrics` scrape.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_total").set(size as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
}

/// Measures one named database operation.
///
/// ```ignore
/// let timer = QueryTimer::new("find_reward_by_id");
/// let result = sqlx::query_as::<_, RewardEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_keeps_name() {
        assert_eq!(QueryTimer::new("lock_reward").query_name, "lock_reward");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        QueryTimer::new("loyalty_transaction").record();
    }
}
