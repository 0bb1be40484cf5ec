use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Configuration for the two-tier sliding-window limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub window: Duration,
    pub global_budget: u32,
    pub per_node_budget: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(1_000),
            global_budget: 1_000,
            per_node_budget: 10,
        }
    }
}

/// The outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Accepted,
    GlobalExceeded,
    MissingNodeId,
    PerNodeExceeded,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

impl Window {
    fn fresh(now: Instant) -> Self {
        Self { start: now, count: 1 }
    }
}

/// Two-tier sliding-window counter: one global window plus one window per
/// `nodeId`. State is process-local and never persisted — a restart
/// grants fresh budgets, which is acceptable since these are operational
/// defenses, not accounting.
pub struct RateLimiter {
    config: RateLimiterConfig,
    global: Mutex<Window>,
    per_node: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            global: Mutex::new(Window {
                start: Instant::now(),
                count: 0,
            }),
            per_node: Mutex::new(HashMap::new()),
        }
    }

    /// Checks and charges the global and per-node budgets for a message.
    /// Must be called only after validation has already accepted the
    /// message, so malformed payloads never consume budget.
    pub fn check(&self, node_id: Option<&str>, now: Instant) -> RateLimitDecision {
        if !self.check_global(now) {
            return RateLimitDecision::GlobalExceeded;
        }

        let Some(node_id) = node_id else {
            return RateLimitDecision::MissingNodeId;
        };

        if self.check_node(node_id, now) {
            RateLimitDecision::Accepted
        } else {
            RateLimitDecision::PerNodeExceeded
        }
    }

    fn check_global(&self, now: Instant) -> bool {
        let mut window = self.global.lock().expect("global rate-limit mutex poisoned");
        if now.duration_since(window.start) >= self.config.window {
            *window = Window::fresh(now);
            return true;
        }
        window.count += 1;
        window.count <= self.config.global_budget
    }

    fn check_node(&self, node_id: &str, now: Instant) -> bool {
        let mut windows = self.per_node.lock().expect("per-node rate-limit mutex poisoned");
        match windows.get_mut(node_id) {
            Some(window) if now.duration_since(window.start) >= self.config.window => {
                *window = Window::fresh(now);
                true
            }
            Some(window) => {
                window.count += 1;
                window.count <= self.config.per_node_budget
            }
            None => {
                windows.insert(node_id.to_string(), Window::fresh(now));
                true
            }
        }
    }

    /// Drops per-node windows that have been idle longer than 10x the window
    /// width. Intended to run on a 60s tick from the host.
    pub fn sweep(&self, now: Instant) {
        let stale_after = self.config.window * 10;
        let mut windows = self.per_node.lock().expect("per-node rate-limit mutex poisoned");
        windows.retain(|_, window| now.duration_since(window.start) < stale_after);
    }

    #[cfg(test)]
    pub(crate) fn tracked_node_count(&self) -> usize {
        self.per_node.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_under_budget() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: Duration::from_millis(1_000),
            global_budget: 1_000,
            per_node_budget: 10,
        });
        let now = Instant::now();
        for _ in 0..10 {
            assert_eq!(limiter.check(Some("node-a"), now), RateLimitDecision::Accepted);
        }
    }

    #[test]
    fn rejects_over_per_node_budget_within_window() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: Duration::from_millis(1_000),
            global_budget: 1_000,
            per_node_budget: 10,
        });
        let now = Instant::now();
        let mut accepted = 0;
        for _ in 0..20 {
            if limiter.check(Some("node-a"), now) == RateLimitDecision::Accepted {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 10);
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: Duration::from_millis(10),
            global_budget: 1_000,
            per_node_budget: 2,
        });
        let now = Instant::now();
        assert_eq!(limiter.check(Some("node-a"), now), RateLimitDecision::Accepted);
        assert_eq!(limiter.check(Some("node-a"), now), RateLimitDecision::Accepted);
        assert_eq!(limiter.check(Some("node-a"), now), RateLimitDecision::PerNodeExceeded);

        let later = now + Duration::from_millis(11);
        assert_eq!(limiter.check(Some("node-a"), later), RateLimitDecision::Accepted);
    }

    #[test]
    fn missing_node_id_is_rejected_after_global_check() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let now = Instant::now();
        assert_eq!(limiter.check(None, now), RateLimitDecision::MissingNodeId);
    }

    #[test]
    fn global_budget_bounds_sum_across_all_nodes() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: Duration::from_millis(1_000),
            global_budget: 5,
            per_node_budget: 1_000,
        });
        let now = Instant::now();
        let mut accepted = 0;
        for i in 0..10 {
            let node = format!("node-{i}");
            if limiter.check(Some(&node), now) == RateLimitDecision::Accepted {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 5);
    }

    #[test]
    fn sweep_drops_only_stale_entries() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: Duration::from_millis(10),
            global_budget: 1_000,
            per_node_budget: 1_000,
        });
        let now = Instant::now();
        limiter.check(Some("node-a"), now);
        limiter.check(Some("node-b"), now);
        assert_eq!(limiter.tracked_node_count(), 2);

        let much_later = now + Duration::from_millis(200);
        limiter.check(Some("node-a"), much_later);
        limiter.sweep(much_later);
        assert_eq!(limiter.tracked_node_count(), 1);
    }
}
