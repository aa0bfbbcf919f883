use std::time::Duration;
use tokio::time::Instant;

/// Opaque token supplied by producers, all messages sharing it are routed to the same consumer
pub type GroupId = String;

/// Opaque identifier of a consumer, queue or node owning a group
pub type RouteId = String;

/// Current assignment of a group to its owning route
///
/// Timestamps are taken from the monotonic clock and are only meaningful within one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBinding {
    group_id: GroupId,
    route: RouteId,
    created_at: Instant,
    last_used_at: Instant,
}

impl GroupBinding {
    /// Creates a new binding which has been created and used just now
    pub fn new(group_id: impl Into<GroupId>, route: impl Into<RouteId>) -> Self {
        Self::at(group_id, route, Instant::now())
    }

    /// Creates a new binding which has been created and used at the given instant
    pub fn at(group_id: impl Into<GroupId>, route: impl Into<RouteId>, now: Instant) -> Self {
        Self {
            group_id: group_id.into(),
            route: route.into(),
            created_at: now,
            last_used_at: now,
        }
    }

    /// Group this binding belongs to
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Route currently owning the group
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Instant at which the binding has been established
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Instant at which the binding has last been used for routing
    pub fn last_used_at(&self) -> Instant {
        self.last_used_at
    }

    /// Marks the binding as used at the given instant
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_used_at {
            self.last_used_at = now;
        }
    }

    /// Time that passed since the binding has last been used
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used_at)
    }

    /// Whether the binding has been unused for longer than the timeout
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        self.idle_for(now) > timeout
    }

    /// Time that passed since the binding has been established
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn start_out_fresh() {
        let now = Instant::now();
        let binding = GroupBinding::at("order-42", "consumerA", now);

        assert_eq!(binding.created_at(), binding.last_used_at());
        assert_eq!(binding.idle_for(now), Duration::ZERO);
        assert!(!binding.is_idle(now, Duration::ZERO));
    }

    #[test]
    fn become_idle_only_beyond_timeout() {
        let now = Instant::now();
        let binding = GroupBinding::at("order-42", "consumerA", now);
        let timeout = Duration::from_secs(5);

        assert!(!binding.is_idle(now + timeout, timeout));
        assert!(binding.is_idle(now + timeout + Duration::from_millis(1), timeout));
    }

    #[test]
    fn refresh_usage_without_aging() {
        let now = Instant::now();
        let later = now + Duration::from_secs(3);
        let mut binding = GroupBinding::at("order-42", "consumerA", now);

        binding.touch(later);

        assert_eq!(binding.idle_for(later), Duration::ZERO);
        assert_eq!(binding.age(later), Duration::from_secs(3));
    }

    #[test]
    fn ignore_touches_from_the_past() {
        let now = Instant::now();
        let mut binding = GroupBinding::at("order-42", "consumerA", now + Duration::from_secs(1));

        binding.touch(now);

        assert_eq!(binding.last_used_at(), now + Duration::from_secs(1));
    }
}
