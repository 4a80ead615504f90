use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long repeated album-part rejections from the same operator stay
/// silenced after the first notice.
pub const REJECTION_WINDOW: Duration = Duration::from_secs(8);

/// Per-operator cooldown for album rejection notices.
///
/// An album arrives as several physical messages sharing one media group id;
/// each part would otherwise trigger its own rejection message. Entries are
/// keyed by operator id and swept lazily on access, so sessions of different
/// operators never contend over each other's entries.
pub struct RejectionCooldown {
    window: Duration,
    entries: Mutex<HashMap<i64, Instant>>,
}

impl Default for RejectionCooldown {
    fn default() -> Self {
        RejectionCooldown::new(REJECTION_WINDOW)
    }
}

impl RejectionCooldown {
    pub fn new(window: Duration) -> Self {
        RejectionCooldown {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Records a rejection for `operator_id`. Returns true when this is the
    /// first rejection inside the window, i.e. the operator should be
    /// notified; later calls within the window return false.
    pub fn should_notify(&self, operator_id: i64) -> bool {
        self.should_notify_at(operator_id, Instant::now())
    }

    /// Drops the operator's cooldown entry, used once a non-album message
    /// arrives.
    pub fn clear(&self, operator_id: i64) {
        let mut entries = self.entries.lock().expect("cooldown mutex poisoned");
        entries.remove(&operator_id);
    }

    fn should_notify_at(&self, operator_id: i64, now: Instant) -> bool {
        let mut entries = self.entries.lock().expect("cooldown mutex poisoned");
        entries.retain(|_, expires| *expires > now);

        if entries.contains_key(&operator_id) {
            return false;
        }
        entries.insert(operator_id, now + self.window);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_rejection_notifies_repeat_is_silent() {
        let cooldown = RejectionCooldown::default();
        let now = Instant::now();

        assert!(cooldown.should_notify_at(7, now));
        assert!(!cooldown.should_notify_at(7, now + Duration::from_secs(1)));
        assert!(!cooldown.should_notify_at(7, now + Duration::from_secs(7)));
    }

    #[test]
    fn expired_entry_notifies_again() {
        let cooldown = RejectionCooldown::default();
        let now = Instant::now();

        assert!(cooldown.should_notify_at(7, now));
        assert!(cooldown.should_notify_at(7, now + Duration::from_secs(9)));
    }

    #[test]
    fn operators_do_not_share_entries() {
        let cooldown = RejectionCooldown::default();
        let now = Instant::now();

        assert!(cooldown.should_notify_at(1, now));
        assert!(cooldown.should_notify_at(2, now));
        assert!(!cooldown.should_notify_at(1, now + Duration::from_secs(2)));
    }

    #[test]
    fn clear_resets_the_window() {
        let cooldown = RejectionCooldown::default();
        let now = Instant::now();

        assert!(cooldown.should_notify_at(7, now));
        cooldown.clear(7);
        assert!(cooldown.should_notify_at(7, now + Duration::from_secs(1)));
    }
}
