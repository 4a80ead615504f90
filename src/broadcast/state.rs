use crate::broadcast::types::{Destination, Payload};

/// Per-operator conversation stage. Each variant carries only the fields
/// valid for that stage; cancellation always resets to `Idle` and drops
/// everything.
#[derive(Clone, Default, Debug)]
pub enum BroadcastState {
    #[default]
    Idle,
    /// Manual targeting: `available` is the snapshot taken when the operator
    /// picked a candidate category, `selected` the toggled chat ids.
    SelectingChats {
        available: Vec<Destination>,
        selected: Vec<i64>,
    },
    /// Target set resolved, waiting for the message to broadcast.
    AwaitingPayload {
        targets: Vec<Destination>,
        target_label: String,
    },
    /// Payload captured, waiting for the operator's PIN.
    AwaitingPin {
        targets: Vec<Destination>,
        payload: Payload,
    },
    /// PIN verified, waiting for the copy/forward choice.
    ChoosingSendMode {
        targets: Vec<Destination>,
        payload: Payload,
    },
}

/// Flips membership of `chat_id` in `selected`. Returns true when the id is
/// selected after the toggle.
pub fn toggle_selection(selected: &mut Vec<i64>, chat_id: i64) -> bool {
    if let Some(pos) = selected.iter().position(|id| *id == chat_id) {
        selected.remove(pos);
        false
    } else {
        selected.push(chat_id);
        true
    }
}

/// Fixes the manual target set: the snapshot filtered by the toggled ids.
/// The result is always a subset of `available`; stale ids in `selected`
/// (not present in the snapshot) are dropped.
pub fn confirm_selection(available: &[Destination], selected: &[i64]) -> Vec<Destination> {
    available
        .iter()
        .filter(|d| selected.contains(&d.chat_id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::types::ChatCategory;

    fn dest(chat_id: i64) -> Destination {
        Destination {
            chat_id,
            category: ChatCategory::Channel,
            title: format!("chat {chat_id}"),
            username: None,
        }
    }

    #[test]
    fn toggle_is_idempotent_pairwise() {
        let mut selected = vec![10, 20];
        assert!(toggle_selection(&mut selected, 30));
        assert!(!toggle_selection(&mut selected, 30));
        assert_eq!(selected, vec![10, 20]);
    }

    #[test]
    fn toggle_reports_new_membership() {
        let mut selected = Vec::new();
        assert!(toggle_selection(&mut selected, 5));
        assert_eq!(selected, vec![5]);
        assert!(!toggle_selection(&mut selected, 5));
        assert!(selected.is_empty());
    }

    #[test]
    fn confirm_filters_snapshot_by_selection() {
        let available = vec![dest(1), dest(2), dest(3), dest(4), dest(5)];
        let mut selected = Vec::new();

        // Toggle two on, then one of them off again.
        toggle_selection(&mut selected, 2);
        toggle_selection(&mut selected, 4);
        toggle_selection(&mut selected, 2);

        let targets = confirm_selection(&available, &selected);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].chat_id, 4);
    }

    #[test]
    fn confirm_drops_ids_missing_from_snapshot() {
        let available = vec![dest(1), dest(2)];
        let targets = confirm_selection(&available, &[2, 99]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].chat_id, 2);
    }

    #[test]
    fn confirm_with_empty_selection_yields_no_targets() {
        let available = vec![dest(1), dest(2)];
        assert!(confirm_selection(&available, &[]).is_empty());
    }
}
