use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{NotificationId, ToastKind, UnixTimeMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

impl Severity {
    #[must_use]
    pub const fn toast_kind(self) -> ToastKind {
        match self {
            Self::Info => ToastKind::Info,
            Self::Warning => ToastKind::Warning,
            Self::Error => ToastKind::Error,
            Self::Success => ToastKind::Success,
        }
    }
}

/// Caller-supplied part of a notification; the ledger fills in the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl NotificationDraft {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub timestamp: UnixTimeMs,
    pub read: bool,
}

/// Newest-first list of notifications. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationLedger {
    entries: Vec<Notification>,
}

impl NotificationLedger {
    pub fn add(&mut self, draft: NotificationDraft) -> &Notification {
        self.add_at(draft, NotificationId::generate(), UnixTimeMs::now())
    }

    pub fn add_at(
        &mut self,
        draft: NotificationDraft,
        id: NotificationId,
        timestamp: UnixTimeMs,
    ) -> &Notification {
        tracing::debug!(id = %id, severity = ?draft.severity, "notification added");
        self.entries.insert(
            0,
            Notification {
                id,
                title: draft.title,
                message: draft.message,
                severity: draft.severity,
                timestamp,
                read: false,
            },
        );
        &self.entries[0]
    }

    /// Returns whether anything changed.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        match self.entries.iter_mut().find(|n| &n.id == id) {
            Some(entry) if !entry.read => {
                entry.read = true;
                true
            }
            _ => false,
        }
    }

    /// Returns how many entries flipped.
    pub fn mark_all_read(&mut self) -> usize {
        let mut flipped = 0;
        for entry in self.entries.iter_mut().filter(|n| !n.read) {
            entry.read = true;
            flipped += 1;
        }
        flipped
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Places older `stored` entries behind the current ones. Ids already
    /// present are skipped. Returns how many entries were taken over.
    pub fn merge_stored(&mut self, stored: NotificationLedger) -> usize {
        let before = self.entries.len();
        for entry in stored.entries {
            if !self.entries.iter().any(|n| n.id == entry.id) {
                self.entries.push(entry);
            }
        }
        self.entries.len() - before
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| &n.id == id)
    }
}

const TEST_TEMPLATES: [(Severity, &str, &str); 4] = [
    (
        Severity::Info,
        "New Feature Available",
        "Check out our new station finder feature for improved charging experience.",
    ),
    (
        Severity::Warning,
        "Upcoming Maintenance",
        "The charging network will undergo maintenance tonight from 2-4 AM.",
    ),
    (
        Severity::Error,
        "Connection Error",
        "Unable to connect to the charging network. Please try again later.",
    ),
    (
        Severity::Success,
        "Charging Complete",
        "Your vehicle has been successfully charged to 100%.",
    ),
];

/// One of the canned demo notifications, picked uniformly.
pub fn random_test_notification<R: Rng + ?Sized>(rng: &mut R) -> NotificationDraft {
    let (severity, title, message) = TEST_TEMPLATES[rng.gen_range(0..TEST_TEMPLATES.len())];
    NotificationDraft::new(title, message, severity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn draft(title: &str) -> NotificationDraft {
        NotificationDraft::new(title, "body", Severity::Info)
    }

    #[test]
    fn test_add_prepends_unread() {
        let mut ledger = NotificationLedger::default();
        ledger.add_at(draft("first"), NotificationId::new("a"), UnixTimeMs(1));
        ledger.add_at(draft("second"), NotificationId::new("b"), UnixTimeMs(2));

        let titles: Vec<_> = ledger.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["second", "first"]);
        assert!(ledger.iter().all(|n| !n.read));
        assert_eq!(ledger.unread_count(), 2);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut ledger = NotificationLedger::default();
        let a = ledger.add(draft("a")).id.clone();
        let b = ledger.add(draft("b")).id.clone();
        assert_ne!(a, b);
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let mut ledger = NotificationLedger::default();
        let id = NotificationId::new("x");
        ledger.add_at(draft("x"), id.clone(), UnixTimeMs(1));

        assert!(ledger.mark_read(&id));
        let snapshot = ledger.clone();
        assert!(!ledger.mark_read(&id));
        assert_eq!(ledger, snapshot);

        assert!(!ledger.mark_read(&NotificationId::new("missing")));
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_mark_all_read_and_clear() {
        let mut ledger = NotificationLedger::default();
        for i in 0..3 {
            ledger.add_at(draft("n"), NotificationId::new(i.to_string()), UnixTimeMs(i));
        }
        ledger.mark_read(&NotificationId::new("1"));

        assert_eq!(ledger.mark_all_read(), 2);
        assert_eq!(ledger.unread_count(), 0);

        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_merge_stored_keeps_live_entries_first() {
        let mut stored = NotificationLedger::default();
        stored.add_at(draft("old"), NotificationId::new("a"), UnixTimeMs(1));
        stored.add_at(draft("older dup"), NotificationId::new("b"), UnixTimeMs(2));

        let mut live = NotificationLedger::default();
        live.add_at(draft("dup"), NotificationId::new("b"), UnixTimeMs(2));
        live.add_at(draft("alert"), NotificationId::new("c"), UnixTimeMs(3));

        assert_eq!(live.merge_stored(stored), 1);
        let ids: Vec<_> = live.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }

    #[test]
    fn test_serializes_with_legacy_field_names() {
        let mut ledger = NotificationLedger::default();
        ledger.add_at(
            NotificationDraft::new("Low", "msg", Severity::Warning),
            NotificationId::new("id-1"),
            UnixTimeMs(1_700_000_000_000),
        );

        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json[0]["type"], "warning");
        assert_eq!(json[0]["timestamp"], "2023-11-14T22:13:20.000Z");
        assert_eq!(json[0]["read"], false);
    }

    #[test]
    fn test_random_test_notification_uses_templates() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let d = random_test_notification(&mut rng);
            assert!(TEST_TEMPLATES
                .iter()
                .any(|(s, t, m)| *s == d.severity && *t == d.title && *m == d.message));
        }
    }
}
