use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A status-bar message.
///
/// `context` names the operation that produced it ("open", "print", ...),
/// mirroring the type tag viewers attach to their status messages.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub context: Option<String>,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl Notification {
    pub fn new(message: impl Into<String>, level: NotificationLevel, duration: Duration) -> Self {
        let now = Instant::now();
        Self {
            message: message.into(),
            level,
            context: None,
            created_at: now,
            expires_at: now + duration,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn time_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Status side channel shared by the host and its viewer.
///
/// Messages are kept in the order they were produced; the newest one is what
/// the status bar shows.
#[derive(Debug, Default)]
pub struct NotificationManager {
    notifications: Vec<Notification>,
    default_duration: Duration,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::with_default_duration(Duration::from_secs(5))
    }

    pub fn with_default_duration(default_duration: Duration) -> Self {
        Self {
            notifications: Vec::new(),
            default_duration,
        }
    }

    pub fn notify(
        &mut self,
        message: impl Into<String>,
        level: NotificationLevel,
        context: Option<&str>,
    ) {
        let mut notification = Notification::new(message, level, self.default_duration);
        notification.context = context.map(str::to_string);
        self.show(notification);
    }

    pub fn show(&mut self, notification: Notification) {
        log::debug!(
            "status [{:?}] {}: {}",
            notification.level,
            notification.context.as_deref().unwrap_or("-"),
            notification.message
        );
        self.notifications.push(notification);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationLevel::Info, None);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationLevel::Warning, None);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationLevel::Error, None);
    }

    /// Remove expired notifications, returns true if any were removed
    pub fn update(&mut self) -> bool {
        let initial_len = self.notifications.len();
        self.notifications.retain(|n| !n.is_expired());
        self.notifications.len() != initial_len
    }

    /// Most recent notification
    pub fn current(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    /// All live notifications, oldest first
    pub fn all(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn in_context<'a>(&'a self, context: &'a str) -> impl Iterator<Item = &'a Notification> {
        self.notifications
            .iter()
            .filter(move |n| n.context.as_deref() == Some(context))
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
    }

    pub fn dismiss_current(&mut self) -> bool {
        self.notifications.pop().is_some()
    }

    pub fn has_notifications(&self) -> bool {
        !self.notifications.is_empty()
    }

    pub fn count(&self) -> usize {
        self.notifications.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn notification_expiration() {
        let notification =
            Notification::new("test", NotificationLevel::Info, Duration::from_millis(50));
        assert!(!notification.is_expired());

        thread::sleep(Duration::from_millis(60));
        assert!(notification.is_expired());
    }

    #[test]
    fn manager_keeps_production_order() {
        let mut manager = NotificationManager::new();

        manager.info("First");
        manager.warn("Second");
        manager.error("Third");

        assert_eq!(manager.count(), 3);
        let messages: Vec<_> = manager.all().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, ["First", "Second", "Third"]);

        let current = manager.current().unwrap();
        assert_eq!(current.message, "Third");
        assert_eq!(current.level, NotificationLevel::Error);
    }

    #[test]
    fn manager_removes_expired() {
        let mut manager = NotificationManager::with_default_duration(Duration::from_millis(50));

        manager.info("Short-lived");
        assert_eq!(manager.count(), 1);

        thread::sleep(Duration::from_millis(60));
        let changed = manager.update();

        assert!(changed);
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn context_filtering() {
        let mut manager = NotificationManager::new();
        manager.notify("Opened a.txt", NotificationLevel::Info, Some("open"));
        manager.notify("Printing", NotificationLevel::Info, Some("print"));
        manager.info("untagged");

        let open: Vec<_> = manager.in_context("open").collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].message, "Opened a.txt");
    }

    #[test]
    fn dismiss_current_pops_newest() {
        let mut manager = NotificationManager::new();
        manager.info("First");
        manager.info("Second");

        assert!(manager.dismiss_current());
        assert_eq!(manager.current().unwrap().message, "First");
        assert!(manager.dismiss_current());
        assert!(!manager.dismiss_current());
    }
}
