use crate::cursor::{CursorShape, CursorState};
use crate::notification::{NotificationLevel, NotificationManager};

use super::toolbar::ToolBar;

/// The part of the host window a viewer is allowed to touch.
///
/// Passed into every contract call instead of being stored by the viewer, so
/// a viewer can never outlive or reach past the host that created it. The
/// only permitted side effects are status messages, toolbar contributions
/// and the override cursor.
pub struct HostContext<'a> {
    notifications: &'a mut NotificationManager,
    toolbar: &'a mut ToolBar,
    cursor: &'a mut CursorState,
}

impl<'a> HostContext<'a> {
    pub fn new(
        notifications: &'a mut NotificationManager,
        toolbar: &'a mut ToolBar,
        cursor: &'a mut CursorState,
    ) -> Self {
        Self {
            notifications,
            toolbar,
            cursor,
        }
    }

    pub fn status_message(&mut self, message: impl Into<String>, context: &str) {
        self.notifications
            .notify(message, NotificationLevel::Info, Some(context));
    }

    pub fn status_warning(&mut self, message: impl Into<String>, context: &str) {
        self.notifications
            .notify(message, NotificationLevel::Warning, Some(context));
    }

    pub fn status_error(&mut self, message: impl Into<String>, context: &str) {
        self.notifications
            .notify(message, NotificationLevel::Error, Some(context));
    }

    pub fn toolbar(&mut self) -> &mut ToolBar {
        self.toolbar
    }

    pub fn set_override_cursor(&mut self, shape: CursorShape) {
        self.cursor.set_override(shape);
    }

    pub fn restore_override_cursor(&mut self) {
        self.cursor.restore_override();
    }
}
