/// One toolbar action a viewer contributes to the host window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerAction {
    pub id: &'static str,
    pub label: String,
    pub key: char,
    pub enabled: bool,
}

/// Actions contributed by the active viewer.
///
/// The host clears the toolbar whenever the viewer is torn down, so
/// contributions never outlive the instance that added them.
#[derive(Debug, Default)]
pub struct ToolBar {
    title: Option<String>,
    actions: Vec<ViewerAction>,
}

impl ToolBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Add an action; a later action with the same id replaces the earlier one.
    pub fn add_action(&mut self, id: &'static str, label: impl Into<String>, key: char) {
        let action = ViewerAction {
            id,
            label: label.into(),
            key,
            enabled: true,
        };
        match self.actions.iter_mut().find(|a| a.id == id) {
            Some(existing) => *existing = action,
            None => self.actions.push(action),
        }
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) {
        if let Some(action) = self.actions.iter_mut().find(|a| a.id == id) {
            action.enabled = enabled;
        }
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.actions.iter().any(|a| a.id == id && a.enabled)
    }

    /// Enabled action bound to `key`
    pub fn action_for_key(&self, key: char) -> Option<&ViewerAction> {
        self.actions.iter().find(|a| a.key == key && a.enabled)
    }

    pub fn actions(&self) -> &[ViewerAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.title.is_none()
    }

    pub fn clear(&mut self) {
        self.title = None;
        self.actions.clear();
    }
}
