use log::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorShape {
    #[default]
    Arrow,
    Wait,
}

/// Override-cursor stack for the host window.
///
/// Viewers push `Wait` while they load and pop it when done. The host owns
/// the only instance and resets it whenever a viewer is torn down, so a
/// viewer destroyed mid-load cannot leave the window stuck in the busy state.
#[derive(Debug, Default)]
pub struct CursorState {
    overrides: Vec<CursorShape>,
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_override(&mut self, shape: CursorShape) {
        self.overrides.push(shape);
    }

    pub fn restore_override(&mut self) {
        if self.overrides.pop().is_none() {
            warn!("restore_override called without a matching set_override");
        }
    }

    pub fn shape(&self) -> CursorShape {
        self.overrides.last().copied().unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.shape() == CursorShape::Wait
    }

    pub fn depth(&self) -> usize {
        self.overrides.len()
    }

    pub fn reset(&mut self) {
        self.overrides.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_nest() {
        let mut cursor = CursorState::new();
        assert_eq!(cursor.shape(), CursorShape::Arrow);

        cursor.set_override(CursorShape::Wait);
        cursor.set_override(CursorShape::Arrow);
        assert!(!cursor.is_busy());

        cursor.restore_override();
        assert!(cursor.is_busy());

        cursor.restore_override();
        cursor.restore_override();
        assert_eq!(cursor.depth(), 0);
    }

    #[test]
    fn reset_drops_all_overrides() {
        let mut cursor = CursorState::new();
        cursor.set_override(CursorShape::Wait);
        cursor.set_override(CursorShape::Wait);
        cursor.reset();
        assert!(!cursor.is_busy());
    }
}
