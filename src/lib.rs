pub mod cursor;
pub mod document_slot;
pub mod event_source;
pub mod main_app;
pub mod media_type;
pub mod notification;
pub mod panic_handler;
pub mod plugin;
pub mod recent;
pub mod session;
pub mod settings;
pub mod theme;
pub mod viewer;
pub mod viewers;
pub mod widget;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use main_app::{App, AppAction, FocusedPanel, MainPanel, PopupWindow, run_app_with_event_source};
