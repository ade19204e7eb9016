use crossterm::event::KeyEvent;

use crate::tmux::{PaneCapture, Target};

/// Actions that can be dispatched through the application
#[derive(Debug, Clone)]
pub enum Action {
    /// A key was pressed
    KeyPress(KeyEvent),
    /// Sessions or windows were listed from tmux
    TargetsUpdated(Vec<Target>),
    /// A target's layout and pane contents were captured
    PreviewLoaded {
        target_id: String,
        panes: Vec<PaneCapture>,
    },
    /// Capturing a target's preview failed
    PreviewFailed { target_id: String, message: String },
    /// An error occurred
    Error(String),
    /// Capture the preview of a target
    LoadPreview(String),
    /// Switch to (or attach) a target and exit
    EnterTarget(String),
}
