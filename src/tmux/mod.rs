mod client;

pub use client::TmuxClient;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::layout::PaneArea;

/// What the picker lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Sessions,
    Windows,
}

/// A session or window that can be previewed and switched to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// tmux id, "$0" for sessions or "@3" for windows
    pub id: String,
    /// Display name, "session" or "session: window"
    pub name: String,
}

impl Target {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A leaf pane of the previewed window together with its captured contents
#[derive(Debug, Clone)]
pub struct PaneCapture {
    pub area: PaneArea,
    /// Output of `capture-pane -e`, SGR escapes included
    pub content: String,
}
