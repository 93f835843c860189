use serde::{Deserialize, Serialize};

/// Structural copy of a live session as written to the snapshot file.
/// Only the hierarchy and pane working directories are captured; whatever
/// was running inside the panes is gone once the multiplexer exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub name: String,
    pub windows: Vec<WindowRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub name: String,
    pub panes: Vec<PaneRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneRecord {
    pub cwd: String,
}

/// A window as reported by the live multiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub index: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneInfo {
    pub cwd: String,
}
