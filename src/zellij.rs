//! Zellij adapter. Two gaps relative to tmux are inherent to the Zellij CLI
//! and surface as degraded behavior rather than being papered over: sessions
//! cannot be renamed from outside, and pane working directories cannot be
//! queried from outside a session, so snapshots taken here record one pane
//! per tab with the home directory as its cwd.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::backend::{self, MultiplexerBackend};
use crate::error::{MuxError, Result};
use crate::models::{PaneInfo, WindowInfo};

pub struct ZellijBackend;

impl ZellijBackend {
    pub fn new() -> Self {
        ZellijBackend
    }

    /// `zellij action` resolves its target from the environment, the same
    /// way it does when invoked from inside a session.
    fn action(&self, session: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new("zellij");
        cmd.env("ZELLIJ_SESSION_NAME", session);
        cmd.arg("action");
        cmd.args(args);
        cmd
    }

    fn home(&self) -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}

fn zellij(args: &[&str]) -> Command {
    let mut cmd = Command::new("zellij");
    cmd.args(args);
    cmd
}

/// Drop `ESC [ ... <final byte>` color sequences from a listing line.
fn strip_ansi(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('[') => {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            Some(_) | None => {}
        }
    }
    out
}

/// `zellij list-sessions` lines look like
/// `dev [Created 2h 3m ago] (current)` with color codes sprinkled in, and
/// dead-but-resurrectable sessions carry an `EXITED` marker. Only the name
/// of a live session survives parsing.
fn parse_session_line(line: &str) -> Option<String> {
    let line = strip_ansi(line);
    let line = line.trim();
    if line.is_empty() || line.contains("EXITED") {
        return None;
    }
    line.split_whitespace().next().map(str::to_string)
}

impl MultiplexerBackend for ZellijBackend {
    fn name(&self) -> &'static str {
        "zellij"
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        let output = backend::capture(&mut zellij(&["list-sessions"]))?;
        if !output.status.success() {
            // "No active zellij sessions found" exits nonzero; treat any
            // listing failure as the empty state, like a stopped server.
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(parse_session_line)
            .collect())
    }

    fn session_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_sessions()?.iter().any(|s| s == name))
    }

    fn create_session(&self, name: &str) -> Result<()> {
        backend::checked(&mut zellij(&["attach", name, "--create-background"]))
    }

    fn create_session_with_window(&self, name: &str, window_name: &str, _cwd: &Path) -> Result<()> {
        // The first tab's cwd cannot be set from outside; only its name can.
        self.create_session(name)?;
        backend::checked(&mut self.action(name, &["rename-tab", window_name]))
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        backend::checked(&mut zellij(&["kill-session", name]))
    }

    fn rename_session(&self, _old: &str, _new: &str) -> Result<()> {
        Err(MuxError::UnsupportedOperation {
            backend: "zellij",
            operation: "renaming sessions",
        })
    }

    fn attach_session(&self, name: &str) -> Result<()> {
        backend::foreground(&mut zellij(&["attach", name]))
    }

    fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>> {
        let output = backend::capture(&mut self.action(session, &["query-tab-names"]))?;
        if !output.status.success() {
            return Err(MuxError::ExternalTool {
                command: format!("zellij action query-tab-names ({session})"),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(strip_ansi)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .enumerate()
            .map(|(index, name)| WindowInfo {
                index: index as u32,
                name,
            })
            .collect())
    }

    fn list_panes(&self, _session: &str, _window_index: u32) -> Result<Vec<PaneInfo>> {
        // No outside-the-session pane query exists; degrade to a single
        // home-directory pane per tab.
        Ok(vec![PaneInfo {
            cwd: self.home().display().to_string(),
        }])
    }

    fn new_window(&self, session: &str, _index: u32, name: &str, cwd: &Path) -> Result<()> {
        let cwd = cwd.display().to_string();
        backend::checked(&mut self.action(session, &["new-tab", "--name", name, "--cwd", &cwd]))
    }

    fn split_pane(&self, session: &str, _window_index: u32, cwd: &Path) -> Result<()> {
        let cwd = cwd.display().to_string();
        backend::checked(&mut self.action(session, &["new-pane", "--cwd", &cwd]))
    }

    fn set_layout(&self, _session: &str, _window_index: u32) -> Result<()> {
        // Zellij tiles new panes on its own.
        Ok(())
    }
}
