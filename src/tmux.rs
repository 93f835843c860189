use std::path::Path;
use std::process::Command;

use crate::backend::{self, MultiplexerBackend};
use crate::error::{MuxError, Result};
use crate::models::{PaneInfo, WindowInfo};

const LIST_SESSIONS_FORMAT: &str = "#{session_name}";
const LIST_WINDOWS_FORMAT: &str = "#{window_index}\t#{window_name}";
const LIST_PANES_FORMAT: &str = "#{pane_current_path}";

pub struct TmuxBackend;

impl TmuxBackend {
    pub fn new() -> Self {
        TmuxBackend
    }

    fn is_inside_tmux(&self) -> bool {
        std::env::var("TMUX").is_ok()
    }
}

fn tmux(args: &[&str]) -> Command {
    let mut cmd = Command::new("tmux");
    cmd.args(args);
    cmd
}

fn scrape_error(command: String, stderr: &[u8]) -> MuxError {
    MuxError::ExternalTool {
        command,
        detail: String::from_utf8_lossy(stderr).trim().to_string(),
    }
}

fn parse_window_line(line: &str) -> Option<WindowInfo> {
    let (index, name) = line.split_once('\t')?;
    Some(WindowInfo {
        index: index.parse().ok()?,
        name: name.to_string(),
    })
}

impl MultiplexerBackend for TmuxBackend {
    fn name(&self) -> &'static str {
        "tmux"
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        let output = backend::capture(&mut tmux(&["list-sessions", "-F", LIST_SESSIONS_FORMAT]))?;
        if !output.status.success() {
            // tmux exits nonzero when no server is running, which is simply
            // the empty state.
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn session_exists(&self, name: &str) -> Result<bool> {
        let output = backend::capture(&mut tmux(&["has-session", "-t", name]))?;
        Ok(output.status.success())
    }

    fn create_session(&self, name: &str) -> Result<()> {
        backend::checked(&mut tmux(&["new-session", "-d", "-s", name]))
    }

    fn create_session_with_window(&self, name: &str, window_name: &str, cwd: &Path) -> Result<()> {
        let cwd = cwd.display().to_string();
        backend::checked(&mut tmux(&[
            "new-session",
            "-d",
            "-s",
            name,
            "-n",
            window_name,
            "-c",
            &cwd,
        ]))
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        backend::checked(&mut tmux(&["kill-session", "-t", name]))
    }

    fn rename_session(&self, old: &str, new: &str) -> Result<()> {
        backend::checked(&mut tmux(&["rename-session", "-t", old, new]))
    }

    fn attach_session(&self, name: &str) -> Result<()> {
        // tmux refuses nested clients; from inside a session the attach
        // degrades to a client switch.
        if self.is_inside_tmux() {
            backend::checked(&mut tmux(&["switch-client", "-t", name]))
        } else {
            backend::foreground(&mut tmux(&["attach-session", "-t", name]))
        }
    }

    fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>> {
        let output = backend::capture(&mut tmux(&[
            "list-windows",
            "-t",
            session,
            "-F",
            LIST_WINDOWS_FORMAT,
        ]))?;
        if !output.status.success() {
            return Err(scrape_error(
                format!("tmux list-windows -t {session}"),
                &output.stderr,
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(parse_window_line)
            .collect())
    }

    fn list_panes(&self, session: &str, window_index: u32) -> Result<Vec<PaneInfo>> {
        let target = format!("{session}:{window_index}");
        let output = backend::capture(&mut tmux(&[
            "list-panes",
            "-t",
            &target,
            "-F",
            LIST_PANES_FORMAT,
        ]))?;
        if !output.status.success() {
            return Err(scrape_error(
                format!("tmux list-panes -t {target}"),
                &output.stderr,
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| PaneInfo {
                cwd: line.to_string(),
            })
            .collect())
    }

    fn new_window(&self, session: &str, index: u32, name: &str, cwd: &Path) -> Result<()> {
        let target = format!("{session}:{index}");
        let cwd = cwd.display().to_string();
        backend::checked(&mut tmux(&[
            "new-window", "-t", &target, "-n", name, "-c", &cwd,
        ]))
    }

    fn split_pane(&self, session: &str, window_index: u32, cwd: &Path) -> Result<()> {
        let target = format!("{session}:{window_index}");
        let cwd = cwd.display().to_string();
        backend::checked(&mut tmux(&["split-window", "-t", &target, "-c", &cwd]))
    }

    fn set_layout(&self, session: &str, window_index: u32) -> Result<()> {
        let target = format!("{session}:{window_index}");
        backend::checked(&mut tmux(&["select-layout", "-t", &target, "tiled"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_line_splits_index_and_name() {
        let window = parse_window_line("2\teditor").unwrap();
        assert_eq!(window.index, 2);
        assert_eq!(window.name, "editor");
    }

    #[test]
    fn window_name_may_contain_spaces() {
        let window = parse_window_line("0\tgit status").unwrap();
        assert_eq!(window.index, 0);
        assert_eq!(window.name, "git status");
    }

    #[test]
    fn malformed_window_lines_are_dropped() {
        assert!(parse_window_line("").is_none());
        assert!(parse_window_line("no-tab-here").is_none());
        assert!(parse_window_line("x\teditor").is_none());
    }
}
