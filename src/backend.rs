use std::io;
use std::path::Path;
use std::process::{Command, Output};

use crate::error::{MuxError, Result};
use crate::models::{PaneInfo, WindowInfo};

/// Narrow boundary around the multiplexer CLI. All output scraping (field
/// splitting, ANSI stripping) lives inside the adapter implementing this
/// trait, never in the callers.
pub trait MultiplexerBackend {
    fn name(&self) -> &'static str;

    /// Live session names in the multiplexer's own order. An empty list is a
    /// normal state (no server running), not an error.
    fn list_sessions(&self) -> Result<Vec<String>>;

    fn session_exists(&self, name: &str) -> Result<bool>;

    /// Create a detached session with the multiplexer's default first window.
    fn create_session(&self, name: &str) -> Result<()>;

    /// Create a detached session whose first window carries the given name
    /// and working directory. Used when replaying a snapshot.
    fn create_session_with_window(&self, name: &str, window_name: &str, cwd: &Path) -> Result<()>;

    fn kill_session(&self, name: &str) -> Result<()>;

    fn rename_session(&self, old: &str, new: &str) -> Result<()>;

    /// Blocking foreground handoff: the child inherits the terminal and this
    /// call returns only once the user detaches or the multiplexer exits.
    fn attach_session(&self, name: &str) -> Result<()>;

    fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>>;

    fn list_panes(&self, session: &str, window_index: u32) -> Result<Vec<PaneInfo>>;

    fn new_window(&self, session: &str, index: u32, name: &str, cwd: &Path) -> Result<()>;

    fn split_pane(&self, session: &str, window_index: u32, cwd: &Path) -> Result<()>;

    /// Apply a tiled layout to the window after all its panes exist.
    fn set_layout(&self, session: &str, window_index: u32) -> Result<()>;
}

pub(crate) fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn spawn_error(cmd: &Command, err: &io::Error) -> MuxError {
    let detail = if err.kind() == io::ErrorKind::NotFound {
        format!("{} is not installed", cmd.get_program().to_string_lossy())
    } else {
        err.to_string()
    };
    MuxError::ExternalTool {
        command: describe(cmd),
        detail,
    }
}

/// Run to completion, capturing output. A nonzero exit is left for the
/// caller to interpret; only a failure to launch is an error here.
pub(crate) fn capture(cmd: &mut Command) -> Result<Output> {
    tracing::debug!("running `{}`", describe(cmd));
    cmd.output().map_err(|err| spawn_error(cmd, &err))
}

/// Run to completion and require a zero exit status.
pub(crate) fn checked(cmd: &mut Command) -> Result<()> {
    let output = capture(cmd)?;
    if !output.status.success() {
        return Err(MuxError::ExternalTool {
            command: describe(cmd),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Hand the terminal to the child and block until it exits. Used for attach,
/// where the multiplexer takes over the screen.
pub(crate) fn foreground(cmd: &mut Command) -> Result<()> {
    tracing::debug!("handing terminal to `{}`", describe(cmd));
    let mut child = cmd.spawn().map_err(|err| spawn_error(cmd, &err))?;
    let status = child.wait()?;
    if !status.success() {
        return Err(MuxError::ExternalTool {
            command: describe(cmd),
            detail: format!("exited with {status}"),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory backend for tests. Keeps a live-session model behind an
    //! `Rc<RefCell<..>>` handle so tests can inspect state after handing the
    //! backend to a registry or menu.

    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct FakeWindow {
        pub name: String,
        pub panes: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct FakeSession {
        pub name: String,
        pub windows: Vec<FakeWindow>,
    }

    #[derive(Debug, Default)]
    pub(crate) struct FakeState {
        pub sessions: Vec<FakeSession>,
        pub attached: Vec<String>,
        pub layouts_applied: Vec<(String, u32)>,
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeBackend {
        pub state: Rc<RefCell<FakeState>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// One window named "shell" with a single home pane per session.
        pub fn with_sessions(names: &[&str]) -> Self {
            let backend = Self::new();
            for name in names {
                backend.state.borrow_mut().sessions.push(FakeSession {
                    name: (*name).to_string(),
                    windows: vec![FakeWindow {
                        name: "shell".to_string(),
                        panes: vec!["/home".to_string()],
                    }],
                });
            }
            backend
        }

        pub fn session_names(&self) -> Vec<String> {
            self.state
                .borrow()
                .sessions
                .iter()
                .map(|s| s.name.clone())
                .collect()
        }

        fn with_session<T>(
            &self,
            name: &str,
            f: impl FnOnce(&mut FakeSession) -> Result<T>,
        ) -> Result<T> {
            let mut state = self.state.borrow_mut();
            match state.sessions.iter_mut().find(|s| s.name == name) {
                Some(session) => f(session),
                None => Err(MuxError::ExternalTool {
                    command: format!("fake {name}"),
                    detail: "no such session".to_string(),
                }),
            }
        }
    }

    impl MultiplexerBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn list_sessions(&self) -> Result<Vec<String>> {
            Ok(self.session_names())
        }

        fn session_exists(&self, name: &str) -> Result<bool> {
            Ok(self.session_names().iter().any(|s| s == name))
        }

        fn create_session(&self, name: &str) -> Result<()> {
            self.state.borrow_mut().sessions.push(FakeSession {
                name: name.to_string(),
                windows: vec![FakeWindow {
                    name: "shell".to_string(),
                    panes: vec!["/home".to_string()],
                }],
            });
            Ok(())
        }

        fn create_session_with_window(
            &self,
            name: &str,
            window_name: &str,
            cwd: &Path,
        ) -> Result<()> {
            self.state.borrow_mut().sessions.push(FakeSession {
                name: name.to_string(),
                windows: vec![FakeWindow {
                    name: window_name.to_string(),
                    panes: vec![cwd.display().to_string()],
                }],
            });
            Ok(())
        }

        fn kill_session(&self, name: &str) -> Result<()> {
            let mut state = self.state.borrow_mut();
            let before = state.sessions.len();
            state.sessions.retain(|s| s.name != name);
            if state.sessions.len() == before {
                return Err(MuxError::ExternalTool {
                    command: format!("fake kill-session {name}"),
                    detail: "no such session".to_string(),
                });
            }
            Ok(())
        }

        fn rename_session(&self, old: &str, new: &str) -> Result<()> {
            self.with_session(old, |session| {
                session.name = new.to_string();
                Ok(())
            })
        }

        fn attach_session(&self, name: &str) -> Result<()> {
            if !self.session_exists(name)? {
                return Err(MuxError::ExternalTool {
                    command: format!("fake attach {name}"),
                    detail: "no such session".to_string(),
                });
            }
            self.state.borrow_mut().attached.push(name.to_string());
            Ok(())
        }

        fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>> {
            self.with_session(session, |session| {
                Ok(session
                    .windows
                    .iter()
                    .enumerate()
                    .map(|(index, window)| WindowInfo {
                        index: index as u32,
                        name: window.name.clone(),
                    })
                    .collect())
            })
        }

        fn list_panes(&self, session: &str, window_index: u32) -> Result<Vec<PaneInfo>> {
            let command = format!("fake list-panes {session}:{window_index}");
            self.with_session(session, |session| {
                let window = session.windows.get(window_index as usize).ok_or_else(|| {
                    MuxError::ExternalTool {
                        command,
                        detail: "no such window".to_string(),
                    }
                })?;
                Ok(window
                    .panes
                    .iter()
                    .map(|cwd| PaneInfo { cwd: cwd.clone() })
                    .collect())
            })
        }

        fn new_window(&self, session: &str, _index: u32, name: &str, cwd: &Path) -> Result<()> {
            self.with_session(session, |session| {
                session.windows.push(FakeWindow {
                    name: name.to_string(),
                    panes: vec![cwd.display().to_string()],
                });
                Ok(())
            })
        }

        fn split_pane(&self, session: &str, window_index: u32, cwd: &Path) -> Result<()> {
            let command = format!("fake split-pane {session}:{window_index}");
            self.with_session(session, |session| {
                let window = session
                    .windows
                    .get_mut(window_index as usize)
                    .ok_or_else(|| MuxError::ExternalTool {
                        command,
                        detail: "no such window".to_string(),
                    })?;
                window.panes.push(cwd.display().to_string());
                Ok(())
            })
        }

        fn set_layout(&self, session: &str, window_index: u32) -> Result<()> {
            self.state
                .borrow_mut()
                .layouts_applied
                .push((session.to_string(), window_index));
            Ok(())
        }
    }
}
