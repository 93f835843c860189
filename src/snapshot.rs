use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::backend::MultiplexerBackend;
use crate::config::Config;
use crate::error::Result;
use crate::models::{PaneRecord, SessionRecord, WindowRecord};

/// Flatten the live registry into snapshot records, in multiplexer order.
pub fn take(backend: &dyn MultiplexerBackend) -> Result<Vec<SessionRecord>> {
    let mut records = Vec::new();
    for name in backend.list_sessions()? {
        let mut windows = Vec::new();
        for window in backend.list_windows(&name)? {
            let panes = backend
                .list_panes(&name, window.index)?
                .into_iter()
                .map(|pane| PaneRecord { cwd: pane.cwd })
                .collect();
            windows.push(WindowRecord {
                name: window.name,
                panes,
            });
        }
        records.push(SessionRecord { name, windows });
    }
    Ok(records)
}

pub fn save(backend: &dyn MultiplexerBackend, path: &Path) -> Result<()> {
    let records = take(backend)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(&records)?)?;
    Ok(())
}

/// Save-on-exit entry point. Returns whether a snapshot was written.
pub fn save_if_enabled(config: &Config, backend: &dyn MultiplexerBackend) -> Result<bool> {
    if !config.session_file_enabled {
        return Ok(false);
    }
    save(backend, &config.session_file)?;
    Ok(true)
}

pub fn load(path: &Path) -> Result<Vec<SessionRecord>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Replay the records against the live multiplexer. Sessions whose name is
/// already live are skipped outright; there is no merging and no rollback,
/// so a failure partway leaves the earlier sessions created. Returns how
/// many sessions were created.
pub fn restore(backend: &dyn MultiplexerBackend, records: &[SessionRecord]) -> Result<usize> {
    let mut created = 0;
    for record in records {
        if backend.session_exists(&record.name)? {
            debug!("session {} already exists, skipping", record.name);
            continue;
        }
        restore_session(backend, record)?;
        created += 1;
    }
    Ok(created)
}

/// Startup restore: a no-op unless session-file saving is on and the file is
/// there. A snapshot that does not parse restores nothing.
pub fn restore_at_startup(config: &Config, backend: &dyn MultiplexerBackend) -> Result<usize> {
    if !config.session_file_enabled || !config.session_file.exists() {
        return Ok(0);
    }
    let records = match load(&config.session_file) {
        Ok(records) => records,
        Err(err) => {
            warn!(
                "snapshot file {} could not be read: {err}",
                config.session_file.display()
            );
            return Ok(0);
        }
    };
    restore(backend, &records)
}

fn restore_session(backend: &dyn MultiplexerBackend, record: &SessionRecord) -> Result<()> {
    let mut windows = record.windows.iter().enumerate();

    match windows.next() {
        Some((_, first)) => {
            backend.create_session_with_window(
                &record.name,
                &first.name,
                Path::new(first_pane_cwd(first)),
            )?;
            restore_extra_panes(backend, &record.name, 0, first)?;
        }
        // A session that was saved with no windows still comes back.
        None => return backend.create_session(&record.name),
    }

    for (index, window) in windows {
        let index = index as u32;
        backend.new_window(
            &record.name,
            index,
            &window.name,
            Path::new(first_pane_cwd(window)),
        )?;
        restore_extra_panes(backend, &record.name, index, window)?;
    }

    Ok(())
}

/// The window's first pane is the one its creation already made; every pane
/// after it is a split.
fn restore_extra_panes(
    backend: &dyn MultiplexerBackend,
    session: &str,
    window_index: u32,
    window: &WindowRecord,
) -> Result<()> {
    for pane in window.panes.iter().skip(1) {
        backend.split_pane(session, window_index, Path::new(&pane.cwd))?;
    }
    backend.set_layout(session, window_index)
}

fn first_pane_cwd(window: &WindowRecord) -> &str {
    window.panes.first().map(|pane| pane.cwd.as_str()).unwrap_or(".")
}

pub fn print_records(records: &[SessionRecord]) {
    for record in records {
        println!("Session: {}", record.name);
        for (index, window) in record.windows.iter().enumerate() {
            println!("  Window {} ({})", index, window.name);
            for pane in &window.panes {
                println!("    Pane: {}", pane.cwd);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{FakeBackend, FakeSession, FakeWindow};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn dev_record() -> SessionRecord {
        SessionRecord {
            name: "dev".to_string(),
            windows: vec![WindowRecord {
                name: "code".to_string(),
                panes: vec![
                    PaneRecord {
                        cwd: "/a".to_string(),
                    },
                    PaneRecord {
                        cwd: "/b".to_string(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn restore_recreates_one_window_with_two_panes_in_order() {
        let fake = FakeBackend::new();
        let created = restore(&fake, &[dev_record()]).unwrap();

        assert_eq!(created, 1);
        assert_eq!(
            fake.state.borrow().sessions,
            vec![FakeSession {
                name: "dev".to_string(),
                windows: vec![FakeWindow {
                    name: "code".to_string(),
                    panes: vec!["/a".to_string(), "/b".to_string()],
                }],
            }]
        );
        assert_eq!(
            fake.state.borrow().layouts_applied,
            vec![("dev".to_string(), 0)]
        );
    }

    #[test]
    fn restore_skips_sessions_that_are_already_live() {
        let fake = FakeBackend::with_sessions(&["dev"]);
        let before = fake.state.borrow().sessions.clone();

        let created = restore(&fake, &[dev_record()]).unwrap();

        assert_eq!(created, 0);
        assert_eq!(fake.state.borrow().sessions, before);
    }

    #[test]
    fn snapshot_then_restore_reconstructs_structure() {
        let source = FakeBackend::new();
        source
            .create_session_with_window("work", "edit", Path::new("/src"))
            .unwrap();
        source.split_pane("work", 0, Path::new("/logs")).unwrap();
        source
            .new_window("work", 1, "repl", Path::new("/tmp"))
            .unwrap();
        source.create_session("scratch").unwrap();

        let records = take(&source).unwrap();

        let target = FakeBackend::new();
        restore(&target, &records).unwrap();

        assert_eq!(take(&target).unwrap(), records);
    }

    #[test]
    fn later_windows_become_new_windows_not_sessions() {
        let fake = FakeBackend::new();
        let record = SessionRecord {
            name: "multi".to_string(),
            windows: vec![
                WindowRecord {
                    name: "one".to_string(),
                    panes: vec![PaneRecord {
                        cwd: "/1".to_string(),
                    }],
                },
                WindowRecord {
                    name: "two".to_string(),
                    panes: vec![PaneRecord {
                        cwd: "/2".to_string(),
                    }],
                },
            ],
        };

        restore(&fake, &[record]).unwrap();

        let state = fake.state.borrow();
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.sessions[0].windows.len(), 2);
        assert_eq!(state.sessions[0].windows[1].name, "two");
        assert_eq!(state.sessions[0].windows[1].panes, vec!["/2".to_string()]);
    }

    #[test]
    fn save_and_load_round_trip_on_disk() {
        let fake = FakeBackend::with_sessions(&["alpha", "beta"]);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sessions.json");

        save(&fake, &path).unwrap();
        let records = load(&path).unwrap();

        assert_eq!(records, take(&fake).unwrap());
    }

    #[test]
    fn save_if_enabled_honors_the_toggle() {
        let fake = FakeBackend::with_sessions(&["alpha"]);
        let dir = TempDir::new().unwrap();
        let mut config = Config::defaults(dir.path().join("config"));

        assert!(!save_if_enabled(&config, &fake).unwrap());
        assert!(!config.session_file.exists());

        config.session_file_enabled = true;
        assert!(save_if_enabled(&config, &fake).unwrap());
        assert!(config.session_file.exists());
    }

    #[test]
    fn startup_restore_ignores_a_corrupt_snapshot() {
        let fake = FakeBackend::new();
        let dir = TempDir::new().unwrap();
        let mut config = Config::defaults(dir.path().join("config"));
        config.session_file_enabled = true;
        std::fs::write(&config.session_file, "not json at all").unwrap();

        let created = restore_at_startup(&config, &fake).unwrap();

        assert_eq!(created, 0);
        assert!(fake.session_names().is_empty());
    }

    #[test]
    fn startup_restore_is_a_noop_when_disabled() {
        let fake = FakeBackend::new();
        let dir = TempDir::new().unwrap();
        let config = Config::defaults(dir.path().join("config"));
        std::fs::write(
            &config.session_file,
            serde_json::to_string(&[dev_record()]).unwrap(),
        )
        .unwrap();

        let created = restore_at_startup(&config, &fake).unwrap();

        assert_eq!(created, 0);
        assert!(fake.session_names().is_empty());
    }
}
