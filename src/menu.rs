use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::config::Config;
use crate::registry::Registry;
use crate::snapshot;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuState {
    Main,
    Config,
    Exit,
}

/// Closed set of main-menu actions. Bare numbers attach by position, the
/// rest are single letters; anything else is rejected before any data is
/// touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    AttachIndex(usize),
    Create,
    Attach,
    Delete,
    Rename,
    Snapshot,
    Config,
    Quit,
}

pub(crate) fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    if let Ok(index) = input.parse::<usize>() {
        return Some(Command::AttachIndex(index));
    }
    match input {
        "n" | "N" => Some(Command::Create),
        "a" | "A" => Some(Command::Attach),
        "d" | "D" => Some(Command::Delete),
        "r" | "R" => Some(Command::Rename),
        "s" | "S" => Some(Command::Snapshot),
        "c" | "C" => Some(Command::Config),
        "q" | "Q" => Some(Command::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConfigCommand {
    ToggleSessionFile,
    ToggleAttachAfterCreation,
    Back,
}

pub(crate) fn parse_config_command(input: &str) -> Option<ConfigCommand> {
    match input.trim() {
        "1" => Some(ConfigCommand::ToggleSessionFile),
        "2" => Some(ConfigCommand::ToggleAttachAfterCreation),
        "b" | "B" => Some(ConfigCommand::Back),
        _ => None,
    }
}

pub struct Menu {
    config: Config,
    registry: Registry,
}

impl Menu {
    pub fn new(config: Config, registry: Registry) -> Self {
        Menu { config, registry }
    }

    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();
        self.run_with(&mut input, &mut out)
    }

    fn run_with(&mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> io::Result<()> {
        let mut state = MenuState::Main;
        let mut notice: Option<String> = None;

        loop {
            state = match state {
                MenuState::Main => self.main_menu(input, out, &mut notice)?,
                MenuState::Config => self.config_menu(input, out, &mut notice)?,
                MenuState::Exit => break,
            };
        }

        // Save-on-exit is the one snapshot the user does not ask for by hand.
        match snapshot::save_if_enabled(&self.config, self.registry.backend()) {
            Ok(true) => writeln!(
                out,
                "Session snapshot saved to: {}",
                self.config.session_file.display()
            )?,
            Ok(false) => {}
            Err(err) => writeln!(out, "{}", format!("could not save snapshot: {err}").red())?,
        }
        Ok(())
    }

    fn main_menu(
        &mut self,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
        notice: &mut Option<String>,
    ) -> io::Result<MenuState> {
        let listing = match self.registry.list() {
            Ok(listing) => listing.to_vec(),
            Err(err) => {
                *notice = Some(err.to_string());
                Vec::new()
            }
        };

        write!(out, "{CLEAR_SCREEN}")?;
        writeln!(
            out,
            "{} ({})",
            "muxman".bold(),
            self.registry.backend().name()
        )?;
        writeln!(out)?;
        if listing.is_empty() {
            writeln!(out, "  (no sessions)")?;
        } else {
            for (position, name) in listing.iter().enumerate() {
                writeln!(out, "  {}) {}", position + 1, name)?;
            }
        }
        writeln!(out)?;
        writeln!(
            out,
            "  [number] attach   n) new   a) attach   d) delete   r) rename"
        )?;
        writeln!(out, "  s) save snapshot   c) config   q) quit")?;
        if let Some(text) = notice.take() {
            writeln!(out)?;
            writeln!(out, "  {}", text.yellow())?;
        }

        let Some(line) = prompt(input, out, "> ")? else {
            return Ok(MenuState::Exit);
        };

        let Some(command) = parse_command(&line) else {
            *notice = Some(format!("invalid option: {}", line.trim()));
            return Ok(MenuState::Main);
        };

        self.dispatch(command, input, out, notice)
    }

    fn dispatch(
        &mut self,
        command: Command,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
        notice: &mut Option<String>,
    ) -> io::Result<MenuState> {
        match command {
            Command::Quit => return Ok(MenuState::Exit),
            Command::Config => return Ok(MenuState::Config),
            Command::AttachIndex(index) => {
                let identifier = index.to_string();
                let result = self.registry.attach(&identifier);
                report(notice, result.map(|name| format!("detached from {name}")));
            }
            Command::Attach => {
                if let Some(identifier) = ask(input, out, "session (number or name): ")? {
                    let result = self.registry.attach(&identifier);
                    report(notice, result.map(|name| format!("detached from {name}")));
                } else {
                    *notice = Some("cancelled".to_string());
                }
            }
            Command::Create => {
                if let Some(name) = ask(input, out, "new session name: ")? {
                    let attach_after = self.config.attach_after_creation;
                    let result = self
                        .registry
                        .create(&name, attach_after)
                        .map(|()| format!("created {name}"));
                    report(notice, result);
                } else {
                    *notice = Some("cancelled".to_string());
                }
            }
            Command::Delete => {
                if let Some(identifier) = ask(input, out, "delete (number or name): ")? {
                    let result = self
                        .registry
                        .delete(&identifier)
                        .map(|name| format!("deleted {name}"));
                    report(notice, result);
                } else {
                    *notice = Some("cancelled".to_string());
                }
            }
            Command::Rename => {
                let Some(identifier) = ask(input, out, "rename (number or name): ")? else {
                    *notice = Some("cancelled".to_string());
                    return Ok(MenuState::Main);
                };
                let Some(new_name) = ask(input, out, "new name: ")? else {
                    *notice = Some("cancelled".to_string());
                    return Ok(MenuState::Main);
                };
                let result = self
                    .registry
                    .rename(&identifier, &new_name)
                    .map(|old| format!("renamed {old} to {new_name}"));
                report(notice, result);
            }
            Command::Snapshot => {
                let result = snapshot::save(self.registry.backend(), &self.config.session_file)
                    .map(|()| format!("snapshot saved to {}", self.config.session_file.display()));
                report(notice, result);
            }
        }
        Ok(MenuState::Main)
    }

    fn config_menu(
        &mut self,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
        notice: &mut Option<String>,
    ) -> io::Result<MenuState> {
        write!(out, "{CLEAR_SCREEN}")?;
        writeln!(out, "{}", "muxman config".bold())?;
        writeln!(out)?;
        writeln!(
            out,
            "  1) save session file on exit: {}",
            on_off(self.config.session_file_enabled)
        )?;
        writeln!(
            out,
            "  2) attach after creation:     {}",
            on_off(self.config.attach_after_creation)
        )?;
        writeln!(out)?;
        writeln!(out, "  session file: {}", self.config.session_file.display())?;
        writeln!(out, "  config file:  {}", self.config.config_file.display())?;
        writeln!(out)?;
        writeln!(out, "  b) back")?;
        if let Some(text) = notice.take() {
            writeln!(out)?;
            writeln!(out, "  {}", text.yellow())?;
        }

        let Some(line) = prompt(input, out, "> ")? else {
            return Ok(MenuState::Exit);
        };

        match parse_config_command(&line) {
            Some(ConfigCommand::ToggleSessionFile) => {
                if let Err(err) = self.config.toggle_session_file() {
                    *notice = Some(format!("config not saved: {err}"));
                }
            }
            Some(ConfigCommand::ToggleAttachAfterCreation) => {
                if let Err(err) = self.config.toggle_attach_after_creation() {
                    *notice = Some(format!("config not saved: {err}"));
                }
            }
            Some(ConfigCommand::Back) => return Ok(MenuState::Main),
            None => *notice = Some(format!("invalid option: {}", line.trim())),
        }
        Ok(MenuState::Config)
    }
}

fn report(notice: &mut Option<String>, result: crate::error::Result<String>) {
    *notice = Some(match result {
        Ok(message) => message,
        Err(err) => err.to_string(),
    });
}

fn on_off(value: bool) -> String {
    if value {
        "on".green().to_string()
    } else {
        "off".red().to_string()
    }
}

/// One blocking line read. `None` means end of input, which ends the loop
/// the same way quitting does.
fn prompt(input: &mut dyn BufRead, out: &mut dyn Write, label: &str) -> io::Result<Option<String>> {
    write!(out, "{label}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Prompt for an argument; an empty reply cancels the action.
fn ask(input: &mut dyn BufRead, out: &mut dyn Write, label: &str) -> io::Result<Option<String>> {
    match prompt(input, out, label)? {
        Some(line) => {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        None => Ok(None),
    }
}
