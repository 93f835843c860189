use crate::backend::MultiplexerBackend;
use crate::error::{MuxError, Result};

/// Live view over the multiplexer's sessions. The multiplexer is always the
/// source of truth; the only thing held here is the last listing, kept so
/// that 1-based indexes shown to the user can be resolved back to names.
pub struct Registry {
    backend: Box<dyn MultiplexerBackend>,
    last_listing: Vec<String>,
}

impl Registry {
    pub fn new(backend: Box<dyn MultiplexerBackend>) -> Self {
        Registry {
            backend,
            last_listing: Vec::new(),
        }
    }

    pub fn backend(&self) -> &dyn MultiplexerBackend {
        self.backend.as_ref()
    }

    /// Re-query the multiplexer and remember the ordering for later
    /// index-based commands.
    pub fn list(&mut self) -> Result<&[String]> {
        self.last_listing = self.backend.list_sessions()?;
        Ok(&self.last_listing)
    }

    /// A user-supplied identifier is tried as a 1-based index into the last
    /// listing first, then as a literal session name.
    fn resolve(&self, identifier: &str) -> Result<String> {
        let identifier = identifier.trim();
        if let Ok(index) = identifier.parse::<usize>() {
            if index >= 1 && index <= self.last_listing.len() {
                return Ok(self.last_listing[index - 1].clone());
            }
        }
        if self.backend.session_exists(identifier)? {
            return Ok(identifier.to_string());
        }
        Err(MuxError::SessionNotFound(identifier.to_string()))
    }

    pub fn create(&mut self, name: &str, attach_after: bool) -> Result<()> {
        if self.backend.session_exists(name)? {
            return Err(MuxError::DuplicateSession(name.to_string()));
        }
        self.backend.create_session(name)?;
        if attach_after {
            self.backend.attach_session(name)?;
        }
        Ok(())
    }

    pub fn delete(&mut self, identifier: &str) -> Result<String> {
        let name = self.resolve(identifier)?;
        self.backend.kill_session(&name)?;
        Ok(name)
    }

    pub fn rename(&mut self, identifier: &str, new_name: &str) -> Result<String> {
        let name = self.resolve(identifier)?;
        self.backend.rename_session(&name, new_name)?;
        Ok(name)
    }

    pub fn attach(&mut self, identifier: &str) -> Result<String> {
        let name = self.resolve(identifier)?;
        self.backend.attach_session(&name)?;
        Ok(name)
    }
}
