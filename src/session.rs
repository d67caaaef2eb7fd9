//! Session store: independent ledger instances keyed by session id
//!
//! Each session owns exactly one `MockLedger`; sessions share no state. The
//! store is an explicit object owned by whoever serves the sessions.

use chrono::{DateTime, Duration, Utc};
use log::info;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashMap;
use std::fmt;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::{MockLedger, SharedInterpreter};

/// Random 128-bit session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId([u8; 16]);

impl SessionId {
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| LedgerError::SessionNotFound(s.to_string()))?;
        let id: [u8; 16] = bytes
            .try_into()
            .map_err(|_| LedgerError::SessionNotFound(s.to_string()))?;
        Ok(Self(id))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

pub struct Session {
    pub ledger: MockLedger,
    pub created: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

/// Snapshot of session metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub created: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
    interpreter: SharedInterpreter,
    rng: StdRng,
}

impl SessionStore {
    /// Every ledger created by this store dispatches to `interpreter`
    pub fn new(interpreter: SharedInterpreter) -> Self {
        Self {
            sessions: HashMap::new(),
            interpreter,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn create(&mut self, config: LedgerConfig) -> Result<SessionId> {
        let ledger = MockLedger::new(config, self.interpreter.clone())?;
        let mut bytes = [0u8; 16];
        loop {
            self.rng.fill_bytes(&mut bytes);
            if !self.sessions.contains_key(&SessionId(bytes)) {
                break;
            }
        }
        let id = SessionId(bytes);
        let now = Utc::now();
        self.sessions.insert(
            id,
            Session {
                ledger,
                created: now,
                last_access: now,
            },
        );
        info!(target: "session", "created [id={}]", id);
        Ok(id)
    }

    /// The session's ledger, marking the session as accessed
    pub fn get(&mut self, id: &SessionId) -> Result<&MockLedger> {
        Ok(&self.touch(id)?.ledger)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Result<&mut MockLedger> {
        Ok(&mut self.touch(id)?.ledger)
    }

    pub fn info(&self, id: &SessionId) -> Result<SessionInfo> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| LedgerError::SessionNotFound(id.to_string()))?;
        Ok(SessionInfo {
            id: *id,
            created: session.created,
            last_access: session.last_access,
        })
    }

    pub fn delete(&mut self, id: &SessionId) -> Result<()> {
        if self.sessions.remove(id).is_none() {
            return Err(LedgerError::SessionNotFound(id.to_string()));
        }
        info!(target: "session", "deleted [id={}]", id);
        Ok(())
    }

    /// Drop sessions not accessed within `max_idle`; returns the evicted ids
    pub fn expire_idle(&mut self, max_idle: Duration) -> Vec<SessionId> {
        let cutoff = Utc::now() - max_idle;
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.last_access < cutoff)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.sessions.remove(id);
            info!(target: "session", "expired [id={}]", id);
        }
        expired
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn touch(&mut self, id: &SessionId) -> Result<&mut Session> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| LedgerError::SessionNotFound(id.to_string()))?;
        session.last_access = Utc::now();
        Ok(session)
    }
}
