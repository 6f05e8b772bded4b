//! Per-address connection budget.
//!
//! Every accepted socket costs one slot of its source address's budget
//! until it closes. Nothing is persisted; a restart starts from zero.

use std::collections::BTreeMap;
use std::net::IpAddr;

/// Rejection from [`AdmissionControl::try_admit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("too many connections from {0}")]
    ConnectionLimitExceeded(IpAddr),
}

impl AdmissionError {
    /// Stable machine-readable name sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionLimitExceeded(_) => "ConnectionLimitExceeded",
        }
    }

    /// HTTP-style status code.
    pub fn status(&self) -> u16 {
        429
    }
}

/// Counts open connections per source address.
#[derive(Debug)]
pub struct AdmissionControl {
    ceiling: usize,
    per_address: BTreeMap<IpAddr, usize>,
}

impl AdmissionControl {
    /// Allows up to `ceiling` concurrent connections per address.
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            per_address: BTreeMap::new(),
        }
    }

    /// Takes a slot for `addr`, or refuses once it is at the ceiling.
    pub fn try_admit(&mut self, addr: IpAddr) -> Result<(), AdmissionError> {
        let count = self.per_address.entry(addr).or_insert(0);
        if *count >= self.ceiling {
            return Err(AdmissionError::ConnectionLimitExceeded(addr));
        }
        *count += 1;
        Ok(())
    }

    /// Gives back a slot. Releasing an address with no open slots is a
    /// no-op.
    pub fn release(&mut self, addr: IpAddr) {
        if let Some(count) = self.per_address.get_mut(&addr) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.per_address.remove(&addr);
            }
        }
    }

    /// Open connections currently counted against `addr`.
    pub fn open(&self, addr: IpAddr) -> usize {
        self.per_address.get(&addr).copied().unwrap_or(0)
    }
}
