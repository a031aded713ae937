//! Account gating for connection operations.

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the user's account is open. Every orchestrator entry point
/// consults the gate before touching state.
pub trait AccountGate: Send + Sync {
    fn is_open(&self) -> bool;
}

/// Gate for deployments without accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl AccountGate for AlwaysOpen {
    fn is_open(&self) -> bool {
        true
    }
}

/// Gate toggled by the account service.
#[derive(Debug, Default)]
pub struct AccountState {
    open: AtomicBool,
}

impl AccountState {
    pub fn new(open: bool) -> Self {
        Self {
            open: AtomicBool::new(open),
        }
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl AccountGate for AccountState {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
