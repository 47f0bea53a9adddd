// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Provider session phases
//!
//! `NoSharedSecret → Handshaking → Ready`, back to `NoSharedSecret` on
//! clear. A clear requested while a handshake is outstanding is held until
//! the handshake settles, so key material is never wiped underneath it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    NoSharedSecret,
    Handshaking,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearAction {
    /// Caller must wipe key material now
    Now,
    /// Wiped when the outstanding handshake settles
    Deferred,
}

#[derive(Debug, Default)]
pub struct SessionState {
    phase: SessionPhase,
    clear_pending: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn begin_handshake(&mut self) {
        self.phase = SessionPhase::Handshaking;
    }

    /// Settle the handshake; returns true if a deferred clear must run now
    pub fn finish_handshake(&mut self, success: bool) -> bool {
        let clear = std::mem::take(&mut self.clear_pending);
        self.phase = if success && !clear {
            SessionPhase::Ready
        } else {
            SessionPhase::NoSharedSecret
        };
        clear
    }

    pub fn request_clear(&mut self) -> ClearAction {
        if self.phase == SessionPhase::Handshaking {
            self.clear_pending = true;
            return ClearAction::Deferred;
        }
        self.phase = SessionPhase::NoSharedSecret;
        ClearAction::Now
    }

    pub fn clear_pending(&self) -> bool {
        self.clear_pending
    }
}
