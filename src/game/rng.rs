//! Random sources for sessions
//!
//! Every session (and every autoplay run) gets its own RNG stream. Nothing is
//! derived from player-observable state.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Boxed RNG owned by a single session
pub type SessionRng = Box<dyn RngCore + Send>;

/// Hands out independent RNG streams
pub trait EntropySource: Send {
    fn stream(&mut self, stream: u64) -> SessionRng;
}

impl<E: EntropySource + ?Sized> EntropySource for Box<E> {
    fn stream(&mut self, stream: u64) -> SessionRng {
        (**self).stream(stream)
    }
}

/// OS-seeded `StdRng` per stream. Use this for real play.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn stream(&mut self, _stream: u64) -> SessionRng {
        Box::new(StdRng::from_os_rng())
    }
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn with_stream(self, stream: u64) -> Self {
        Self { stream, ..self }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream)
    }
}

/// Deterministic PCG streams keyed by stream id, for tests and replay audits
#[derive(Debug, Clone, Copy)]
pub struct SeededEntropy {
    state: RngState,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            state: RngState::new(seed),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn stream(&mut self, stream: u64) -> SessionRng {
        Box::new(self.state.with_stream(stream).to_rng())
    }
}

/// Stream id for a session's hazard draws
pub fn hazard_stream(session_id: u64) -> u64 {
    session_id.wrapping_mul(2)
}

/// Stream id for the autoplay slot picker of a session
pub fn autoplay_stream(session_id: u64) -> u64 {
    session_id.wrapping_mul(2).wrapping_add(1)
}
