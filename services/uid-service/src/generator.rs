//! External id synthesis.

use rand::distr::Alphanumeric;
use rand::Rng;
use uid_core::Segment;

/// Produces external ids for Surrogates generated without one.
pub trait ExternalIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random alphanumeric ids of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    /// The length is clamped to what the `eid` segment accepts.
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(Segment::EID.minimum, Segment::EID.maximum),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new(Segment::EID.maximum)
    }
}

impl ExternalIdGenerator for RandomGenerator {
    fn generate(&self) -> String {
        rand::rng()
            .sample_iter(Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}
