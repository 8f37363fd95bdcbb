/// Monotonically increasing token attached to every asynchronous request.
///
/// A result is applied only if its generation still equals the latest one
/// issued by the owning [`GenerationCounter`]; anything older is stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Issues generations and answers "is this still the latest?".
#[derive(Debug, Default, Clone)]
pub struct GenerationCounter {
    latest: Generation,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new generation; every previously issued one becomes stale.
    pub fn advance(&mut self) -> Generation {
        self.latest = Generation(self.latest.0.wrapping_add(1));
        self.latest
    }

    pub fn latest(&self) -> Generation {
        self.latest
    }

    pub fn is_latest(&self, generation: Generation) -> bool {
        self.latest == generation
    }
}
