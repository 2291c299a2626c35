/// Where per-instruction trace lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceTarget {
    #[default]
    Off,
    /// `log::trace!` on target `famicore::trace`.
    Log,
    Stdout,
}

/// Runtime options for a [`crate::Nes`].
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub trace: TraceTarget,
    /// Start here instead of at the reset vector.
    pub entry_point: Option<u16>,
}

impl Config {
    /// nestest's automation mode starts at $C000 instead of the reset vector.
    pub fn nestest() -> Self {
        Config {
            trace: TraceTarget::Off,
            entry_point: Some(0xC000),
        }
    }

    pub fn with_trace(mut self, trace: TraceTarget) -> Self {
        self.trace = trace;
        self
    }
}
