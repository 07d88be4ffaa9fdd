//! Tracer configuration
//!
//! Provides the knobs shared by both trace builders:
//! - Call depth limit used by pre-check synthesis
//! - Whether pre-check synthesis runs at all

/// Maximum call depth of the EVM
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Tracer configuration parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracerConfig {
    /// Depth above which call-like opcodes are rejected
    pub max_call_depth: usize,
    /// Synthesize failed frames for call-like opcodes the engine rejects
    /// before announcing them
    ///
    /// Disable for engines that already report those rejections as
    /// enter/exit pairs (revm does).
    pub synthesize_preflight: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            synthesize_preflight: true,
        }
    }
}

impl TracerConfig {
    /// Configuration for engines that pair aborted calls themselves
    pub fn without_preflight() -> Self {
        Self {
            synthesize_preflight: false,
            ..Default::default()
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}
