//! Parse configuration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::adapter::Adapters;
use crate::location::SourceId;

/// Default limit on region nesting. Fits the 2 MiB stack of a spawned thread
/// in unoptimized builds.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Stack reserved per nesting level by [`stack_size_for`].
const STACK_PER_LEVEL: usize = 32 * 1024;

/// Stack size for a thread that parses with nesting up to `max_depth`.
pub fn stack_size_for(max_depth: usize) -> usize {
    (1usize << 20).saturating_add(max_depth.saturating_mul(STACK_PER_LEVEL))
}

/// Cooperative cancellation signal shared between a caller and a parse.
///
/// The parser polls it at every top-level declaration and region entry and,
/// once set, stops with a partial module and a `Cancelled` diagnostic.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug)]
pub struct ParseOptions<'a> {
    pub source_id: SourceId,
    pub cancellation: Option<CancellationToken>,
    /// Whether deprecated surface forms produce warnings.
    pub deprecation_warnings: bool,
    /// Nesting beyond this many regions stops the parse.
    pub max_depth: usize,
    pub adapters: Adapters<'a>,
}

impl Default for ParseOptions<'static> {
    fn default() -> Self {
        Self {
            source_id: SourceId::new("<input>"),
            cancellation: None,
            deprecation_warnings: true,
            max_depth: DEFAULT_MAX_DEPTH,
            adapters: Adapters::default(),
        }
    }
}

impl<'a> ParseOptions<'a> {
    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = SourceId::new(id);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_deprecation_warnings(mut self, enabled: bool) -> Self {
        self.deprecation_warnings = enabled;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_adapters<'b>(self, adapters: Adapters<'b>) -> ParseOptions<'b> {
        ParseOptions {
            source_id: self.source_id,
            cancellation: self.cancellation,
            deprecation_warnings: self.deprecation_warnings,
            max_depth: self.max_depth,
            adapters,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let options = ParseOptions::default().with_cancellation(token.clone());
        assert!(!options.is_cancelled());
        token.cancel();
        assert!(options.is_cancelled());
    }

    #[test]
    fn test_builder_defaults() {
        let options = ParseOptions::default()
            .with_source_id("a.cir")
            .with_max_depth(4);
        assert_eq!(options.source_id.as_str(), "a.cir");
        assert_eq!(options.max_depth, 4);
        assert!(options.deprecation_warnings);
    }

    #[test]
    fn test_stack_size_grows_with_depth() {
        assert!(stack_size_for(DEFAULT_MAX_DEPTH) >= 2 << 20);
        assert!(stack_size_for(1000) > stack_size_for(DEFAULT_MAX_DEPTH));
        assert_eq!(stack_size_for(usize::MAX), usize::MAX);
    }
}
