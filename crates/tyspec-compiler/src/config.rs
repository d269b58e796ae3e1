//! Configuration for the inference pass.

/// How the pass reacts to a recoverable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceMode {
    /// Stop at the first error.
    #[default]
    Normal,
    /// Record every error and keep going with the next instruction.
    Silent,
}

/// Tunables for [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    pub mode: InferenceMode,
    /// Fraction of a switch's case span that must be covered before a dense
    /// jump table is built.
    pub switch_table_density: f64,
    /// Instructions listed before and after the failing one.
    pub snippet_context: usize,
    /// Context used instead when `verbose_snippets` is set.
    pub debug_snippet_context: usize,
    pub verbose_snippets: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            mode: InferenceMode::Normal,
            switch_table_density: 0.75,
            snippet_context: 1,
            debug_snippet_context: 8,
            verbose_snippets: false,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: InferenceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `with_mode(InferenceMode::Silent)`.
    pub fn silent(self) -> Self {
        self.with_mode(InferenceMode::Silent)
    }

    pub fn with_switch_table_density(mut self, density: f64) -> Self {
        self.switch_table_density = density;
        self
    }

    pub fn with_snippet_context(mut self, context: usize) -> Self {
        self.snippet_context = context;
        self
    }

    pub fn with_debug_snippet_context(mut self, context: usize) -> Self {
        self.debug_snippet_context = context;
        self
    }

    pub fn with_verbose_snippets(mut self, verbose: bool) -> Self {
        self.verbose_snippets = verbose;
        self
    }

    pub fn is_silent(&self) -> bool {
        self.mode == InferenceMode::Silent
    }

    /// Number of context instructions a snippet shows on each side.
    pub fn context_lines(&self) -> usize {
        if self.verbose_snippets {
            self.debug_snippet_context
        } else {
            self.snippet_context
        }
    }
}
