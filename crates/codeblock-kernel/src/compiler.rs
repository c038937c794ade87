//! Compiler collaborator: source text → executable form.
//!
//! The graph compiles a block's source when it is saved and stores the result
//! next to the text. It never runs the result. The default implementation
//! parses Rhai into an AST under the same safety limits the script engine
//! uses; nothing is evaluated.

use std::any::Any;
use std::sync::Arc;

use rhai::{AST, Engine};

use codeblock_types::Executable;

/// Turns code-block source into an executable handle.
pub trait CodeCompiler: Send + Sync {
    /// Compile `source`. The error string is surfaced to the caller verbatim.
    fn compile(&self, source: &str) -> Result<Arc<dyn Executable>, String>;
}

/// A parsed Rhai script.
#[derive(Debug)]
pub struct RhaiExecutable {
    ast: AST,
}

impl RhaiExecutable {
    pub fn ast(&self) -> &AST {
        &self.ast
    }
}

impl Executable for RhaiExecutable {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Rhai-backed [`CodeCompiler`].
pub struct RhaiCompiler {
    engine: Engine,
}

impl Default for RhaiCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiCompiler {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);
        engine.set_max_modules(10);
        engine.set_max_string_size(1_000_000);
        engine.set_max_array_size(10_000);
        engine.set_max_map_size(10_000);
        Self { engine }
    }
}

impl CodeCompiler for RhaiCompiler {
    fn compile(&self, source: &str) -> Result<Arc<dyn Executable>, String> {
        let ast = self.engine.compile(source).map_err(|e| e.to_string())?;
        Ok(Arc::new(RhaiExecutable { ast }))
    }
}

impl std::fmt::Debug for RhaiCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiCompiler").finish_non_exhaustive()
    }
}
