//! Module emitter façade (component G).
//!
//! Thin contract over the external wasm module builder. The conversion
//! engine and expression lowerer never touch a concrete builder type;
//! they only push instructions onto a [`FuncBody`], which stands in for
//! the "opaque expression handle" the original design hands those passes
//! — Wasm's stack machine means postorder instruction emission already
//! encodes the expression tree, so no separate handle type is needed.

pub mod encoder;

use wasm_encoder::{Instruction, ValType};

pub use encoder::EncoderEmitter;

/// Handle into the module's type section, deduplicated by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureHandle(pub u32);

/// Handle into the module's function index space (imports first, then
/// locally defined functions, matching wasm's own indexing rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionHandle(pub u32);

/// One function body under construction.
pub struct FuncBody {
    instrs: Vec<Instruction<'static>>,
}

impl FuncBody {
    pub fn new() -> Self {
        Self { instrs: Vec::new() }
    }

    pub fn push(&mut self, instr: Instruction<'static>) {
        self.instrs.push(instr);
    }

    pub fn instructions(&self) -> &[Instruction<'static>] {
        &self.instrs
    }
}

impl Default for FuncBody {
    fn default() -> Self {
        Self::new()
    }
}

/// Thin contract over the external wasm module builder.
pub trait ModuleEmitter {
    /// Declares the module's single linear memory, exported under
    /// `export_name`.
    fn set_memory(&mut self, initial_pages: u64, maximum_pages: Option<u64>, export_name: &str);

    /// Registers a function type, deduplicated by `key`. Calling this
    /// twice with the same key returns the same handle.
    fn add_function_type(&mut self, key: &str, params: &[ValType], result: Option<ValType>) -> SignatureHandle;

    /// Adds a locally defined function body, returning its handle in the
    /// module's function index space. Must be called after every import
    /// has already been registered via [`add_import`](Self::add_import).
    fn add_function(
        &mut self,
        name: &str,
        sig: SignatureHandle,
        extra_locals: &[ValType],
        body: FuncBody,
    ) -> FunctionHandle;

    /// Registers an imported function, returning its handle in the
    /// module's function index space.
    fn add_import(&mut self, module: &str, field: &str, sig: SignatureHandle) -> FunctionHandle;

    /// Exports a function under `external_name`.
    fn add_export(&mut self, func: FunctionHandle, external_name: &str);

    /// Marks `func` as the module's start function.
    fn set_start(&mut self, func: FunctionHandle);

    /// Serializes the accumulated module to its binary representation.
    fn finish(self) -> Vec<u8>;
}
