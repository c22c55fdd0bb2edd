//! Semantic analysis and code generation, in the two passes described by
//! the component design: `pass1` builds every top-level descriptor and
//! registers its signature; `pass2` compiles bodies against those
//! descriptors. `lower` holds the expression lowerer both passes share
//! indirectly (only `pass2` calls it, for `return` expressions).

mod lower;
mod pass1;
mod pass2;

use std::collections::HashMap;

use crate::ast::Program;
use crate::diag::DiagnosticBag;
use crate::emit::{FunctionHandle, ModuleEmitter, SignatureHandle};
use crate::ty::{PrimitiveType, TypeRegistry};

/// A function or method descriptor produced by pass 1.
pub struct FunctionDescriptor {
    pub mangled_name: String,
    pub params: Vec<PrimitiveType>,
    pub param_names: Vec<String>,
    pub return_type: PrimitiveType,
    pub export: bool,
    pub import: bool,
    pub sig: SignatureHandle,
    pub handle: Option<FunctionHandle>,
    pub body: Option<Vec<crate::ast::Stmt>>,
}

/// An enum member recorded as a named integer constant.
pub struct Constant {
    pub ty: PrimitiveType,
    pub value: i64,
}

/// A single parameter or local variable's assigned wasm local index.
#[derive(Debug, Clone)]
pub struct LocalSlot {
    pub index: u32,
    pub ty: PrimitiveType,
}

/// Maps in-scope names to local slots for one function body.
#[derive(Debug, Default)]
pub struct LocalScope {
    slots: HashMap<String, LocalSlot>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: String, ty: PrimitiveType, index: u32) {
        self.slots.insert(name, LocalSlot { index, ty });
    }

    pub fn get(&self, name: &str) -> Option<&LocalSlot> {
        self.slots.get(name)
    }
}

/// Everything pass 1 produced, consumed by pass 2.
#[derive(Default)]
pub struct SymbolTable {
    pub imports: Vec<FunctionDescriptor>,
    pub locals: Vec<FunctionDescriptor>,
    pub constants: HashMap<String, Constant>,
}

/// Runs both passes against `program`, emitting into `emitter`.
///
/// Returns the accumulated diagnostics. Emission still proceeds on
/// recoverable errors so that callers see the complete diagnostic set;
/// it is the caller's job to check [`DiagnosticBag::has_errors`] before
/// trusting the emitted bytes.
pub fn compile_module(
    program: &Program,
    registry: &TypeRegistry,
    emitter: &mut impl ModuleEmitter,
) -> anyhow::Result<DiagnosticBag> {
    let mut diags = DiagnosticBag::new();
    let mut table = pass1::run(program, registry, emitter, &mut diags)?;
    pass2::run(&mut table, registry, emitter, &mut diags)?;
    Ok(diags)
}
