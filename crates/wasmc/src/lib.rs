//! Compiles a statically-typed scripting language subset to WebAssembly
//! modules.
//!
//! The crate is organized the way the component design lays it out: a
//! [`ty`] registry and resolver, a [`convert`] engine for numeric
//! conversions, a two-pass [`sema`] pipeline (symbol initializer, body
//! compiler, expression lowerer), and an [`emit`] façade over the actual
//! wasm binary builder. [`ast`] is the contract the (out of scope) front
//! end hands this crate.

pub mod ast;
pub mod convert;
pub mod diag;
pub mod emit;
mod sema;
pub mod ty;

pub use diag::{Diagnostic, DiagnosticBag, Severity};

use emit::ModuleEmitter;

/// Tunables for one compilation. `word_size` selects the wasm integer
/// family `uintptr` (and therefore `Ptr<T>`) belongs to: 4 for the
/// `memory32` model, 8 for `memory64`.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub word_size: u8,
    pub memory_initial_pages: u64,
    pub memory_maximum_pages: Option<u64>,
    pub memory_export_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            word_size: 4,
            memory_initial_pages: 256,
            memory_maximum_pages: None,
            memory_export_name: "memory".to_string(),
        }
    }
}

/// Result of a compilation: the emitted module bytes plus whatever
/// diagnostics the two passes collected. Bytes are still produced even
/// when `diagnostics.has_errors()` is true, with `unreachable`
/// instructions standing in for anything that failed to lower; callers
/// that care about correctness must check `has_errors` themselves.
pub struct CompileOutput {
    pub wasm: Vec<u8>,
    pub diagnostics: DiagnosticBag,
}

/// Compiles `program` into a wasm module per `options`.
///
/// Returns `Err` only for conditions that make emitting any module at
/// all meaningless (an ill-formed `Ptr<T>`, a function with type
/// parameters, an unsupported pointer word size). Everything else is a
/// recoverable [`Diagnostic`] attached to the returned [`CompileOutput`].
///
/// # Example
/// ```no_run
/// use wasmc::{compile, CompileOptions};
/// use wasmc::ast::Program;
///
/// let json = std::fs::read_to_string("program.json").unwrap();
/// let program: Program = serde_json::from_str(&json).unwrap();
/// let out = compile(&program, &CompileOptions::default()).unwrap();
/// std::fs::write("out.wasm", out.wasm).unwrap();
/// ```
pub fn compile(program: &ast::Program, options: &CompileOptions) -> anyhow::Result<CompileOutput> {
    let registry = ty::TypeRegistry::new(options.word_size)?;
    let mut emitter = emit::EncoderEmitter::new();
    emitter.set_memory(
        options.memory_initial_pages,
        options.memory_maximum_pages,
        &options.memory_export_name,
    );

    let diagnostics = sema::compile_module(program, &registry, &mut emitter)?;
    let wasm = emitter.finish();

    Ok(CompileOutput { wasm, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn ty(name: &str) -> TypeNode {
        TypeNode::Name(name.to_string())
    }

    #[test]
    fn empty_program_still_emits_a_valid_header() {
        let program = Program { decls: vec![] };
        let out = compile(&program, &CompileOptions::default()).unwrap();
        assert_eq!(&out.wasm[0..4], b"\0asm");
        assert!(!out.diagnostics.has_errors());
    }

    #[test]
    fn exported_function_round_trips_through_compile() {
        let program = Program {
            decls: vec![TopDecl::Function(FunctionDecl {
                name: "add".into(),
                type_params: vec![],
                params: vec![
                    Param { name: "a".into(), ty: ty("int") },
                    Param { name: "b".into(), ty: ty("int") },
                ],
                return_type: ty("int"),
                modifiers: Modifiers { export: true, import: false, is_static: false },
                body: Some(vec![Stmt::Return {
                    value: Some(Expr::Binary {
                        op: "+".into(),
                        lhs: Box::new(Expr::Ident { name: "a".into() }),
                        rhs: Box::new(Expr::Ident { name: "b".into() }),
                    }),
                }]),
            })],
        };
        let out = compile(&program, &CompileOptions::default()).unwrap();
        assert!(!out.diagnostics.has_errors());
        assert!(out.wasm.len() > 8);
    }

    #[test]
    fn unsupported_ptr_word_size_is_rejected() {
        let program = Program { decls: vec![] };
        let options = CompileOptions { word_size: 6, ..CompileOptions::default() };
        assert!(compile(&program, &options).is_err());
    }
}
