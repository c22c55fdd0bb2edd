//! Body compiler (component E).
//!
//! Compiles every local function's (and method's) statement list into a
//! wasm function body, assigning parameters to local slots and wiring
//! `return` expressions through the conversion engine to the declared
//! return type. Import descriptors are fully handled by pass 1 and are
//! skipped here since they carry no body.

use wasm_encoder::Instruction;

use super::lower::lower_expr;
use super::{LocalScope, SymbolTable};
use crate::ast::Stmt;
use crate::convert::convert;
use crate::diag::DiagnosticBag;
use crate::emit::{FuncBody, ModuleEmitter};
use crate::ty::{PrimitiveType, TypeRegistry};

pub fn run(
    table: &mut SymbolTable,
    registry: &TypeRegistry,
    emitter: &mut impl ModuleEmitter,
    diags: &mut DiagnosticBag,
) -> anyhow::Result<()> {
    for desc in &mut table.locals {
        let mut scope = LocalScope::new();
        for (i, ty) in desc.params.iter().enumerate() {
            scope.declare(desc.param_names[i].clone(), ty.clone(), i as u32);
        }

        let stmts = desc
            .body
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("function `{}` has no body", desc.mangled_name))?;

        let mut body = FuncBody::new();
        for stmt in stmts {
            compile_stmt(stmt, &mut body, registry, &scope, &desc.return_type, &table.constants, diags);
        }

        let handle = emitter.add_function(&desc.mangled_name, desc.sig, &[], body);
        desc.handle = Some(handle);
        if desc.export {
            emitter.add_export(handle, &desc.mangled_name);
        }
        if desc.mangled_name == "start" {
            emitter.set_start(handle);
        }
    }
    Ok(())
}

fn compile_stmt(
    stmt: &Stmt,
    body: &mut FuncBody,
    registry: &TypeRegistry,
    scope: &LocalScope,
    return_type: &PrimitiveType,
    constants: &std::collections::HashMap<String, super::Constant>,
    diags: &mut DiagnosticBag,
) {
    match stmt {
        Stmt::Return { value } => match (return_type.is_void(), value) {
            (true, Some(_)) => {
                diags.error("a void function cannot return a value");
                body.push(Instruction::Unreachable);
            }
            (true, None) => {
                body.push(Instruction::Return);
            }
            (false, None) => {
                diags.error(format!("missing return value; function returns `{:?}`", return_type.kind));
                body.push(Instruction::Unreachable);
            }
            (false, Some(expr)) => {
                let inferred = lower_expr(expr, body, registry, scope, return_type, constants, diags);
                let mut reported = false;
                convert(body, registry, diags, &mut reported, &inferred, return_type, false);
                body.push(Instruction::Return);
            }
        },
        Stmt::Other { label } => {
            diags.error(format!("unsupported statement kind `{label}`"));
            body.push(Instruction::Unreachable);
        }
    }
}
