//! Symbol initializer (component D).
//!
//! Walks every top-level declaration once, resolving signatures and
//! registering them with the module emitter. Imports are registered
//! immediately (claiming the low end of wasm's function index space);
//! local function descriptors are collected for pass 2, which assigns
//! them their handles as their bodies are compiled.

use super::{Constant, FunctionDescriptor, SymbolTable};
use crate::ast::{ClassDecl, EnumDecl, FunctionDecl, MethodDecl, Program, TopDecl};
use crate::diag::DiagnosticBag;
use crate::emit::ModuleEmitter;
use crate::ty::{resolve_type, PrimitiveType, TypeRegistry};

pub fn run(
    program: &Program,
    registry: &TypeRegistry,
    emitter: &mut impl ModuleEmitter,
    diags: &mut DiagnosticBag,
) -> anyhow::Result<SymbolTable> {
    let mut table = SymbolTable::default();
    let mut pending_imports = Vec::new();

    for decl in &program.decls {
        match decl {
            TopDecl::Variable(v) => {
                diags.warning(format!(
                    "global `{}` ignored: global variable emission is not implemented",
                    v.name
                ));
            }
            TopDecl::Function(f) => {
                let desc = function_descriptor(f.name.clone(), f, registry, emitter)?;
                if desc.import {
                    pending_imports.push(desc);
                } else {
                    table.locals.push(desc);
                }
            }
            TopDecl::Class(c) => {
                collect_class(c, registry, emitter, &mut table.locals)?;
            }
            TopDecl::Enum(e) => {
                collect_enum(e, registry, &mut table.constants);
            }
        }
    }

    for desc in pending_imports {
        register_import(desc, emitter, &mut table);
    }

    Ok(table)
}

fn function_descriptor(
    mangled_name: String,
    f: &FunctionDecl,
    registry: &TypeRegistry,
    emitter: &mut impl ModuleEmitter,
) -> anyhow::Result<FunctionDescriptor> {
    anyhow::ensure!(
        f.type_params.is_empty(),
        "function `{}` declares type parameters, which are unsupported",
        f.name
    );

    let mut params = Vec::with_capacity(f.params.len());
    let mut param_names = Vec::with_capacity(f.params.len());
    for p in &f.params {
        params.push(resolve_type(registry, &p.ty, false)?);
        param_names.push(p.name.clone());
    }
    let return_type = resolve_type(registry, &f.return_type, true)?;

    let sig = register_signature(&params, &return_type, registry, emitter);

    Ok(FunctionDescriptor {
        mangled_name,
        params,
        param_names,
        return_type,
        export: f.modifiers.export,
        import: f.modifiers.import,
        sig,
        handle: None,
        body: f.body.clone(),
    })
}

fn method_descriptor(
    class_name: &str,
    m: &MethodDecl,
    registry: &TypeRegistry,
    emitter: &mut impl ModuleEmitter,
) -> anyhow::Result<FunctionDescriptor> {
    anyhow::ensure!(
        !m.modifiers.export && !m.modifiers.import,
        "method `{}${}` cannot carry export/import modifiers",
        class_name,
        m.name
    );

    let mangled_name = format!("{class_name}${}", m.name);
    let mut params = Vec::with_capacity(m.params.len() + 1);
    let mut param_names = Vec::with_capacity(m.params.len() + 1);
    if !m.modifiers.is_static {
        params.push(registry.uintptr());
        param_names.push("this".to_string());
    }
    for p in &m.params {
        params.push(resolve_type(registry, &p.ty, false)?);
        param_names.push(p.name.clone());
    }
    let return_type = resolve_type(registry, &m.return_type, true)?;

    let sig = register_signature(&params, &return_type, registry, emitter);

    Ok(FunctionDescriptor {
        mangled_name,
        params,
        param_names,
        return_type,
        export: false,
        import: false,
        sig,
        handle: None,
        body: Some(m.body.clone()),
    })
}

fn register_signature(
    params: &[PrimitiveType],
    return_type: &PrimitiveType,
    registry: &TypeRegistry,
    emitter: &mut impl ModuleEmitter,
) -> crate::emit::SignatureHandle {
    let key = signature_key(params, return_type);
    let val_params: Vec<_> = params.iter().map(|p| registry.val_type(p).expect("parameters are never void")).collect();
    let val_result = registry.val_type(return_type);
    emitter.add_function_type(&key, &val_params, val_result)
}

fn signature_key(params: &[PrimitiveType], return_type: &PrimitiveType) -> String {
    let mut key: String = params.iter().map(|p| p.sig_tag).collect();
    key.push(return_type.sig_tag);
    key
}

fn collect_class(
    c: &ClassDecl,
    registry: &TypeRegistry,
    emitter: &mut impl ModuleEmitter,
    locals: &mut Vec<FunctionDescriptor>,
) -> anyhow::Result<()> {
    for m in &c.methods {
        locals.push(method_descriptor(&c.name, m, registry, emitter)?);
    }
    Ok(())
}

fn collect_enum(e: &EnumDecl, registry: &TypeRegistry, constants: &mut std::collections::HashMap<String, Constant>) {
    for member in &e.members {
        let key = format!("{}${}", e.name, member.name);
        constants.insert(
            key,
            Constant {
                ty: registry.int(),
                value: member.value,
            },
        );
    }
}

fn register_import(mut desc: FunctionDescriptor, emitter: &mut impl ModuleEmitter, table: &mut SymbolTable) {
    let (module, field) = split_import_name(&desc.mangled_name);
    let handle = emitter.add_import(&module, &field, desc.sig);
    desc.handle = Some(handle);
    if desc.export {
        emitter.add_export(handle, &desc.mangled_name);
    }
    if desc.mangled_name == "start" {
        emitter.set_start(handle);
    }
    table.imports.push(desc);
}

/// Splits `module$field` into its two halves; a name with no `$` is
/// assumed to live in the implicit `env` module.
fn split_import_name(name: &str) -> (String, String) {
    match name.split_once('$') {
        Some((module, field)) => (module.to_string(), field.to_string()),
        None => ("env".to_string(), name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::emit::EncoderEmitter;

    fn ty(name: &str) -> TypeNode {
        TypeNode::Name(name.to_string())
    }

    #[test]
    fn import_name_without_dollar_defaults_to_env_module() {
        assert_eq!(split_import_name("log"), ("env".to_string(), "log".to_string()));
    }

    #[test]
    fn import_name_with_dollar_splits_module_and_field() {
        assert_eq!(
            split_import_name("math$sqrt"),
            ("math".to_string(), "sqrt".to_string())
        );
    }

    #[test]
    fn duplicate_signatures_share_one_type_section_entry() {
        let registry = TypeRegistry::new(4).unwrap();
        let mut emitter = EncoderEmitter::new();
        let program = Program {
            decls: vec![
                TopDecl::Function(FunctionDecl {
                    name: "a".into(),
                    type_params: vec![],
                    params: vec![Param { name: "x".into(), ty: ty("int") }],
                    return_type: ty("int"),
                    modifiers: Modifiers::default(),
                    body: Some(vec![Stmt::Return { value: Some(Expr::Ident { name: "x".into() }) }]),
                }),
                TopDecl::Function(FunctionDecl {
                    name: "b".into(),
                    type_params: vec![],
                    params: vec![Param { name: "y".into(), ty: ty("int") }],
                    return_type: ty("int"),
                    modifiers: Modifiers::default(),
                    body: Some(vec![Stmt::Return { value: Some(Expr::Ident { name: "y".into() }) }]),
                }),
            ],
        };
        let mut diags = DiagnosticBag::new();
        let table = run(&program, &registry, &mut emitter, &mut diags).unwrap();
        assert_eq!(table.locals[0].sig, table.locals[1].sig);
    }

    #[test]
    fn enum_members_become_int_constants() {
        let registry = TypeRegistry::new(4).unwrap();
        let mut emitter = EncoderEmitter::new();
        let program = Program {
            decls: vec![TopDecl::Enum(EnumDecl {
                name: "Color".into(),
                members: vec![EnumMember { name: "Red".into(), value: 2 }],
            })],
        };
        let mut diags = DiagnosticBag::new();
        let table = run(&program, &registry, &mut emitter, &mut diags).unwrap();
        let c = table.constants.get("Color$Red").unwrap();
        assert_eq!(c.value, 2);
        assert_eq!(c.ty.kind, registry.int().kind);
    }

    #[test]
    fn global_variable_produces_a_warning_not_an_error() {
        let registry = TypeRegistry::new(4).unwrap();
        let mut emitter = EncoderEmitter::new();
        let program = Program {
            decls: vec![TopDecl::Variable(VariableDecl { name: "g".into(), ty: ty("int") })],
        };
        let mut diags = DiagnosticBag::new();
        run(&program, &registry, &mut emitter, &mut diags).unwrap();
        assert!(!diags.has_errors());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn instance_method_gets_leading_this_pointer_param() {
        let registry = TypeRegistry::new(4).unwrap();
        let mut emitter = EncoderEmitter::new();
        let program = Program {
            decls: vec![TopDecl::Class(ClassDecl {
                name: "Point".into(),
                methods: vec![MethodDecl {
                    name: "len".into(),
                    params: vec![],
                    return_type: ty("int"),
                    modifiers: Modifiers::default(),
                    body: vec![Stmt::Return { value: Some(Expr::Number { text: "0".into() }) }],
                }],
            })],
        };
        let mut diags = DiagnosticBag::new();
        let table = run(&program, &registry, &mut emitter, &mut diags).unwrap();
        assert_eq!(table.locals[0].mangled_name, "Point$len");
        assert_eq!(table.locals[0].params.len(), 1);
        assert_eq!(table.locals[0].params[0].kind, registry.uintptr().kind);
    }

    #[test]
    fn type_parameters_are_rejected() {
        let registry = TypeRegistry::new(4).unwrap();
        let mut emitter = EncoderEmitter::new();
        let program = Program {
            decls: vec![TopDecl::Function(FunctionDecl {
                name: "generic".into(),
                type_params: vec!["T".into()],
                params: vec![],
                return_type: ty("void"),
                modifiers: Modifiers::default(),
                body: Some(vec![]),
            })],
        };
        let mut diags = DiagnosticBag::new();
        assert!(run(&program, &registry, &mut emitter, &mut diags).is_err());
    }
}
