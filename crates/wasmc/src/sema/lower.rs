//! Expression lowerer (component F).
//!
//! Lowering is bidirectional: a contextual type flows down from the
//! enclosing statement, and an inferred type flows back up once the
//! expression's own shape is known. Binary operators need both directions
//! at once — the final instruction family and any literal's width depend
//! on a result type computed from both operands — so `lower_binary`
//! first probes each operand's type with a side-effect-free pass
//! ([`infer_type`]) before lowering either one for real. This is the one
//! place this lowerer diverges from a single linear walk: probing avoids
//! emitting (and diagnosing) every operand twice.

use std::collections::HashMap;

use wasm_encoder::Instruction;

use super::{Constant, LocalScope};
use crate::ast::Expr;
use crate::convert::convert;
use crate::diag::DiagnosticBag;
use crate::emit::FuncBody;
use crate::ty::{resolve_type, Kind, PrimitiveType, TypeRegistry};

pub fn lower_expr(
    expr: &Expr,
    body: &mut FuncBody,
    registry: &TypeRegistry,
    scope: &LocalScope,
    ctx_ty: &PrimitiveType,
    constants: &HashMap<String, Constant>,
    diags: &mut DiagnosticBag,
) -> PrimitiveType {
    match expr {
        Expr::Paren { inner } => lower_expr(inner, body, registry, scope, ctx_ty, constants, diags),

        Expr::As { inner, ty } => {
            // the inner expression is lowered under the contextual type this
            // `as` node itself inherited, not the cast's own target type
            let from = lower_expr(inner, body, registry, scope, ctx_ty, constants, diags);
            match resolve_type(registry, ty, false) {
                Ok(target) => {
                    let mut reported = false;
                    convert(body, registry, diags, &mut reported, &from, &target, true)
                }
                Err(e) => {
                    diags.error(e.to_string());
                    from
                }
            }
        }

        Expr::Binary { op, lhs, rhs } => lower_binary(op, lhs, rhs, body, registry, scope, ctx_ty, constants, diags),

        Expr::Number { text } => lower_number(text, body, registry, ctx_ty, diags),

        Expr::Ident { name } => match scope.get(name) {
            Some(slot) => {
                body.push(Instruction::LocalGet(slot.index));
                slot.ty.clone()
            }
            None => {
                diags.error(format!("undefined identifier `{name}`"));
                body.push(Instruction::Unreachable);
                ctx_ty.clone()
            }
        },

        Expr::Property { object, property } => {
            if let Expr::Ident { name } = object.as_ref() {
                if let Some(c) = constants.get(&format!("{name}${property}")) {
                    body.push(Instruction::I32Const(c.value as i32));
                    return c.ty.clone();
                }
            }
            diags.error("unsupported property access");
            body.push(Instruction::Unreachable);
            ctx_ty.clone()
        }

        Expr::Other { label } => {
            diags.error(format!("unsupported expression kind `{label}`"));
            body.push(Instruction::Unreachable);
            ctx_ty.clone()
        }
    }
}

fn lower_binary(
    op: &str,
    lhs: &Expr,
    rhs: &Expr,
    body: &mut FuncBody,
    registry: &TypeRegistry,
    scope: &LocalScope,
    outer_ctx: &PrimitiveType,
    constants: &HashMap<String, Constant>,
    diags: &mut DiagnosticBag,
) -> PrimitiveType {
    let lhs_probe = infer_type(lhs, registry, scope, outer_ctx, constants);
    let rhs_probe = infer_type(rhs, registry, scope, outer_ctx, constants);
    let result_ty = binary_result_type(registry, &lhs_probe, &rhs_probe);

    let lhs_ty = lower_expr(lhs, body, registry, scope, &result_ty, constants, diags);
    let mut lhs_reported = false;
    convert(body, registry, diags, &mut lhs_reported, &lhs_ty, &result_ty, false);

    let rhs_ty = lower_expr(rhs, body, registry, scope, &result_ty, constants, diags);
    let mut rhs_reported = false;
    convert(body, registry, diags, &mut rhs_reported, &rhs_ty, &result_ty, false);

    match binary_opcode(op, &result_ty, registry.word_size) {
        Ok(instr) => body.push(instr),
        Err(msg) => {
            diags.error(msg);
            body.push(Instruction::Unreachable);
        }
    }

    result_ty
}

/// Side-effect-free twin of `lower_expr`, used only to learn an
/// operand's type ahead of choosing a binary operator's result type.
fn infer_type(
    expr: &Expr,
    registry: &TypeRegistry,
    scope: &LocalScope,
    ctx_ty: &PrimitiveType,
    constants: &HashMap<String, Constant>,
) -> PrimitiveType {
    match expr {
        Expr::Paren { inner } => infer_type(inner, registry, scope, ctx_ty, constants),
        Expr::As { ty, .. } => resolve_type(registry, ty, false).unwrap_or_else(|_| ctx_ty.clone()),
        Expr::Binary { lhs, rhs, .. } => {
            let l = infer_type(lhs, registry, scope, ctx_ty, constants);
            let r = infer_type(rhs, registry, scope, ctx_ty, constants);
            binary_result_type(registry, &l, &r)
        }
        Expr::Number { text } => infer_number_type(text, registry, ctx_ty),
        Expr::Ident { name } => scope.get(name).map(|s| s.ty.clone()).unwrap_or_else(|| ctx_ty.clone()),
        Expr::Property { object, property } => {
            if let Expr::Ident { name } = object.as_ref() {
                if let Some(c) = constants.get(&format!("{name}${property}")) {
                    return c.ty.clone();
                }
            }
            ctx_ty.clone()
        }
        Expr::Other { .. } => ctx_ty.clone(),
    }
}

/// "If either side is float, the wider float wins; otherwise, the wider
/// integer wins; a tie between two equally wide kinds prefers the
/// unsigned one" (the spec is silent on same-width ties; unsigned-wins
/// was picked to match the registry's own tie-break for `uintptr`).
fn binary_result_type(registry: &TypeRegistry, l: &PrimitiveType, r: &PrimitiveType) -> PrimitiveType {
    match (l.is_float(), r.is_float()) {
        (true, true) => {
            if l.size >= r.size {
                l.clone()
            } else {
                r.clone()
            }
        }
        (true, false) => l.clone(),
        (false, true) => r.clone(),
        (false, false) => wider_int(l, r),
    }
}

fn wider_int(a: &PrimitiveType, b: &PrimitiveType) -> PrimitiveType {
    if a.size != b.size {
        if a.size > b.size {
            a.clone()
        } else {
            b.clone()
        }
    } else if !a.signed {
        a.clone()
    } else {
        b.clone()
    }
}

fn binary_opcode(op: &str, ty: &PrimitiveType, word_size: u8) -> Result<Instruction<'static>, String> {
    let is_float = ty.is_float();
    let is_long = ty.is_long(word_size);

    if is_float {
        return match op {
            "+" => Ok(if ty.size == 4 { Instruction::F32Add } else { Instruction::F64Add }),
            "-" => Ok(if ty.size == 4 { Instruction::F32Sub } else { Instruction::F64Sub }),
            "*" => Ok(if ty.size == 4 { Instruction::F32Mul } else { Instruction::F64Mul }),
            "/" => Ok(if ty.size == 4 { Instruction::F32Div } else { Instruction::F64Div }),
            "%" | "&" | "|" | "^" | "<<" | ">>" => {
                Err(format!("operator `{op}` is not defined for floating-point operands"))
            }
            other => Err(format!("unsupported operator `{other}`")),
        };
    }

    if is_long {
        return match op {
            "+" => Ok(Instruction::I64Add),
            "-" => Ok(Instruction::I64Sub),
            "*" => Ok(Instruction::I64Mul),
            "/" if ty.signed => Ok(Instruction::I64DivS),
            "/" => Ok(Instruction::I64DivU),
            "%" if ty.signed => Ok(Instruction::I64RemS),
            "%" => Ok(Instruction::I64RemU),
            "&" => Ok(Instruction::I64And),
            "|" => Ok(Instruction::I64Or),
            "^" => Ok(Instruction::I64Xor),
            "<<" => Ok(Instruction::I64Shl),
            ">>" if ty.signed => Ok(Instruction::I64ShrS),
            ">>" => Ok(Instruction::I64ShrU),
            other => Err(format!("unsupported operator `{other}`")),
        };
    }

    match op {
        "+" => Ok(Instruction::I32Add),
        "-" => Ok(Instruction::I32Sub),
        "*" => Ok(Instruction::I32Mul),
        "/" if ty.signed => Ok(Instruction::I32DivS),
        "/" => Ok(Instruction::I32DivU),
        "%" if ty.signed => Ok(Instruction::I32RemS),
        "%" => Ok(Instruction::I32RemU),
        "&" => Ok(Instruction::I32And),
        "|" => Ok(Instruction::I32Or),
        "^" => Ok(Instruction::I32Xor),
        "<<" => Ok(Instruction::I32Shl),
        ">>" if ty.signed => Ok(Instruction::I32ShrS),
        ">>" => Ok(Instruction::I32ShrU),
        other => Err(format!("unsupported operator `{other}`")),
    }
}

fn looks_like_float_literal(text: &str) -> bool {
    if text.starts_with("0x") || text.starts_with("0X") {
        return false;
    }
    text.contains('.') || text.contains('e') || text.contains('E')
}

fn infer_number_type(text: &str, registry: &TypeRegistry, ctx_ty: &PrimitiveType) -> PrimitiveType {
    if looks_like_float_literal(text) && !ctx_ty.is_float() {
        registry.double()
    } else {
        ctx_ty.clone()
    }
}

fn strip_radix(text: &str) -> (u32, &str) {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (16, hex)
    } else {
        (10, text)
    }
}

fn parse_int_literal(text: &str) -> anyhow::Result<i64> {
    let (radix, digits) = strip_radix(text);
    u64::from_str_radix(digits, radix)
        .map(|v| v as i64)
        .map_err(|_| anyhow::anyhow!("malformed integer literal `{text}`"))
}

fn lower_number(
    text: &str,
    body: &mut FuncBody,
    registry: &TypeRegistry,
    ctx_ty: &PrimitiveType,
    diags: &mut DiagnosticBag,
) -> PrimitiveType {
    let ty = infer_number_type(text, registry, ctx_ty);

    if ty.is_float() {
        let parsed: Result<f64, _> = text.parse();
        let value = match parsed {
            Ok(v) => v,
            Err(_) => {
                diags.error(format!("malformed floating-point literal `{text}`"));
                0.0
            }
        };
        body.push(if ty.size == 4 {
            Instruction::F32Const(value as f32)
        } else {
            Instruction::F64Const(value)
        });
        return ty;
    }

    if ty.kind == Kind::Bool {
        let raw = parse_int_literal(text).unwrap_or(0);
        body.push(Instruction::I32Const(if raw != 0 { 1 } else { 0 }));
        return ty;
    }

    if ty.is_long(registry.word_size) {
        let (radix, digits) = strip_radix(text);
        let value = if radix == 10 && ty.signed {
            digits.parse::<i64>()
        } else {
            u64::from_str_radix(digits, radix).map(|v| v as i64)
        };
        let value = match value {
            Ok(v) => v,
            Err(_) => {
                diags.error(format!("malformed integer literal `{text}`"));
                0
            }
        };
        body.push(Instruction::I64Const(value));
        return ty;
    }

    // <=32-bit integer family: mask down to the contextual type's own width
    let raw = parse_int_literal(text).unwrap_or(0);
    let masked = match ty.mask32() {
        Some(mask) => raw & mask as i64,
        None => raw, // already a full 32-bit lane (int/uint)
    };
    body.push(Instruction::I32Const(masked as i32));
    ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::FuncBody;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(4).unwrap()
    }

    #[test]
    fn sub_word_literal_is_masked_to_its_own_width() {
        let reg = registry();
        let mut body = FuncBody::new();
        let mut diags = DiagnosticBag::new();
        lower_number("0x80", &mut body, &reg, &reg.sbyte(), &mut diags);
        assert!(matches!(body.instructions()[0], Instruction::I32Const(128)));
    }

    #[test]
    fn i64_max_literal_round_trips_through_low_high_halves() {
        let reg = registry();
        let mut body = FuncBody::new();
        let mut diags = DiagnosticBag::new();
        lower_number("9223372036854775807", &mut body, &reg, &reg.long(), &mut diags);
        match body.instructions()[0] {
            Instruction::I64Const(v) => {
                assert_eq!(v, i64::MAX);
                assert_eq!((v as u64) & 0xFFFF_FFFF, 0xFFFF_FFFF);
                assert_eq!(((v as u64) >> 32) & 0xFFFF_FFFF, 0x7FFF_FFFF);
            }
            other => panic!("expected I64Const, got {other:?}"),
        }
    }

    #[test]
    fn float_text_under_non_float_context_infers_double() {
        let reg = registry();
        assert_eq!(infer_number_type("1.5", &reg, &reg.int()).kind, reg.double().kind);
    }

    #[test]
    fn float_text_under_float_context_keeps_context_width() {
        let reg = registry();
        assert_eq!(infer_number_type("1.5", &reg, &reg.float()).kind, reg.float().kind);
    }

    #[test]
    fn binary_result_type_prefers_wider_float() {
        let reg = registry();
        let result = binary_result_type(&reg, &reg.float(), &reg.double());
        assert_eq!(result.kind, reg.double().kind);
    }

    #[test]
    fn binary_result_type_prefers_long_over_int() {
        let reg = registry();
        let result = binary_result_type(&reg, &reg.long(), &reg.int());
        assert_eq!(result.kind, reg.long().kind);
    }

    #[test]
    fn division_selects_signed_or_unsigned_opcode() {
        let reg = registry();
        assert!(matches!(binary_opcode("/", &reg.int(), 4), Ok(Instruction::I32DivS)));
        assert!(matches!(binary_opcode("/", &reg.uint(), 4), Ok(Instruction::I32DivU)));
    }

    #[test]
    fn unsupported_operator_is_a_recoverable_error() {
        let reg = registry();
        assert!(binary_opcode("??", &reg.int(), 4).is_err());
    }
}
