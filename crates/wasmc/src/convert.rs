//! Numeric conversion engine (component C).
//!
//! Applies the five conversion rules in priority order: identity,
//! float-involving conversions, int-to-float, int-to-long (and back), and
//! plain int-to-int. Every branch returns the target type and, as a side
//! effect, appends whatever instructions are needed to the function body
//! under construction.
//!
//! `reported` is a latch shared across an entire conversion chain (e.g. a
//! float-to-byte conversion that bottoms out through an intermediate
//! int): the first illegal-implicit diagnostic in the chain sets it, and
//! every conversion downstream of that point proceeds as if it had been
//! written explicitly, so a single bad cast never produces a cascade of
//! near-duplicate diagnostics.

use wasm_encoder::Instruction;

use crate::diag::DiagnosticBag;
use crate::emit::FuncBody;
use crate::ty::{PrimitiveType, TypeRegistry};

pub fn convert(
    body: &mut FuncBody,
    registry: &TypeRegistry,
    diags: &mut DiagnosticBag,
    reported: &mut bool,
    from: &PrimitiveType,
    to: &PrimitiveType,
    explicit: bool,
) -> PrimitiveType {
    if from.is_same_kind(to) {
        return to.clone();
    }

    let word = registry.word_size;

    if from.is_float() {
        return convert_from_float(body, registry, diags, reported, from, to, explicit, word);
    }
    if to.is_float() {
        return convert_int_to_float(body, diags, reported, from, to, explicit, word);
    }
    if from.is_long(word) || to.is_long(word) {
        return convert_int_long(body, registry, diags, reported, from, to, explicit, word);
    }
    convert_int_int(body, diags, reported, from, to, explicit)
}

fn report_once(diags: &mut DiagnosticBag, reported: &mut bool, explicit: bool, message: impl Into<String>) {
    if !explicit && !*reported {
        diags.error(message);
        *reported = true;
    }
}

fn convert_from_float(
    body: &mut FuncBody,
    registry: &TypeRegistry,
    diags: &mut DiagnosticBag,
    reported: &mut bool,
    from: &PrimitiveType,
    to: &PrimitiveType,
    explicit: bool,
    word: u8,
) -> PrimitiveType {
    if to.is_float() {
        // only two float kinds exist, so non-identity means promote or demote
        if to.size > from.size {
            body.push(Instruction::F64PromoteF32);
        } else {
            body.push(Instruction::F32DemoteF64);
            report_once(
                diags,
                reported,
                explicit,
                "implicit conversion from double to float requires an explicit cast",
            );
        }
        return to.clone();
    }

    let is_long_target = to.is_long(word);
    let target_signed = to.signed;
    let instr = match (from.size, is_long_target, target_signed) {
        (4, false, true) => Instruction::I32TruncF32S,
        (4, false, false) => Instruction::I32TruncF32U,
        (4, true, true) => Instruction::I64TruncF32S,
        (4, true, false) => Instruction::I64TruncF32U,
        (8, false, true) => Instruction::I32TruncF64S,
        (8, false, false) => Instruction::I32TruncF64U,
        (8, true, true) => Instruction::I64TruncF64S,
        (8, true, false) => Instruction::I64TruncF64U,
        _ => unreachable!("only f32/f64 reach convert_from_float"),
    };
    body.push(instr);
    report_once(
        diags,
        reported,
        explicit,
        "implicit conversion from a floating-point type to an integer type requires an explicit cast",
    );

    if is_long_target {
        return to.clone();
    }
    // produced a 32-bit lane of the target's signedness; recurse to
    // normalize sub-word widths (already reported above if this was implicit)
    let intermediate = if target_signed { registry.int() } else { registry.uint() };
    convert_int_int(body, diags, reported, &intermediate, to, true)
}

fn convert_int_to_float(
    body: &mut FuncBody,
    diags: &mut DiagnosticBag,
    reported: &mut bool,
    from: &PrimitiveType,
    to: &PrimitiveType,
    explicit: bool,
    word: u8,
) -> PrimitiveType {
    let is_long_src = from.is_long(word);
    let instr = match (to.size, is_long_src, from.signed) {
        (4, false, true) => Instruction::F32ConvertI32S,
        (4, false, false) => Instruction::F32ConvertI32U,
        (4, true, true) => Instruction::F32ConvertI64S,
        (4, true, false) => Instruction::F32ConvertI64U,
        (8, false, true) => Instruction::F64ConvertI32S,
        (8, false, false) => Instruction::F64ConvertI32U,
        (8, true, true) => Instruction::F64ConvertI64S,
        (8, true, false) => Instruction::F64ConvertI64U,
        _ => unreachable!("target is always f32 or f64 here"),
    };
    body.push(instr);

    let implicit_ok = if to.size == 4 {
        from.size <= 2
    } else {
        from.size <= 4 && !is_long_src
    };
    if !implicit_ok {
        report_once(
            diags,
            reported,
            explicit,
            format!(
                "implicit conversion from `{:?}` to `{:?}` requires an explicit cast",
                from.kind, to.kind
            ),
        );
    }
    to.clone()
}

fn convert_int_long(
    body: &mut FuncBody,
    registry: &TypeRegistry,
    diags: &mut DiagnosticBag,
    reported: &mut bool,
    from: &PrimitiveType,
    to: &PrimitiveType,
    explicit: bool,
    word: u8,
) -> PrimitiveType {
    let from_long = from.is_long(word);
    let to_long = to.is_long(word);

    if from_long && to_long {
        // both already a 64-bit lane; this is a same-size int-to-int reinterpretation
        return convert_int_int(body, diags, reported, from, to, explicit);
    }

    if !from_long && to_long {
        let instr = if to.signed {
            Instruction::I64ExtendI32S
        } else {
            Instruction::I64ExtendI32U
        };
        body.push(instr);
        return to.clone();
    }

    // from_long && !to_long: narrow
    body.push(Instruction::I32WrapI64);
    report_once(
        diags,
        reported,
        explicit,
        "implicit narrowing conversion from a 64-bit integer type requires an explicit cast",
    );
    let intermediate = if from.signed { registry.int() } else { registry.uint() };
    convert_int_int(body, diags, reported, &intermediate, to, true)
}

fn convert_int_int(
    body: &mut FuncBody,
    diags: &mut DiagnosticBag,
    reported: &mut bool,
    from: &PrimitiveType,
    to: &PrimitiveType,
    explicit: bool,
) -> PrimitiveType {
    if to.size >= from.size {
        // widening or same-width reinterpretation: the bit pattern already
        // matches the target lane, nothing to emit
        return to.clone();
    }

    report_once(
        diags,
        reported,
        explicit,
        format!(
            "implicit narrowing conversion from `{:?}` to `{:?}` requires an explicit cast",
            from.kind, to.kind
        ),
    );

    if to.signed {
        let shift = to.shift32().expect("narrowing target is always sub-32-bit here") as i32;
        body.push(Instruction::I32Const(shift));
        body.push(Instruction::I32Shl);
        body.push(Instruction::I32Const(shift));
        body.push(Instruction::I32ShrS);
    } else {
        let mask = to.mask32().expect("narrowing target is always sub-32-bit here") as i32;
        body.push(Instruction::I32Const(mask));
        body.push(Instruction::I32And);
    }
    to.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> (TypeRegistry, DiagnosticBag) {
        (TypeRegistry::new(4).unwrap(), DiagnosticBag::new())
    }

    #[test]
    fn identity_emits_nothing() {
        let (reg, mut diags) = ctx();
        let mut body = FuncBody::new();
        let mut reported = false;
        let result = convert(&mut body, &reg, &mut diags, &mut reported, &reg.int(), &reg.int(), false);
        assert!(body.instructions().is_empty());
        assert_eq!(result.kind, reg.int().kind);
        assert!(diags.is_empty());
    }

    #[test]
    fn implicit_float_narrowing_is_flagged_once() {
        let (reg, mut diags) = ctx();
        let mut body = FuncBody::new();
        let mut reported = false;
        convert(&mut body, &reg, &mut diags, &mut reported, &reg.double(), &reg.float(), false);
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn explicit_float_narrowing_is_silent() {
        let (reg, mut diags) = ctx();
        let mut body = FuncBody::new();
        let mut reported = false;
        convert(&mut body, &reg, &mut diags, &mut reported, &reg.double(), &reg.float(), true);
        assert!(diags.is_empty());
    }

    #[test]
    fn implicit_float_to_int_narrows_reports_only_the_outer_conversion() {
        let (reg, mut diags) = ctx();
        let mut body = FuncBody::new();
        let mut reported = false;
        let result = convert(&mut body, &reg, &mut diags, &mut reported, &reg.float(), &reg.sbyte(), false);
        assert_eq!(result.kind, reg.sbyte().kind);
        assert_eq!(diags.len(), 1, "one diagnostic for the whole float->sbyte chain");
        assert!(matches!(body.instructions()[0], Instruction::I32TruncF32S));
    }

    #[test]
    fn long_to_int_narrowing_wraps_then_masks_unsigned() {
        let (reg, mut diags) = ctx();
        let mut body = FuncBody::new();
        let mut reported = false;
        convert(&mut body, &reg, &mut diags, &mut reported, &reg.ulong(), &reg.ushort(), true);
        assert!(matches!(body.instructions()[0], Instruction::I32WrapI64));
        assert!(matches!(body.instructions()[1], Instruction::I32Const(0xFFFF)));
        assert!(matches!(body.instructions()[2], Instruction::I32And));
    }

    #[test]
    fn int_to_sbyte_narrowing_sign_shrinks() {
        let (reg, mut diags) = ctx();
        let mut body = FuncBody::new();
        let mut reported = false;
        convert(&mut body, &reg, &mut diags, &mut reported, &reg.int(), &reg.sbyte(), true);
        assert!(matches!(body.instructions()[0], Instruction::I32Const(24)));
        assert!(matches!(body.instructions()[1], Instruction::I32Shl));
        assert!(matches!(body.instructions()[2], Instruction::I32Const(24)));
        assert!(matches!(body.instructions()[3], Instruction::I32ShrS));
    }

    #[test]
    fn int_widening_to_long_uses_target_signedness() {
        let (reg, mut diags) = ctx();
        let mut body = FuncBody::new();
        let mut reported = false;
        convert(&mut body, &reg, &mut diags, &mut reported, &reg.int(), &reg.ulong(), false);
        assert!(matches!(body.instructions()[0], Instruction::I64ExtendI32U));
        assert!(diags.is_empty(), "widening is always implicitly legal");
    }
}
