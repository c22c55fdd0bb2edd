//! Type registry and resolver (components A and B).
//!
//! Every primitive type the language supports is described by a small,
//! cheaply cloned descriptor. Plain kinds carry no payload; `Ptr<T>`
//! descriptors additionally carry their pointee so later passes can
//! recover it, even though arithmetic only ever looks at the pointer's
//! own width and signedness.

use std::rc::Rc;

use crate::ast::TypeNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Byte,
    SByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Bool,
    Float,
    Double,
    Void,
    UIntPtr,
}

/// A resolved primitive type descriptor.
///
/// `sig_tag` is the single-character tag used to intern function
/// signatures (see `sema::pass1::signature_key`); it is assigned once per
/// kind and never recomputed, so two descriptors of the same kind always
/// agree on it regardless of where they were produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveType {
    pub kind: Kind,
    pub size: u8,
    pub signed: bool,
    pub sig_tag: char,
    pub underlying: Option<Rc<PrimitiveType>>,
}

impl PrimitiveType {
    pub fn is_same_kind(&self, other: &PrimitiveType) -> bool {
        self.kind == other.kind
    }

    pub fn is_void(&self) -> bool {
        self.kind == Kind::Void
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, Kind::Float | Kind::Double)
    }

    /// True if this type occupies the 32-bit wasm integer family, i.e. it
    /// is one of byte/sbyte/short/ushort/int/uint/bool, or a pointer on a
    /// 32-bit target.
    pub fn is_int(&self, word_size: u8) -> bool {
        matches!(
            self.kind,
            Kind::Byte | Kind::SByte | Kind::Short | Kind::UShort | Kind::Int | Kind::UInt | Kind::Bool
        ) || (self.kind == Kind::UIntPtr && word_size == 4)
    }

    /// True if this type occupies the 64-bit wasm integer family.
    pub fn is_long(&self, word_size: u8) -> bool {
        matches!(self.kind, Kind::Long | Kind::ULong) || (self.kind == Kind::UIntPtr && word_size == 8)
    }

    /// Left/right shift amount used to sign-shrink a value into this
    /// type's width through the 32-bit lane, or `None` when this type is
    /// already a full 32-bit (or wider) lane.
    pub fn shift32(&self) -> Option<u32> {
        (self.size < 4).then(|| 32 - 8 * self.size as u32)
    }

    /// Bitmask that truncates a 32-bit lane value to this type's width,
    /// or `None` when this type is already a full 32-bit (or wider) lane.
    pub fn mask32(&self) -> Option<u32> {
        (self.size < 4).then(|| (1u32 << (8 * self.size as u32)) - 1)
    }
}

/// Produces and owns the canonical descriptor for every primitive kind.
///
/// `word_size` governs `uintptr`'s size (and therefore which wasm integer
/// family it belongs to): 4 on a 32-bit memory model, 8 on a 64-bit one.
pub struct TypeRegistry {
    pub word_size: u8,
}

macro_rules! primitive_ctor {
    ($name:ident, $kind:ident, $size:expr, $signed:expr, $tag:expr) => {
        pub fn $name(&self) -> PrimitiveType {
            PrimitiveType {
                kind: Kind::$kind,
                size: $size,
                signed: $signed,
                sig_tag: $tag,
                underlying: None,
            }
        }
    };
}

impl TypeRegistry {
    pub fn new(word_size: u8) -> anyhow::Result<Self> {
        anyhow::ensure!(
            word_size == 4 || word_size == 8,
            "unsupported pointer word size {word_size} (must be 4 or 8)"
        );
        Ok(Self { word_size })
    }

    primitive_ctor!(byte, Byte, 1, false, 'b');
    primitive_ctor!(sbyte, SByte, 1, true, 'y');
    primitive_ctor!(short, Short, 2, true, 's');
    primitive_ctor!(ushort, UShort, 2, false, 'S');
    primitive_ctor!(int, Int, 4, true, 'i');
    primitive_ctor!(uint, UInt, 4, false, 'I');
    primitive_ctor!(long, Long, 8, true, 'l');
    primitive_ctor!(ulong, ULong, 8, false, 'L');
    primitive_ctor!(bool_, Bool, 4, false, 'o');
    primitive_ctor!(float, Float, 4, true, 'f');
    primitive_ctor!(double, Double, 8, true, 'd');
    primitive_ctor!(void_, Void, 0, false, 'v');

    pub fn uintptr(&self) -> PrimitiveType {
        PrimitiveType {
            kind: Kind::UIntPtr,
            size: self.word_size,
            signed: false,
            sig_tag: 'p',
            underlying: None,
        }
    }

    pub fn pointer_to(&self, underlying: PrimitiveType) -> PrimitiveType {
        let mut p = self.uintptr();
        p.underlying = Some(Rc::new(underlying));
        p
    }

    pub fn by_name(&self, name: &str, allow_void: bool) -> Option<PrimitiveType> {
        match name {
            "byte" => Some(self.byte()),
            "sbyte" => Some(self.sbyte()),
            "short" => Some(self.short()),
            "ushort" => Some(self.ushort()),
            "int" => Some(self.int()),
            "uint" => Some(self.uint()),
            "long" => Some(self.long()),
            "ulong" => Some(self.ulong()),
            "bool" => Some(self.bool_()),
            "float" => Some(self.float()),
            "double" => Some(self.double()),
            "uintptr" => Some(self.uintptr()),
            "void" if allow_void => Some(self.void_()),
            _ => None,
        }
    }

    /// `ValType` wasm-encoder will use to represent this type in a
    /// signature or local slot. `None` means "no value" (only legal as a
    /// function return type).
    pub fn val_type(&self, ty: &PrimitiveType) -> Option<wasm_encoder::ValType> {
        if ty.is_void() {
            return None;
        }
        Some(if ty.is_float() {
            if ty.size == 4 {
                wasm_encoder::ValType::F32
            } else {
                wasm_encoder::ValType::F64
            }
        } else if ty.is_long(self.word_size) {
            wasm_encoder::ValType::I64
        } else {
            wasm_encoder::ValType::I32
        })
    }
}

/// Resolves a surface type node to a primitive descriptor (component B).
///
/// `allow_void` permits `void` only where the grammar allows it (function
/// return position); everywhere else it is rejected even though the
/// registry knows about it.
pub fn resolve_type(registry: &TypeRegistry, node: &TypeNode, allow_void: bool) -> anyhow::Result<PrimitiveType> {
    match node {
        TypeNode::Name(name) => registry
            .by_name(name, allow_void)
            .ok_or_else(|| anyhow::anyhow!("unsupported type name `{name}`")),
        TypeNode::Generic { name, args } if name == "Ptr" => {
            anyhow::ensure!(args.len() == 1, "`Ptr<T>` requires exactly one type argument");
            match &args[0] {
                TypeNode::Name(inner) => {
                    let underlying = registry
                        .by_name(inner, false)
                        .ok_or_else(|| anyhow::anyhow!("unsupported type name `{inner}`"))?;
                    Ok(registry.pointer_to(underlying))
                }
                TypeNode::Generic { .. } => {
                    anyhow::bail!("`Ptr<T>` argument must be a simple type reference")
                }
            }
        }
        TypeNode::Generic { name, .. } => anyhow::bail!("unsupported generic type `{name}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_word_types_report_shift_and_mask() {
        let reg = TypeRegistry::new(4).unwrap();
        assert_eq!(reg.byte().mask32(), Some(0xFF));
        assert_eq!(reg.sbyte().shift32(), Some(24));
        assert_eq!(reg.short().mask32(), Some(0xFFFF));
        assert_eq!(reg.int().mask32(), None);
    }

    #[test]
    fn uintptr_follows_word_size_for_family_membership() {
        let reg32 = TypeRegistry::new(4).unwrap();
        assert!(reg32.uintptr().is_int(4));
        assert!(!reg32.uintptr().is_long(4));

        let reg64 = TypeRegistry::new(8).unwrap();
        assert!(reg64.uintptr().is_long(8));
        assert!(!reg64.uintptr().is_int(8));
    }

    #[test]
    fn resolve_ptr_of_int_carries_underlying() {
        let reg = TypeRegistry::new(4).unwrap();
        let node = TypeNode::Generic {
            name: "Ptr".into(),
            args: vec![TypeNode::Name("int".into())],
        };
        let resolved = resolve_type(&reg, &node, false).unwrap();
        assert_eq!(resolved.kind, Kind::UIntPtr);
        assert_eq!(resolved.underlying.as_ref().map(|u| u.kind), Some(Kind::Int));
    }

    #[test]
    fn void_rejected_outside_return_position() {
        let reg = TypeRegistry::new(4).unwrap();
        let node = TypeNode::Name("void".into());
        assert!(resolve_type(&reg, &node, false).is_err());
        assert!(resolve_type(&reg, &node, true).is_ok());
    }

    #[test]
    fn nested_ptr_argument_rejected() {
        let reg = TypeRegistry::new(4).unwrap();
        let node = TypeNode::Generic {
            name: "Ptr".into(),
            args: vec![TypeNode::Generic {
                name: "Ptr".into(),
                args: vec![TypeNode::Name("int".into())],
            }],
        };
        assert!(resolve_type(&reg, &node, false).is_err());
    }
}
