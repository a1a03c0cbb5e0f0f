//! IR type representation for the Opal backend
//!
//! The semantic core maps source-level type names onto this closed set of
//! backend types. Code generation reads struct layouts from here to emit
//! allocations, field addressing, and function signatures.

use std::fmt;

/// A backend IR type
#[derive(Debug, Clone, PartialEq)]
pub enum IrType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Void,
    /// Untyped pointer; also the representation of strings and arrays
    Ptr,
    /// Pointer to a specific IR type
    PtrTo(Box<IrType>),
    /// Aggregate with a computed byte layout
    Struct(StructLayout),
}

impl IrType {
    /// Create a pointer to `inner`
    pub fn ptr_to(inner: IrType) -> Self {
        IrType::PtrTo(Box::new(inner))
    }

    /// Size of a value of this type in bytes
    pub fn size_in_bytes(&self) -> usize {
        match self {
            IrType::I8 | IrType::Bool => 1,
            IrType::I16 => 2,
            IrType::I32 | IrType::F32 => 4,
            IrType::I64 | IrType::F64 => 8,
            IrType::Void => 0,
            IrType::Ptr | IrType::PtrTo(_) => 8,
            IrType::Struct(layout) => layout.size,
        }
    }

    /// Required alignment of this type in bytes (at least 1)
    pub fn align(&self) -> usize {
        match self {
            IrType::Void => 1,
            IrType::Struct(layout) => layout.align,
            other => other.size_in_bytes(),
        }
    }

    /// Whether this is a pointer (typed or untyped)
    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Ptr | IrType::PtrTo(_))
    }

    /// Get the struct layout if this is an aggregate
    pub fn layout(&self) -> Option<&StructLayout> {
        match self {
            IrType::Struct(layout) => Some(layout),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::F32 => write!(f, "f32"),
            IrType::F64 => write!(f, "f64"),
            IrType::Bool => write!(f, "bool"),
            IrType::Void => write!(f, "void"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::PtrTo(inner) => write!(f, "ptr<{}>", inner),
            IrType::Struct(layout) => write!(f, "struct {}", layout.name),
        }
    }
}

/// One field of a struct layout
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: IrType,
    /// Byte offset from the start of the aggregate
    pub offset: usize,
}

/// Computed byte layout of an aggregate type
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<StructField>,
    /// Total size in bytes, a multiple of `align`
    pub size: usize,
    /// Alignment in bytes, the maximum over the fields (at least 1)
    pub align: usize,
}

impl StructLayout {
    /// Compute the layout for the given fields in declaration order
    ///
    /// Each field is placed at the smallest offset past the previous field
    /// that satisfies its own alignment; the total size is rounded up to
    /// the aggregate alignment.
    pub fn compute(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (String, IrType)>,
    ) -> Self {
        let mut laid_out = Vec::new();
        let mut offset = 0usize;
        let mut align = 1usize;

        for (field_name, ty) in fields {
            let field_align = ty.align();
            offset = round_up(offset, field_align);
            align = align.max(field_align);
            let size = ty.size_in_bytes();
            laid_out.push(StructField {
                name: field_name,
                ty,
                offset,
            });
            offset += size;
        }

        StructLayout {
            name: name.into(),
            fields: laid_out,
            size: round_up(offset, align),
            align,
        }
    }

    /// Get a field by name
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn round_up(value: usize, align: usize) -> usize {
    debug_assert!(align > 0);
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_of(fields: &[(&str, IrType)]) -> StructLayout {
        StructLayout::compute(
            "Test",
            fields.iter().map(|(n, t)| (n.to_string(), t.clone())),
        )
    }

    #[test]
    fn test_player_layout() {
        let layout = layout_of(&[("b", IrType::I32), ("x", IrType::F32)]);
        assert_eq!(layout.fields.len(), 2);
        assert_eq!(layout.fields[0].offset, 0);
        assert_eq!(layout.fields[1].offset, 4);
        assert_eq!(layout.size, 8);
        assert_eq!(layout.align, 4);
    }

    #[test]
    fn test_padding_before_wide_field() {
        let layout = layout_of(&[("tag", IrType::I8), ("value", IrType::I64)]);
        assert_eq!(layout.fields[0].offset, 0);
        assert_eq!(layout.fields[1].offset, 8);
        assert_eq!(layout.size, 16);
        assert_eq!(layout.align, 8);
    }

    #[test]
    fn test_tail_padding() {
        let layout = layout_of(&[("value", IrType::I64), ("tag", IrType::I8)]);
        assert_eq!(layout.fields[1].offset, 8);
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn test_empty_struct() {
        let layout = layout_of(&[]);
        assert_eq!(layout.size, 0);
        assert_eq!(layout.align, 1);
    }

    #[test]
    fn test_layout_invariants() {
        let layout = layout_of(&[
            ("a", IrType::Bool),
            ("b", IrType::I16),
            ("c", IrType::I8),
            ("d", IrType::F64),
            ("e", IrType::I32),
        ]);
        assert_eq!(layout.size % layout.align, 0);
        for pair in layout.fields.windows(2) {
            assert!(pair[1].offset >= pair[0].offset + pair[0].ty.size_in_bytes());
            assert_eq!(pair[1].offset % pair[1].ty.align(), 0);
        }
    }

    #[test]
    fn test_nested_struct_field() {
        let inner = layout_of(&[("x", IrType::F32), ("y", IrType::F32)]);
        let outer = layout_of(&[("id", IrType::I8), ("pos", IrType::Struct(inner))]);
        assert_eq!(outer.fields[1].offset, 4);
        assert_eq!(outer.size, 12);
        assert_eq!(outer.align, 4);
    }

    #[test]
    fn test_primitive_sizes() {
        assert_eq!(IrType::I8.size_in_bytes(), 1);
        assert_eq!(IrType::I16.size_in_bytes(), 2);
        assert_eq!(IrType::I32.size_in_bytes(), 4);
        assert_eq!(IrType::I64.size_in_bytes(), 8);
        assert_eq!(IrType::Bool.size_in_bytes(), 1);
        assert_eq!(IrType::Void.size_in_bytes(), 0);
        assert_eq!(IrType::Ptr.size_in_bytes(), 8);
        assert_eq!(IrType::ptr_to(IrType::I32).size_in_bytes(), 8);
    }

    #[test]
    fn test_void_aligns_to_one() {
        assert_eq!(IrType::Void.align(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(IrType::I32.to_string(), "i32");
        assert_eq!(IrType::ptr_to(IrType::F64).to_string(), "ptr<f64>");
        let layout = layout_of(&[]);
        assert_eq!(IrType::Struct(layout).to_string(), "struct Test");
    }
}
