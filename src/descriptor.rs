//! The capability set the generator needs from whatever knows about types.
//!
//! Backings only have to answer questions about *their* types (members, enums,
//! external parseables). Questions about std shapes are answered here by default,
//! purely from the spelling of the type.
use serde::Serialize;

use crate::shape::TypeShape;

/// A publicly writable member of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    /// Rust field identifier.
    pub field: String,
    /// Key looked up in the data source.
    pub key: String,
    #[serde(rename = "type")]
    pub ty: TypeShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumVariant {
    pub name: String,
    /// Discriminant, explicit or implied by declaration order.
    pub value: i64,
}

/// Integer and float primitives plus the std `FromStr` types worth binding.
const STD_PARSEABLE: &[&str] = &[
    "bool", "char",
    "i8", "i16", "i32", "i64", "i128", "isize",
    "u8", "u16", "u32", "u64", "u128", "usize",
    "f32", "f64",
    "NonZeroI8", "NonZeroI16", "NonZeroI32", "NonZeroI64", "NonZeroI128", "NonZeroIsize",
    "NonZeroU8", "NonZeroU16", "NonZeroU32", "NonZeroU64", "NonZeroU128", "NonZeroUsize",
    "IpAddr", "Ipv4Addr", "Ipv6Addr", "SocketAddr", "SocketAddrV4", "SocketAddrV6",
    "PathBuf",
];

const SEQUENCE_TYPES: &[&str] = &["VecDeque", "LinkedList", "HashSet", "BTreeSet"];
const DICTIONARY_TYPES: &[&str] = &["HashMap", "BTreeMap"];

pub trait TypeDescriptor {
    /// Writable members in declaration order. Read-only members are not returned.
    fn writable_members(&self, ty: &TypeShape) -> Vec<Member>;

    /// Variants when `ty` is an enum, `None` otherwise.
    fn enum_variants(&self, ty: &TypeShape) -> Option<Vec<EnumVariant>>;

    /// The data source's own node type, assigned without parsing.
    fn is_section_passthrough(&self, ty: &TypeShape) -> bool;

    /// Types exposing `FromStr`, std ones included.
    fn has_try_parse(&self, ty: &TypeShape) -> bool {
        is_std_parseable(ty)
    }

    fn is_string(&self, ty: &TypeShape) -> bool {
        ty.is_std("String") && ty.args().is_empty()
    }

    fn is_byte_sequence(&self, ty: &TypeShape) -> bool {
        let byte = TypeShape::named("u8");
        ty.std_args("Vec", 1).is_some_and(|args| args[0] == byte)
            || ty.boxed_slice_element("Box") == Some(&byte)
    }

    fn is_enum(&self, ty: &TypeShape) -> bool {
        self.enum_variants(ty).is_some()
    }

    /// Variable-length arrays: `Vec<T>` and `Box<[T]>`.
    fn array_element(&self, ty: &TypeShape) -> Option<TypeShape> {
        ty.std_args("Vec", 1)
            .map(|args| &args[0])
            .or_else(|| ty.boxed_slice_element("Box"))
            .cloned()
    }

    /// Other collections that can be built from an ordered run of elements.
    fn sequence_element(&self, ty: &TypeShape) -> Option<TypeShape> {
        let listed = SEQUENCE_TYPES
            .iter()
            .find_map(|name| ty.std_args(name, 1))
            .or_else(|| indexmap_args(ty, "IndexSet", 1));
        if let Some(args) = listed {
            return Some(args[0].clone());
        }
        ["Rc", "Arc"]
            .iter()
            .find_map(|ptr| ty.boxed_slice_element(ptr))
            .cloned()
    }

    /// Maps keyed by the child's key token: `HashMap`, `BTreeMap`, `IndexMap`.
    fn dictionary_entry(&self, ty: &TypeShape) -> Option<(TypeShape, TypeShape)> {
        DICTIONARY_TYPES
            .iter()
            .find_map(|name| ty.std_args(name, 2))
            .or_else(|| indexmap_args(ty, "IndexMap", 2))
            .map(|args| (args[0].clone(), args[1].clone()))
    }

    /// Closed shapes that look like collections but cannot be filled from a
    /// variable number of children: `[T; N]`, bare `[T]`, and maps carrying an
    /// explicit hasher argument.
    fn is_unsupported_generic(&self, ty: &TypeShape) -> bool {
        match ty {
            TypeShape::Array { .. } | TypeShape::Slice(_) => true,
            TypeShape::Path { .. } => {
                DICTIONARY_TYPES.iter().any(|name| ty.std_args(name, 3).is_some())
                    || ty.std_args("HashSet", 2).is_some()
                    || indexmap_args(ty, "IndexMap", 3).is_some()
                    || indexmap_args(ty, "IndexSet", 2).is_some()
            }
        }
    }
}

/// Primitives and std types implementing `FromStr`.
pub fn is_std_parseable(ty: &TypeShape) -> bool {
    ty.args().is_empty() && STD_PARSEABLE.iter().any(|name| ty.is_std(name))
}

fn indexmap_args<'t>(ty: &'t TypeShape, name: &str, arity: usize) -> Option<&'t [TypeShape]> {
    if ty.is_named_in(name, &["indexmap"]) && ty.args().len() == arity {
        Some(ty.args())
    } else {
        None
    }
}
