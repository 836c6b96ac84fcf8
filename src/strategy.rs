//! Member type → binding strategy.
//!
//! Classification is pure and total. Rules are tried in a fixed order and the first
//! match wins, so the order below is load-bearing: `Vec<u8>` is array-shaped but
//! must decode as base64, and a `HashMap` would otherwise end up as a nested record.
use std::fmt;

use serde::{Serialize, Serializer};

use crate::descriptor::TypeDescriptor;
use crate::shape::TypeShape;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingStrategy {
    StringLeaf,
    Base64Bytes,
    SectionPassthrough,
    EnumParse {
        target: TypeShape,
    },
    SequenceOf {
        element: TypeShape,
        strategy: Box<BindingStrategy>,
    },
    DictionaryOf {
        key: TypeShape,
        key_strategy: Box<BindingStrategy>,
        value: TypeShape,
        value_strategy: Box<BindingStrategy>,
    },
    TryParseLeaf {
        target: TypeShape,
    },
    NestedObject {
        target: TypeShape,
    },
    Unsupported {
        reason: UnsupportedReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// Collection-like, but cannot be built from a variable number of children.
    ClosedGeneric(TypeShape),
    DictionaryKey(TypeShape),
    /// An element or value type that is itself unsupported.
    Inner {
        ty: TypeShape,
        reason: Box<UnsupportedReason>,
    },
    NestedOption,
    BoxedLeaf(TypeShape),
}

impl BindingStrategy {
    /// Strategies that produce a value from a single string (or node) without
    /// statements of their own.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            BindingStrategy::StringLeaf
                | BindingStrategy::Base64Bytes
                | BindingStrategy::SectionPassthrough
                | BindingStrategy::EnumParse { .. }
                | BindingStrategy::TryParseLeaf { .. }
        )
    }

    fn unsupported(reason: UnsupportedReason) -> Self {
        BindingStrategy::Unsupported { reason }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLUTION
// ————————————————————————————————————————————————————————————————————————————

pub fn resolve<D: TypeDescriptor + ?Sized>(descriptor: &D, ty: &TypeShape) -> BindingStrategy {
    // `Option<T>` binds as `T`; absence is the emitter's concern
    if let Some(inner) = ty.option_inner() {
        if inner.option_inner().is_some() {
            return BindingStrategy::unsupported(UnsupportedReason::NestedOption);
        }
        return resolve(descriptor, inner);
    }

    // `Box<T>` only makes sense as the indirection of a recursive record
    if let Some(inner) = ty.box_inner() {
        return match resolve(descriptor, inner) {
            nested @ BindingStrategy::NestedObject { .. } if inner.option_inner().is_none() => nested,
            unsupported @ BindingStrategy::Unsupported { .. } => unsupported,
            _ => BindingStrategy::unsupported(UnsupportedReason::BoxedLeaf(ty.clone())),
        };
    }

    resolve_core(descriptor, ty)
}

fn resolve_core<D: TypeDescriptor + ?Sized>(descriptor: &D, ty: &TypeShape) -> BindingStrategy {
    // 1) Strings
    if descriptor.is_string(ty) {
        return BindingStrategy::StringLeaf;
    }

    // 2) Bytes, before the array rule can see them
    if descriptor.is_byte_sequence(ty) {
        return BindingStrategy::Base64Bytes;
    }

    // 3) The data source's own node type
    if descriptor.is_section_passthrough(ty) {
        return BindingStrategy::SectionPassthrough;
    }

    // 4) Enums
    if descriptor.is_enum(ty) {
        return BindingStrategy::EnumParse { target: ty.canonical() };
    }

    // 5) Arrays and sequence-like collections
    if let Some(element) = descriptor
        .array_element(ty)
        .or_else(|| descriptor.sequence_element(ty))
    {
        return sequence_of(descriptor, element);
    }

    // 6) Dictionaries
    if let Some((key, value)) = descriptor.dictionary_entry(ty) {
        return dictionary_of(descriptor, key, value);
    }

    // 7) Anything with `FromStr`
    if descriptor.has_try_parse(ty) {
        return BindingStrategy::TryParseLeaf { target: ty.clone() };
    }

    // 8) Closed collection shapes we refuse to guess at
    if descriptor.is_unsupported_generic(ty) {
        return BindingStrategy::unsupported(UnsupportedReason::ClosedGeneric(ty.clone()));
    }

    // 9) Everything else is a record with a binder of its own
    BindingStrategy::NestedObject { target: ty.binding_identity() }
}

fn sequence_of<D: TypeDescriptor + ?Sized>(descriptor: &D, element: TypeShape) -> BindingStrategy {
    // string elements are taken as raw values, no recursion
    if descriptor.is_string(&element) {
        return BindingStrategy::SequenceOf { element, strategy: Box::new(BindingStrategy::StringLeaf) };
    }
    match resolve(descriptor, &element) {
        BindingStrategy::Unsupported { reason } => BindingStrategy::unsupported(UnsupportedReason::Inner {
            ty: element,
            reason: Box::new(reason),
        }),
        strategy => BindingStrategy::SequenceOf { element, strategy: Box::new(strategy) },
    }
}

fn dictionary_of<D: TypeDescriptor + ?Sized>(
    descriptor: &D,
    key: TypeShape,
    value: TypeShape,
) -> BindingStrategy {
    let key_strategy = resolve(descriptor, &key);
    let key_ok = matches!(
        key_strategy,
        BindingStrategy::StringLeaf | BindingStrategy::EnumParse { .. } | BindingStrategy::TryParseLeaf { .. }
    );
    if !key_ok || key.option_inner().is_some() {
        return BindingStrategy::unsupported(UnsupportedReason::DictionaryKey(key));
    }

    match resolve(descriptor, &value) {
        BindingStrategy::Unsupported { reason } => BindingStrategy::unsupported(UnsupportedReason::Inner {
            ty: value,
            reason: Box::new(reason),
        }),
        value_strategy => BindingStrategy::DictionaryOf {
            key,
            key_strategy: Box::new(key_strategy),
            value,
            value_strategy: Box::new(value_strategy),
        },
    }
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedReason::ClosedGeneric(ty) => {
                write!(f, "`{ty}` cannot be built from a variable number of entries")
            }
            UnsupportedReason::DictionaryKey(key) => {
                write!(f, "dictionary keys must be strings, enums or parseable, not `{key}`")
            }
            UnsupportedReason::Inner { ty, reason } => write!(f, "`{ty}`: {reason}"),
            UnsupportedReason::NestedOption => {
                f.write_str("a nested `Option` cannot be told apart from an absent value")
            }
            UnsupportedReason::BoxedLeaf(ty) => write!(f, "`{ty}` boxes a leaf; only records may be boxed"),
        }
    }
}

impl Serialize for UnsupportedReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::descriptor::{EnumVariant, Member};

    /// Knows one enum and one external parseable; everything else is a record.
    struct Fixture;

    impl TypeDescriptor for Fixture {
        fn writable_members(&self, _ty: &TypeShape) -> Vec<Member> {
            Vec::new()
        }

        fn enum_variants(&self, ty: &TypeShape) -> Option<Vec<EnumVariant>> {
            (ty.to_string() == "Level").then(|| {
                vec![EnumVariant { name: "Low".into(), value: 0 }]
            })
        }

        fn is_section_passthrough(&self, ty: &TypeShape) -> bool {
            ty.name() == Some("ConfigSection")
        }

        fn has_try_parse(&self, ty: &TypeShape) -> bool {
            // an enum that also parses must still resolve as an enum
            ty.to_string() == "url::Url" || ty.to_string() == "Level" || {
                ty.args().is_empty() && ["i32", "u16", "bool"].contains(&ty.to_string().as_str())
            }
        }
    }

    fn strategy(src: &str) -> BindingStrategy {
        resolve(&Fixture, &TypeShape::parse(src).unwrap())
    }

    fn shape(src: &str) -> TypeShape {
        TypeShape::parse(src).unwrap()
    }

    #[test]
    fn leaves() {
        assert_eq!(strategy("String"), BindingStrategy::StringLeaf);
        assert_eq!(strategy("std::string::String"), BindingStrategy::StringLeaf);
        assert_eq!(strategy("ConfigSection"), BindingStrategy::SectionPassthrough);
        assert_eq!(strategy("i32"), BindingStrategy::TryParseLeaf { target: shape("i32") });
        assert_eq!(strategy("url::Url"), BindingStrategy::TryParseLeaf { target: shape("url::Url") });
        assert_eq!(strategy("Level"), BindingStrategy::EnumParse { target: shape("Level") });
    }

    #[test]
    fn bytes_never_take_the_sequence_path() {
        assert_eq!(strategy("Vec<u8>"), BindingStrategy::Base64Bytes);
        assert_eq!(strategy("Box<[u8]>"), BindingStrategy::Base64Bytes);
        assert_eq!(
            strategy("Vec<u16>"),
            BindingStrategy::SequenceOf {
                element: shape("u16"),
                strategy: Box::new(BindingStrategy::TryParseLeaf { target: shape("u16") }),
            }
        );
    }

    #[test]
    fn string_sequences_are_raw_leaves() {
        for src in ["Vec<String>", "VecDeque<String>", "BTreeSet<String>", "Arc<[String]>"] {
            assert_eq!(
                strategy(src),
                BindingStrategy::SequenceOf {
                    element: shape("String"),
                    strategy: Box::new(BindingStrategy::StringLeaf),
                },
                "{src}"
            );
        }
    }

    #[test]
    fn record_sequences_recurse() {
        assert_eq!(
            strategy("Vec<Item>"),
            BindingStrategy::SequenceOf {
                element: shape("Item"),
                strategy: Box::new(BindingStrategy::NestedObject { target: shape("Item") }),
            }
        );
    }

    #[test]
    fn dictionaries_check_their_key() {
        assert_eq!(
            strategy("HashMap<Level, Item>"),
            BindingStrategy::DictionaryOf {
                key: shape("Level"),
                key_strategy: Box::new(BindingStrategy::EnumParse { target: shape("Level") }),
                value: shape("Item"),
                value_strategy: Box::new(BindingStrategy::NestedObject { target: shape("Item") }),
            }
        );
        assert!(matches!(strategy("indexmap::IndexMap<String, i32>"), BindingStrategy::DictionaryOf { .. }));
        assert_eq!(
            strategy("BTreeMap<Item, i32>"),
            BindingStrategy::Unsupported { reason: UnsupportedReason::DictionaryKey(shape("Item")) }
        );
        assert_eq!(
            strategy("HashMap<Option<i32>, i32>"),
            BindingStrategy::Unsupported { reason: UnsupportedReason::DictionaryKey(shape("Option<i32>")) }
        );
    }

    #[test]
    fn closed_generics_are_flagged() {
        for src in ["[i32; 4]", "HashMap<String, i32, Hasher>", "indexmap::IndexMap<String, i32, Hasher>"] {
            assert_eq!(
                strategy(src),
                BindingStrategy::Unsupported { reason: UnsupportedReason::ClosedGeneric(shape(src)) },
                "{src}"
            );
        }
        assert!(matches!(
            strategy("Vec<[u8; 2]>"),
            BindingStrategy::Unsupported { reason: UnsupportedReason::Inner { .. } }
        ));
    }

    #[test]
    fn wrappers() {
        assert_eq!(strategy("Option<i32>"), BindingStrategy::TryParseLeaf { target: shape("i32") });
        assert_eq!(
            strategy("Option<Box<Node>>"),
            BindingStrategy::NestedObject { target: shape("Node") }
        );
        assert_eq!(
            strategy("Option<Option<i32>>"),
            BindingStrategy::Unsupported { reason: UnsupportedReason::NestedOption }
        );
        assert_eq!(
            strategy("Box<i32>"),
            BindingStrategy::Unsupported { reason: UnsupportedReason::BoxedLeaf(shape("Box<i32>")) }
        );
    }

    #[test]
    fn unknown_types_are_records() {
        assert_eq!(
            strategy("crate::net::Endpoint"),
            BindingStrategy::NestedObject { target: shape("crate::net::Endpoint") }
        );
    }
}
