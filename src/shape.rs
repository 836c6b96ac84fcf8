//! Parsed Rust type expressions.
//!
//! `TypeShape` is the unit the generator reasons about: the declared type of a
//! member, or a type that needs a binder of its own. Nothing semantic lives here.
//! Whether a shape is an enum, a record or a parseable leaf is the descriptor's call.
use std::fmt;

use heck::ToSnakeCase;
use serde::{Serialize, Serializer};

/// Crate roots under which well-known std names are recognized.
const STD_ROOTS: &[&str] = &["std", "alloc", "core"];

/// Std names that collapse to their bare spelling for identity purposes.
const WELL_KNOWN: &[&str] = &[
    "String", "Vec", "Option", "Box", "Rc", "Arc",
    "HashMap", "HashSet", "BTreeMap", "BTreeSet", "VecDeque", "LinkedList",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeShape {
    /// `a::b::Name<Args..>`; a leading `::` is dropped.
    Path {
        segments: Vec<String>,
        args: Vec<TypeShape>,
    },
    /// `[T; N]`, with `N` kept as written (a literal or a const name).
    Array {
        element: Box<TypeShape>,
        len: String,
    },
    /// `[T]`, only meaningful behind a pointer (`Box<[T]>`, `Arc<[T]>`).
    Slice(Box<TypeShape>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type `{src}` at offset {offset}: {reason}")]
pub struct ShapeError {
    pub src: String,
    pub offset: usize,
    pub reason: &'static str,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl TypeShape {
    pub fn parse(src: &str) -> Result<Self, ShapeError> {
        let mut parser = Parser { src, pos: 0 };
        let ty = parser.ty()?;
        parser.skip_ws();
        if parser.pos != src.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }

    /// Single-segment path without generic arguments.
    pub fn named(name: &str) -> Self {
        TypeShape::Path { segments: vec![name.to_owned()], args: Vec::new() }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INSPECTION
// ————————————————————————————————————————————————————————————————————————————

impl TypeShape {
    /// Last path segment.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeShape::Path { segments, .. } => segments.last().map(String::as_str),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeShape] {
        match self {
            TypeShape::Path { args, .. } => args,
            _ => &[],
        }
    }

    /// True when the last segment is `name` and the path is either bare or rooted
    /// in one of `crates`.
    pub fn is_named_in(&self, name: &str, crates: &[&str]) -> bool {
        match self {
            TypeShape::Path { segments, .. } => {
                segments.last().is_some_and(|last| last == name)
                    && (segments.len() == 1 || crates.contains(&segments[0].as_str()))
            }
            _ => false,
        }
    }

    pub fn is_std(&self, name: &str) -> bool {
        self.is_named_in(name, STD_ROOTS)
    }

    /// Generic arguments of a std type `name` with exactly `arity` arguments.
    pub fn std_args(&self, name: &str, arity: usize) -> Option<&[TypeShape]> {
        if self.is_std(name) && self.args().len() == arity {
            Some(self.args())
        } else {
            None
        }
    }

    pub fn option_inner(&self) -> Option<&TypeShape> {
        self.std_args("Option", 1).map(|args| &args[0])
    }

    /// `Box<T>` for a sized `T`. `Box<[T]>` is a sequence, not an indirection.
    pub fn box_inner(&self) -> Option<&TypeShape> {
        match self.std_args("Box", 1) {
            Some([TypeShape::Slice(_)]) | None => None,
            Some(args) => Some(&args[0]),
        }
    }

    /// The element of `Ptr<[T]>` for a std pointer `Ptr`.
    pub fn boxed_slice_element(&self, ptr: &str) -> Option<&TypeShape> {
        match self.std_args(ptr, 1) {
            Some([TypeShape::Slice(element)]) => Some(element.as_ref()),
            _ => None,
        }
    }

    /// Ledger key: the same record reached as `T`, `Box<T>`, `Option<T>` or
    /// `std::boxed::Box<T>` is one type.
    pub fn binding_identity(&self) -> TypeShape {
        let mut current = self;
        loop {
            if let Some(inner) = current.option_inner() {
                current = inner;
            } else if let Some(inner) = current.box_inner() {
                current = inner;
            } else {
                break;
            }
        }
        current.canonical()
    }

    /// Collapses well-known std paths (`std::string::String` → `String`).
    pub fn canonical(&self) -> TypeShape {
        match self {
            TypeShape::Path { segments, args } => {
                let args = args.iter().map(TypeShape::canonical).collect();
                let known = segments.len() > 1
                    && STD_ROOTS.contains(&segments[0].as_str())
                    && segments.last().is_some_and(|last| WELL_KNOWN.contains(&last.as_str()));
                let segments = match (known, segments.last()) {
                    (true, Some(last)) => vec![last.clone()],
                    _ => segments.clone(),
                };
                TypeShape::Path { segments, args }
            }
            TypeShape::Array { element, len } => TypeShape::Array {
                element: Box::new(element.canonical()),
                len: len.clone(),
            },
            TypeShape::Slice(element) => TypeShape::Slice(Box::new(element.canonical())),
        }
    }

    /// snake_case fragment for generated function names.
    pub fn symbol(&self) -> String {
        match self {
            TypeShape::Path { segments, args } => {
                let mut parts = segments
                    .iter()
                    .filter(|s| !matches!(s.as_str(), "crate" | "self" | "super"))
                    .map(|s| s.to_snake_case())
                    .collect::<Vec<_>>();
                parts.extend(args.iter().map(TypeShape::symbol));
                parts.join("_")
            }
            TypeShape::Array { element, len } => {
                format!("array_{}_{}", element.symbol(), len.to_snake_case())
            }
            TypeShape::Slice(element) => format!("slice_{}", element.symbol()),
        }
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Path { segments, args } => {
                f.write_str(&segments.join("::"))?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeShape::Array { element, len } => write!(f, "[{element}; {len}]"),
            TypeShape::Slice(element) => write!(f, "[{element}]"),
        }
    }
}

impl Serialize for TypeShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &'static str) -> ShapeError {
        ShapeError { src: self.src.to_owned(), offset: self.pos, reason }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> &'a str {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn ident(&mut self) -> Result<String, ShapeError> {
        let start = self.pos;
        let word = self.word();
        if word.is_empty() || word.starts_with(|c: char| c.is_ascii_digit()) {
            self.pos = start;
            return Err(self.error("expected identifier"));
        }
        Ok(word.to_owned())
    }

    fn ty(&mut self) -> Result<TypeShape, ShapeError> {
        if self.eat("[") {
            let element = Box::new(self.ty()?);
            if self.eat(";") {
                let len = self.word();
                if len.is_empty() {
                    return Err(self.error("expected array length"));
                }
                let len = len.to_owned();
                if !self.eat("]") {
                    return Err(self.error("expected `]`"));
                }
                return Ok(TypeShape::Array { element, len });
            }
            if !self.eat("]") {
                return Err(self.error("expected `]` or `;`"));
            }
            return Ok(TypeShape::Slice(element));
        }

        self.eat("::");
        let mut segments = vec![self.ident()?];
        while self.eat("::") {
            segments.push(self.ident()?);
        }

        let mut args = Vec::new();
        if self.eat("<") {
            loop {
                args.push(self.ty()?);
                if self.eat(",") {
                    // trailing comma
                    if self.eat(">") {
                        break;
                    }
                    continue;
                }
                if self.eat(">") {
                    break;
                }
                return Err(self.error("expected `,` or `>`"));
            }
        }
        Ok(TypeShape::Path { segments, args })
    }
}
