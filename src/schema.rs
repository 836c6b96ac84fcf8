//! Schema files: the type facts the generator cannot see for itself.
//!
//! A schema declares the record types (their fields, keys and writability), the
//! enums, extra `FromStr` types, and which records are roots. Several files merge
//! into one `Schema`, which then answers the generator's type questions.
use std::fs;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::config::{GeneratorOptions, PartialOptions};
use crate::descriptor::{EnumVariant, Member, TypeDescriptor, is_std_parseable};
use crate::emit::FORBIDDEN_IDENTS;
use crate::error::{Error, Result};
use crate::shape::TypeShape;

static IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Crate under which the runtime's node type may also be spelled.
const RUNTIME_CRATE: &str = "config_bindgen";

// ————————————————————————————————————————————————————————————————————————————
// FILE FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    options: PartialOptions,
    #[serde(default)]
    roots: Vec<String>,
    #[serde(default)]
    structs: IndexMap<String, StructDecl>,
    #[serde(default)]
    enums: IndexMap<String, EnumDecl>,
    #[serde(default)]
    parseable: Vec<String>,
    #[serde(default)]
    section_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StructDecl {
    #[serde(default)]
    root: bool,
    #[serde(default)]
    fields: Vec<FieldDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDecl {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    /// Data-source key; the field name when omitted.
    #[serde(default)]
    key: Option<String>,
    #[serde(default = "writable_by_default")]
    writable: bool,
}

fn writable_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnumDecl {
    variants: Vec<VariantDecl>,
}

/// `"Name"`, or `{ "name": "Name", "value": 4 }` for an explicit discriminant.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VariantDecl {
    Implicit(String),
    Explicit { name: String, value: i64 },
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
struct Field {
    member: Member,
    writable: bool,
}

#[derive(Debug, Clone)]
pub struct Schema {
    options: GeneratorOptions,
    roots: IndexSet<TypeShape>,
    structs: IndexMap<TypeShape, Vec<Field>>,
    enums: IndexMap<TypeShape, Vec<EnumVariant>>,
    parseable: IndexSet<TypeShape>,
    section_type: TypeShape,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            options: GeneratorOptions::default(),
            roots: IndexSet::new(),
            structs: IndexMap::new(),
            enums: IndexMap::new(),
            parseable: IndexSet::new(),
            section_type: TypeShape::named("ConfigSection"),
        }
    }
}

impl Schema {
    /// Reads and merges `paths` in order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut schema = Schema::default();
        for path in paths {
            let path = path.as_ref();
            let src = fs::read_to_string(path).map_err(|source| Error::Io {
                path: path.to_owned(),
                source,
            })?;
            schema.extend_from_str(&src, &path.display().to_string())?;
            tracing::debug!(path = %path.display(), "loaded schema");
        }
        schema.check_roots()?;
        Ok(schema)
    }

    /// A single schema document; `origin` names it in errors.
    pub fn parse(src: &str, origin: &str) -> Result<Self> {
        let mut schema = Schema::default();
        schema.extend_from_str(src, origin)?;
        schema.check_roots()?;
        Ok(schema)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let mut schema = Schema::default();
        let file = decode(value, "<inline>")?;
        schema.absorb(file, "<inline>")?;
        schema.check_roots()?;
        Ok(schema)
    }

    /// Merges one more document. Roots are not checked until the caller is done
    /// merging, since a root may be declared by a later file.
    pub fn extend_from_str(&mut self, src: &str, origin: &str) -> Result<()> {
        let mut de = serde_json::Deserializer::from_str(src);
        let file = decode(&mut de, origin)?;
        de.end().map_err(|err| Error::Schema {
            origin: origin.to_owned(),
            path: ".".to_owned(),
            message: err.to_string(),
        })?;
        self.absorb(file, origin)
    }

    pub fn check_roots(&self) -> Result<()> {
        match self.roots.iter().find(|root| !self.structs.contains_key(*root)) {
            Some(root) => Err(Error::UnknownRoot(root.to_string())),
            None => Ok(()),
        }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut GeneratorOptions {
        &mut self.options
    }

    /// Roots in discovery order: each file's `roots` list, then its structs marked
    /// `"root": true`.
    pub fn roots(&self) -> Vec<TypeShape> {
        self.roots.iter().cloned().collect()
    }

    fn absorb(&mut self, file: SchemaFile, origin: &str) -> Result<()> {
        self.options.merge(file.options);
        if let Some(section_type) = file.section_type {
            self.section_type = declared(origin, &section_type)?;
        }

        for name in &file.roots {
            self.roots.insert(declared(origin, name)?);
        }

        for (name, decl) in file.structs {
            let ty = self.claim(origin, &name)?;
            let owner = format!("{origin}: struct {name}");
            let fields = decl
                .fields
                .into_iter()
                .map(|field| field.resolve(&owner))
                .collect::<Result<Vec<_>>>()?;
            if decl.root {
                self.roots.insert(ty.clone());
            }
            self.structs.insert(ty, fields);
        }

        for (name, decl) in file.enums {
            let ty = self.claim(origin, &name)?;
            let owner = format!("{origin}: enum {name}");
            let variants = decl.resolve(&owner)?;
            self.enums.insert(ty, variants);
        }

        for name in &file.parseable {
            let ty = self.claim(origin, name)?;
            self.parseable.insert(ty);
        }
        Ok(())
    }

    /// Parses a declared type name, refusing a second declaration of the same type.
    fn claim(&self, origin: &str, name: &str) -> Result<TypeShape> {
        let ty = declared(origin, name)?;
        if self.structs.contains_key(&ty) || self.enums.contains_key(&ty) || self.parseable.contains(&ty) {
            return Err(Error::DuplicateType(ty.to_string()));
        }
        Ok(ty)
    }
}

impl FieldDecl {
    fn resolve(self, owner: &str) -> Result<Field> {
        check_ident(owner, &self.name)?;
        let ty = TypeShape::parse(&self.ty).map_err(|source| Error::Shape {
            owner: format!("{owner}.{}", self.name),
            source,
        })?;
        let key = self.key.unwrap_or_else(|| self.name.clone());
        Ok(Field {
            member: Member { field: self.name, key, ty },
            writable: self.writable,
        })
    }
}

impl EnumDecl {
    /// Implicit discriminants continue from the previous variant, as in Rust.
    fn resolve(self, owner: &str) -> Result<Vec<EnumVariant>> {
        let mut next = 0i64;
        let mut variants = Vec::with_capacity(self.variants.len());
        for decl in self.variants {
            let (name, value) = match decl {
                VariantDecl::Implicit(name) => (name, next),
                VariantDecl::Explicit { name, value } => (name, value),
            };
            check_ident(owner, &name)?;
            next = value.wrapping_add(1);
            variants.push(EnumVariant { name, value });
        }
        Ok(variants)
    }
}

fn check_ident(owner: &str, name: &str) -> Result<()> {
    if IDENT.is_match(name) && !FORBIDDEN_IDENTS.contains(&name) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier { owner: owner.to_owned(), name: name.to_owned() })
    }
}

fn declared(origin: &str, name: &str) -> Result<TypeShape> {
    TypeShape::parse(name)
        .map(|ty| ty.canonical())
        .map_err(|source| Error::Shape { owner: origin.to_owned(), source })
}

fn decode<'de, D: Deserializer<'de>>(de: D, origin: &str) -> Result<SchemaFile> {
    serde_path_to_error::deserialize(de).map_err(|err| Error::Schema {
        origin: origin.to_owned(),
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

// ————————————————————————————————————————————————————————————————————————————
// DESCRIPTOR
// ————————————————————————————————————————————————————————————————————————————

impl TypeDescriptor for Schema {
    fn writable_members(&self, ty: &TypeShape) -> Vec<Member> {
        let Some(fields) = self.structs.get(&ty.binding_identity()) else {
            tracing::warn!(%ty, "type is not declared in any schema, binding no members");
            return Vec::new();
        };
        fields
            .iter()
            .filter(|field| {
                if !field.writable {
                    tracing::debug!(%ty, field = %field.member.field, "skipping read-only member");
                }
                field.writable
            })
            .map(|field| field.member.clone())
            .collect()
    }

    fn enum_variants(&self, ty: &TypeShape) -> Option<Vec<EnumVariant>> {
        self.enums.get(&ty.canonical()).cloned()
    }

    fn is_section_passthrough(&self, ty: &TypeShape) -> bool {
        let ty = ty.canonical();
        if ty == self.section_type {
            return true;
        }
        // the default node type, spelled through the runtime crate
        self.section_type.name().is_some_and(|name| {
            ty.args().is_empty() && ty.is_named_in(name, &[RUNTIME_CRATE])
        })
    }

    fn has_try_parse(&self, ty: &TypeShape) -> bool {
        is_std_parseable(ty) || self.parseable.contains(&ty.canonical())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn shape(src: &str) -> TypeShape {
        TypeShape::parse(src).unwrap()
    }

    fn sample() -> Schema {
        Schema::from_value(json!({
            "options": { "registry": true },
            "roots": ["Other"],
            "structs": {
                "App": { "root": true, "fields": [
                    { "name": "name", "type": "String", "key": "Name" },
                    { "name": "port", "type": "u16" },
                    { "name": "computed", "type": "u32", "writable": false },
                ] },
                "Other": {},
            },
            "enums": { "Level": { "variants": ["Low", { "name": "Mid", "value": 10 }, "High"] } },
            "parseable": ["url::Url"],
        }))
        .unwrap()
    }

    #[test]
    fn members_default_their_key_and_skip_read_only() {
        let schema = sample();
        let members = schema.writable_members(&shape("App"));
        assert_eq!(
            members,
            vec![
                Member { field: "name".into(), key: "Name".into(), ty: shape("String") },
                Member { field: "port".into(), key: "port".into(), ty: shape("u16") },
            ]
        );
        // wrappers name the same record
        assert_eq!(schema.writable_members(&shape("Option<Box<App>>")).len(), 2);
        assert!(schema.writable_members(&shape("Unknown")).is_empty());
    }

    #[test]
    fn roots_list_comes_before_marked_structs() {
        let schema = sample();
        assert_eq!(schema.roots(), vec![shape("Other"), shape("App")]);
        assert!(schema.options().registry);
    }

    #[test]
    fn implicit_discriminants_follow_explicit_ones() {
        let variants = sample().enum_variants(&shape("Level")).unwrap();
        let values = variants.iter().map(|v| (v.name.as_str(), v.value)).collect::<Vec<_>>();
        assert_eq!(values, vec![("Low", 0), ("Mid", 10), ("High", 11)]);
    }

    #[test]
    fn parseables_and_section_spellings() {
        let schema = sample();
        assert!(schema.has_try_parse(&shape("url::Url")));
        assert!(schema.has_try_parse(&shape("std::net::IpAddr")));
        assert!(!schema.has_try_parse(&shape("App")));
        assert!(schema.is_section_passthrough(&shape("ConfigSection")));
        assert!(schema.is_section_passthrough(&shape("::config_bindgen::runtime::ConfigSection")));
        assert!(!schema.is_section_passthrough(&shape("other::ConfigSection")));
    }

    #[test]
    fn unknown_keys_report_their_json_path() {
        let err = Schema::from_value(json!({
            "structs": { "A": { "fields": [{ "name": "x", "type": "i32", "colour": 1 }] } }
        }))
        .unwrap_err();
        match err {
            Error::Schema { path, message, .. } => {
                assert!(path.starts_with("structs.A.fields"), "{path}");
                assert!(message.contains("colour"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_bad_declarations() {
        let bad_ident = Schema::from_value(json!({
            "structs": { "A": { "fields": [{ "name": "not-an-ident", "type": "i32" }] } }
        }));
        assert!(matches!(bad_ident, Err(Error::InvalidIdentifier { .. })));

        let bad_type = Schema::from_value(json!({
            "structs": { "A": { "fields": [{ "name": "x", "type": "Vec<" }] } }
        }));
        assert!(matches!(bad_type, Err(Error::Shape { .. })));

        let unknown_root = Schema::from_value(json!({ "roots": ["Missing"] }));
        assert!(matches!(unknown_root, Err(Error::UnknownRoot(name)) if name == "Missing"));

        let enum_root = Schema::from_value(json!({
            "roots": ["Level"],
            "enums": { "Level": { "variants": ["A"] } },
        }));
        assert!(matches!(enum_root, Err(Error::UnknownRoot(_))));
    }

    #[test]
    fn merging_files() {
        let mut schema = Schema::default();
        schema
            .extend_from_str(r#"{ "roots": ["B"], "options": { "runtime": "rt" } }"#, "a.json")
            .unwrap();
        // the root is declared by the second file
        schema
            .extend_from_str(r#"{ "structs": { "B": {} }, "options": { "registry": true } }"#, "b.json")
            .unwrap();
        schema.check_roots().unwrap();
        assert_eq!(schema.options().runtime, "rt");
        assert!(schema.options().registry);

        let dup = schema.extend_from_str(r#"{ "enums": { "B": { "variants": [] } } }"#, "c.json");
        assert!(matches!(dup, Err(Error::DuplicateType(name)) if name == "B"));
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        assert!(matches!(Schema::parse("{} {}", "x.json"), Err(Error::Schema { .. })));
    }
}
