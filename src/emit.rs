//! Per-type binder emission.
//!
//! One `emit_binder` call writes the body of one binder: a statement per writable
//! member, chosen by the member's strategy. Records reached through a member are
//! never emitted inline; they go onto the worklist and get a binder of their own
//! once the driver dequeues them.
use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::descriptor::{EnumVariant, Member, TypeDescriptor};
use crate::shape::TypeShape;
use crate::strategy::{BindingStrategy, resolve};
use crate::worklist::Worklist;
use crate::writer::CodeWriter;

/// Words that need `r#` as a field name.
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "trait", "true", "try", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield",
];

/// Words that cannot be field names at all, not even raw.
pub const FORBIDDEN_IDENTS: &[&str] = &["self", "Self", "super", "crate", "_"];

pub fn field_ident(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_owned()
    }
}

/// A generated binder and the decisions that shaped it.
#[derive(Debug, Clone, Serialize)]
pub struct Binder {
    #[serde(rename = "type")]
    pub ty: TypeShape,
    pub name: String,
    pub members: Vec<MemberPlan>,
    #[serde(skip)]
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberPlan {
    #[serde(flatten)]
    pub member: Member,
    pub strategy: BindingStrategy,
}

/// Where a value comes from inside generated code.
#[derive(Debug, Clone, Copy)]
enum Source<'s> {
    /// Child `key` of the node bound to `node`.
    Member { node: &'s str, key: &'s str },
    /// The node itself: a sequence element or a dictionary entry.
    Node(&'s str),
}

impl Source<'_> {
    /// Expression of type `Option<&str>`.
    fn raw(&self) -> String {
        match self {
            Source::Member { node, key } => format!("{node}.get({key:?})"),
            Source::Node(node) => format!("{node}.value()"),
        }
    }

    /// Expression of type `&ConfigSection`.
    fn section(&self) -> String {
        match self {
            Source::Member { node, key } => format!("{node}.section({key:?})"),
            Source::Node(node) => (*node).to_owned(),
        }
    }

    /// The node being bound itself, of type `&ConfigSection`.
    fn current(&self) -> &str {
        match self {
            Source::Member { node, .. } => node,
            Source::Node(node) => node,
        }
    }
}

/// Stable, collision-free function names per type.
#[derive(Debug, Default)]
struct Symbols {
    by_type: IndexMap<TypeShape, String>,
    taken: HashSet<String>,
}

impl Symbols {
    fn derived(stem: &str) -> [String; 3] {
        [format!("bind_{stem}"), format!("bind_{stem}_core"), format!("parse_{stem}")]
    }

    fn stem(&mut self, ty: &TypeShape) -> String {
        if let Some(stem) = self.by_type.get(ty) {
            return stem.clone();
        }
        let base = ty.symbol();
        let mut stem = base.clone();
        let mut n = 2;
        while Self::derived(&stem).iter().any(|name| self.taken.contains(name)) {
            stem = format!("{base}_{n}");
            n += 1;
        }
        self.taken.extend(Self::derived(&stem));
        self.by_type.insert(ty.clone(), stem.clone());
        stem
    }
}

pub struct Emitter<'d, D: TypeDescriptor + ?Sized> {
    descriptor: &'d D,
    runtime: String,
    symbols: Symbols,
    enums: IndexMap<TypeShape, Vec<EnumVariant>>,
    depth: usize,
}

// ————————————————————————————————————————————————————————————————————————————
// NAMES
// ————————————————————————————————————————————————————————————————————————————

impl<'d, D: TypeDescriptor + ?Sized> Emitter<'d, D> {
    pub fn new(descriptor: &'d D, runtime: &str) -> Self {
        Self {
            descriptor,
            runtime: runtime.to_owned(),
            symbols: Symbols::default(),
            enums: IndexMap::new(),
            depth: 0,
        }
    }

    /// Internal binder for `ty`.
    pub fn binder_name(&mut self, ty: &TypeShape) -> String {
        format!("bind_{}_core", self.symbols.stem(&ty.binding_identity()))
    }

    /// Public entry point for a root `ty`.
    pub fn entry_name(&mut self, ty: &TypeShape) -> String {
        format!("bind_{}", self.symbols.stem(&ty.binding_identity()))
    }

    fn enum_parser(&mut self, target: &TypeShape) -> String {
        let ident = target.binding_identity();
        if !self.enums.contains_key(&ident) {
            let variants = self.descriptor.enum_variants(target).unwrap_or_default();
            self.enums.insert(ident.clone(), variants);
        }
        format!("parse_{}", self.symbols.stem(&ident))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BINDERS
// ————————————————————————————————————————————————————————————————————————————

impl<'d, D: TypeDescriptor + ?Sized> Emitter<'d, D> {
    pub fn emit_binder(&mut self, ty: &TypeShape, worklist: &mut Worklist) -> Binder {
        let name = self.binder_name(ty);
        let members = self.descriptor.writable_members(ty);
        if members.is_empty() {
            tracing::warn!(%ty, "no writable members, binder will be empty");
        }

        let plans = members
            .into_iter()
            .map(|member| {
                let strategy = resolve(self.descriptor, &member.ty);
                MemberPlan { member, strategy }
            })
            .collect::<Vec<_>>();

        let r = self.runtime.clone();
        let mut w = CodeWriter::new();
        let reads_node = plans
            .iter()
            .any(|plan| !matches!(plan.strategy, BindingStrategy::Unsupported { .. }));
        if !reads_node {
            w.line("#[allow(unused_variables)]");
        }
        w.open(format!(
            "fn {name}(node: &{r}::ConfigSection, value: &mut {ty}) -> ::std::result::Result<(), {r}::BindError>"
        ));
        for plan in &plans {
            let lhs = format!("value.{}", field_ident(&plan.member.field));
            let src = Source::Member { node: "node", key: &plan.member.key };
            self.depth = 0;
            self.assign(&mut w, &lhs, &plan.member.ty, &plan.strategy, src, worklist);
        }
        w.line("Ok(())");
        w.close();

        tracing::debug!(%ty, binder = %name, members = plans.len(), "emitted binder");
        Binder { ty: ty.clone(), name, members: plans, source: w.into_string() }
    }

    /// `lhs = <value of type ty read from src>`, as one or more statements.
    fn assign(
        &mut self,
        w: &mut CodeWriter,
        lhs: &str,
        ty: &TypeShape,
        strategy: &BindingStrategy,
        src: Source<'_>,
        worklist: &mut Worklist,
    ) {
        let optional = ty.option_inner().is_some();
        match strategy {
            BindingStrategy::SequenceOf { element, strategy } => {
                self.sequence(w, lhs, optional, element, strategy, src, worklist);
            }
            BindingStrategy::DictionaryOf { key, key_strategy, value, value_strategy } => {
                let map = ty.option_inner().unwrap_or(ty);
                let entry = Entry { map, key, key_strategy, value, value_strategy };
                self.dictionary(w, lhs, optional, entry, src, worklist);
            }
            BindingStrategy::NestedObject { target } => {
                self.nested(w, lhs, optional, target, src, worklist);
            }
            BindingStrategy::Unsupported { reason } => {
                tracing::warn!(%ty, %reason, "unsupported member, assigning its default");
                w.line(format!("// not supported: {reason}"));
                w.line(format!("{lhs} = ::std::default::Default::default();"));
            }
            leaf => {
                let expr = self.leaf_expr(ty, leaf, src);
                w.line(format!("{lhs} = {expr};"));
            }
        }
    }

    /// Single expression for a leaf strategy. Absent or unparseable values become
    /// `None` for optional targets and the type's default otherwise.
    fn leaf_expr(&mut self, ty: &TypeShape, strategy: &BindingStrategy, src: Source<'_>) -> String {
        let r = self.runtime.clone();
        let target = ty.option_inner().unwrap_or(ty);
        let optional = ty.option_inner().is_some();
        let expr = match strategy {
            BindingStrategy::StringLeaf => {
                format!("{}.map(::std::borrow::ToOwned::to_owned)", src.raw())
            }
            BindingStrategy::Base64Bytes => {
                let convert = if target.is_std("Vec") { "" } else { ".map(::std::convert::Into::into)" };
                format!("{r}::decode_base64({}){convert}", src.raw())
            }
            // the node being bound is handed over as is, so it is always present
            BindingStrategy::SectionPassthrough if optional => {
                return format!("Some({}.clone())", src.current());
            }
            BindingStrategy::SectionPassthrough => return format!("{}.clone()", src.current()),
            BindingStrategy::EnumParse { target } => {
                let parser = self.enum_parser(target);
                format!("{}.and_then({parser})", src.raw())
            }
            BindingStrategy::TryParseLeaf { target } if target.is_std("bool") => {
                format!("{r}::parse_bool({})", src.raw())
            }
            BindingStrategy::TryParseLeaf { target } => {
                format!("{r}::parse_value::<{target}>({})", src.raw())
            }
            _ => return "::std::default::Default::default()".to_owned(),
        };
        if optional { expr } else { format!("{expr}.unwrap_or_default()") }
    }

    #[allow(clippy::too_many_arguments)]
    fn sequence(
        &mut self,
        w: &mut CodeWriter,
        lhs: &str,
        optional: bool,
        element: &TypeShape,
        strategy: &BindingStrategy,
        src: Source<'_>,
        worklist: &mut Worklist,
    ) {
        let d = self.depth;
        self.depth += 1;
        let (section, items, item) = (format!("section{d}"), format!("items{d}"), format!("item{d}"));

        w.open("");
        w.line(format!("let {section} = {};", src.section()));
        w.line(format!("let mut {items} = ::std::vec::Vec::<{element}>::new();"));
        w.open(format!("for {item} in {section}.children()"));
        self.element(w, &|v| format!("{items}.push({v});"), element, strategy, Source::Node(&item), worklist);
        w.close();
        let built = format!("{items}.into_iter().collect()");
        finish(w, lhs, optional, &section, &built);
        w.close();

        self.depth -= 1;
    }

    fn dictionary(
        &mut self,
        w: &mut CodeWriter,
        lhs: &str,
        optional: bool,
        entry: Entry<'_>,
        src: Source<'_>,
        worklist: &mut Worklist,
    ) {
        let d = self.depth;
        self.depth += 1;
        let (section, dict, item, key) =
            (format!("section{d}"), format!("dict{d}"), format!("item{d}"), format!("key{d}"));
        let r = self.runtime.clone();

        w.open("");
        w.line(format!("let {section} = {};", src.section()));
        w.line(format!("let mut {dict} = <{} as ::std::default::Default>::default();", entry.map));
        w.open(format!("for {item} in {section}.children()"));
        let key_expr = self.key_expr(entry.key, entry.key_strategy, &item);
        w.line(format!("let {key} = {key_expr};"));
        self.element(
            w,
            &|v| {
                format!(
                    "if {dict}.insert({key}, {v}).is_some() {{\n    return Err({r}::BindError::duplicate_key({item}));\n}}"
                )
            },
            entry.value,
            entry.value_strategy,
            Source::Node(&item),
            worklist,
        );
        w.close();
        finish(w, lhs, optional, &section, &dict);
        w.close();

        self.depth -= 1;
    }

    /// A key that does not parse aborts the bind; values never do.
    fn key_expr(&mut self, key: &TypeShape, strategy: &BindingStrategy, item: &str) -> String {
        let r = self.runtime.clone();
        let parsed = match strategy {
            BindingStrategy::EnumParse { target } => {
                let parser = self.enum_parser(target);
                format!("{parser}({item}.key())")
            }
            BindingStrategy::TryParseLeaf { target } if target.is_std("bool") => {
                format!("{r}::parse_bool(Some({item}.key()))")
            }
            BindingStrategy::TryParseLeaf { target } => {
                format!("{r}::parse_value::<{target}>(Some({item}.key()))")
            }
            // strings are the only other key the resolver lets through
            _ => return format!("<{key} as ::std::convert::From<&str>>::from({item}.key())"),
        };
        format!("{parsed}.ok_or_else(|| {r}::BindError::invalid_key({item}))?")
    }

    /// Binds one element from `src` and hands the value to `sink`, which may
    /// produce several lines.
    fn element(
        &mut self,
        w: &mut CodeWriter,
        sink: &dyn Fn(&str) -> String,
        ty: &TypeShape,
        strategy: &BindingStrategy,
        src: Source<'_>,
        worklist: &mut Worklist,
    ) {
        if strategy.is_leaf() {
            let expr = self.leaf_expr(ty, strategy, src);
            w.fragment(&sink(&expr));
            return;
        }
        let current = format!("current{}", self.depth);
        w.line(format!("let mut {current} = <{ty} as ::std::default::Default>::default();"));
        self.assign(w, &current, ty, strategy, src, worklist);
        w.fragment(&sink(&current));
    }

    fn nested(
        &mut self,
        w: &mut CodeWriter,
        lhs: &str,
        optional: bool,
        target: &TypeShape,
        src: Source<'_>,
        worklist: &mut Worklist,
    ) {
        worklist.enqueue(target.clone());
        let binder = self.binder_name(target);
        if !optional {
            w.line(format!("{binder}({}, &mut {lhs})?;", src.section()));
            return;
        }
        // only materialize an absent record when there is data for it, which also
        // keeps recursive records finite
        let section = format!("section{}", self.depth);
        w.open("");
        w.line(format!("let {section} = {};", src.section()));
        w.open(format!("if {section}.exists()"));
        w.line(format!(
            "{binder}({section}, {lhs}.get_or_insert_with(::std::default::Default::default))?;"
        ));
        w.close();
        w.close();
    }
}

struct Entry<'a> {
    map: &'a TypeShape,
    key: &'a TypeShape,
    key_strategy: &'a BindingStrategy,
    value: &'a TypeShape,
    value_strategy: &'a BindingStrategy,
}

/// Final assignment of a built collection; optional targets stay `None` when the
/// data source has no node for them.
fn finish(w: &mut CodeWriter, lhs: &str, optional: bool, section: &str, built: &str) {
    if optional {
        w.line(format!("{lhs} = {section}.exists().then(|| {built});"));
    } else {
        w.line(format!("{lhs} = {built};"));
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENUM PARSERS
// ————————————————————————————————————————————————————————————————————————————

impl<'d, D: TypeDescriptor + ?Sized> Emitter<'d, D> {
    /// Every enum referenced so far, in first-reference order: variant names match
    /// case-insensitively, integers match discriminants.
    pub fn emit_enum_parsers(&mut self) -> IndexMap<TypeShape, String> {
        let enums = self.enums.clone();
        enums
            .into_iter()
            .map(|(ty, variants)| {
                let name = self.enum_parser(&ty);
                let mut w = CodeWriter::new();
                w.open(format!("fn {name}(raw: &str) -> ::std::option::Option<{ty}>"));
                w.line("let raw = raw.trim();");
                for variant in &variants {
                    w.open(format!("if raw.eq_ignore_ascii_case({:?})", variant.name));
                    w.line(format!("return Some({ty}::{});", variant.name));
                    w.close();
                }
                w.open("match raw.parse::<i64>()");
                for variant in &variants {
                    w.line(format!("Ok({}) => Some({ty}::{}),", variant.value, variant.name));
                }
                w.line("_ => None,");
                w.close();
                w.close();
                (ty, w.into_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::schema::Schema;

    fn schema() -> Schema {
        Schema::from_value(json!({
            "structs": {
                "Sample": { "fields": [
                    { "name": "name", "type": "String", "key": "Name" },
                    { "name": "count", "type": "i32", "key": "Count" },
                    { "name": "tags", "type": "Vec<String>", "key": "Tags" },
                    { "name": "child", "type": "Child", "key": "Child" },
                ] },
                "Child": { "fields": [ { "name": "value", "type": "i32", "key": "Value" } ] },
                "Wide": { "fields": [
                    { "name": "type", "type": "Option<Level>" },
                    { "name": "limits", "type": "BTreeMap<Level, Vec<u16>>" },
                    { "name": "next", "type": "Option<Box<Wide>>" },
                    { "name": "fixed", "type": "[u8; 4]" },
                    { "name": "raw", "type": "ConfigSection" },
                    { "name": "on", "type": "bool" },
                ] },
                "Bag": { "fields": [
                    { "name": "raw", "type": "Option<ConfigSection>", "key": "Raw" },
                    { "name": "labels", "type": "HashMap<String, String>", "key": "Labels" },
                ] },
            },
            "enums": { "Level": { "variants": ["Low", { "name": "High", "value": 10 }] } },
        }))
        .unwrap()
    }

    fn shape(src: &str) -> TypeShape {
        TypeShape::parse(src).unwrap()
    }

    #[test]
    fn scenario_binder() {
        let schema = schema();
        let mut emitter = Emitter::new(&schema, "rt");
        let mut worklist = Worklist::new();
        let binder = emitter.emit_binder(&shape("Sample"), &mut worklist);

        assert_eq!(
            binder.source,
            r#"fn bind_sample_core(node: &rt::ConfigSection, value: &mut Sample) -> ::std::result::Result<(), rt::BindError> {
    value.name = node.get("Name").map(::std::borrow::ToOwned::to_owned).unwrap_or_default();
    value.count = rt::parse_value::<i32>(node.get("Count")).unwrap_or_default();
    {
        let section0 = node.section("Tags");
        let mut items0 = ::std::vec::Vec::<String>::new();
        for item0 in section0.children() {
            items0.push(item0.value().map(::std::borrow::ToOwned::to_owned).unwrap_or_default());
        }
        value.tags = items0.into_iter().collect();
    }
    bind_child_core(node.section("Child"), &mut value.child)?;
    Ok(())
}
"#
        );
        // the nested record is queued, not emitted inline
        assert_eq!(worklist.next_pending(), Some(shape("Child")));
        assert!(!binder.source.contains("fn bind_child_core"));
    }

    #[test]
    fn wide_binder() {
        let schema = schema();
        let mut emitter = Emitter::new(&schema, "rt");
        let mut worklist = Worklist::new();
        let binder = emitter.emit_binder(&shape("Wide"), &mut worklist);

        assert_eq!(
            binder.source,
            r#"fn bind_wide_core(node: &rt::ConfigSection, value: &mut Wide) -> ::std::result::Result<(), rt::BindError> {
    value.r#type = node.get("type").and_then(parse_level);
    {
        let section0 = node.section("limits");
        let mut dict0 = <BTreeMap<Level, Vec<u16>> as ::std::default::Default>::default();
        for item0 in section0.children() {
            let key0 = parse_level(item0.key()).ok_or_else(|| rt::BindError::invalid_key(item0))?;
            let mut current1 = <Vec<u16> as ::std::default::Default>::default();
            {
                let section1 = item0;
                let mut items1 = ::std::vec::Vec::<u16>::new();
                for item1 in section1.children() {
                    items1.push(rt::parse_value::<u16>(item1.value()).unwrap_or_default());
                }
                current1 = items1.into_iter().collect();
            }
            if dict0.insert(key0, current1).is_some() {
                return Err(rt::BindError::duplicate_key(item0));
            }
        }
        value.limits = dict0;
    }
    {
        let section0 = node.section("next");
        if section0.exists() {
            bind_wide_core(section0, value.next.get_or_insert_with(::std::default::Default::default))?;
        }
    }
    // not supported: `[u8; 4]` cannot be built from a variable number of entries
    value.fixed = ::std::default::Default::default();
    value.raw = node.clone();
    value.on = rt::parse_bool(node.get("on")).unwrap_or_default();
    Ok(())
}
"#
        );
        // a self-reference is queued like any other record
        assert_eq!(worklist.next_pending(), Some(shape("Wide")));
    }

    #[test]
    fn passthrough_takes_the_bound_node_and_keys_stay_unique() {
        let schema = schema();
        let mut emitter = Emitter::new(&schema, "rt");
        let binder = emitter.emit_binder(&shape("Bag"), &mut Worklist::new());

        assert_eq!(
            binder.source,
            r#"fn bind_bag_core(node: &rt::ConfigSection, value: &mut Bag) -> ::std::result::Result<(), rt::BindError> {
    value.raw = Some(node.clone());
    {
        let section0 = node.section("Labels");
        let mut dict0 = <HashMap<String, String> as ::std::default::Default>::default();
        for item0 in section0.children() {
            let key0 = <String as ::std::convert::From<&str>>::from(item0.key());
            if dict0.insert(key0, item0.value().map(::std::borrow::ToOwned::to_owned).unwrap_or_default()).is_some() {
                return Err(rt::BindError::duplicate_key(item0));
            }
        }
        value.labels = dict0;
    }
    Ok(())
}
"#
        );
    }

    #[test]
    fn enum_parsers_cover_names_and_discriminants() {
        let schema = schema();
        let mut emitter = Emitter::new(&schema, "rt");
        emitter.emit_binder(&shape("Wide"), &mut Worklist::new());
        let parsers = emitter.emit_enum_parsers();

        assert_eq!(parsers.len(), 1);
        assert_eq!(
            parsers[&shape("Level")],
            r#"fn parse_level(raw: &str) -> ::std::option::Option<Level> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("Low") {
        return Some(Level::Low);
    }
    if raw.eq_ignore_ascii_case("High") {
        return Some(Level::High);
    }
    match raw.parse::<i64>() {
        Ok(0) => Some(Level::Low),
        Ok(10) => Some(Level::High),
        _ => None,
    }
}
"#
        );
    }

    #[test]
    fn symbols_never_collide() {
        let schema = schema();
        let mut emitter = Emitter::new(&schema, "rt");
        assert_eq!(emitter.binder_name(&shape("X")), "bind_x_core");
        // `XCore`'s entry point would be `bind_x_core`
        assert_eq!(emitter.entry_name(&shape("XCore")), "bind_x_core_2");
        assert_eq!(emitter.binder_name(&shape("Option<Box<X>>")), "bind_x_core");
    }
}
