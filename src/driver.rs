//! One generation pass: roots in, a compilable unit out.
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::config::GeneratorOptions;
use crate::descriptor::TypeDescriptor;
use crate::emit::{Binder, Emitter};
use crate::shape::TypeShape;
use crate::worklist::Worklist;
use crate::writer::CodeWriter;

pub const HEADER: &str = "// @generated by config-bindgen. Do not edit.";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub struct Generator<'d, D: TypeDescriptor + ?Sized> {
    descriptor: &'d D,
    options: GeneratorOptions,
}

/// A root type and the public names generated for it.
#[derive(Debug, Clone, Serialize)]
pub struct RootEntry {
    #[serde(rename = "type")]
    pub ty: TypeShape,
    pub entry: String,
    pub binder: String,
}

/// Everything one pass produced. `render` turns it into source text.
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    pub roots: Vec<RootEntry>,
    /// In emission order: roots first, then records as they were discovered.
    pub binders: Vec<Binder>,
    pub enum_parsers: IndexMap<TypeShape, String>,
    pub options: GeneratorOptions,
}

/// Serializable summary of a pass, for inspection.
#[derive(Debug, Serialize)]
pub struct Plan<'u> {
    pub options: &'u GeneratorOptions,
    pub roots: &'u [RootEntry],
    pub types: &'u [Binder],
    pub enums: Vec<&'u TypeShape>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'d, D: TypeDescriptor + ?Sized> Generator<'d, D> {
    pub fn new(descriptor: &'d D, options: GeneratorOptions) -> Self {
        Self { descriptor, options }
    }

    /// Emits a binder for every root and every record reachable from one. `None`
    /// when there are no roots: nothing at all is emitted in that case.
    pub fn generate(&self, roots: &[TypeShape]) -> Option<GeneratedUnit> {
        let roots = roots.iter().map(TypeShape::binding_identity).collect::<IndexSet<_>>();
        if roots.is_empty() {
            tracing::info!("no root types, nothing to generate");
            return None;
        }

        let mut emitter = Emitter::new(self.descriptor, &self.options.runtime);
        let mut worklist = Worklist::new();
        for root in &roots {
            worklist.enqueue(root.clone());
        }

        let mut binders = Vec::new();
        while let Some(ty) = worklist.next_pending() {
            binders.push(emitter.emit_binder(&ty, &mut worklist));
        }
        let enum_parsers = emitter.emit_enum_parsers();

        let roots = roots
            .into_iter()
            .map(|ty| RootEntry {
                entry: emitter.entry_name(&ty),
                binder: emitter.binder_name(&ty),
                ty,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            roots = roots.len(),
            binders = binders.len(),
            enums = enum_parsers.len(),
            dropped = worklist.dropped(),
            "generated binders"
        );
        Some(GeneratedUnit { roots, binders, enum_parsers, options: self.options.clone() })
    }
}

impl GeneratedUnit {
    pub fn plan(&self) -> Plan<'_> {
        Plan {
            options: &self.options,
            roots: &self.roots,
            types: &self.binders,
            enums: self.enum_parsers.keys().collect(),
        }
    }

    pub fn render(&self) -> String {
        let r = &self.options.runtime;
        let mut w = CodeWriter::new();
        w.line(HEADER);

        for root in &self.roots {
            w.blank();
            w.line(format!("/// Binds `node` onto an existing `{}`.", root.ty));
            w.open(format!(
                "pub fn {}(node: &{r}::ConfigSection, value: &mut {}) -> ::std::result::Result<(), {r}::BindError>",
                root.entry, root.ty
            ));
            w.line(format!("{}(node, value)", root.binder));
            w.close();
        }

        self.render_dispatch(&mut w);
        if self.options.registry {
            self.render_registrations(&mut w);
        }

        for binder in &self.binders {
            w.blank();
            w.fragment(&binder.source);
        }
        for parser in self.enum_parsers.values() {
            w.blank();
            w.fragment(parser);
        }
        w.into_string()
    }

    /// `bind` and `get`: a closed type test over the roots, nothing else.
    fn render_dispatch(&self, w: &mut CodeWriter) {
        let r = &self.options.runtime;
        w.blank();
        w.line("/// Binds `node` onto `value` when `T` is one of the root types.");
        w.open(format!(
            "pub fn bind<T: ::std::any::Any>(node: &{r}::ConfigSection, value: &mut T) -> ::std::result::Result<(), {r}::BindError>"
        ));
        w.line("let value: &mut dyn ::std::any::Any = value;");
        for root in &self.roots {
            w.open(format!("if let Some(value) = value.downcast_mut::<{}>()", root.ty));
            w.line(format!("return {}(node, value);", root.binder));
            w.close();
        }
        w.line(format!("Err({r}::BindError::unsupported_type::<T>())"));
        w.close();

        w.blank();
        w.line("/// A default `T` with `node` bound onto it.");
        w.open(format!(
            "pub fn get<T: ::std::any::Any + ::std::default::Default>(node: &{r}::ConfigSection) -> ::std::result::Result<T, {r}::BindError>"
        ));
        w.line("let mut value = T::default();");
        w.line("bind(node, &mut value)?;");
        w.line("Ok(value)");
        w.close();
    }

    fn render_registrations(&self, w: &mut CodeWriter) {
        let r = &self.options.runtime;
        w.blank();
        w.open(format!("pub fn register_binders(registry: &mut {r}::BinderRegistry)"));
        for root in &self.roots {
            w.line(format!("registry.register::<{}>({});", root.ty, root.binder));
        }
        w.close();
    }
}
