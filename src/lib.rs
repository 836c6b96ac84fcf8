//! Build-time generator of configuration binders.
//!
//! Given record types described by a [`TypeDescriptor`] (usually a [`Schema`]), the
//! generator emits plain Rust functions that copy values out of a
//! [`runtime::ConfigSection`] tree into those records. Generated code depends only on
//! [`runtime`].
//!
//! From a build script:
//!
//! ```no_run
//! let out = std::path::Path::new(&std::env::var("OUT_DIR").unwrap()).join("bindings.rs");
//! config_bindgen::compile_schemas(&["schemas/app.json"], &out).unwrap();
//! ```
pub mod config;
pub mod descriptor;
pub mod driver;
pub mod emit;
pub mod error;
pub mod runtime;
pub mod schema;
pub mod shape;
pub mod strategy;
pub mod worklist;
pub mod writer;

use std::path::Path;

pub use config::GeneratorOptions;
pub use descriptor::{EnumVariant, Member, TypeDescriptor};
pub use driver::{GeneratedUnit, Generator};
pub use error::{Error, Result};
pub use schema::Schema;
pub use shape::TypeShape;
pub use strategy::{BindingStrategy, UnsupportedReason, resolve};

/// Loads `schemas`, generates binders for their roots and writes them to `out`.
///
/// A schema set without roots still writes a file holding only the header, so an
/// `include!` of it keeps compiling.
pub fn compile_schemas<P: AsRef<Path>>(schemas: &[P], out: &Path) -> Result<()> {
    for schema in schemas {
        println!("cargo:rerun-if-changed={}", schema.as_ref().display());
    }
    let schema = Schema::load(schemas)?;
    let source = Generator::new(&schema, schema.options().clone())
        .generate(&schema.roots())
        .map(|unit| unit.render())
        .unwrap_or_else(|| format!("{}\n", driver::HEADER));
    std::fs::write(out, source).map_err(|source| Error::Write { path: out.to_owned(), source })
}
