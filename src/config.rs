use serde::{Deserialize, Serialize};

/// Path generated code uses to reach `config_bindgen::runtime`.
pub const DEFAULT_RUNTIME: &str = "::config_bindgen::runtime";

/// Knobs for one generation pass. Read from a schema's `options` block; the CLI
/// overrides individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorOptions {
    /// Module path of the runtime support, as seen from the generated code.
    pub runtime: String,
    /// Emit `register_binders` for a `BinderRegistry`.
    pub registry: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_owned(),
            registry: false,
        }
    }
}

impl GeneratorOptions {
    /// Fields set in `other` win; `other` is a partially filled options block.
    pub fn merge(&mut self, other: PartialOptions) {
        if let Some(runtime) = other.runtime {
            self.runtime = runtime;
        }
        if let Some(registry) = other.registry {
            self.registry = registry;
        }
    }
}

/// An `options` block as written in a schema file: every field optional, so that a
/// later file only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialOptions {
    pub runtime: Option<String>,
    pub registry: Option<bool>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn later_blocks_override_named_fields_only() {
        let mut options = GeneratorOptions::default();
        options.merge(PartialOptions { runtime: None, registry: Some(true) });
        options.merge(PartialOptions { runtime: Some("crate::rt".into()), registry: None });
        assert_eq!(
            options,
            GeneratorOptions { runtime: "crate::rt".into(), registry: true }
        );
    }
}
