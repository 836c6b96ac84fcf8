//! CLI: schemas → (rust | plan)
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use config_bindgen::{Error, GeneratedUnit, Generator, Schema};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate configuration binders from schema files, or inspect the binding plan
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    /// debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit the generated Rust binders
    Rust(RustOut),
    /// print the resolved strategy of every member as JSON
    Plan(PlanOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more schema files. May be literal paths or quoted glob patterns;
    /// later files override the options of earlier ones
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct RustOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// module path of the runtime as seen from the generated code
    #[arg(long)]
    runtime: Option<String>,

    /// also emit `register_binders` for a `BinderRegistry`
    #[arg(long)]
    registry: bool,

    /// output .rs file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct PlanOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_schema(&self) -> anyhow::Result<Schema> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let schema = Schema::load(&source_paths).context("failed to load schemas")?;
        eprintln!("{} {} schema file(s)", "loaded".green().bold(), source_paths.len());
        Ok(schema)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Rust(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                // 1) schemas, with flag overrides
                let mut schema = target.input_settings.load_schema()?;
                if let Some(runtime) = target.runtime.as_ref() {
                    schema.options_mut().runtime = runtime.clone();
                }
                if target.registry {
                    schema.options_mut().registry = true;
                }

                // 2) generate
                let Some(unit) = generate(&schema) else {
                    return Ok(());
                };

                // 3) write
                write_output(target.out.as_deref(), &unit.render())?;
                eprintln!(
                    "{} {} binder(s) for {} root(s)",
                    "generated".green().bold(),
                    unit.binders.len(),
                    unit.roots.len()
                );
            }
            Command::Plan(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let schema = target.input_settings.load_schema()?;
                let Some(unit) = generate(&schema) else {
                    return Ok(());
                };
                let plan_src = serde_json::to_string_pretty(&unit.plan())
                    .context("failed to serialize plan")?;
                write_output(target.out.as_deref(), &plan_src)?;
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn generate(schema: &Schema) -> Option<GeneratedUnit> {
    let unit = Generator::new(schema, schema.options().clone()).generate(&schema.roots());
    if unit.is_none() {
        eprintln!("{} no root types declared, nothing emitted", "skipped".yellow().bold());
    }
    unit
}

fn write_output(out: Option<&Path>, src: &str) -> anyhow::Result<()> {
    let Some(out) = out else {
        println!("{src}");
        return Ok(());
    };
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))?;
    eprintln!("{} {}", "wrote".green().bold(), out.display());
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Error>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let glob_error = |pattern: &str, message: String| Error::Glob {
        pattern: pattern.to_owned(),
        message,
    };

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            // Treat as a glob pattern
            let mut matched_any = false;
            let entries = glob::glob(pattern).map_err(|e| glob_error(pattern, e.to_string()))?;
            for entry in entries {
                let path = entry.map_err(|e| glob_error(pattern, e.to_string()))?;
                matched_any = true;
                out.push(path);
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(glob_error(pattern, "matched no files".to_owned()));
            }
        } else {
            // Treat as a literal path
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
    }

    #[test]
    fn empty_globs_are_errors() {
        let err = resolve_file_path_patterns(["/definitely/not/here/*.json"]).unwrap_err();
        assert!(matches!(err, Error::Glob { .. }));
    }

    #[test]
    fn subcommands_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "config-bindgen", "rust", "-i", "a.json", "b.json", "--registry", "--runtime", "crate::rt", "-v",
        ])
        .unwrap();
        assert!(cli.verbose());
        match cli.cmd {
            Command::Rust(target) => {
                assert_eq!(target.input_settings.input, vec!["a.json", "b.json"]);
                assert!(target.registry);
                assert_eq!(target.runtime.as_deref(), Some("crate::rt"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
