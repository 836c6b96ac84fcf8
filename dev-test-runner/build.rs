use std::path::PathBuf;

fn main() {
    let out_dir = std::env::var("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    let out = PathBuf::from(out_dir).join("bindings.rs");
    if let Err(error) = config_bindgen::compile_schemas(&["schemas/app.json"], &out) {
        panic!("failed to generate binders: {error}");
    }
}
