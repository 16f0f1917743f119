fn main() {
    // Writes $OUT_DIR/built.rs, included by lib.rs for model metadata
    built::write_built_file().expect("Failed to generate build info");
}
