//! Public API surface extraction and sample-coverage engine.
//!
//! Binary crate entry point. All CLI logic is in the library's `cli` module.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    surface::cli::run();
}
