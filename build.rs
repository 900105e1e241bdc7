//! Build script - passes the esp-hal linker script to the firmware binary.
//!
//! Host builds (`cargo test`) link normally; only the `embedded` feature
//! needs `linkall.x`.

use std::env;

fn main() {
    if env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tlinkall.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
