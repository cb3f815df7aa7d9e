//! Locates and links the system unrar library.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=UNRAR_LIB_DIR");
    println!("cargo:rerun-if-env-changed=UNRAR_STATIC");

    if let Ok(dir) = env::var("UNRAR_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }

    let kind = if env::var_os("UNRAR_STATIC").is_some() {
        "static"
    } else {
        "dylib"
    };
    println!("cargo:rustc-link-lib={kind}=unrar");
}
