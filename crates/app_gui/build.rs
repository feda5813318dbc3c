use std::env;

fn main() {
    let version =
        env::var("TOMATO_VERSION").unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=TOMATO_VERSION={version}");
}
