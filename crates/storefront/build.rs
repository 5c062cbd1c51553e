//! Build script for storefront crate.
//!
//! Hashes the static assets so templates can append a cache-busting
//! `?v=` value that changes whenever the CSS or JavaScript changes.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Assets whose content feeds the version.
const ASSETS: [&str; 2] = ["static/css/main.css", "static/js/selectors.js"];

fn main() {
    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:rustc-env=ASSET_VERSION=dev");
        return;
    };

    let mut hasher = Sha256::new();
    for asset in ASSETS {
        let path = Path::new(&manifest_dir).join(asset);
        println!("cargo:rerun-if-changed={}", path.display());
        match fs::read(&path) {
            Ok(content) => hasher.update(&content),
            Err(e) => println!("cargo:warning=Could not read {asset}: {e}"),
        }
    }

    // First 8 hex chars are plenty for cache busting
    let hash = format!("{:x}", hasher.finalize());
    let version = hash.get(..8).unwrap_or("dev");
    println!("cargo:rustc-env=ASSET_VERSION={version}");
}
