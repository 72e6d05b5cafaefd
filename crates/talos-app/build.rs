use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let version_file = workspace_root(&manifest_dir).join("VERSION");
    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = fs::read_to_string(&version_file).expect("read VERSION file");
    let version = contents.trim();
    assert!(
        is_release_version(version),
        "VERSION must be MAJOR.MINOR.PATCH, got {version:?}"
    );

    println!("cargo:rustc-env=TALOS_CLIENT_VERSION={version}");
}

fn workspace_root(manifest_dir: &Path) -> &Path {
    manifest_dir
        .ancestors()
        .nth(2)
        .expect("crate lives under <root>/crates/")
}

fn is_release_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}
