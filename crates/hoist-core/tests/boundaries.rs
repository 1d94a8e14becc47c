use std::fs;
use std::path::{Path, PathBuf};

fn source(rel: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(rel);
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

fn domain_sources() -> Vec<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates dir")
        .join("hoist-domain")
        .join("src");
    fs::read_dir(&dir)
        .expect("domain src")
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "rs"))
        .collect()
}

#[test]
fn relocation_does_not_touch_the_network() {
    let relocate = source("src/relocate.rs");
    assert!(!relocate.contains("crate::net"), "relocate must stay offline");
    assert!(!relocate.contains("reqwest"), "relocate must stay offline");
}

#[test]
fn domain_crate_stays_pure_data() {
    let sources = domain_sources();
    assert!(!sources.is_empty());
    for path in sources {
        let contents = fs::read_to_string(&path).expect("read domain source");
        assert!(
            !contents.contains("std::fs"),
            "{} must not touch the filesystem",
            path.display()
        );
    }
}
