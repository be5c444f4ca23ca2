//! Source hygiene for the canvas engine.
//!
//! The engine core runs natively under `cargo test` and inside wasm in the
//! browser. These checks scan `src/` (test modules excluded) for code that
//! would panic in the browser, lose errors silently, or leak browser-only
//! APIs out of `web.rs`.

use std::fs;
use std::path::Path;

const SRC_DIR: &str = "src";

/// The only module allowed to touch browser bindings.
const BROWSER_MODULE: &str = "web.rs";

/// Patterns that must not appear in production engine code.
const FORBIDDEN: &[(&str, &str)] = &[
    (".unwrap()", "propagate or default instead of panicking"),
    (".expect(", "propagate or default instead of panicking"),
    ("panic!(", "a panic aborts the wasm instance"),
    ("unreachable!(", "a panic aborts the wasm instance"),
    ("todo!(", "unfinished code"),
    ("unimplemented!(", "unfinished code"),
    ("let _ =", "discards a result without inspecting it"),
    (".ok()", "discards an error without inspecting it"),
    ("#[allow(dead_code)]", "delete unused code instead"),
    ("dbg!(", "debug output left behind"),
    ("println!", "log through the `log` facade"),
    ("eprintln!", "log through the `log` facade"),
    ("std::time::", "no std clock on wasm32; timestamps come from the host"),
];

/// Patterns confined to `BROWSER_MODULE`.
const BROWSER_ONLY: &[&str] = &["wasm_bindgen", "web_sys", "js_sys"];

struct SourceFile {
    name: String,
    content: String,
}

fn is_test_module(name: &str) -> bool {
    name.ends_with("_test.rs")
}

fn read_src() -> Vec<SourceFile> {
    let Ok(entries) = fs::read_dir(SRC_DIR) else {
        return Vec::new();
    };
    let mut files: Vec<SourceFile> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let content = fs::read_to_string(entry.path()).ok()?;
            name.ends_with(".rs").then_some(SourceFile { name, content })
        })
        .collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));
    files
}

fn production_files() -> Vec<SourceFile> {
    read_src().into_iter().filter(|f| !is_test_module(&f.name)).collect()
}

/// `file:line` for every non-comment line containing `pattern`.
fn hits(files: &[SourceFile], pattern: &str) -> Vec<String> {
    files
        .iter()
        .flat_map(|file| {
            file.content.lines().enumerate().filter_map(move |(i, line)| {
                let code = line.trim_start();
                if code.starts_with("//") || !code.contains(pattern) {
                    return None;
                }
                Some(format!("{}:{}", file.name, i + 1))
            })
        })
        .collect()
}

#[test]
fn src_directory_is_readable() {
    let files = production_files();
    assert!(files.iter().any(|f| f.name == "lib.rs"), "run from the canvas crate root");
    assert!(files.iter().any(|f| f.name == "engine.rs"));
}

#[test]
fn production_code_has_no_forbidden_patterns() {
    let files = production_files();
    let violations: Vec<String> = FORBIDDEN
        .iter()
        .filter_map(|(pattern, reason)| {
            let found = hits(&files, pattern);
            (!found.is_empty()).then(|| format!("`{pattern}` ({reason}): {}", found.join(", ")))
        })
        .collect();

    assert!(violations.is_empty(), "forbidden patterns in canvas/src:\n  {}", violations.join("\n  "));
}

#[test]
fn browser_bindings_stay_in_web_module() {
    let native: Vec<SourceFile> = production_files()
        .into_iter()
        .filter(|f| f.name != BROWSER_MODULE)
        .collect();

    for pattern in BROWSER_ONLY {
        let found = hits(&native, pattern);
        assert!(found.is_empty(), "`{pattern}` outside {BROWSER_MODULE}: {}", found.join(", "));
    }
}

#[test]
fn web_module_is_gated_to_wasm32() {
    let lib = production_files()
        .into_iter()
        .find(|f| f.name == "lib.rs")
        .map(|f| f.content)
        .unwrap_or_default();
    let lines: Vec<&str> = lib.lines().map(str::trim).collect();

    let Some(decl) = lines.iter().position(|l| *l == "pub mod web;") else {
        panic!("lib.rs does not declare the web module");
    };
    assert!(
        decl > 0 && lines[decl - 1] == "#[cfg(target_arch = \"wasm32\")]",
        "`pub mod web;` must sit directly under a wasm32 cfg"
    );
}

#[test]
fn every_path_attribute_points_at_an_existing_test_module() {
    let all = read_src();
    let names: Vec<&str> = all.iter().map(|f| f.name.as_str()).collect();

    let mut missing = Vec::new();
    for file in all.iter().filter(|f| !is_test_module(&f.name)) {
        for line in file.content.lines() {
            let Some(rest) = line.trim().strip_prefix("#[path = \"") else {
                continue;
            };
            let Some(target) = rest.split('"').next() else {
                continue;
            };
            if !is_test_module(target) || !names.contains(&target) {
                missing.push(format!("{} -> {target}", file.name));
            }
        }
    }

    assert!(missing.is_empty(), "bad #[path] test modules: {}", missing.join(", "));
}

#[test]
fn every_test_module_is_wired_in() {
    let all = read_src();
    let wired: String = all
        .iter()
        .filter(|f| !is_test_module(&f.name))
        .map(|f| f.content.as_str())
        .collect();

    let orphans: Vec<&str> = all
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| is_test_module(name) && !wired.contains(&format!("#[path = \"{name}\"]")))
        .collect();

    assert!(orphans.is_empty(), "test modules never compiled: {}", orphans.join(", "));
}
