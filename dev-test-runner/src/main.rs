//! Runs every fixture under `fixtures/cases/` against the library.
//!
//! Usage: `cargo run -p dev-test-runner [-- <name regex>]`
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use instantiate::{BranchPolicy, Config, DEFAULT_JSON_DEPTH, Instance, Instantiator, Record, TypeRegistry};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    name: String,
    /// Inline declaration document.
    schema: Value,
    #[serde(rename = "type")]
    type_name: String,
    /// Either a decoded input or raw JSON text.
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    json_depth: Option<usize>,
    #[serde(default)]
    policy: BranchPolicy,
    expect: Expect,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Expect {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    /// Declared type of the built instance; `null` expects a null result.
    #[serde(default)]
    type_name: Option<Value>,
    /// Per-field checks on a record result, keyed by parameter name.
    #[serde(default)]
    fields: BTreeMap<String, FieldExpect>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldExpect {
    #[serde(default)]
    type_name: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

fn main() -> ExitCode {
    let filter = match std::env::args().nth(1).map(|raw| Regex::new(&raw)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid filter: {error}");
            return ExitCode::FAILURE;
        }
    };

    let cases_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures/cases");
    let paths = match case_paths(&cases_dir) {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("failed to list {}: {error}", cases_dir.display());
            return ExitCode::FAILURE;
        }
    };

    let (mut passed, mut failed) = (0usize, 0usize);
    for path in paths {
        let case = match load_case(&path) {
            Ok(case) => case,
            Err(message) => {
                failed += 1;
                eprintln!("FAIL {}: {message}", path.display());
                continue;
            }
        };
        if filter.as_ref().is_some_and(|re| !re.is_match(&case.name)) {
            continue;
        }
        match run_case(&case) {
            Ok(()) => {
                passed += 1;
                println!("ok   {}", case.name);
            }
            Err(message) => {
                failed += 1;
                eprintln!("FAIL {}: {message}", case.name);
            }
        }
    }

    println!("\n{passed} passed, {failed} failed");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn case_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
    paths.sort();
    Ok(paths)
}

fn load_case(path: &Path) -> Result<Case, String> {
    let src = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let de = &mut serde_json::Deserializer::from_str(&src);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}

fn run_case(case: &Case) -> Result<(), String> {
    let registry = TypeRegistry::from_json_str(&case.schema.to_string()).map_err(|e| e.to_string())?;
    let config = Config { branch_policy: case.policy, ..Config::default() };
    let instantiator = Instantiator::new(&registry).with_config(config);

    let result = match (&case.input, &case.text) {
        (Some(input), None) => instantiator.from_object(input, &case.type_name),
        (None, Some(text)) => {
            instantiator.from_text(text, &case.type_name, case.json_depth.unwrap_or(DEFAULT_JSON_DEPTH))
        }
        _ => return Err("exactly one of `input` or `text` is required".into()),
    };

    match (&case.expect.error, result) {
        (Some(kind), Ok(instance)) => Err(format!("expected {kind}, got {instance:?}")),
        (Some(kind), Err(error)) if error.kind() == kind.as_str() => Ok(()),
        (Some(kind), Err(error)) => Err(format!("expected {kind}, got {}: {error}", error.kind())),
        (None, Err(error)) => Err(format!("unexpected {}: {error}", error.kind())),
        (None, Ok(instance)) => check_instance(&case.expect, &instance),
    }
}

fn check_instance(expect: &Expect, instance: &Instance) -> Result<(), String> {
    if !expect.ok {
        return Err("case expects neither success nor an error".into());
    }
    match &expect.type_name {
        None => {}
        Some(Value::Null) if instance.is_null() => {}
        Some(Value::String(name)) if instance.type_name() == Some(name.as_str()) => {}
        Some(other) => return Err(format!("expected instance of {other}, got {instance:?}")),
    }
    if expect.fields.is_empty() {
        return Ok(());
    }

    let record = instance
        .downcast_ref::<Record>()
        .ok_or_else(|| format!("field checks need a record, got {instance:?}"))?;
    for (name, field) in &expect.fields {
        let actual = record.get(name).ok_or_else(|| format!("record has no field `{name}`"))?;
        if let Some(type_name) = &field.type_name {
            if actual.type_name() != Some(type_name.as_str()) {
                return Err(format!("field `{name}`: expected {type_name}, got {actual:?}"));
            }
        }
        if let Some(value) = &field.value {
            if actual.as_value() != Some(value) {
                return Err(format!("field `{name}`: expected {value}, got {actual:?}"));
            }
        }
    }
    Ok(())
}
