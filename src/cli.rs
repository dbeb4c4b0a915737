//! Minimal CLI: declarations → (tree | build)
//!
//! ```text
//! instantiate tree  --schema fixtures/blog.types.json --type TaggedPost
//! instantiate build --schema fixtures/blog.types.json --type Post --input 'fixtures/data/*.json'
//! ```
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use instantiate::{
    BranchPolicy, Children, Config, DEFAULT_JSON_DEPTH, DEFAULT_MAX_TREE_DEPTH, Instance, Instantiator,
    MAX_JSON_DEPTH, MAX_TREE_DEPTH, ObjectExtractor, PropertyNode, TypeRegistry, decode,
};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// build typed object graphs from JSON using declared constructor parameters
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the property tree of a declared type
    Tree(TreeOut),
    /// instantiate a declared type from one or more JSON documents
    Build(BuildOut),
}

#[derive(Args, Debug, Clone)]
struct TypeSettings {
    /// JSON declaration file: { "types": [ { "name", "params": [...] } ] }
    #[arg(long, short)]
    schema: PathBuf,

    /// target type name
    #[arg(long = "type", short = 't')]
    type_name: String,

    /// maximum composite nesting while expanding the type graph
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_TREE_DEPTH,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=MAX_TREE_DEPTH as u64),
    )]
    max_depth: usize,
}

#[derive(clap::Parser, Debug)]
struct TreeOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// emit the tree as JSON instead of an indented listing
    #[arg(long)]
    json: bool,
}

#[derive(clap::Parser, Debug)]
struct BuildOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// maximum nesting accepted when decoding each input
    #[arg(
        long,
        default_value_t = DEFAULT_JSON_DEPTH,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=MAX_JSON_DEPTH as u64),
    )]
    json_depth: usize,

    /// how union and intersection parameters pick a result
    #[arg(long, value_enum, default_value_t = BranchPolicy::FirstBranch)]
    policy: BranchPolicy,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeSettings {
    fn load_registry(&self) -> Result<TypeRegistry> {
        TypeRegistry::from_path(&self.schema)
            .with_context(|| format!("failed to load declarations from {}", self.schema.display()))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Tree(target) => {
                let settings = &target.type_settings;
                let registry = settings.load_registry()?;
                let config = Config { max_tree_depth: settings.max_depth, ..Config::default() };
                let tree = Instantiator::new(&registry)
                    .with_config(config)
                    .build_tree(&settings.type_name)
                    .with_context(|| format!("failed to build tree for {}", settings.type_name))?;

                if target.json {
                    println!("{}", serde_json::to_string_pretty(&tree)?);
                } else {
                    let mut out = String::new();
                    render_tree(&tree, &settings.type_name, 0, &mut out);
                    print!("{out}");
                }
                Ok(())
            }
            Command::Build(target) => {
                let settings = &target.type_settings;
                let registry = settings.load_registry()?;
                let config = Config { max_tree_depth: settings.max_depth, branch_policy: target.policy };
                let instantiator = Instantiator::new(&registry).with_config(config);

                // 1) one tree for every input
                let tree = instantiator
                    .build_tree(&settings.type_name)
                    .with_context(|| format!("failed to build tree for {}", settings.type_name))?;

                // 2) decode + instantiate in parallel, report in input order
                let source_paths = resolve_file_path_patterns(&target.input)?;
                let results = build_inputs(&instantiator, &tree, &source_paths, target.json_depth);

                let mut failures = 0usize;
                for (path, result) in source_paths.iter().zip(results) {
                    match result {
                        Ok(instance) => {
                            println!("{} {}", "✓".green(), path.display());
                            println!("{instance:#?}");
                        }
                        Err(error) => {
                            failures += 1;
                            eprintln!("{} {}: {error:#}", "✗".red(), path.display());
                        }
                    }
                }
                if failures > 0 {
                    bail!("{failures} of {} inputs failed", source_paths.len());
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn render_tree(node: &PropertyNode, label: &str, indent: usize, out: &mut String) {
    let types = node
        .descriptor()
        .types()
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ");
    let label = if label.is_empty() { "·" } else { label };
    out.push_str(&format!(
        "{:indent$}{} {} [{}]\n",
        "",
        label.bold(),
        format!("{:?}", node.operator()).to_uppercase().cyan(),
        types.dimmed(),
        indent = indent * 2,
    ));
    match node.children() {
        Children::Leaf => {}
        Children::Fields(nodes) | Children::Branches(nodes) => {
            for child in nodes {
                render_tree(child, child.name(), indent + 1, out);
            }
        }
        Children::Components(lists) => {
            for (ty, list) in node.descriptor().types().iter().zip(lists) {
                out.push_str(&format!("{:indent$}& {}\n", "", ty.name().yellow(), indent = (indent + 1) * 2));
                for child in list {
                    render_tree(child, child.name(), indent + 2, out);
                }
            }
        }
        Children::Element(element) => render_tree(element, "[]", indent + 1, out),
    }
}

fn build_inputs(
    instantiator: &Instantiator<'_>,
    tree: &PropertyNode,
    paths: &[PathBuf],
    json_depth: usize,
) -> Vec<Result<Instance>> {
    paths
        .par_iter()
        .map(|path| {
            let source = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            let value = decode(&source, json_depth)?;
            let instance = instantiator.instantiate_with(tree, &value, &ObjectExtractor)?;
            Ok(instance)
        })
        .collect()
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
