//! Developer CLI: resolve a resource kind's schema, then convert documents
//! into (and optionally back out of) the typed model.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::info;

use crate::cache::TypeCache;
use crate::convert::{document_to_typed, typed_to_document};
use crate::document::{FileSchemaSource, SchemaSource};
use crate::error::ConvertError;
use crate::resolver::{Resolver, ResolverConfig, DEFAULT_DEPTH_BUDGET};
use crate::types::Type;
use crate::wire;

// ------------------------------ Types ------------------------------ //

/// resolve Kubernetes-style OpenAPI schemas into type descriptors and convert
/// manifests into the typed value model
#[derive(Parser, Debug)]
#[command(name = "typed-manifest")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve a definition and print its type descriptor JSON
    Schema(SchemaOut),
    /// convert documents to typed values and print their wire encoding
    Convert(ConvertOut),
}

#[derive(Args, Debug, Clone)]
struct TargetSettings {
    /// Swagger 2 (`definitions`) or OpenAPI 3 (`components.schemas`) JSON document
    #[arg(long)]
    document: PathBuf,

    /// definition identifier, e.g. io.k8s.api.core.v1.Pod
    #[arg(long, conflicts_with = "gvk", required_unless_present = "gvk")]
    definition: Option<String>,

    /// resource kind as group/version/Kind; the core group is empty (/v1/Pod)
    #[arg(long)]
    gvk: Option<String>,

    /// maximum schema recursion depth
    #[arg(long, default_value_t = DEFAULT_DEPTH_BUDGET)]
    depth_budget: usize,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /items/0)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    target: TargetSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ConvertOut {
    #[command(flatten)]
    target: TargetSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// convert each typed value back out and print the generic document
    #[arg(long)]
    round_trip: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document, labelled for diagnostics.
struct Input {
    label: String,
    value: Value,
}

// ------------------------------ Implementation ------------------------------ //

impl TargetSettings {
    fn resolve(&self, resolver: &Resolver) -> Result<Arc<Type>> {
        let doc = FileSchemaSource::new(&self.document)
            .load()
            .with_context(|| format!("loading {}", self.document.display()))?;
        let ty = match (&self.definition, &self.gvk) {
            (Some(id), _) => resolver.resolve_definition(&doc, id)?,
            (None, Some(gvk)) => {
                let (group, version, kind) = parse_gvk(gvk)?;
                resolver.resolve_kind(&doc, group, version, kind)?
            }
            (None, None) => bail!("one of --definition or --gvk is required"),
        };
        Ok(ty)
    }

    fn resolver(&self) -> Resolver {
        Resolver::new(Arc::new(TypeCache::new()), ResolverConfig { depth_budget: self.depth_budget })
    }
}

impl InputSettings {
    fn load(&self) -> Result<Vec<Input>> {
        let mut inputs = Vec::new();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            let documents = if self.ndjson {
                source
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(i, line)| {
                        serde_json::from_str(line)
                            .with_context(|| format!("failed to parse {source_path_str}:{}", i + 1))
                    })
                    .collect::<Result<Vec<Value>>>()?
            } else {
                vec![serde_json::from_str(&source)
                    .with_context(|| format!("failed to parse JSON source file {source_path_str}"))?]
            };
            for (doc_index, document) in documents.into_iter().enumerate() {
                let label = if self.ndjson {
                    format!("{source_path_str}#{doc_index}")
                } else {
                    source_path_str.clone()
                };
                self.select(label, document, &mut inputs)?;
            }
        }
        info!(documents = inputs.len(), "loaded input documents");
        Ok(inputs)
    }

    fn select(&self, label: String, document: Value, inputs: &mut Vec<Input>) -> Result<()> {
        let document = match self.json_pointer.as_deref() {
            None => document,
            Some(pointer) => document
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("{label}: JSON pointer {pointer} selects nothing"))?,
        };
        match self.jq_expr.as_deref() {
            None => inputs.push(Input { label, value: document }),
            Some(jq_expr) => {
                let outputs = crate::jq_exec::run_jaq(jq_expr, &document)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let fan_out = outputs.len() > 1;
                for (i, value) in outputs.into_iter().enumerate() {
                    let label = if fan_out { format!("{label}[{i}]") } else { label.clone() };
                    inputs.push(Input { label, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                let resolver = target.target.resolver();
                let ty = target.target.resolve(&resolver)?;
                let schema_src = serde_json::to_string_pretty(&ty.to_json())?;
                write_output(target.out.as_deref(), &schema_src)
            }
            Command::Convert(target) => {
                let resolver = target.target.resolver();
                let ty = target.target.resolve(&resolver)?;
                let inputs = target.input_settings.load()?;

                let results: Vec<Result<Value, ConvertError>> = inputs
                    .par_iter()
                    .map(|input| convert_one(&input.value, &ty, target.round_trip))
                    .collect();

                let mut rendered = Vec::with_capacity(results.len());
                let mut failures = 0usize;
                for (input, result) in inputs.iter().zip(results) {
                    match result {
                        Ok(value) => rendered.push(serde_json::to_string_pretty(&value)?),
                        Err(error) => {
                            failures += 1;
                            eprintln!("{}", render_diagnostic(&input.label, &error));
                        }
                    }
                }
                info!(converted = rendered.len(), failed = failures, "conversion finished");
                write_output(target.out.as_deref(), &rendered.join("\n"))?;
                if failures > 0 {
                    bail!("{failures} of {} documents failed to convert", inputs.len());
                }
                Ok(())
            }
        }
    }
}

// ------------------------------ Helpers ------------------------------ //

fn convert_one(document: &Value, ty: &Type, round_trip: bool) -> Result<Value, ConvertError> {
    let typed = document_to_typed(document, ty)?;
    if round_trip {
        return Ok(typed_to_document(&typed)?.unwrap_or(Value::Null));
    }
    wire::encode(&typed)
}

fn render_diagnostic(label: &str, error: &ConvertError) -> String {
    format!(
        "{} {label}: {}: {}",
        "error:".red().bold(),
        error.path().to_string().bold(),
        error.message().red(),
    )
}

/// `group/version/Kind`; the core group is written as an empty segment.
fn parse_gvk(src: &str) -> Result<(&str, &str, &str)> {
    let mut parts = src.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(group), Some(version), Some(kind)) if !version.is_empty() && !kind.is_empty() => {
            Ok((group, version, kind))
        }
        _ => bail!("expected group/version/Kind, got {src:?}"),
    }
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{contents}");
            Ok(())
        }
    }
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
            for entry in glob::glob(pattern)? {
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

// ------------------------------- Tests ------------------------------------ //
