mod offline;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cube_extract::{
    plan_extract, write_query_file, Backend, ExtractOptions, ExtractSpec, PartitionOptions,
    QueryPlan,
};
use cube_outline::Outline;
use serde::de::DeserializeOwned;

use crate::offline::OutlineFile;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Mdx,
    Calc,
    Report,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Mdx => Backend::Mdx,
            BackendArg::Calc => Backend::CalcScript,
            BackendArg::Report => Backend::ReportScript,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Compile a cube extract into MDX, calc-script or report-script text")]
struct Args {
    /// Outline file (JSON): cube name, dimensions and their member records.
    #[arg(long)]
    outline: PathBuf,

    /// Extract spec (JSON), flat or by axis.
    #[arg(long)]
    spec: PathBuf,

    /// Extract options (JSON). Flags below override its fields.
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Column dimension for flat specs.
    #[arg(long)]
    column_dimension: Option<String>,

    /// Split the MDX query over this dimension's members.
    #[arg(long)]
    partition_dimension: Option<String>,

    /// Members per partition chunk.
    #[arg(long, default_value_t = 100)]
    chunk_size: usize,

    /// Write the query text here instead of stdout.
    #[arg(long)]
    query_file: Option<PathBuf>,

    /// Override the cube name from the outline file.
    #[arg(long)]
    cube: Option<String>,

    /// Print the plan, axes and warnings as JSON.
    #[arg(long)]
    json: bool,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read {what} {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {what} {}", path.display()))
}

fn options(args: &Args) -> Result<ExtractOptions> {
    let mut options: ExtractOptions = match &args.options {
        Some(path) => read_json(path, "options")?,
        None => ExtractOptions::default(),
    };
    if let Some(backend) = args.backend {
        options.backend = backend.into();
    }
    if let Some(column) = &args.column_dimension {
        options.column_dimension = Some(column.clone());
    }
    if let Some(dimension) = &args.partition_dimension {
        options.partition = Some(PartitionOptions {
            dimension: dimension.clone(),
            chunk_size: args.chunk_size,
        });
    }
    if args.query_file.is_some() {
        options.query_file = args.query_file.clone();
    }
    Ok(options)
}

fn plan_json(plan: &QueryPlan) -> serde_json::Value {
    let queries: Vec<serde_json::Value> = plan
        .queries
        .iter()
        .map(|q| {
            serde_json::json!({
                "dialect": q.dialect.to_string(),
                "text": q.text,
                "partition": q.partition.as_ref().map(|p| serde_json::json!({
                    "dimension": p.dimension,
                    "index": p.index,
                    "count": p.count,
                })),
            })
        })
        .collect();
    let warnings: Vec<String> = plan.warnings.iter().map(ToString::to_string).collect();
    serde_json::json!({
        "backend": plan.backend,
        "axes": plan.axes,
        "queries": queries,
        "warnings": warnings,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let source: OutlineFile = read_json(&args.outline, "outline")?;
    let spec: ExtractSpec = read_json(&args.spec, "extract spec")?;
    let options = options(&args)?;

    let cube = args.cube.clone().unwrap_or_else(|| source.cube.clone());
    let mut outline = Outline::load(cube, &source).context("load outline")?;
    let plan = plan_extract(&mut outline, &source, &spec, &options).context("compile extract")?;
    log::info!(
        "compiled {} {} queries for {}",
        plan.queries.len(),
        plan.backend,
        outline.cube_name()
    );

    if let Some(path) = &options.query_file {
        write_query_file(path, &plan)
            .with_context(|| format!("write query file {}", path.display()))?;
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan_json(&plan))?);
    } else if options.query_file.is_none() {
        print!("{}", plan.query_file_text());
    }
    Ok(())
}
