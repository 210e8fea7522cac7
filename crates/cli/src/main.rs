//! CLI tool for rendering slide-deck reports from PPTX templates.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deckgen_core::placeholder::{self, PlaceholderKind, PlaceholderUse};
use deckgen_core::{content, Content, JobMetadata, ListMarkerSyntax, RecordMode, RenderOptions, Renderer};
use deckgen_pptx::PptxTemplate;
use deckgen_service::{output_filename, GeneratorConfig, JobRunner, ReportGenerator};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Render slide-deck reports from a PPTX template and record content.
#[derive(Parser, Debug)]
#[command(name = "deckgen")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a template offline from JSON content files
    Render {
        /// Template presentation (.pptx)
        #[arg(short, long)]
        template: PathBuf,

        /// Content file(s): a JSON object, or an array of records
        #[arg(short, long, required = true)]
        content: Vec<PathBuf>,

        /// Job id injected as {{jobid}}
        #[arg(short, long, default_value = "local")]
        job_id: String,

        /// Output file (default: <job id>_report.pptx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record column holding content, for record arrays
        #[arg(long, default_value = "jeschro_content")]
        content_field: String,

        /// Record mode: cumulative or per-record
        #[arg(short, long, default_value = "cumulative")]
        mode: RecordMode,

        /// Table marker syntax: delimited or fixed-offset
        #[arg(long, default_value = "fixed-offset")]
        marker_syntax: ListMarkerSyntax,
    },

    /// List the placeholders of a template
    Inspect {
        /// Template presentation (.pptx)
        template: PathBuf,

        /// Table marker syntax: delimited or fixed-offset
        #[arg(long, default_value = "fixed-offset")]
        marker_syntax: ListMarkerSyntax,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a generation job against the configured data service
    Generate {
        /// Job id
        job_id: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match args.command {
        Command::Render {
            template,
            content,
            job_id,
            output,
            content_field,
            mode,
            marker_syntax,
        } => {
            let options = RenderOptions {
                record_mode: mode,
                marker_syntax,
                ..RenderOptions::default()
            };
            let output = output.unwrap_or_else(|| PathBuf::from(output_filename(&job_id)));
            render(&template, &content, &job_id, &content_field, options, &output)?;
            println!("{}", output.display());
        }
        Command::Inspect {
            template,
            marker_syntax,
            json,
        } => {
            let template = PptxTemplate::open(&template)
                .with_context(|| format!("Failed to open {}", template.display()))?;
            let found = placeholder::inventory(template.document(), marker_syntax);
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                for line in format_inventory(&found) {
                    println!("{}", line);
                }
            }
        }
        Command::Generate { job_id } => {
            let config = GeneratorConfig::from_env().context("Failed to load configuration")?;
            let runner = JobRunner::from_config(config)?;
            let report = runner
                .generate(&job_id)
                .with_context(|| format!("Job {} failed", job_id))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Render `template` with the given content files and write the result.
fn render(
    template_path: &Path,
    content_files: &[PathBuf],
    job_id: &str,
    content_field: &str,
    options: RenderOptions,
    output: &Path,
) -> Result<()> {
    let template = PptxTemplate::open(template_path)
        .with_context(|| format!("Failed to open {}", template_path.display()))?;
    let job = JobMetadata::now(job_id);
    let contents = load_contents(content_files, content_field, &job)?;
    log::debug!("Rendering {} record(s)", contents.len());

    let (document, report) = Renderer::new(options).render(template.document(), &contents);
    log::info!(
        "Rendered {} paragraph(s), rebuilt {} table(s), collapsed {}",
        report.paragraphs,
        report.tables_rebuilt,
        report.tables_collapsed
    );

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    template
        .save(&document, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

/// Read content files in order. An object is one record's content; an array
/// holds records whose `content_field` column carries the content.
fn load_contents(paths: &[PathBuf], content_field: &str, job: &JobMetadata) -> Result<Vec<Content>> {
    let mut contents = Vec::new();

    for path in paths {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;

        match value {
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(record) => Ok(record),
                        _ => Err(anyhow::anyhow!(
                            "{}: record arrays must hold objects",
                            path.display()
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?;
                contents.extend(content::resolve(&records, content_field, job));
            }
            _ => {
                let content = Content::decode(&raw)
                    .with_context(|| format!("Invalid content in {}", path.display()))?;
                contents.push(content.with_job(job));
            }
        }
    }

    Ok(contents)
}

fn format_inventory(found: &[PlaceholderUse]) -> Vec<String> {
    found
        .iter()
        .map(|p| {
            let kind = match p.kind {
                PlaceholderKind::Scalar => "text",
                PlaceholderKind::List => "table",
            };
            format!("slide {:>3}  {:<5}  {:<20}  {}", p.slide, kind, p.shape, p.name)
        })
        .collect()
}
