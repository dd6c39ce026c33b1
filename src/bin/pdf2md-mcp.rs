//! CLI binary for pdf2md-mcp.
//!
//! `serve` runs the MCP server; the other subcommands drive the same library
//! calls by hand for testing a PDF or an endpoint without an MCP client.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_mcp::{
    convert_page, inspect, render_page_png, run_stdio, RasterConfig, VisionClient, VisionConfig,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run as an MCP server (stdio)
  pdf2md-mcp serve

  # Rasterise page 1 only (no API key needed)
  pdf2md-mcp render report.pdf 1 -o page-1.png

  # Rasterise and transcribe page 3
  pdf2md-mcp convert report.pdf 3 -o page-3.md --save-image page-3.png

  # Page count and page sizes
  pdf2md-mcp inspect report.pdf

  # Download pdfium into the local cache
  pdf2md-mcp setup

MCP CLIENT CONFIGURATION:
  {
    "mcpServers": {
      "pdf-to-markdown": {
        "command": "pdf2md-mcp",
        "args": ["serve"],
        "env": { "QWEN_API_URL": "...", "QWEN_API_KEY": "..." }
      }
    }
  }

ENVIRONMENT VARIABLES:
  QWEN_API_URL             Vision endpoint (required for serve/convert)
  QWEN_API_KEY             Bearer token (required for serve/convert)
  QWEN_MODEL               Model ID (default: qwen-vl-max)
  QWEN_API_FORMAT          dashscope | openai (default: detected from the URL)
  QWEN_TIMEOUT_SECS        Request timeout (default: 120)
  PDF2MD_SCALE             Render scale, pixels per point (default: 2.0)
  PDFIUM_LIB_PATH          Path to an existing libpdfium
  PDFIUM_LOCATE_CACHE_DIR  Override the pdfium cache directory
"#;

/// Render PDF pages and transcribe them to Markdown with a vision model.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-mcp",
    version,
    about = "MCP server that converts a PDF page to Markdown with a vision model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Device pixels per PDF point (0.25–8.0).
    #[arg(
        long,
        global = true,
        env = "PDF2MD_SCALE",
        default_value_t = pdf2md_mcp::config::DEFAULT_RENDER_SCALE
    )]
    scale: f32,

    /// PDF user password for encrypted documents (not used by `serve`).
    #[arg(long, global = true, env = "PDF2MD_PASSWORD")]
    password: Option<String>,

    /// Explicit pdfium library to load.
    #[arg(long, global = true)]
    pdfium_lib: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2MD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve `convert_pdf_page_to_markdown` over MCP stdio.
    Serve,

    /// Rasterise one page to PNG.
    Render {
        /// PDF file.
        pdf: PathBuf,
        /// 1-indexed page number.
        #[arg(allow_negative_numbers = true)]
        page: i64,
        /// Output PNG (default: page-<N>.png).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rasterise one page and transcribe it.
    Convert {
        /// PDF file.
        pdf: PathBuf,
        /// 1-indexed page number.
        #[arg(allow_negative_numbers = true)]
        page: i64,
        /// Write Markdown to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the PNG sent to the model.
        #[arg(long)]
        save_image: Option<PathBuf>,
    },

    /// Print page count, metadata and page sizes.
    Inspect {
        /// PDF file.
        pdf: PathBuf,
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Download pdfium into the local cache.
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // stderr only: stdout carries the MCP protocol in `serve`.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let raster = build_raster_config(&cli)?;

    match cli.command {
        Command::Serve => {
            let vision = VisionConfig::from_env().context("Cannot start the MCP server")?;
            // The tool contract has no password argument.
            let raster = RasterConfig {
                password: None,
                ..raster
            };
            run_stdio(raster, vision).await.context("MCP server failed")?;
        }

        Command::Render { pdf, page, output } => {
            let started = Instant::now();
            let png = render_page_png(&pdf, page, &raster)
                .await
                .with_context(|| format!("Failed to render {} page {}", pdf.display(), page))?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("page-{page}.png")));
            write_file(&output, png.as_bytes())?;
            if !cli.quiet {
                eprintln!(
                    "{} page {}  {}  {}  →  {}",
                    green("✔"),
                    page,
                    dim(&format!("{} bytes", png.len())),
                    dim(&format!("{}ms", started.elapsed().as_millis())),
                    bold(&output.display().to_string()),
                );
            }
        }

        Command::Convert {
            pdf,
            page,
            output,
            save_image,
        } => {
            let vision = VisionConfig::from_env().context("Vision endpoint not configured")?;
            let client = VisionClient::new(vision)?;
            let result = convert_page(&pdf, page, &raster, &client)
                .await
                .with_context(|| format!("Failed to convert {} page {}", pdf.display(), page))?;

            if let Some(ref image_path) = save_image {
                write_file(image_path, result.png.as_bytes())?;
            }
            match output {
                Some(ref path) => write_file(path, result.markdown.as_bytes())?,
                None => print!("{}", result.markdown),
            }
            if !cli.quiet {
                eprintln!(
                    "{} page {}  {}  render {}ms  vision {}ms",
                    green("✔"),
                    result.page,
                    dim(&format!("{} chars", result.markdown.len())),
                    result.render_duration_ms,
                    result.vision_duration_ms,
                );
            }
        }

        Command::Inspect { pdf, json } => {
            let info = inspect(&pdf, &raster)
                .await
                .with_context(|| format!("Failed to inspect {}", pdf.display()))?;
            if json {
                let json = serde_json::to_string_pretty(&info)
                    .context("Failed to serialize document info")?;
                println!("{json}");
            } else {
                println!("File:         {}", pdf.display());
                if let Some(ref t) = info.metadata.title {
                    println!("Title:        {}", t);
                }
                if let Some(ref a) = info.metadata.author {
                    println!("Author:       {}", a);
                }
                println!("Pages:        {}", info.page_count);
                println!("PDF Version:  {}", info.metadata.pdf_version);
                if let Some(ref p) = info.metadata.producer {
                    println!("Producer:     {}", p);
                }
                println!("Scale:        {}", raster.scale);
                for p in &info.pages {
                    println!(
                        "  page {:>4}  {:>8.2} × {:<8.2} pt  →  {} px",
                        p.page, p.width_pt, p.height_pt, p.viewport
                    );
                }
            }
        }

        Command::Setup => {
            let path = fetch_pdfium(cli.quiet).await?;
            if !cli.quiet {
                eprintln!("{} pdfium ready: {}", green("✔"), bold(&path.display().to_string()));
            }
        }
    }

    Ok(())
}

fn build_raster_config(cli: &Cli) -> Result<RasterConfig> {
    let mut builder = RasterConfig::builder().scale(cli.scale);
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    builder.build().context("Invalid render settings")
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// Download pdfium with a progress bar (or silently with `--quiet`).
async fn fetch_pdfium(quiet: bool) -> Result<PathBuf> {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    bar.set_prefix("pdfium");
    bar.enable_steady_tick(Duration::from_millis(80));

    let progress = bar.clone();
    let path = tokio::task::spawn_blocking(move || {
        pdfium_locate::fetch_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if progress.length() != Some(t) {
                    progress.set_length(t);
                }
            }
            progress.set_position(downloaded);
        }))
    })
    .await
    .context("Download task panicked")?
    .context("Failed to download pdfium")?;

    bar.finish_and_clear();
    Ok(path)
}
