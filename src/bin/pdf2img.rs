//! CLI binary for edgequake-pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionSettings`, writes the page images and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2img::{
    convert, dispatch_summary, inspect, resolve_input, write_artifacts, ConversionProgressCallback,
    ConversionSettings, DocumentAnalysis, ImageFormat, LlmSummarizer, PageArtifact,
    ProgressCallback, Summarizer, MAX_SCALE, MIN_SCALE,
};
use edgequake_pdf2img::pipeline::input::default_output_dir;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a percentage bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }

    fn activate_bar(&self) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(100);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_complete(&self, artifact: &PageArtifact, percent: u8) {
        self.bar.println(format!(
            "  {} Page {:>3}  {:<12}  {}",
            green("✓"),
            artifact.page_num,
            dim(&format!("{}x{}", artifact.width, artifact.height)),
            dim(&format!("{:>7} KB", artifact.byte_len() / 1024)),
        ));
        self.bar.set_position(u64::from(percent));
    }

    fn on_conversion_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages rendered in {:.1}s",
            green("✔"),
            bold(&total_pages.to_string()),
            self.started.elapsed().as_secs_f64()
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page as PNG at scale 2 (next to the PDF)
  pdf2img document.pdf

  # Selected pages into a directory
  pdf2img --pages "1-5, 8, 10-12" -o images/ report.pdf

  # JPEG at 300 DPI-equivalent, quality 0.8
  pdf2img --format jpeg --scale 4.17 --quality 0.8 scan.pdf

  # Convert from URL
  pdf2img https://arxiv.org/pdf/1706.03762 --pages 1 -o attention/

  # Inspect PDF metadata (no rendering)
  pdf2img --inspect-only document.pdf

  # Also summarise the first pages with an LLM
  pdf2img --summarize --pages 1-3 paper.pdf

PAGE RANGES:
  Comma-separated pages and inclusive intervals, e.g. "1-5, 8, 10-12".
  An empty range selects every page. Malformed tokens are ignored and
  out-of-range pages are clamped away; a range that selects nothing is an error.

OUTPUT FILES:
  {name}-page-{n}.png or {name}-page-{n}.jpg, one per selected page.

ENVIRONMENT VARIABLES:
  PDF2IMG_PAGES, PDF2IMG_FORMAT, PDF2IMG_SCALE, PDF2IMG_QUALITY, PDF2IMG_OUTPUT_DIR
  OPENAI_API_KEY          OpenAI API key (for --summarize)
  ANTHROPIC_API_KEY       Anthropic API key (for --summarize)
  EDGEQUAKE_LLM_PROVIDER  Override summary provider
  EDGEQUAKE_MODEL         Override summary model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium — skips auto-download
  PDFIUM_FETCH_CACHE_DIR  Override the default pdfium cache directory

  PDFium (~30 MB) is downloaded automatically on first run and cached.
"#;

/// Convert PDF pages to PNG or JPEG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Convert PDF pages to PNG or JPEG images",
    long_about = "Render selected pages of a PDF document (local file or URL) to PNG or JPEG \
images at a chosen scale. Pages render one at a time; if any selected page fails, no images \
are written.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Directory for the images. Default: next to the PDF (or `.` for URLs).
    #[arg(short, long, env = "PDF2IMG_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Page range, e.g. "1-5, 8, 10-12". Empty selects every page.
    #[arg(long, env = "PDF2IMG_PAGES", default_value = "")]
    pages: String,

    /// Output image format.
    #[arg(long, env = "PDF2IMG_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// Render scale (1.0 = 72 DPI).
    #[arg(long, env = "PDF2IMG_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// JPEG quality, 0.0–1.0. Ignored for PNG.
    #[arg(long, env = "PDF2IMG_QUALITY", default_value_t = 0.92)]
    quality: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2IMG_PASSWORD")]
    password: Option<String>,

    /// Summarise text from the first pages with an LLM (best effort).
    #[arg(long, env = "PDF2IMG_SUMMARIZE")]
    summarize: bool,

    /// LLM model ID for --summarize.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider for --summarize: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Language of the summary.
    #[arg(long, env = "PDF2IMG_SUMMARY_LANGUAGE", default_value = "English")]
    summary_language: String,

    /// Seconds to wait for the summary after the images are written.
    #[arg(long, env = "PDF2IMG_SUMMARY_TIMEOUT", default_value_t = 30)]
    summary_timeout: u64,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print a JSON report instead of human-readable output.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2IMG_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// What `--json` prints after a conversion.
#[derive(Serialize)]
struct Report<'a> {
    input: &'a str,
    files: Vec<PathBuf>,
    artifacts: &'a [PageArtifact],
    extracted_text: &'a str,
    stats: &'a edgequake_pdf2img::ConversionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<DocumentAnalysis>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Ensure PDFium engine is available ───────────────────────────────────
    ensure_pdfium(cli.quiet)?;

    // ── Resolve input ────────────────────────────────────────────────────
    let mut source = resolve_input(&cli.input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to read '{}'", cli.input))?;
    if let Some(ref password) = cli.password {
        source = source.with_password(password.clone());
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&source).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Settings ─────────────────────────────────────────────────────────
    let settings = build_settings(&cli)?;
    let summarizer = if cli.summarize {
        build_summarizer(&cli)
    } else {
        None
    };

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&source, &settings, progress_cb)
        .await
        .context("Conversion failed")?;

    // Dispatched before writing so the summary overlaps with disk I/O.
    let pending_summary =
        summarizer.and_then(|s| dispatch_summary(s, &output.extracted_text));

    let out_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.input));
    let files = write_artifacts(&output.artifacts, &out_dir, &source.stem())
        .await
        .context("Failed to write images")?;

    let analysis = match pending_summary {
        Some(rx) => match tokio::time::timeout(Duration::from_secs(cli.summary_timeout), rx).await {
            Ok(Ok(analysis)) => Some(analysis),
            Ok(Err(_)) => None,
            Err(_) => {
                warn!("Summary not ready after {}s; skipping", cli.summary_timeout);
                None
            }
        },
        None => None,
    };

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let report = Report {
            input: &cli.input,
            files,
            artifacts: &output.artifacts,
            extracted_text: &output.extracted_text,
            stats: &output.stats,
            analysis,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
        return Ok(());
    }

    if !cli.quiet {
        if !show_progress {
            eprintln!(
                "Rendered {}/{} pages in {}ms",
                output.stats.selected_pages,
                output.stats.total_pages,
                output.stats.total_duration_ms
            );
        }
        eprintln!(
            "   {} files  /  {} KB  →  {}",
            dim(&files.len().to_string()),
            dim(&(output.stats.total_bytes / 1024).to_string()),
            bold(&out_dir.display().to_string()),
        );
        if let Some(a) = analysis {
            eprintln!("{} {}", cyan("◆"), a.summary);
            if !a.suggested_tags.is_empty() {
                eprintln!("   {}", dim(&a.suggested_tags.join(" · ")));
            }
        }
    }

    Ok(())
}

/// Locate PDFium once for the process, showing a download bar the first time.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if quiet || pdfium_fetch::find_library().is_some() {
        tokio::task::block_in_place(|| pdfium_fetch::init_library(None))
            .context("Failed to locate PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_fetch::init_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map CLI args to `ConversionSettings`.
fn build_settings(cli: &Cli) -> Result<ConversionSettings> {
    if !(MIN_SCALE..=MAX_SCALE).contains(&cli.scale) {
        anyhow::bail!(
            "--scale must be between {MIN_SCALE} and {MAX_SCALE} (got {})",
            cli.scale
        );
    }
    if !(0.0..=1.0).contains(&cli.quality) {
        anyhow::bail!("--quality must be between 0 and 1 (got {})", cli.quality);
    }

    ConversionSettings::builder()
        .format(cli.format.into())
        .scale(cli.scale)
        .quality(cli.quality)
        .page_range(cli.pages.clone())
        .build()
        .context("Invalid configuration")
}

/// Summaries are optional: a missing provider is a warning, not an error.
fn build_summarizer(cli: &Cli) -> Option<Arc<dyn Summarizer>> {
    let built = match cli.provider {
        Some(ref name) => LlmSummarizer::with_provider(name, cli.model.as_deref()),
        None => LlmSummarizer::from_env(cli.model.as_deref()),
    };
    match built {
        Ok(s) => {
            let summarizer: Arc<dyn Summarizer> =
                Arc::new(s.with_language(cli.summary_language.clone()));
            Some(summarizer)
        }
        Err(e) => {
            warn!("Summaries disabled: {}", e);
            if !cli.quiet {
                eprintln!("{} summaries disabled: {}", cyan("⚠"), e);
            }
            None
        }
    }
}
