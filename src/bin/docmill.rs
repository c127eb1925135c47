//! CLI binary for docmill.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs one pipeline per input and prints the JSON results.

use anyhow::{Context, Result};
use clap::Parser;
use docmill::{
    write_json, BlockStats, ConversionProgressCallback, OfficeRenderer, PageSeparator,
    PdfiumConverter, Pipeline, PipelineConfig, ProgressCallback, ResultDocument, Stage,
};
use docmill::pipeline::input::has_image_extension;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar over all inputs; a log line per finished file. Files may finish
/// out of order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, filename: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(filename))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_request_start(&self, filename: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(filename.to_string(), Instant::now());
        }
        self.bar.set_message(filename.to_string());
    }

    fn on_stage(&self, filename: &str, stage: Stage) {
        self.bar.set_message(format!("{filename}: {stage}"));
    }

    fn on_request_complete(&self, filename: &str, stats: &BlockStats) {
        let secs = self.elapsed_secs(filename);
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            green("✓"),
            filename,
            dim(&format!("{} images, {} tables", stats.images, stats.tables)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_request_error(&self, filename: &str, error: String) {
        let secs = self.elapsed_secs(filename);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error,
        };

        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            filename,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one document, JSON on stdout
  docmill report.pdf

  # Office documents are rendered to PDF first (needs LibreOffice)
  docmill slides.pptx letter.docx -o out/

  # Images are routed by extension, or forced with --image
  docmill scan.png
  docmill --image upload.bin

  # Convert from URL
  docmill https://example.org/files/whitepaper.pdf

  # Several inputs at once
  docmill -c 8 -o out/ docs/*.pdf

  # Check the environment
  docmill --check

ENVIRONMENT VARIABLES:
  DOCMILL_OFFICE_BIN    Office renderer executable (default: libreoffice)
  DOCMILL_TEMP_DIR      Root directory for transient files
  DOCMILL_PASSWORD      PDF user password
  PDFIUM_LIB_PATH       Path to libpdfium (file or directory)
  RUST_LOG              Log filter, overrides --verbose / --quiet
"#;

/// Normalise PDF, office documents and images into Markdown, media and stats.
#[derive(Parser, Debug)]
#[command(
    name = "docmill",
    version,
    about = "Normalise PDF, office documents and images into Markdown, media and block statistics",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs.
    #[arg(required_unless_present = "check")]
    inputs: Vec<String>,

    /// Write `<filename>.json` per input into this directory instead of stdout.
    #[arg(short, long, env = "DOCMILL_OUTPUT")]
    output: Option<PathBuf>,

    /// Treat every input as an image.
    #[arg(long)]
    image: bool,

    /// Number of inputs converted concurrently.
    #[arg(short, long, env = "DOCMILL_CONCURRENCY", default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..=256))]
    concurrency: u16,

    /// Skip picture encoding; block_stats still reports the counts.
    #[arg(long, env = "DOCMILL_NO_IMAGES")]
    no_images: bool,

    /// Office renderer executable.
    #[arg(long, env = "DOCMILL_OFFICE_BIN", default_value = docmill::DEFAULT_OFFICE_PROGRAM)]
    office_bin: String,

    /// Root directory for transient files.
    #[arg(long, env = "DOCMILL_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCMILL_PASSWORD")]
    password: Option<String>,

    /// Page separator in text: none, hr, comment, or custom string.
    #[arg(long, env = "DOCMILL_SEPARATOR", default_value = "none")]
    separator: String,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOCMILL_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "DOCMILL_NO_PROGRESS")]
    no_progress: bool,

    /// Report whether the office renderer and pdfium are usable, then exit.
    #[arg(long)]
    check: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCMILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCMILL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.check;
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

    if cli.check {
        return run_check(&cli).await;
    }

    // ── Build pipeline ───────────────────────────────────────────────────
    let progress = show_progress.then(|| CliProgressCallback::new(cli.inputs.len()));
    let config = build_config(&cli, progress.clone().map(|p| p as ProgressCallback))?;
    let pipeline = Pipeline::with_default_engine(config);

    if let Some(ref dir) = cli.output {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    // ── Run conversions ──────────────────────────────────────────────────
    let started = Instant::now();
    let results: Vec<(String, docmill::Result<ResultDocument>)> =
        stream::iter(cli.inputs.iter().cloned().map(|input| {
            let pipeline = pipeline.clone();
            let as_image = cli.image || has_image_extension(&input);
            async move {
                let result = if as_image {
                    pipeline.ingest_input(&input).await
                } else {
                    pipeline.convert_input(&input).await
                };
                (input, result)
            }
        }))
        .buffered(cli.concurrency as usize)
        .collect()
        .await;

    if let Some(ref p) = progress {
        p.finish();
    }

    // ── Emit ─────────────────────────────────────────────────────────────
    let mut docs = Vec::new();
    let mut failed = 0usize;
    for (input, result) in results {
        match result {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                failed += 1;
                // the progress bar already reported it
                if progress.is_none() {
                    eprintln!("{} {}: {} [{}]", red("✗"), input, e, e.kind());
                }
            }
        }
    }

    if let Some(ref dir) = cli.output {
        let mut names = OutputNames::default();
        for doc in &docs {
            let path = dir.join(names.claim(&doc.metadata.filename));
            write_json(doc, &path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("{}  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
    } else if !docs.is_empty() {
        let json = if cli.inputs.len() == 1 {
            serde_json::to_string_pretty(&docs[0])
        } else {
            serde_json::to_string_pretty(&docs)
        }
        .context("Failed to serialise output")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        eprintln!(
            "{} {}/{} inputs converted in {}ms",
            if failed == 0 { green("✔") } else { red("✘") },
            bold(&docs.len().to_string()),
            cli.inputs.len(),
            started.elapsed().as_millis(),
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} inputs failed", cli.inputs.len());
    }
    Ok(())
}

/// Output file names for one run.
///
/// Each result is written to `<filename>.json`; when two inputs share a file
/// name (`a/report.pdf` and `b/report.pdf`), later ones get `-1`, `-2`, ...
#[derive(Debug, Default)]
struct OutputNames {
    taken: HashSet<String>,
}

impl OutputNames {
    fn claim(&mut self, filename: &str) -> String {
        let mut candidate = format!("{filename}.json");
        let mut n = 1;
        while !self.taken.insert(candidate.clone()) {
            candidate = format!("{filename}-{n}.json");
            n += 1;
        }
        candidate
    }
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .office_program(&cli.office_bin)
        .extract_images(!cli.no_images)
        .page_separator(parse_separator(&cli.separator))
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

/// `--check`: probe the external collaborators.
async fn run_check(cli: &Cli) -> Result<()> {
    let renderer = OfficeRenderer::new(&cli.office_bin);
    let renderer_ok = renderer.is_available().await;
    println!(
        "{} office renderer  {}",
        if renderer_ok { green("✓") } else { red("✗") },
        renderer.program()
    );

    let engine = tokio::task::spawn_blocking(|| PdfiumConverter::new().probe())
        .await
        .context("Engine probe panicked")?;
    match &engine {
        Ok(()) => println!("{} pdfium", green("✓")),
        Err(e) => println!("{} pdfium  {}", red("✗"), dim(&e.to_string())),
    }

    if !renderer_ok || engine.is_err() {
        anyhow::bail!("environment check failed");
    }
    Ok(())
}
