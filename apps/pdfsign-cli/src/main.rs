//! pdfsign command line
//!
//! Stamps signature images onto PDFs and runs the Word/PDF converters
//! outside the browser, using the same core as the web app.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdfsign_core::validation::{self, FileKind};
use pdfsign_core::{
    embed_signatures_with_report, Point, Raster, SignatureAnnotation, SignatureKind,
    SignatureStore, SignerConfig, Size,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfsign")]
#[command(version, about = "Place signature images on PDFs and convert Word/PDF")]
struct Args {
    /// Signer settings (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page count, version and metadata
    Info { input: PathBuf },

    /// Embed signature images and write a signed copy
    Sign {
        input: PathBuf,

        /// Saved signature store (JSON)
        #[arg(short, long)]
        annotations: Option<PathBuf>,

        /// PAGE:X:Y:WIDTH:HEIGHT:IMAGE, viewer coordinates at 100% zoom
        #[arg(short, long)]
        stamp: Vec<StampArg>,

        /// Provenance recorded for --stamp images
        #[arg(long, default_value = "uploaded_image")]
        kind: SignatureKind,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract text lines from a PDF into a .docx
    PdfToWord {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reflow the text of a .docx into a PDF
    WordToPdf {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// One `--stamp` value
#[derive(Debug, Clone, PartialEq)]
struct StampArg {
    page: u32,
    position: Point,
    size: Size,
    image: PathBuf,
}

impl FromStr for StampArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The image path is last so it may itself contain ':'
        let parts: Vec<&str> = s.splitn(6, ':').collect();
        if parts.len() != 6 || parts[5].is_empty() {
            return Err(format!("expected PAGE:X:Y:WIDTH:HEIGHT:IMAGE, got '{}'", s));
        }
        let num = |v: &str| {
            v.parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", v))
        };
        let page = parts[0]
            .parse::<u32>()
            .map_err(|_| format!("'{}' is not a page number", parts[0]))?;
        Ok(Self {
            page,
            position: Point::new(num(parts[1])?, num(parts[2])?),
            size: Size::new(num(parts[3])?, num(parts[4])?),
            image: PathBuf::from(parts[5]),
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Results go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => SignerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SignerConfig::default(),
    };

    match args.command {
        Command::Info { input } => {
            let bytes = read(&input)?;
            let info = validation::validate_pdf(&bytes)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Sign {
            input,
            annotations,
            stamp,
            kind,
            output,
        } => sign(&config, &input, annotations.as_deref(), &stamp, kind, output)?,
        Command::PdfToWord { input, output } => {
            validation::validate_file_type(&input.to_string_lossy(), FileKind::Pdf)?;
            let docx = pdfsign_core::pdf_to_docx(&read(&input)?)?;
            let output = output.unwrap_or_else(|| converted_path(&input, FileKind::Word));
            write(&output, &docx)?;
        }
        Command::WordToPdf { input, output } => {
            validation::validate_file_type(&input.to_string_lossy(), FileKind::Word)?;
            let pdf = pdfsign_core::docx_to_pdf(&read(&input)?)?;
            let output = output.unwrap_or_else(|| converted_path(&input, FileKind::Pdf));
            write(&output, &pdf)?;
        }
    }

    Ok(())
}

fn sign(
    config: &SignerConfig,
    input: &Path,
    annotations: Option<&Path>,
    stamps: &[StampArg],
    kind: SignatureKind,
    output: Option<PathBuf>,
) -> Result<()> {
    let filename = input.to_string_lossy();
    let bytes = read(input)?;
    let info = validation::validate_pdf_upload(&filename, &bytes, &config.uploads)?;
    tracing::info!(pages = info.page_count, "Loaded {}", input.display());

    let mut store = match annotations {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SignatureStore::from_json(&json)
                .with_context(|| format!("parsing annotations {}", path.display()))?
        }
        None => SignatureStore::new(),
    };

    for stamp in stamps {
        let image = read(&stamp.image)?;
        validation::validate_signature_image(&image, &config.uploads)
            .with_context(|| format!("signature image {}", stamp.image.display()))?;
        store.add(
            SignatureAnnotation::new(kind, Raster::new(image), stamp.page)
                .with_position(stamp.position)
                .with_size(config.limits.apply(stamp.size)),
        );
    }

    if store.is_empty() {
        bail!("nothing to sign: pass --annotations or at least one --stamp");
    }

    let report = embed_signatures_with_report(&bytes, store.annotations())?;
    for skipped in &report.skipped {
        tracing::warn!(id = skipped.id, reason = ?skipped.reason, "Signature not embedded");
    }

    let output = output.unwrap_or_else(|| {
        let name = validation::signed_filename(&filename, &config.output.signed_suffix);
        input.with_file_name(name)
    });
    write(&output, &report.bytes)?;
    println!(
        "{} signature(s) embedded, {} skipped -> {}",
        report.embedded,
        report.skipped.len(),
        output.display()
    );
    Ok(())
}

fn converted_path(input: &Path, target: FileKind) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(validation::converted_filename(&name, target))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(bytes = bytes.len(), "Wrote {}", path.display());
    Ok(())
}
