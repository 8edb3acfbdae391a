use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use notepress::{ExportOptions, OutputFormat, PageGeometry, Theme};

/// Lay out a markdown note as fixed-size pages
#[derive(Parser, Debug)]
#[command(name = "notepress")]
#[command(version)]
#[command(about = "Export markdown notes as paginated SVG, PNG or PDF", long_about = None)]
struct Args {
    /// Input markdown file (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Document title (defaults to the input file name)
    #[arg(long)]
    title: Option<String>,

    /// Directory the page files are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pdf")]
    format: Format,

    /// Path to an Alacritty theme file (YAML or TOML) or a native theme file
    #[arg(short, long, value_name = "THEME", conflicts_with = "builtin_theme")]
    theme: Option<PathBuf>,

    /// Name of a built-in theme
    #[arg(long, value_name = "NAME")]
    builtin_theme: Option<String>,

    /// Page size
    #[arg(long, value_enum, default_value = "a4")]
    page_size: PageSize,

    /// Per-image fetch timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 5.0)]
    image_timeout: f64,

    /// Render every image as its alt-text placeholder
    #[arg(long)]
    no_images: bool,

    /// Raster scale multiplier for PNG output (e.g. 2.0 for sharper output)
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Svg,
    Png,
    Pdf,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Svg => OutputFormat::Svg,
            Format::Png => OutputFormat::Png,
            Format::Pdf => OutputFormat::Pdf,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PageSize {
    A4,
    Letter,
}

impl From<PageSize> for PageGeometry {
    fn from(size: PageSize) -> Self {
        match size {
            PageSize::A4 => PageGeometry::a4(),
            PageSize::Letter => PageGeometry::letter(),
        }
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> notepress::Result<()> {
    let theme = load_theme(&args)?;

    let from_stdin = args.input.to_str() == Some("-");
    let content = if from_stdin {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)?
    };

    let title = args.title.clone().unwrap_or_else(|| {
        if from_stdin {
            String::new()
        } else {
            default_title(&args.input)
        }
    });

    let image_timeout = if args.image_timeout.is_finite() && args.image_timeout > 0.0 {
        Duration::from_secs_f64(args.image_timeout)
    } else {
        notepress::image::DEFAULT_IMAGE_TIMEOUT
    };

    let options = ExportOptions {
        format: args.format.into(),
        out_dir: args.out_dir.clone(),
        png_scale: args.png_scale,
        theme,
        geometry: args.page_size.into(),
        image_timeout,
        images_enabled: !args.no_images,
        base_path: if from_stdin {
            None
        } else {
            args.input.parent().map(Path::to_path_buf)
        },
    };

    let written = notepress::export(&title, &content, &options)?;
    for path in &written {
        eprintln!("{} saved to: {}", options.format.extension().to_uppercase(), path.display());
    }
    Ok(())
}

fn load_theme(args: &Args) -> notepress::Result<Theme> {
    if let Some(path) = &args.theme {
        if !path.is_file() {
            return Err(notepress::Error::Theme(format!(
                "theme file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        return Theme::from_file_content(&content);
    }
    match &args.builtin_theme {
        Some(name) => Theme::from_builtin(name),
        None => Ok(Theme::default()),
    }
}

fn default_title(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}
