//! pagewipe CLI - PDF header/footer region eraser

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pagewipe::backend::{load_document, page_box, page_rotation};
use pagewipe::{
    crop_footer, detect_format_from_bytes, preview_file, set_dimension, set_enabled,
    ConfigStore, DimensionField, DocumentProcessingService, ErrorResponse, FileStore,
    FooterAnnotation, LopdfProcessor, PaginationConfig, ProcessRequest, RegionKind, Rotation,
    DEFAULT_RENDER_SCALE,
};

#[derive(Parser)]
#[command(name = "pagewipe")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Preview and erase PDF header/footer regions", long_about = None)]
struct Cli {
    /// Directory holding settings.json (defaults to the platform config dir)
    #[arg(long, global = true, env = "PAGEWIPE_CONFIG_DIR", value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show page count and per-page geometry
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Document password
        #[arg(long)]
        password: Option<String>,
    },

    /// Render one page with the configured regions overlaid
    Preview {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page to render (1-indexed)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Render scale
        #[arg(long, default_value_t = DEFAULT_RENDER_SCALE)]
        scale: f64,

        /// Document password
        #[arg(long)]
        password: Option<String>,

        /// Output PNG file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Erase the configured regions and stamp page labels
    Process {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Document password
        #[arg(long)]
        password: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cut the footer off every page instead of painting over it
    Crop {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Height to remove, in points (1-500)
        #[arg(long)]
        height: f64,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Document password
        #[arg(long)]
        password: Option<String>,
    },

    /// Show or change the saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore every setting to its default
    Reset,

    /// Enable a region
    Enable {
        #[arg(value_enum)]
        area: Area,
    },

    /// Disable a region
    Disable {
        #[arg(value_enum)]
        area: Area,
    },

    /// Change a region dimension (10-500)
    Set {
        #[arg(value_enum)]
        area: Area,

        #[arg(value_enum)]
        field: Field,

        value: f64,
    },

    /// Set the first processed page and the first numbered page
    Pagination {
        /// First page to process
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        start: Option<u32>,

        /// Page labelled as page 1
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        number_from: Option<u32>,
    },

    /// Set the text printed under the page label
    FooterText {
        /// Footer text (at most 100 characters; empty to clear)
        text: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Area {
    HeaderFull,
    HeaderLeft,
    HeaderRight,
    FooterFull,
    FooterLeft,
    FooterRight,
}

impl From<Area> for RegionKind {
    fn from(area: Area) -> Self {
        match area {
            Area::HeaderFull => RegionKind::HeaderFull,
            Area::HeaderLeft => RegionKind::HeaderLeft,
            Area::HeaderRight => RegionKind::HeaderRight,
            Area::FooterFull => RegionKind::FooterFull,
            Area::FooterLeft => RegionKind::FooterLeft,
            Area::FooterRight => RegionKind::FooterRight,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Field {
    Width,
    Height,
}

impl From<Field> for DimensionField {
    fn from(field: Field) -> Self {
        match field {
            Field::Width => DimensionField::Width,
            Field::Height => DimensionField::Height,
        }
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config_dir = cli.config_dir.as_deref();

    let result = match cli.command {
        Commands::Info { input, password } => cmd_info(&input, password.as_deref()),
        Commands::Preview {
            input,
            page,
            scale,
            password,
            output,
        } => cmd_preview(config_dir, &input, page, scale, password, output.as_deref()),
        Commands::Process {
            input,
            output,
            password,
            json,
        } => cmd_process(config_dir, &input, output.as_deref(), password, json),
        Commands::Crop {
            input,
            height,
            output,
            password,
        } => cmd_crop(&input, height, output.as_deref(), password.as_deref()),
        Commands::Config { action } => cmd_config(config_dir, action),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn open_config(config_dir: Option<&Path>) -> Result<ConfigStore<FileStore>, Box<dyn std::error::Error>> {
    let store = match config_dir {
        Some(dir) => FileStore::in_dir(dir),
        None => FileStore::in_config_dir()?,
    };
    log::debug!("Using settings file {}", store.path().display());
    Ok(ConfigStore::new(store))
}

fn sibling_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(message);
    pb
}

fn cmd_info(input: &Path, password: Option<&str>) -> CmdResult {
    let bytes = fs::read(input)?;
    let format = detect_format_from_bytes(&bytes)?;
    let doc = load_document(&bytes, password)?;
    let pages = doc.get_pages();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), format.version);
    println!("{}: {}", "Pages".bold(), pages.len());

    println!();
    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for (number, page_id) in &pages {
        let rotation = page_rotation(&doc, *page_id);
        let viewport = page_box(&doc, *page_id).viewport(1.0, rotation.corrected());
        let note = if rotation == Rotation::Degrees180 {
            " (upside down, turned upright on processing)".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{:>5}  {:>7.1} x {:<7.1} pt  {:>3}°{}",
            number, viewport.width, viewport.height, rotation.as_degrees(), note
        );
    }

    Ok(())
}

fn cmd_preview(
    config_dir: Option<&Path>,
    input: &Path,
    page: u32,
    scale: f64,
    password: Option<String>,
    output: Option<&Path>,
) -> CmdResult {
    let config = open_config(config_dir)?.load_config();
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_path(input, &format!("_page{}", page), "png"));

    let pb = spinner("Rendering page...");
    let rt = tokio::runtime::Runtime::new()?;
    let rendered = rt.block_on(preview_file(input, page, &config.regions, scale, password));
    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };
    rendered.surface.save(&output)?;
    pb.finish_with_message("Done!");

    println!(
        "\n{} page {} ({}x{} px, {}°)",
        "Rendered".green().bold(),
        rendered.page_number,
        rendered.surface.width(),
        rendered.surface.height(),
        rendered.rotation.as_degrees()
    );
    if rendered.rotation != rendered.intrinsic_rotation {
        println!(
            "  {} stored at {}°, shown upright",
            "note:".yellow(),
            rendered.intrinsic_rotation.as_degrees()
        );
    }
    let count = rendered.overlays.len();
    for (i, rect) in rendered.overlays.iter().enumerate() {
        let branch = if i + 1 == count { "└─" } else { "├─" };
        println!(
            "  {} {} at ({:.0}, {:.0})",
            branch.dimmed(),
            rect.label,
            rect.x,
            rect.y
        );
    }
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_process(
    config_dir: Option<&Path>,
    input: &Path,
    output: Option<&Path>,
    password: Option<String>,
    json: bool,
) -> CmdResult {
    let config = open_config(config_dir)?.load_config();
    let mut request = ProcessRequest::from_config(&config);
    if let Some(password) = password {
        request = request.with_credential(password);
    }
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_path(input, "_clean", "pdf"));
    let source = fs::read(input)?;

    let pb = spinner("Processing PDF...");
    let result = LopdfProcessor::default().process(&source, &request);
    pb.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) if json => {
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            std::process::exit(1);
        }
        Err(e) => {
            if e.requires_password() {
                eprintln!("{} re-run with --password", "hint:".yellow());
            }
            return Err(e.into());
        }
    };
    fs::write(&output, &report.bytes)?;

    if json {
        let body = serde_json::json!({
            "status": "success",
            "output": output.display().to_string(),
            "totalPages": report.total_pages,
            "processedPages": report.processed_pages,
            "labelledPages": report.labelled_pages,
            "correctedPages": report.corrected_pages,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", "Processing complete".green().bold());
    println!("  {} {} of {} pages processed", "├─".dimmed(), report.processed_pages, report.total_pages);
    println!("  {} {} pages labelled", "├─".dimmed(), report.labelled_pages);
    println!("  {} {} pages turned upright", "└─".dimmed(), report.corrected_pages);
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_crop(input: &Path, height: f64, output: Option<&Path>, password: Option<&str>) -> CmdResult {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_path(input, "_cropped", "pdf"));
    let source = fs::read(input)?;

    let pb = spinner("Cropping pages...");
    let result = crop_footer(&source, height, password);
    pb.finish_and_clear();
    let report = result?;

    fs::write(&output, &report.bytes)?;
    println!(
        "{} {:.0}pt from {} of {} pages",
        "Cropped".green().bold(),
        height,
        report.processed_pages,
        report.total_pages
    );
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_config(config_dir: Option<&Path>, action: ConfigAction) -> CmdResult {
    let config = open_config(config_dir)?;
    let current = config.load_config();

    match action {
        ConfigAction::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&current)?);
            } else {
                print_config(&config, &current);
            }
            return Ok(());
        }
        ConfigAction::Reset => {
            config.reset();
            println!("{}", "Settings reset to defaults".green());
        }
        ConfigAction::Enable { area } => {
            let kind = RegionKind::from(area);
            config.save_regions(&set_enabled(&current.regions, kind, true));
            println!("{} {}", "Enabled".green(), kind);
        }
        ConfigAction::Disable { area } => {
            let kind = RegionKind::from(area);
            config.save_regions(&set_enabled(&current.regions, kind, false));
            println!("{} {}", "Disabled".green(), kind);
        }
        ConfigAction::Set { area, field, value } => {
            let kind = RegionKind::from(area);
            let field = DimensionField::from(field);
            let regions = set_dimension(&current.regions, kind, field, value)?;
            config.save_regions(&regions);
            println!("{} {} {} = {}", "Set".green(), kind, field, value);
        }
        ConfigAction::Pagination { start, number_from } => {
            let pagination = PaginationConfig::new(
                start.unwrap_or(current.pagination.process_start_page),
                number_from.unwrap_or(current.pagination.page_number_start),
            );
            config.save_pagination(&pagination);
            println!(
                "{} processing from page {}, numbering from page {}",
                "Set".green(),
                pagination.process_start_page,
                pagination.page_number_start
            );
        }
        ConfigAction::FooterText { text } => {
            let footer = FooterAnnotation::new(&text)?;
            config.save_footer_text(&footer);
            if footer.is_empty() {
                println!("{}", "Footer text cleared".green());
            } else {
                println!("{} {:?}", "Footer text set to".green(), footer.as_str());
            }
        }
    }

    Ok(())
}

fn print_config(config: &ConfigStore<FileStore>, current: &pagewipe::AppConfig) {
    println!("{}", "Regions".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for (kind, region) in current.regions.iter() {
        let state = if region.enabled {
            "on ".green().bold()
        } else {
            "off".dimmed()
        };
        let size = match region.width() {
            Some(width) => format!("{} x {}", width, region.height()),
            None => format!("height {}", region.height()),
        };
        println!("  {}  {:<14} {}", state, kind.label(), size);
    }

    println!();
    println!("{}", "Pagination".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {}",
        "Process from page".bold(),
        current.pagination.process_start_page
    );
    println!(
        "{}: {}",
        "Number from page".bold(),
        current.pagination.page_number_start
    );
    println!(
        "{}: {}",
        "Footer text".bold(),
        if current.footer_text.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            current.footer_text.as_str().to_string()
        }
    );

    println!();
    println!("{}: {}", "Settings file".bold(), config.store().path().display());
}

fn cmd_version() {
    println!("{} {}", "pagewipe".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF header/footer region eraser");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pagewipe".dimmed());
    println!("License: MIT");
}
