use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use pdfmark::config::{parse_color, PageSelection, WatermarkConfig};
use pdfmark::geometry::{PageGeometry, A4};
use pdfmark::logging::{self, LogFormat};
use pdfmark::metrics::StandardFont;
use pdfmark::pdf_ops::{self, parse_page_size};
use pdfmark::placement::{BoxAnchor, PivotConvention, TextAlignment};
use pdfmark::parallel;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdfmark", version)]
#[command(about = "Stamp rotated text watermarks onto PDFs exactly where a preview placed them")]
struct Cli {
    #[arg(short, long, action = ArgAction::Count, global = true, help = "More log output (-v info, -vv debug)")]
    verbose: u8,
    #[arg(long, value_enum, default_value = "plain", global = true, help = "Log output format")]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

/// Watermark style flags; each one overrides the config file.
#[derive(Args, Debug, Default)]
struct StyleArgs {
    #[arg(long, help = "JSON configuration file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Watermark text (\\n separates lines)")]
    text: Option<String>,
    #[arg(long, allow_hyphen_values = true, help = "Anchor X, percent from the left edge")]
    x: Option<f64>,
    #[arg(long, allow_hyphen_values = true, help = "Anchor Y, percent from the top edge")]
    y: Option<f64>,
    #[arg(long, help = "Font size in points")]
    size: Option<f64>,
    #[arg(long, allow_hyphen_values = true, help = "Rotation in degrees, counter-clockwise")]
    rotation: Option<f64>,
    #[arg(long, help = "Opacity (0.0-1.0)")]
    opacity: Option<f64>,
    #[arg(long, help = "Standard font, e.g. Helvetica-Bold or Times-Roman")]
    font: Option<StandardFont>,
    #[arg(long, value_parser = parse_color, help = "Fill colour as r,g,b (0-1) or #rrggbb")]
    color: Option<[f64; 3]>,
    #[arg(long, help = "Line alignment: left, center, right")]
    align: Option<TextAlignment>,
    #[arg(long, help = "Point of the text box placed on the anchor: center, top-left, ... or fx,fy")]
    box_anchor: Option<BoxAnchor>,
    #[arg(long, help = "Baseline distance as a multiple of the line height")]
    line_spacing: Option<f64>,
    #[arg(long, help = "Pages to stamp: all, or a list like 1,3-5")]
    pages: Option<PageSelection>,
    #[arg(long, help = "Write the stamp streams uncompressed")]
    no_compress: bool,
}

impl StyleArgs {
    fn to_config(&self) -> Result<WatermarkConfig> {
        let mut config = match &self.config {
            Some(path) => WatermarkConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => WatermarkConfig::default(),
        };

        if let Some(text) = &self.text {
            config.text = text.replace("\\n", "\n");
        }
        if let Some(x) = self.x {
            config.anchor.x = x;
        }
        if let Some(y) = self.y {
            config.anchor.y = y;
        }
        if let Some(size) = self.size {
            config.font_size = size;
        }
        if let Some(rotation) = self.rotation {
            config.rotation = rotation;
        }
        if let Some(opacity) = self.opacity {
            config.opacity = opacity;
        }
        if let Some(font) = self.font {
            config.font = font;
        }
        if let Some(color) = self.color {
            config.color = color;
        }
        if let Some(align) = self.align {
            config.alignment = align;
        }
        if let Some(box_anchor) = self.box_anchor {
            config.box_anchor = box_anchor;
        }
        if let Some(line_spacing) = self.line_spacing {
            config.line_spacing = line_spacing;
        }
        if let Some(pages) = &self.pages {
            config.pages = pages.clone();
        }
        if self.no_compress {
            config.compress = false;
        }

        Ok(config.validate()?)
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Add a text watermark to a PDF")]
    Watermark {
        #[arg(help = "Input PDF file")]
        input: String,
        #[arg(short, long, help = "Output PDF file")]
        output: String,
        #[command(flatten)]
        style: StyleArgs,
        #[arg(long, help = "Print the per-page placements as JSON")]
        json: bool,
    },
    #[command(about = "Watermark many PDFs in parallel")]
    Batch {
        #[arg(help = "Input PDF files", required = true, num_args = 1..)]
        inputs: Vec<String>,
        #[arg(long, help = "Directory for the stamped files")]
        out_dir: String,
        #[command(flatten)]
        style: StyleArgs,
    },
    #[command(about = "Print where the watermark would be drawn, as JSON")]
    Place {
        #[arg(long, default_value_t = A4.width, help = "Page width in points")]
        width: f64,
        #[arg(long, default_value_t = A4.height, help = "Page height in points")]
        height: f64,
        #[arg(long, default_value = "baseline-start", help = "Pivot used by the drawing backend: baseline-start or box-center")]
        pivot: PivotConvention,
        #[command(flatten)]
        style: StyleArgs,
    },
    #[command(about = "List pages with their size and rotation")]
    Info {
        #[arg(help = "Input PDF file")]
        input: String,
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    #[command(about = "Create a PDF of empty pages")]
    Blank {
        #[arg(help = "Output PDF file")]
        output: String,
        #[arg(long, default_value_t = 1, help = "Number of pages")]
        pages: usize,
        #[arg(long, default_value = "a4", value_parser = parse_page_size, help = "a4, letter or WIDTHxHEIGHT in points")]
        size: PageGeometry,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_format);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Watermark {
            input,
            output,
            style,
            json,
        } => {
            let config = style.to_config()?;
            let report = pdf_ops::watermark_pdf(&input, &output, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Successfully watermarked {} of {} pages into {}",
                    report.pages_stamped, report.pages_total, output
                );
            }
            if report.substituted_chars > 0 {
                eprintln!(
                    "Warning: {} character(s) cannot be shown in {} and were drawn as '?'",
                    report.substituted_chars, config.font
                );
            }
            Ok(())
        }
        Commands::Batch {
            inputs,
            out_dir,
            style,
        } => {
            let config = style.to_config()?;
            std::fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir))?;

            let results = parallel::watermark_files_parallel(&inputs, &out_dir, &config);
            let mut failed = 0;
            for (input, result) in &results {
                match result {
                    Ok(report) => println!("{}: watermarked {} pages", input, report.pages_stamped),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {:#}", input, e);
                    }
                }
            }
            if failed > 0 {
                return Err(anyhow!("{} of {} files failed", failed, results.len()));
            }
            println!("Successfully watermarked {} files into {}", results.len(), out_dir);
            Ok(())
        }
        Commands::Place {
            width,
            height,
            pivot,
            style,
        } => {
            let config = style.to_config()?;
            let page = PageGeometry::new(width, height);
            let placement = pdf_ops::preview_placement(&config, page, pivot)?;
            let anchor = config.anchor.to_page_point(page);
            let output = serde_json::json!({
                "page": page,
                "anchor": anchor,
                "placement": placement,
                "corners": placement.corners(),
                "residual": placement.anchor_point().distance(anchor),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::Info { input, json } => {
            let pages = pdf_ops::page_summaries(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&pages)?);
            } else {
                println!("{}: {} pages", input, pages.len());
                for page in &pages {
                    println!(
                        "  page {}: {} x {} pt, rotate {}",
                        page.page, page.width, page.height, page.rotate
                    );
                }
            }
            Ok(())
        }
        Commands::Blank { output, pages, size } => {
            pdf_ops::create_blank_pdf(&output, size, pages)?;
            println!("PDF created successfully: {}", output);
            Ok(())
        }
    }
}
