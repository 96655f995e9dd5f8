//! # pdfmark
//!
//! Stamps text watermarks onto PDF documents so they land exactly where a
//! browser-style preview showed them.
//!
//! A preview positions the watermark by its visual centre, in percent of the
//! page with Y growing downwards, and rotates it about that centre. PDF draws
//! text from the baseline start with Y growing upwards and rotates about that
//! same baseline point. This crate closes the gap: it flips the axis, measures
//! the text with standard-font metrics, and pulls the draw origin back by the
//! rotated half-extent so the exported stamp matches the preview at any angle.
//!
//! ## Quick Start
//!
//! ```rust
//! use pdfmark::geometry::{AnchorPosition, A4};
//! use pdfmark::metrics::StandardFont;
//! use pdfmark::placement::compute_placement;
//!
//! let placement = compute_placement(
//!     AnchorPosition::new(50.0, 50.0),
//!     A4,
//!     "CONFIDENTIAL",
//!     48.0,
//!     -45.0,
//!     &StandardFont::Helvetica,
//! );
//! assert!(placement.origin_x < A4.width / 2.0);
//! ```
//!
//! ## Stamping a document
//!
//! ```rust,no_run
//! use pdfmark::config::WatermarkConfig;
//! use pdfmark::pdf::PdfDocument;
//! use pdfmark::watermark::stamp_document;
//!
//! let mut doc = PdfDocument::load_from_file("input.pdf").expect("load");
//! let report = stamp_document(&mut doc, &WatermarkConfig::new("DRAFT")).expect("stamp");
//! doc.save("output.pdf").expect("save");
//! println!("stamped {} pages", report.pages_stamped);
//! ```
//!
//! ## Modules
//!
//! - [`geometry`]: page sizes, points, anchors and rotations
//! - [`metrics`]: the [`metrics::FontMetrics`] capability and standard-font widths
//! - [`placement`]: the placement calculator, single-line and block layouts
//! - [`config`]: watermark configuration and page selection
//! - [`pdf`]: PDF object model and reader
//! - [`pdf_generator`]: serialisation and blank documents
//! - [`watermark`]: stamping a configured watermark onto pages
//! - [`pdf_ops`] and [`parallel`]: file-level and batch operations
//! - [`compression`]: Flate and hex helpers
//! - [`logging`]: subscriber setup for the CLI
//! - [`error`]: the library error type

pub mod compression;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod parallel;
pub mod pdf;
pub mod pdf_generator;
pub mod pdf_ops;
pub mod placement;
pub mod watermark;

pub use config::WatermarkConfig;
pub use error::{Result, WatermarkError};
pub use placement::{compute_placement, Placement, PlacementCalculator};
