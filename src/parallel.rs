//! Parallel batch watermarking using Rayon.
//!
//! Each input is loaded, stamped and written independently; one failure does
//! not stop the others.

use crate::config::WatermarkConfig;
use crate::pdf_ops;
use crate::watermark::StampReport;
use anyhow::{anyhow, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Output path for `input` inside `output_dir`, keeping the file name.
pub fn output_path_for(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .ok_or_else(|| anyhow!("Input path {} has no file name", input.display()))?;
    Ok(output_dir.join(name))
}

/// Watermark many PDFs concurrently.
///
/// Returns `(input, result)` pairs in input order. Inputs that would write
/// the same output file all fail without touching it.
///
/// # Example
/// ```rust,no_run
/// use pdfmark::config::WatermarkConfig;
/// use pdfmark::parallel;
///
/// let config = WatermarkConfig::new("DRAFT");
/// let results = parallel::watermark_files_parallel(&["a.pdf", "b.pdf"], "stamped", &config);
/// for (path, result) in results {
///     match result {
///         Ok(report) => println!("{}: {} pages", path, report.pages_stamped),
///         Err(e) => eprintln!("{}: {:#}", path, e),
///     }
/// }
/// ```
pub fn watermark_files_parallel<P: AsRef<Path> + Sync, Q: AsRef<Path>>(
    input_paths: &[P],
    output_dir: Q,
    config: &WatermarkConfig,
) -> Vec<(String, Result<StampReport>)> {
    let output_dir = output_dir.as_ref();
    let mut targets: HashMap<PathBuf, usize> = HashMap::new();
    for input in input_paths {
        if let Ok(output) = output_path_for(input.as_ref(), output_dir) {
            *targets.entry(output).or_insert(0) += 1;
        }
    }

    input_paths
        .par_iter()
        .map(|input| {
            let input = input.as_ref();
            let label = input.display().to_string();
            let result = output_path_for(input, output_dir).and_then(|output| {
                if targets.get(&output).copied().unwrap_or(0) > 1 {
                    return Err(anyhow!(
                        "Output {} is shared with another input of the same name",
                        output.display()
                    ));
                }
                watermark_one(input, &output, config)
            });
            if let Err(e) = &result {
                tracing::warn!(input = %label, error = %format!("{:#}", e), "Batch item failed");
            }
            (label, result)
        })
        .collect()
}

fn watermark_one(input: &Path, output: &Path, config: &WatermarkConfig) -> Result<StampReport> {
    if output == input {
        return Err(anyhow!("Output {} would overwrite its input", output.display()));
    }
    let input_str = input
        .to_str()
        .ok_or_else(|| anyhow!("Input path {} is not valid UTF-8", input.display()))?;
    let output_str = output
        .to_str()
        .ok_or_else(|| anyhow!("Output path {} is not valid UTF-8", output.display()))?;
    pdf_ops::watermark_pdf(input_str, output_str, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::A4;
    use crate::pdf_generator::blank_document;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pdfmark_parallel_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_output_path_for() {
        let out = output_path_for(Path::new("/tmp/in/report.pdf"), Path::new("/tmp/out")).unwrap();
        assert_eq!(out, PathBuf::from("/tmp/out/report.pdf"));
        assert!(output_path_for(Path::new("/"), Path::new("/tmp/out")).is_err());
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = scratch_dir("batch");
        let out_dir = dir.join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let good = dir.join("good.pdf");
        blank_document(&[A4]).unwrap().save(&good).unwrap();
        let bad = dir.join("bad.pdf");
        fs::write(&bad, b"not a pdf").unwrap();

        let results = watermark_files_parallel(&[good.clone(), bad.clone()], &out_dir, &WatermarkConfig::new("BATCH"));
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(out_dir.join("good.pdf").exists());
        assert!(!out_dir.join("bad.pdf").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_batch_refuses_to_overwrite_input() {
        let dir = scratch_dir("overwrite");
        let input = dir.join("same.pdf");
        blank_document(&[A4]).unwrap().save(&input).unwrap();
        let results = watermark_files_parallel(&[input.clone()], &dir, &WatermarkConfig::default());
        assert!(results[0].1.is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_batch_rejects_duplicate_output_names() {
        let dir = scratch_dir("duplicates");
        let out_dir = dir.join("out");
        fs::create_dir_all(dir.join("a")).unwrap();
        fs::create_dir_all(dir.join("b")).unwrap();
        fs::create_dir_all(&out_dir).unwrap();

        let first = dir.join("a").join("x.pdf");
        let second = dir.join("b").join("x.pdf");
        let unique = dir.join("a").join("y.pdf");
        blank_document(&[A4]).unwrap().save(&first).unwrap();
        blank_document(&[A4, A4, A4]).unwrap().save(&second).unwrap();
        blank_document(&[A4]).unwrap().save(&unique).unwrap();

        let results = watermark_files_parallel(&[first, second, unique], &out_dir, &WatermarkConfig::new("DUP"));
        assert_eq!(results.len(), 3);
        for (_, result) in &results[..2] {
            let err = result.as_ref().unwrap_err();
            assert!(format!("{:#}", err).contains("same name"));
        }
        assert!(results[2].1.is_ok());
        assert!(!out_dir.join("x.pdf").exists());
        assert!(out_dir.join("y.pdf").exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
