//! Batch extraction of .LVL packages to JSON

use anyhow::{Context, Result};
use bzpsp_lvl::{PackageFile, PackageSummary};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::naming::OutputNames;

const SUMMARY_STEM: &str = "_summary";

/// A package that could not be decoded
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub file: String,
    pub error: String,
}

/// Contents of `_summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct LvlReport {
    pub files_total: usize,
    pub ok: usize,
    pub failed: usize,
    pub files: Vec<PackageSummary>,
    pub failures: Vec<Failure>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

/// .LVL files directly inside `root`, sorted by name
pub fn collect_packages(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(root).with_context(|| format!("Listing {}", root.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_lvl = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("lvl"))
            .unwrap_or(false);
        if is_lvl {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Writing {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Pair each package with its own `.json` path. Stems that collide
/// case-insensitively (`M.LVL` / `M.lvl`) get `_2`, `_3`, ... suffixes.
fn plan_outputs(files: &[PathBuf], out_root: &Path) -> Vec<(PathBuf, PathBuf)> {
    let mut names = OutputNames::new();
    names.reserve("", SUMMARY_STEM);

    files
        .iter()
        .map(|path| {
            let stem = path.file_stem().unwrap_or_default().to_string_lossy();
            let claimed = names.claim("", &stem);
            if claimed != stem {
                tracing::warn!("{}: output renamed to {}.json", file_name(path), claimed);
            }
            (path.clone(), out_root.join(format!("{}.json", claimed)))
        })
        .collect()
}

/// Decode one package and write its document to `out_path`
pub fn extract_one(path: &Path, out_path: &Path) -> Result<PackageSummary> {
    let name = file_name(path);
    let package =
        PackageFile::open(path).with_context(|| format!("Decoding {}", path.display()))?;
    tracing::debug!("  {}", package.info_line());

    let document = package.into_document(&name);
    write_json(out_path, &document)?;
    Ok(document.summary)
}

/// Decode every package under `root` in parallel and write the batch summary
pub fn run(root: &Path, out_root: &Path, limit: usize) -> Result<LvlReport> {
    let mut files = collect_packages(root)?;
    if limit > 0 {
        files.truncate(limit);
    }

    std::fs::create_dir_all(out_root)
        .with_context(|| format!("Creating {}", out_root.display()))?;

    let jobs = plan_outputs(&files, out_root);
    let outcomes: Vec<(String, Result<PackageSummary>)> = jobs
        .par_iter()
        .map(|(path, out_path)| (file_name(path), extract_one(path, out_path)))
        .collect();

    let mut summaries = Vec::new();
    let mut failures = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(summary) => {
                tracing::info!(
                    "{}: objects={} rws_refs={}",
                    name,
                    summary.parsed_object_count,
                    summary.unique_rws_refs.len()
                );
                summaries.push(summary);
            }
            Err(e) => {
                tracing::warn!("{}: FAIL {:#}", name, e);
                failures.push(Failure {
                    file: name,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    let report = LvlReport {
        files_total: files.len(),
        ok: summaries.len(),
        failed: failures.len(),
        files: summaries,
        failures,
    };
    write_json(&out_root.join(format!("{}.json", SUMMARY_STEM)), &report)?;

    tracing::info!(
        "Done. lvl_files={} ok={} failed={} out={}",
        report.files_total,
        report.ok,
        report.failed,
        out_root.display()
    );
    Ok(report)
}
