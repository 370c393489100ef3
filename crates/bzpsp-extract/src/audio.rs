//! Batch audio extraction: .at3 copy and .bnk unpacking

use anyhow::{Context, Result};
use bzpsp_audio::bank::sanitize_name;
use bzpsp_audio::vag::is_vag;
use bzpsp_audio::{decode_vag, BankDirectory, BankEntry, NameAllocator};
use bzpsp_common::AudioMode;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::naming::OutputNames;

const INDEX_FILE: &str = "_index.csv";

const INDEX_HEADER: [&str; 8] = [
    "index", "name", "size", "offset", "magic", "out_file", "wav_file", "status",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct At3Stats {
    pub copied: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BankStats {
    pub extracted: usize,
    pub wav_written: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AudioReport {
    pub at3: At3Stats,
    pub banks: BankStats,
}

impl AudioReport {
    pub fn failed(&self) -> usize {
        self.at3.failed + self.banks.failed
    }
}

/// Files below `root` with the given extension (any case), sorted
fn find_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Copy every .at3 stream to `out_root/at3/<relative path>`
pub fn copy_at3(audio_root: &Path, out_root: &Path) -> At3Stats {
    let out_at3 = out_root.join("at3");
    let mut stats = At3Stats::default();

    for src in find_files(audio_root, "at3") {
        let rel = src.strip_prefix(audio_root).unwrap_or(&src);
        let dst = out_at3.join(rel);
        let copied = dst
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::copy(&src, &dst));
        match copied {
            Ok(_) => stats.copied += 1,
            Err(e) => {
                tracing::warn!("Failed to copy {}: {}", src.display(), e);
                stats.failed += 1;
            }
        }
    }
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RowStatus {
    Ok,
    InvalidRange,
    DecodeFailed,
}

/// One `_index.csv` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct IndexRow {
    index: usize,
    name: String,
    size: u32,
    offset: u32,
    magic: String,
    out_file: String,
    wav_file: String,
    status: RowStatus,
}

impl IndexRow {
    fn new(entry: &BankEntry, status: RowStatus) -> Self {
        Self {
            index: entry.index,
            name: entry.name.clone(),
            size: entry.size,
            offset: entry.offset,
            magic: String::new(),
            out_file: String::new(),
            wav_file: String::new(),
            status,
        }
    }
}

/// First four payload bytes as Latin-1, empty for shorter payloads
fn magic_text(payload: &[u8]) -> String {
    match payload.get(..4) {
        Some(magic) => magic.iter().map(|&b| b as char).collect(),
        None => String::new(),
    }
}

fn index_writer<W: Write>(sink: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(sink)
}

fn write_index(path: &Path, rows: &[IndexRow]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating {}", path.display()))?;
    let mut writer = index_writer(BufWriter::new(file));
    writer.write_record(INDEX_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Decode a VAG payload and write it to `wav_path`
fn write_wav(payload: &[u8], wav_path: &Path) -> Result<()> {
    let sound = decode_vag(payload)?;
    let mut writer = BufWriter::new(File::create(wav_path)?);
    sound.write_wav(&mut writer)?;
    writer.flush()?;
    tracing::debug!(
        "{}: {} samples, {:.2}s",
        wav_path.display(),
        sound.sample_count(),
        sound.duration_secs()
    );
    Ok(())
}

/// Output directory for each bank: `out_root/bnk/<relative parent>/<bank name>/`.
/// Bank names that sanitize to the same directory get `_2`, `_3`, ...
fn plan_bank_dirs(
    banks: &[PathBuf],
    audio_root: &Path,
    out_root: &Path,
) -> Vec<(PathBuf, PathBuf)> {
    let mut names = OutputNames::new();
    banks
        .iter()
        .map(|bank| {
            let rel = bank.strip_prefix(audio_root).unwrap_or(bank);
            let parent = rel.parent().unwrap_or_else(|| Path::new(""));
            let stem = rel.file_stem().unwrap_or_default().to_string_lossy();
            let dir_name = names.claim(&parent.to_string_lossy(), &sanitize_name(&stem));
            (bank.clone(), out_root.join("bnk").join(parent).join(dir_name))
        })
        .collect()
}

/// Unpack one bank into `bank_out`
pub fn extract_bank(bank_path: &Path, bank_out: &Path, decode: bool) -> Result<BankStats> {
    let data = std::fs::read(bank_path)
        .with_context(|| format!("Reading {}", bank_path.display()))?;
    let directory = BankDirectory::parse(&data);

    std::fs::create_dir_all(bank_out)
        .with_context(|| format!("Creating {}", bank_out.display()))?;

    let mut stats = BankStats::default();
    let mut names = NameAllocator::new();
    let mut rows = Vec::with_capacity(directory.len());

    for entry in &directory.entries {
        let Some(payload) = entry.payload(&data) else {
            rows.push(IndexRow::new(entry, RowStatus::InvalidRange));
            stats.failed += 1;
            continue;
        };

        let out_name = names.allocate(&entry.name);
        let out_file = bank_out.join(&out_name);
        std::fs::write(&out_file, payload)
            .with_context(|| format!("Writing {}", out_file.display()))?;
        stats.extracted += 1;

        let mut row = IndexRow::new(entry, RowStatus::Ok);
        row.magic = magic_text(payload);

        if decode && is_vag(payload) {
            let stem = Path::new(&out_name).file_stem().unwrap_or_default();
            let wav_name = names.allocate(&format!("{}.wav", stem.to_string_lossy()));
            match write_wav(payload, &bank_out.join(&wav_name)) {
                Ok(()) => {
                    row.wav_file = wav_name;
                    stats.wav_written += 1;
                }
                Err(e) => {
                    tracing::debug!("{}: {:#}", out_file.display(), e);
                    row.status = RowStatus::DecodeFailed;
                    stats.failed += 1;
                }
            }
        }
        row.out_file = out_name;
        rows.push(row);
    }

    write_index(&bank_out.join(INDEX_FILE), &rows)?;
    Ok(stats)
}

/// Run the requested audio extraction under `audio_root`
pub fn run(
    audio_root: &Path,
    out_root: &Path,
    mode: AudioMode,
    decode: bool,
) -> Result<AudioReport> {
    std::fs::create_dir_all(out_root)
        .with_context(|| format!("Creating {}", out_root.display()))?;

    let mut report = AudioReport::default();

    if mode.copies_at3() {
        report.at3 = copy_at3(audio_root, out_root);
        tracing::info!(
            "[at3] copied={} failed={}",
            report.at3.copied,
            report.at3.failed
        );
    }

    if mode.unpacks_banks() {
        let banks = find_files(audio_root, "bnk");
        let jobs = plan_bank_dirs(&banks, audio_root, out_root);
        let outcomes: Vec<(&PathBuf, Result<BankStats>)> = jobs
            .par_iter()
            .map(|(bank, bank_out)| (bank, extract_bank(bank, bank_out, decode)))
            .collect();

        for (bank, outcome) in outcomes {
            let name = bank.file_name().unwrap_or_default().to_string_lossy();
            match outcome {
                Ok(stats) => {
                    tracing::info!(
                        "[bnk] {}: extracted={} wav={} failed={}",
                        name,
                        stats.extracted,
                        stats.wav_written,
                        stats.failed
                    );
                    report.banks.extracted += stats.extracted;
                    report.banks.wav_written += stats.wav_written;
                    report.banks.failed += stats.failed;
                }
                Err(e) => {
                    tracing::warn!("[bnk] {}: FAIL {:#}", name, e);
                    report.banks.failed += 1;
                }
            }
        }
    }

    tracing::info!(
        "Done. at3_copied={} bnk_extracted={} wav_written={} failed={} out={}",
        report.at3.copied,
        report.banks.extracted,
        report.banks.wav_written,
        report.failed(),
        out_root.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME_SIZE: usize = 0x40;

    fn vag_stream() -> Vec<u8> {
        let mut out = vec![0u8; 0x40];
        out[..4].copy_from_slice(b"VAGp");
        out[0x0C..0x10].copy_from_slice(&16u32.to_be_bytes());
        out[0x10..0x14].copy_from_slice(&11025u32.to_be_bytes());
        let mut block = [0x11u8; 16];
        block[0] = 0x00;
        block[1] = 0x01;
        out.extend_from_slice(&block);
        out
    }

    /// Bank with the given (name, payload) entries plus trailing raw entries
    fn bank(files: &[(&str, Vec<u8>)], bogus: &[(&str, u32, u32)]) -> Vec<u8> {
        let count = files.len() + bogus.len();
        let mut offset = 4 + count * 0x48;
        let mut table = (count as u32).to_le_bytes().to_vec();
        let mut body = Vec::new();

        let push = |table: &mut Vec<u8>, name: &str, size: u32, off: u32| {
            let mut field = [0u8; NAME_SIZE];
            field[..name.len()].copy_from_slice(name.as_bytes());
            table.extend_from_slice(&field);
            table.extend_from_slice(&size.to_le_bytes());
            table.extend_from_slice(&off.to_le_bytes());
        };
        for (name, payload) in files {
            push(&mut table, name, payload.len() as u32, offset as u32);
            offset += payload.len();
            body.extend_from_slice(payload);
        }
        for (name, size, off) in bogus {
            push(&mut table, name, *size, *off);
        }
        table.extend(body);
        table
    }

    fn row(name: &str) -> IndexRow {
        IndexRow {
            index: 7,
            name: name.to_string(),
            size: 16,
            offset: 292,
            magic: "VAGp".to_string(),
            out_file: name.to_string(),
            wav_file: String::new(),
            status: RowStatus::DecodeFailed,
        }
    }

    #[test]
    fn test_index_row_quoting() {
        let mut writer = index_writer(Vec::new());
        writer.serialize(row("plain.vag")).unwrap();
        writer.serialize(row("a,b")).unwrap();
        writer.serialize(row("say \"hi\"")).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(
            text,
            "7,plain.vag,16,292,VAGp,plain.vag,,decode_failed\r\n\
             7,\"a,b\",16,292,VAGp,\"a,b\",,decode_failed\r\n\
             7,\"say \"\"hi\"\"\",16,292,VAGp,\"say \"\"hi\"\"\",,decode_failed\r\n"
        );
    }

    #[test]
    fn test_magic_text() {
        assert_eq!(magic_text(b"VAGp\0\0"), "VAGp");
        assert_eq!(magic_text(&[0xE9, b'a', b'b', b'c']), "\u{e9}abc");
        assert_eq!(magic_text(b"abc"), "");
    }

    #[test]
    fn test_extract_bank() {
        let audio = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir(audio.path().join("sfx")).unwrap();

        let data = bank(
            &[
                ("boom.vag", vag_stream()),
                ("Boom.VAG", b"RIFFjunk".to_vec()),
                ("broken.vag", b"VAGpshort".to_vec()),
            ],
            &[("missing.vag", 0x100, 0x10_0000)],
        );
        let bank_path = audio.path().join("sfx").join("Weapons 1.bnk");
        std::fs::write(&bank_path, &data).unwrap();

        let jobs = plan_bank_dirs(&[bank_path.clone()], audio.path(), out.path());
        let dir = out.path().join("bnk").join("sfx").join("Weapons_1");
        assert_eq!(jobs[0].1, dir);

        let stats = extract_bank(&bank_path, &dir, true).unwrap();
        assert_eq!(
            stats,
            BankStats {
                extracted: 3,
                wav_written: 1,
                failed: 2
            }
        );

        assert_eq!(std::fs::read(dir.join("boom.vag")).unwrap(), vag_stream());
        assert_eq!(std::fs::read(dir.join("Boom_2.VAG")).unwrap(), b"RIFFjunk");

        let wav = std::fs::read(dir.join("boom.wav")).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 11025);
        assert_eq!(wav.len(), 44 + 28 * 2);

        let csv = std::fs::read_to_string(dir.join(INDEX_FILE)).unwrap();
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], "index,name,size,offset,magic,out_file,wav_file,status");
        assert_eq!(lines[1], "0,boom.vag,80,292,VAGp,boom.vag,boom.wav,ok");
        assert_eq!(lines[2], "1,Boom.VAG,8,372,RIFF,Boom_2.VAG,,ok");
        assert_eq!(lines[3], "2,broken.vag,9,380,VAGp,broken.vag,,decode_failed");
        assert_eq!(lines[4], "3,missing.vag,256,1048576,,,,invalid_range");
        assert_eq!(lines[5], "");
    }

    #[test]
    fn test_extract_bank_without_decoding() {
        let audio = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let bank_path = audio.path().join("music.bnk");
        std::fs::write(&bank_path, bank(&[("theme.vag", vag_stream())], &[])).unwrap();

        let dir = out.path().join("music");
        let stats = extract_bank(&bank_path, &dir, false).unwrap();
        assert_eq!(stats.extracted, 1);
        assert_eq!(stats.wav_written, 0);

        assert!(dir.join("theme.vag").exists());
        assert!(!dir.join("theme.wav").exists());
    }

    #[test]
    fn test_run_modes() {
        let audio = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(audio.path().join("stream").join("menu")).unwrap();
        std::fs::write(audio.path().join("stream").join("menu").join("title.at3"), b"at3").unwrap();
        std::fs::write(audio.path().join("LOOP.AT3"), b"loop").unwrap();
        std::fs::write(audio.path().join("ui.bnk"), bank(&[("click.vag", vag_stream())], &[])).unwrap();

        let report = run(audio.path(), out.path(), AudioMode::At3, true).unwrap();
        assert_eq!(report.at3, At3Stats { copied: 2, failed: 0 });
        assert_eq!(
            std::fs::read(out.path().join("at3").join("stream").join("menu").join("title.at3"))
                .unwrap(),
            b"at3"
        );
        assert!(!out.path().join("bnk").exists());

        let report = run(audio.path(), out.path(), AudioMode::Bnk, true).unwrap();
        assert_eq!(report.at3, At3Stats::default());
        assert_eq!(report.banks.extracted, 1);
        assert_eq!(report.banks.wav_written, 1);
        assert!(out.path().join("bnk").join("ui").join("click.wav").exists());
    }

    #[test]
    fn test_empty_bank_writes_header_only() {
        let audio = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let bank_path = audio.path().join("empty.bnk");
        std::fs::write(&bank_path, [9u8, 0, 0, 0]).unwrap();

        let stats = extract_bank(&bank_path, out.path(), true).unwrap();
        assert_eq!(stats, BankStats::default());
        let csv = std::fs::read_to_string(out.path().join(INDEX_FILE)).unwrap();
        assert_eq!(csv, "index,name,size,offset,magic,out_file,wav_file,status\r\n");
    }

    #[test]
    fn test_wav_name_does_not_clobber_entries() {
        let out = tempfile::tempdir().unwrap();
        let audio = tempfile::tempdir().unwrap();
        let bank_path = audio.path().join("sfx.bnk");
        let data = bank(
            &[
                ("shot.vag", vag_stream()),
                ("shot.wav", b"RAWBYTES".to_vec()),
                ("SHOT.bin", vag_stream()),
            ],
            &[],
        );
        std::fs::write(&bank_path, data).unwrap();

        let stats = extract_bank(&bank_path, out.path(), true).unwrap();
        assert_eq!(stats.wav_written, 2);

        assert_eq!(&std::fs::read(out.path().join("shot.wav")).unwrap()[..4], b"RIFF");
        assert_eq!(std::fs::read(out.path().join("shot_2.wav")).unwrap(), b"RAWBYTES");
        assert_eq!(&std::fs::read(out.path().join("SHOT_3.wav")).unwrap()[..4], b"RIFF");

        let csv = std::fs::read_to_string(out.path().join(INDEX_FILE)).unwrap();
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert!(lines[1].ends_with(",shot.vag,shot.wav,ok"));
        assert!(lines[2].ends_with(",RAWB,shot_2.wav,,ok"));
        assert!(lines[3].ends_with(",SHOT.bin,SHOT_3.wav,ok"));
    }

    #[test]
    fn test_colliding_bank_names_get_distinct_dirs() {
        let audio = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(audio.path().join("ui 1.bnk"), bank(&[("a.vag", b"AAAA".to_vec())], &[]))
            .unwrap();
        std::fs::write(audio.path().join("ui_1.bnk"), bank(&[("b.vag", b"BBBB".to_vec())], &[]))
            .unwrap();

        let report = run(audio.path(), out.path(), AudioMode::Bnk, false).unwrap();
        assert_eq!(report.banks.extracted, 2);

        let first = out.path().join("bnk").join("ui_1");
        let second = out.path().join("bnk").join("ui_1_2");
        assert!(first.join("a.vag").exists());
        assert!(second.join("b.vag").exists());
        assert!(first.join(INDEX_FILE).exists());
        assert!(second.join(INDEX_FILE).exists());
    }
}
