use std::sync::Arc;
use std::thread;

use simgram::{Error, GeneratorConfig, QueryParams, Reader, SimgramConfig, SimilarityMetric, StorageConfig, Writer};
use simgram::storage::format::{Directory, Header};
use tempfile::tempdir;

fn write_index(path: &std::path::Path, strings: &[&str]) {
    let mut writer = Writer::open(path, 3, false, false).unwrap();
    for s in strings {
        writer.insert(s).unwrap();
    }
    writer.close().unwrap();
}

const NAMES: [&str; 6] = [
    "Barack Hussein Obama II",
    "James Gordon Brown",
    "Angela Merkel",
    "Nicolas Sarkozy",
    "Silvio Berlusconi",
    "Stephen Harper",
];

#[test]
fn closed_reader_reports_not_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);

    let mut reader = Reader::open(&path).unwrap();
    let params = QueryParams::default();
    reader.close().unwrap();

    assert!(!reader.is_open());
    assert!(matches!(reader.retrieve("Angela", &params), Err(Error::DatabaseNotOpen)));
    assert!(matches!(reader.check("Angela", &params), Err(Error::DatabaseNotOpen)));
    assert!(matches!(reader.info(), Err(Error::DatabaseNotOpen)));
    assert!(matches!(reader.close(), Err(Error::DatabaseAlreadyClosed)));
}

#[test]
fn closing_one_clone_leaves_others_usable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);

    let mut first = Reader::open(&path).unwrap();
    let second = first.clone();
    first.close().unwrap();

    let params = QueryParams::new(SimilarityMetric::Cosine, 0.6).unwrap();
    assert_eq!(second.retrieve("Barack Obama", &params).unwrap(), vec!["Barack Hussein Obama II"]);
}

#[test]
fn reader_settings_come_from_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unicode.db");
    let mut writer = Writer::with_config(
        &path,
        &GeneratorConfig::new(2, true, true),
        &StorageConfig { sync_on_close: false, ..StorageConfig::default() },
    ).unwrap();
    writer.insert("ラーメン").unwrap();
    writer.close().unwrap();

    let info = Reader::open(&path).unwrap().info().unwrap();
    assert_eq!(info.ngram_size, 2);
    assert!(info.use_markers);
    assert!(info.encoding.is_unicode());
    assert_eq!(info.version, simgram::storage::FORMAT_VERSION);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(Reader::open(dir.path().join("absent.db")), Err(Error::Io(_))));
}

#[test]
fn unfinished_writer_leaves_no_readable_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.db");
    let writer = Writer::open(&path, 3, false, false).unwrap();
    // The placeholder header is in place until close.
    assert!(Reader::open(&path).unwrap_err().is_corruption());
    drop(writer);
    assert!(Reader::open(&path).is_ok());
}

#[test]
fn concurrent_readers_share_one_handle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);

    let reader = Arc::new(Reader::open(&path).unwrap());
    let params = QueryParams::new(SimilarityMetric::Jaccard, 0.3).unwrap();
    let expected = reader.retrieve("Gordon Brown", &params).unwrap();
    assert_eq!(expected, vec!["James Gordon Brown"]);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let reader = if i % 2 == 0 { Arc::clone(&reader) } else { Arc::new((*reader).clone()) };
            thread::spawn(move || {
                (0..25)
                    .map(|_| reader.retrieve("Gordon Brown", &params).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for hits in handle.join().unwrap() {
            assert_eq!(hits, expected);
        }
    }
    assert_eq!(reader.metrics().unwrap().queries, 1 + 8 * 25);
}

fn flip(path: &std::path::Path, at: usize) {
    let mut bytes = std::fs::read(path).unwrap();
    bytes[at] ^= 0x5A;
    std::fs::write(path, bytes).unwrap();
}

fn layout(path: &std::path::Path) -> (Header, Directory) {
    let bytes = std::fs::read(path).unwrap();
    let header = Header::decode(&bytes).unwrap();
    let start = header.directory_offset as usize;
    let directory = Directory::decode(&bytes[start..start + header.directory_len as usize]).unwrap();
    (header, directory)
}

#[test]
fn damaged_header_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);
    flip(&path, 26);
    assert!(Reader::open(&path).unwrap_err().is_corruption());
}

#[test]
fn unknown_version_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[8..12].copy_from_slice(&99u32.to_le_bytes());
    std::fs::write(&path, bytes).unwrap();
    assert!(Reader::open(&path).unwrap_err().is_corruption());
}

#[test]
fn truncated_file_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);

    let bytes = std::fs::read(&path).unwrap();
    for keep in [0, 10, 71, bytes.len() / 2, bytes.len() - 1] {
        std::fs::write(&path, &bytes[..keep]).unwrap();
        assert!(Reader::open(&path).unwrap_err().is_corruption(), "kept {} bytes", keep);
    }
}

#[test]
fn damaged_string_table_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);
    let (_, directory) = layout(&path);

    flip(&path, (directory.strings.offset + directory.strings.len - 1) as usize);
    assert!(Reader::open(&path).unwrap_err().is_corruption());
}

#[test]
fn damaged_bucket_fails_the_query_not_the_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);
    let (_, directory) = layout(&path);
    let bucket = directory.buckets[0];

    flip(&path, (bucket.section.offset + bucket.section.len / 2) as usize);
    let reader = Reader::open(&path).unwrap();
    let everything = QueryParams::new(SimilarityMetric::Overlap, 0.0).unwrap();
    assert!(reader.retrieve("anything", &everything).unwrap_err().is_corruption());
    assert_eq!(reader.metrics().unwrap().failed_queries, 1);
}

#[test]
fn structural_damage_is_caught_without_checksums() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.db");
    write_index(&path, &NAMES);
    let (_, directory) = layout(&path);
    let bucket = directory.buckets[0];

    // First entry id of the first bucket, past its 16-byte header.
    let mut bytes = std::fs::read(&path).unwrap();
    let at = bucket.section.offset as usize + 16;
    bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    std::fs::write(&path, bytes).unwrap();

    let storage = StorageConfig { verify_checksums: false, ..StorageConfig::default() };
    let reader = Reader::with_config(&path, &storage).unwrap();
    let everything = QueryParams::new(SimilarityMetric::Cosine, 0.0).unwrap();
    assert!(reader.retrieve("anything", &everything).unwrap_err().is_corruption());
}

#[test]
fn posting_into_another_bucket_is_caught_without_checksums() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pair.db");
    write_index(&path, &["abcde", "zzzzzzzzzz"]);
    let (_, directory) = layout(&path);
    let bucket = directory.buckets.iter().find(|b| b.cardinality == 3).unwrap();
    assert_eq!(bucket.num_entries, 1);

    // Header, one entry id, three 16-byte keys each followed by start and length.
    let postings_at = bucket.section.offset as usize + 16 + 4 + 3 * (16 + 8);
    let mut bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[postings_at..postings_at + 4], &0u32.to_le_bytes());
    bytes[postings_at..postings_at + 4].copy_from_slice(&1u32.to_le_bytes());
    std::fs::write(&path, bytes).unwrap();

    let storage = StorageConfig { verify_checksums: false, ..StorageConfig::default() };
    let reader = Reader::with_config(&path, &storage).unwrap();
    let params = QueryParams::new(SimilarityMetric::Overlap, 0.3).unwrap();
    assert!(reader.retrieve("abcde", &params).unwrap_err().is_corruption());
}

#[test]
fn ini_configuration_drives_writer_and_queries() {
    let dir = tempdir().unwrap();
    let ini_path = dir.path().join("simgram.ini");
    std::fs::write(&ini_path, "\
[generator]
ngram_size = 3
use_markers = false

[matcher]
measure = cosine
threshold = 0.6

[storage]
overwrite = true
").unwrap();
    let config = SimgramConfig::from_ini(&ini_path).unwrap();

    let path = dir.path().join("names.db");
    std::fs::write(&path, b"stale").unwrap();
    let mut writer = Writer::with_config(&path, &config.generator, &config.storage).unwrap();
    for name in NAMES {
        writer.insert(name).unwrap();
    }
    writer.close().unwrap();

    let reader = Reader::with_config(&path, &config.storage).unwrap();
    let params = config.matcher.query_params().unwrap();
    assert_eq!(reader.retrieve("Barack Obama", &params).unwrap(), vec!["Barack Hussein Obama II"]);
}
