//! Integration tests for the incremental log tailer.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use install_watch::watcher::{LogEncoding, LogTailer, TailRead, WatchTarget};
use tokio_test::assert_ok;

const LOG: &str = "MSI (c) (C4:10) [10:01:58:101]: Resetting cached policy values\r\n\
Größe: 12 MB, Pfad: C:\\Program Files\\Python27\\\r\n\
\r\n\
Action start 10:02:10: InstallFinalize.\r\n\
日本語のログ行\r\n\
tail without newline";

fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn append(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(bytes).unwrap();
}

/// Append `bytes` in pieces and collect every line the tailer delivers.
async fn tail_in_chunks(encoding: LogEncoding, bytes: &[u8], chunk: usize) -> Vec<String> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    let mut tailer = LogTailer::new(WatchTarget::new(&path).with_encoding(encoding));
    let mut delivered = Vec::new();

    assert_eq!(assert_ok!(tailer.read_new_lines().await), TailRead::Absent);

    for piece in bytes.chunks(chunk) {
        append(&path, piece);
        match assert_ok!(tailer.read_new_lines().await) {
            TailRead::Lines(lines) => delivered.extend(lines),
            TailRead::Absent => panic!("file vanished"),
        }
    }

    let consumed = tailer.cursor().offset() as usize;
    assert_eq!(consumed + tailer.cursor().carry().len(), bytes.len());
    delivered
}

fn expected_lines() -> Vec<String> {
    let complete = &LOG[..LOG.rfind('\n').unwrap() + 1];
    complete
        .split_terminator('\n')
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect()
}

#[tokio::test]
async fn chunked_utf8_appends_deliver_every_line_once() {
    for chunk in [1, 2, 3, 7, 16, 64, 4096] {
        let lines = tail_in_chunks(LogEncoding::Utf8, LOG.as_bytes(), chunk).await;
        assert_eq!(lines, expected_lines(), "chunk size {chunk}");
    }
}

#[tokio::test]
async fn chunked_utf16_appends_deliver_every_line_once() {
    let bytes = utf16(LOG);
    for chunk in [1, 3, 5, 8, 33, 4096] {
        let lines = tail_in_chunks(LogEncoding::Utf16Le, &bytes, chunk).await;
        assert_eq!(lines, expected_lines(), "chunk size {chunk}");
    }
}

#[tokio::test]
async fn utf16_and_utf8_logs_yield_identical_lines() {
    let mut wide = vec![0xFF, 0xFE];
    wide.extend(utf16(LOG));
    let mut narrow = vec![0xEF, 0xBB, 0xBF];
    narrow.extend_from_slice(LOG.as_bytes());

    let wide_lines = tail_in_chunks(LogEncoding::Utf16Le, &wide, 4096).await;
    let narrow_lines = tail_in_chunks(LogEncoding::Utf8, &narrow, 4096).await;

    assert_eq!(wide_lines, narrow_lines);
    assert_eq!(wide_lines, expected_lines());
}

#[tokio::test]
async fn partial_line_is_held_until_terminated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    append(&path, b"Apply begin\nApply compl");

    let mut tailer = LogTailer::new(WatchTarget::new(&path));
    assert_eq!(
        assert_ok!(tailer.read_new_lines().await),
        TailRead::Lines(vec!["Apply begin".to_string()])
    );
    assert_eq!(tailer.cursor().carry(), b"Apply compl");

    append(&path, b"ete, result: 0x0\n");
    assert_eq!(
        assert_ok!(tailer.read_new_lines().await),
        TailRead::Lines(vec!["Apply complete, result: 0x0".to_string()])
    );
}

#[tokio::test]
async fn corrupt_bytes_do_not_stop_tailing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    append(&path, b"before\n\xC3\x28garbage\nafter\n");

    let mut tailer = LogTailer::new(WatchTarget::new(&path));
    assert_eq!(
        assert_ok!(tailer.read_new_lines().await),
        TailRead::Lines(vec![
            "before".to_string(),
            "(garbage".to_string(),
            "after".to_string()
        ])
    );
}
