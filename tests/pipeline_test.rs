//! End-to-end tests: captured serial text through the line reader, extractor,
//! and assembler

use spectra_monitor::domain::{is_missing, ChannelGroup, Sentinel};
use spectra_monitor::infra::Config;
use spectra_monitor::io::{open_replay, ReadError, ScriptedLines, StreamLineReader};
use spectra_monitor::services::{BlockExtractor, ReadingAssembler};
use std::io::Write;
use tempfile::NamedTempFile;

/// Two cycles as the bridge firmware prints them, with boot noise and CRLF
const CAPTURE: &[u8] = b"AS7341 + AS7263 bridge v1\r\n\
&,\r\n\
120,340,560,780,\r\n\
1000,15,\r\n\
900,870,650,430,2100,40,&\r\n\
$,\r\n\
11.5,22.5,0,\r\n\
-4,abc,66$\r\n\
\r\n\
&,\r\n\
1,2,3&\r\n\
$,\r\n\
9,8,7,6,5,4,3,2,1$\r\n";

#[tokio::test]
async fn test_replay_capture_file() {
    let mut capture = NamedTempFile::new().unwrap();
    capture.write_all(CAPTURE).unwrap();
    capture.flush().unwrap();

    let source = open_replay(capture.path()).await.unwrap();
    let mut assembler = ReadingAssembler::from_config(source, &Config::default());

    let first = assembler.next_frame().await.unwrap();
    let as7341 = &first.group("AS7341").unwrap().values;
    assert_eq!(as7341.len(), 12);
    assert_eq!(as7341[0], 120.0);
    assert_eq!(as7341[4], 1000.0);
    assert_eq!(as7341[11], 40.0);

    let as7263 = &first.group("AS7263").unwrap().values;
    assert_eq!(as7263.len(), 6);
    assert_eq!(as7263[0], 11.5);
    assert_eq!(as7263[1], 22.5);
    assert!(is_missing(as7263[2]));
    assert!(is_missing(as7263[3]));
    assert!(is_missing(as7263[4]));
    assert_eq!(as7263[5], 66.0);

    let second = assembler.next_frame().await.unwrap();
    assert_eq!(second.groups[0].present_count(), 3);
    assert_eq!(second.groups[0].values.len(), 12);
    assert_eq!(second.groups[1].values, vec![9.0, 8.0, 7.0, 6.0, 5.0, 4.0]);

    assert!(matches!(assembler.next_frame().await, Err(ReadError::Closed)));
    assert_eq!(assembler.frames_assembled(), 2);
}

#[tokio::test]
async fn test_bundled_bench_capture_replays() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/captures/bench-lamp.txt");
    let source = open_replay(path).await.unwrap();
    let mut assembler = ReadingAssembler::from_config(source, &Config::default());

    let first = assembler.next_frame().await.unwrap();
    assert_eq!(first.groups[0].values[0], 412.0);
    assert_eq!(first.groups[0].values[11], 140.0);
    assert_eq!(first.groups[0].present_count(), 12);
    assert_eq!(first.groups[1].values, vec![310.5, 655.2, 1204.8, 1432.0, 1188.6, 702.3]);

    // Zero and negative readings drop out
    let second = assembler.next_frame().await.unwrap();
    assert!(is_missing(second.groups[0].values[11]));
    assert_eq!(second.groups[0].present_count(), 11);
    assert!(is_missing(second.groups[1].values[5]));
    assert_eq!(second.groups[1].present_count(), 5);

    // Single-line block, then a short block padded out
    let third = assembler.next_frame().await.unwrap();
    assert_eq!(third.groups[0].values[11], 139.0);
    assert_eq!(third.groups[1].values[0], 309.8);
    assert_eq!(third.groups[1].values.len(), 6);
    assert_eq!(third.groups[1].present_count(), 1);

    assert!(matches!(assembler.next_frame().await, Err(ReadError::Closed)));
}

#[tokio::test]
async fn test_invalid_utf8_is_dropped() {
    let bytes: &[u8] = b"&\n10,\xff\xfe20\n30&\n$\n1$\n";
    let source = StreamLineReader::new("bytes", bytes, None);
    let mut assembler = ReadingAssembler::from_config(source, &Config::default());

    let frame = assembler.next_frame().await.unwrap();
    assert_eq!(&frame.groups[0].values[..3], &[10.0, 20.0, 30.0]);
    assert_eq!(frame.groups[1].values[0], 1.0);
}

#[tokio::test]
async fn test_other_group_blocks_do_not_leak() {
    // An AS7263 block arriving first must be skipped while seeking AS7341
    let mut source = ScriptedLines::new(["$", "5,5,5$", "&", "7&", "$", "6$"]);
    source.push_timeout();
    let mut assembler = ReadingAssembler::from_config(source, &Config::default());

    let frame = assembler.next_frame().await.unwrap();
    assert_eq!(frame.groups[0].values[0], 7.0);
    assert_eq!(frame.groups[0].present_count(), 1);
    assert_eq!(frame.groups[1].values[0], 6.0);
    assert_eq!(frame.groups[1].present_count(), 1);
}

#[tokio::test]
async fn test_frame_json_output() {
    let source = ScriptedLines::new(["&", "1,0&", "$", "2$"]);
    let groups = ChannelGroup::defaults();
    let config = Config::default();
    let mut assembler = ReadingAssembler::from_config(source, &config);
    assert_eq!(assembler.groups(), groups.as_slice());

    let frame = assembler.next_frame().await.unwrap();
    let json = serde_json::to_value(&frame).unwrap();
    let first = json["groups"][0]["values"].as_array().unwrap();
    assert_eq!(first.len(), 12);
    assert_eq!(first[0], 1.0);
    assert!(first[1].is_null());
    assert_eq!(json["groups"][1]["name"], "AS7263");
}

#[tokio::test]
async fn test_extractor_stops_at_block_end() {
    let mut source = ScriptedLines::new(["", "&", "1&"]);
    source.push_timeout();
    source.push("$");
    source.push("2$");

    let sentinel = Sentinel::new("&").unwrap();
    let tokens = BlockExtractor::new(',').extract_block(&mut source, &sentinel, 12).await.unwrap();
    assert_eq!(tokens, vec!["1"]);
    assert_eq!(source.consumed(), 3);
    assert_eq!(source.remaining(), 3);
}
