//! End-to-end coverage of the `zpkglist` binary: compress/decompress via
//! subprocess, `--print-content-size`, the three read-discipline flags
//! agreeing with each other, multi-file concatenation, and `--qf`'s
//! documented hard-error behavior.

use std::io::Write;
use std::process::{Command, Stdio};

use zpkglist::config::HEADER_MAGIC;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_zpkglist"))
}

fn make_blob(il: u32, data: &[u8]) -> Vec<u8> {
    let mut b = Vec::with_capacity(16 + 16 * il as usize + data.len());
    b.extend_from_slice(&HEADER_MAGIC);
    b.extend_from_slice(&il.to_be_bytes());
    b.extend_from_slice(&(data.len() as u32).to_be_bytes());
    b.resize(b.len() + 16 * il as usize, 0);
    b.extend_from_slice(data);
    b
}

fn run_piped(mut cmd: Command, stdin_data: &[u8]) -> (i32, Vec<u8>, Vec<u8>) {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn zpkglist binary");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin_data)
        .expect("write stdin");
    let out = child.wait_with_output().expect("wait for zpkglist binary");
    (out.status.code().unwrap_or(-1), out.stdout, out.stderr)
}

#[test]
fn compress_then_decompress_round_trips_through_the_binary() {
    let blobs: Vec<Vec<u8>> = (0..6).map(|i| make_blob(i + 1, &vec![i as u8; 800])).collect();
    let mut input = Vec::new();
    for b in &blobs {
        input.extend_from_slice(b);
    }

    let (code, compressed, _) = run_piped(bin(), &input);
    assert_eq!(code, 0);
    assert_ne!(compressed, input, "compressed output should differ from the raw blob stream");

    let mut decompress_cmd = bin();
    decompress_cmd.arg("-d");
    let (code, decompressed, _) = run_piped(decompress_cmd, &compressed);
    assert_eq!(code, 0);
    assert_eq!(decompressed, input);
}

#[test]
fn print_content_size_reports_without_decompressing() {
    let blob = make_blob(1, &vec![9u8; 4096]);
    let (code, compressed, _) = run_piped(bin(), &blob);
    assert_eq!(code, 0);

    let mut cmd = bin();
    cmd.args(["-d", "--print-content-size"]);
    let (code, stdout, _) = run_piped(cmd, &compressed);
    assert_eq!(code, 0);
    let reported: u64 = String::from_utf8(stdout).unwrap().trim().parse().unwrap();
    assert_eq!(reported, blob.len() as u64);
}

#[test]
fn malloc_and_view_disciplines_agree() {
    let blobs: Vec<Vec<u8>> = (0..5).map(|i| make_blob(i + 1, &vec![i as u8; 1200])).collect();
    let mut input = Vec::new();
    for b in &blobs {
        input.extend_from_slice(b);
    }
    let (_, compressed, _) = run_piped(bin(), &input);

    let mut malloc_cmd = bin();
    malloc_cmd.args(["-d", "--malloc"]);
    let (_, malloc_out, _) = run_piped(malloc_cmd, &compressed);

    let mut view_cmd = bin();
    view_cmd.args(["-d", "--view"]);
    let (_, view_out, _) = run_piped(view_cmd, &compressed);

    assert_eq!(malloc_out, input);
    assert_eq!(view_out, input);
}

#[test]
fn qf_flag_is_a_hard_error() {
    let mut cmd = bin();
    cmd.args(["-d", "--qf", "%{NAME}"]);
    let (code, _, stderr) = run_piped(cmd, &[]);
    assert_ne!(code, 0);
    assert!(String::from_utf8_lossy(&stderr).contains("qf"));
}

#[test]
fn compressing_empty_input_yields_a_valid_bare_envelope() {
    let (code, compressed, _) = run_piped(bin(), &[]);
    assert_eq!(code, 0);
    assert_eq!(compressed.len(), 24);

    let mut cmd = bin();
    cmd.arg("-d");
    let (code, decompressed, _) = run_piped(cmd, &compressed);
    assert_eq!(code, 0);
    assert!(decompressed.is_empty());
}

#[test]
fn decompress_concatenates_multiple_named_files_like_cat() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_blob(1, b"file-one-contents");
    let b = make_blob(2, b"file-two-contents");

    let path_a = dir.path().join("a.hdrlist");
    let path_b = dir.path().join("b.hdrlist");
    std::fs::write(&path_a, &a).unwrap();
    std::fs::write(&path_b, &b).unwrap();

    let mut cmd = bin();
    cmd.args(["-d", path_a.to_str().unwrap(), path_b.to_str().unwrap()]);
    let out = cmd.output().unwrap();
    assert!(out.status.success());

    let mut expected = a;
    expected.extend_from_slice(&b);
    assert_eq!(out.stdout, expected);
}
