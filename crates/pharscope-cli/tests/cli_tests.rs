//! Integration tests for pharscope-cli.
//!
//! `info` and `diff` extract archives by running this same binary as a child
//! process, so these tests exercise the full subprocess path.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use pharscope_core::ArchiveInfo;
use pharscope_core::CompressionAlgorithm;
use pharscope_core::SignatureAlgorithm;
use pharscope_core::extraction::ArchiveExtractor;
use pharscope_core::test_utils::PharBuilder;
use pharscope_core::test_utils::write_archive;
use predicates::prelude::*;
use rsa::Pkcs1v15Sign;
use rsa::RsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use sha2::Digest;
use sha2::Sha256;
use std::path::PathBuf;
use tempfile::TempDir;

const PRIVATE_KEY: &str = include_str!("../../pharscope-core/tests/fixtures/private.pem");
const PUBLIC_KEY: &str = include_str!("../../pharscope-core/tests/fixtures/public.pem");

fn pharscope_cmd() -> Command {
    cargo_bin_cmd!("pharscope")
}

fn files() -> [(&'static str, &'static [u8]); 3] {
    [
        ("index.php", b"<?php require 'src/app.php';\n"),
        ("src/app.php", b"<?php echo 'hello';\n"),
        ("README.md", b"# demo\n"),
    ]
}

/// Same files, every entry stored with `compression`, SHA-256 signed.
fn build(dir: &TempDir, name: &str, compression: CompressionAlgorithm) -> PathBuf {
    let mut builder = PharBuilder::new();
    for (path, contents) in files() {
        builder = builder.file(path, contents, compression);
    }
    let bytes = builder.signed_with(SignatureAlgorithm::Sha256).build();
    write_archive(dir.path(), name, &bytes)
}

fn build_rsa_signed(dir: &TempDir, name: &str) -> PathBuf {
    let key = RsaPrivateKey::from_pkcs8_pem(PRIVATE_KEY).unwrap();
    let bytes = PharBuilder::new()
        .file("index.php", b"<?php echo 1;\n", CompressionAlgorithm::None)
        .build_with_signature(SignatureAlgorithm::OpenSslSha256, |data| {
            key.sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(data))
                .unwrap()
        });
    let path = write_archive(dir.path(), name, &bytes);
    write_archive(dir.path(), &format!("{name}.pubkey"), PUBLIC_KEY.as_bytes());
    path
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("invalid JSON output")
}

#[test]
fn test_version_flag() {
    pharscope_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pharscope"));
}

#[test]
fn test_help_lists_commands() {
    pharscope_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("verify"));
}

#[test]
fn test_extract_creates_files() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::Gz);
    let out = temp.path().join("out");

    pharscope_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction complete"));

    assert_eq!(
        std::fs::read(out.join("src/app.php")).unwrap(),
        b"<?php echo 'hello';\n"
    );
    assert!(!out.join(".phar_meta.json").exists());
}

#[test]
fn test_extract_internal_writes_side_channel() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::Bz2);
    let out = temp.path().join("out");

    pharscope_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .arg("--no-interaction")
        .arg("--internal")
        .assert()
        .success();

    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.join(".phar_meta.json")).unwrap()).unwrap();
    assert_eq!(meta["signature"]["hash_type"], "SHA-256");
    assert_eq!(meta["version"], "1.1.1");
    assert_eq!(meta["files"].as_array().unwrap().len(), 3);
    assert_eq!(meta["files"][0]["compression"], "BZ2");
}

#[test]
fn test_extract_json_output() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::None);

    let json = json_stdout(
        pharscope_cmd()
            .arg("extract")
            .arg("--json")
            .arg(&archive)
            .arg(temp.path().join("out")),
    );
    assert_eq!(json["status"], "success");
    assert_eq!(json["operation"], "extract");
    assert_eq!(json["data"]["files_extracted"], 3);
    assert_eq!(json["data"]["signature_verified"], true);
}

#[test]
fn test_extract_nonexistent_archive() {
    let temp = TempDir::new().unwrap();

    pharscope_cmd()
        .arg("extract")
        .arg(temp.path().join("missing.phar"))
        .arg(temp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Archive not found"));
}

#[test]
fn test_extract_tampered_archive_fails() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::None);
    let mut bytes = std::fs::read(&archive).unwrap();
    bytes[2] ^= 0x20;
    std::fs::write(&archive, bytes).unwrap();

    pharscope_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(temp.path().join("out"))
        .arg("--internal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match"));
}

#[test]
fn test_info_reports_metadata_through_subprocess() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::Gz);

    let json = json_stdout(pharscope_cmd().arg("info").arg("--json").arg(&archive));
    assert_eq!(json["operation"], "info");
    assert_eq!(json["data"]["metadata"]["signature"]["hash_type"], "SHA-256");
    assert_eq!(json["data"]["compression"]["GZ"], 3);
    assert_eq!(json["data"]["files"].as_array().unwrap().len(), 3);
}

#[test]
fn test_info_json_error_envelope() {
    let temp = TempDir::new().unwrap();

    let output = pharscope_cmd()
        .args(["info", "--json"])
        .arg(temp.path().join("missing.phar"))
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["operation"], "info");
    assert_eq!(json["status"], "error");
    assert!(json["error"].as_str().unwrap().contains("Archive not found"));
    assert!(json.get("data").is_none());
}

#[test]
fn test_extract_respects_max_path_depth() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::None);

    pharscope_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(temp.path().join("out"))
        .args(["--max-path-depth", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("src/app.php"));
}

#[test]
fn test_reload_picks_up_rewritten_archive() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::Gz);
    let extractor = ArchiveExtractor::new(env!("CARGO_BIN_EXE_pharscope"));

    let mut info = ArchiveInfo::open(&archive, &extractor).unwrap();
    assert_eq!(info.compression_tally().get(CompressionAlgorithm::Gz), 3);
    let first_hash = info.metadata().signature_hash().unwrap().to_string();
    let first_root = info.root().unwrap().to_path_buf();

    // Same files, recompressed: new signature hash.
    build(&temp, "app.phar", CompressionAlgorithm::Bz2);
    info.reload(&extractor).unwrap();

    let second_root = info.root().unwrap().to_path_buf();
    assert!(!first_root.exists());
    assert!(second_root.is_dir());
    assert_ne!(info.metadata().signature_hash().unwrap(), first_hash);
    let tally = info.compression_tally();
    assert_eq!(tally.get(CompressionAlgorithm::Bz2), 3);
    assert_eq!(tally.get(CompressionAlgorithm::Gz), 0);

    // Unsigned rewrite: no hash to key the cache on.
    let mut builder = PharBuilder::new();
    for (path, contents) in files() {
        builder = builder.file(path, contents, CompressionAlgorithm::None);
    }
    write_archive(temp.path(), "app.phar", &builder.build());
    info.reload(&extractor).unwrap();

    assert!(!second_root.exists());
    assert!(info.metadata().signature.is_none());
    let tally = info.compression_tally();
    assert_eq!(tally.get(CompressionAlgorithm::None), 3);
    assert_eq!(tally.get(CompressionAlgorithm::Bz2), 0);

    info.close().unwrap();
}

#[test]
fn test_info_human_output() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::Gz);

    pharscope_cmd()
        .arg("info")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("SHA-256"))
        .stdout(predicate::str::contains("{GZ: 3}"))
        .stdout(predicate::str::contains("src/app.php"));
}

#[test]
fn test_info_missing_archive_fails() {
    let temp = TempDir::new().unwrap();

    pharscope_cmd()
        .arg("info")
        .arg(temp.path().join("missing.phar"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.phar"));
}

#[test]
fn test_diff_identical_archives() {
    let temp = TempDir::new().unwrap();
    let a = build(&temp, "a.phar", CompressionAlgorithm::Gz);
    let b = build(&temp, "b.phar", CompressionAlgorithm::Gz);

    pharscope_cmd()
        .arg("diff")
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout(predicate::str::contains("Archives are identical"));
}

#[test]
fn test_diff_compression_only_change() {
    let temp = TempDir::new().unwrap();
    let a = build(&temp, "gz.phar", CompressionAlgorithm::Gz);
    let b = build(&temp, "bz2.phar", CompressionAlgorithm::Bz2);

    for mode in ["list", "checksum"] {
        let json = json_stdout(
            pharscope_cmd()
                .args(["diff", "--json", "--mode", mode])
                .arg(&a)
                .arg(&b),
        );
        let data = &json["data"];
        assert_eq!(data["equal"], false, "{mode}");
        assert_eq!(data["differences"], serde_json::json!(["No differences"]), "{mode}");
        assert_eq!(data["compression"]["a"], serde_json::json!({"GZ": 3}));
        assert_eq!(data["compression"]["b"], serde_json::json!({"BZ2": 3}));
    }
}

#[test]
fn test_diff_checksum_with_compression_shows_storage() {
    let temp = TempDir::new().unwrap();
    let a = build(&temp, "gz.phar", CompressionAlgorithm::Gz);
    let b = build(&temp, "bz2.phar", CompressionAlgorithm::Bz2);

    pharscope_cmd()
        .args(["diff", "--with-compression"])
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout(predicate::str::contains("Archives differ"))
        .stdout(predicate::str::contains("--- gz.phar"))
        .stdout(predicate::str::contains("+++ bz2.phar"))
        .stdout(predicate::str::contains("  BZ2  "));
}

#[test]
fn test_diff_list_mode_names_files() {
    let temp = TempDir::new().unwrap();
    let a = write_archive(
        temp.path(),
        "old.phar",
        &PharBuilder::new()
            .file("kept.php", b"k", CompressionAlgorithm::None)
            .file("removed.php", b"r", CompressionAlgorithm::None)
            .build(),
    );
    let b = write_archive(
        temp.path(),
        "new.phar",
        &PharBuilder::new()
            .file("kept.php", b"k", CompressionAlgorithm::None)
            .file("added.php", b"a", CompressionAlgorithm::None)
            .build(),
    );

    pharscope_cmd()
        .args(["diff", "--mode", "list"])
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout(predicate::str::contains("- removed.php"))
        .stdout(predicate::str::contains("+ added.php"))
        .stdout(predicate::str::contains("kept.php").not());
}

#[cfg(unix)]
#[test]
fn test_diff_custom_command() {
    let temp = TempDir::new().unwrap();
    let a = write_archive(
        temp.path(),
        "left.phar",
        &PharBuilder::new()
            .file("x.txt", b"one\n", CompressionAlgorithm::None)
            .build(),
    );
    let b = write_archive(
        temp.path(),
        "right.phar",
        &PharBuilder::new()
            .file("x.txt", b"two\n", CompressionAlgorithm::None)
            .build(),
    );

    pharscope_cmd()
        .args(["diff", "--command", "diff -r {a} {b}"])
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout(predicate::str::contains("< one"))
        .stdout(predicate::str::contains("> two"));
}

#[test]
fn test_diff_missing_archive_fails() {
    let temp = TempDir::new().unwrap();
    let a = build(&temp, "a.phar", CompressionAlgorithm::Gz);

    pharscope_cmd()
        .arg("diff")
        .arg(&a)
        .arg(temp.path().join("missing.phar"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Archive not found"))
        .stderr(predicate::str::contains("missing.phar"))
        .stderr(predicate::str::contains("a.phar").not());
}

#[test]
fn test_diff_tool_failure_names_both_archives() {
    let temp = TempDir::new().unwrap();
    let a = build(&temp, "a.phar", CompressionAlgorithm::Gz);
    let b = build(&temp, "b.phar", CompressionAlgorithm::Bz2);

    pharscope_cmd()
        .arg("diff")
        .arg(&a)
        .arg(&b)
        .args(["--command", "/nonexistent/difftool {a} {b}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("a.phar' and '"))
        .stderr(predicate::str::contains("b.phar'"))
        .stderr(predicate::str::contains("difftool"));
}

#[test]
fn test_diff_public_key_signed_is_undecided() {
    let temp = TempDir::new().unwrap();
    let a = build_rsa_signed(&temp, "a.phar");
    let b = build_rsa_signed(&temp, "b.phar");

    let json = json_stdout(
        pharscope_cmd()
            .args(["diff", "--json", "--mode", "list"])
            .arg(&a)
            .arg(&b),
    );
    assert!(json["data"]["equal"].is_null());
    assert_eq!(json["data"]["differences"], serde_json::json!(["No differences"]));
}

#[test]
fn test_verify_hash_signed() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::None);

    pharscope_cmd()
        .arg("verify")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Signature verified"))
        .stdout(predicate::str::contains("SHA-256"));
}

#[test]
fn test_verify_rsa_signed() {
    let temp = TempDir::new().unwrap();
    let archive = build_rsa_signed(&temp, "app.phar");

    let json = json_stdout(pharscope_cmd().args(["verify", "--json"]).arg(&archive));
    assert_eq!(json["data"]["algorithm"], "OpenSSL_SHA256");
    assert_eq!(json["data"]["verified"], true);
    assert_eq!(json["data"]["signed"], true);
}

#[test]
fn test_verify_rsa_without_pubkey_fails() {
    let temp = TempDir::new().unwrap();
    let archive = build_rsa_signed(&temp, "app.phar");
    std::fs::remove_file(temp.path().join("app.phar.pubkey")).unwrap();

    pharscope_cmd()
        .arg("verify")
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("pubkey"));
}

#[test]
fn test_verify_tampered_fails() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::None);
    let mut bytes = std::fs::read(&archive).unwrap();
    bytes[2] ^= 0x20;
    std::fs::write(&archive, bytes).unwrap();

    pharscope_cmd()
        .arg("verify")
        .arg(&archive)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Signature mismatch"))
        .stderr(predicate::str::contains("Signature verification failed"));
}

#[test]
fn test_verify_tampered_json_is_single_error_envelope() {
    let temp = TempDir::new().unwrap();
    let archive = build(&temp, "app.phar", CompressionAlgorithm::None);
    let mut bytes = std::fs::read(&archive).unwrap();
    bytes[2] ^= 0x20;
    std::fs::write(&archive, bytes).unwrap();

    let output = pharscope_cmd()
        .args(["verify", "--json"])
        .arg(&archive)
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["operation"], "verify");
    assert_eq!(json["status"], "error");
    assert_eq!(json["data"]["verified"], false);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Signature verification failed")
    );
}

#[test]
fn test_verify_unsigned() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(
        temp.path(),
        "plain.phar",
        &PharBuilder::new()
            .file("a", b"a", CompressionAlgorithm::None)
            .build(),
    );

    pharscope_cmd()
        .arg("verify")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("is not signed"));

    pharscope_cmd()
        .args(["verify", "--require-signature"])
        .arg(&archive)
        .assert()
        .failure();
}

#[test]
fn test_completion_bash() {
    pharscope_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pharscope"));
}
