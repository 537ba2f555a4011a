//! CLI integration tests for modimg-cli.
//!
//! These tests run the actual binary against generated images and list files
//! and check outputs and exit codes.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{ImageBuffer, Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_KEYS: &[&str] = &[
    "PHASH_ALLOWLIST",
    "PHASH_ALLOWLIST_PATH",
    "PHASH_BLOCKLIST",
    "PHASH_BLOCKLIST_PATH",
    "PHASH_ALLOW_MAX_DISTANCE",
    "PHASH_ALLOW_MAXDIST",
    "PHASH_BLOCK_MAX_DISTANCE",
    "PHASH_MAXDIST",
    "PHASH_BLOCK_MAXDIST",
    "PHASH_ALLOW_DISABLE",
    "PHASH_BLOCK_DISABLE",
    "PHASH_ALGORITHM",
    "OPENNSFW2_DISABLE",
];

/// A `modimg` command isolated from the caller's environment and `.env`.
fn modimg(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("modimg").unwrap();
    cmd.current_dir(dir).env("NO_COLOR", "1");
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

fn write_stripes(dir: &Path, name: &str) -> PathBuf {
    let img: RgbImage = ImageBuffer::from_fn(96, 96, |x, _| {
        if (x / 6) % 2 == 0 {
            Rgb([230, 230, 230])
        } else {
            Rgb([20, 20, 20])
        }
    });
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

/// Fingerprint of `image` as printed by `modimg hash`.
fn hash_of(dir: &Path, image: &Path) -> String {
    let output = modimg(dir).arg("hash").arg(image).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    stdout
        .split_whitespace()
        .next()
        .expect("hash output")
        .to_string()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    let dir = TempDir::new().unwrap();
    modimg(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Perceptual-hash image moderation"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("hash"));
}

#[test]
fn test_help_shows_exit_codes() {
    let dir = TempDir::new().unwrap();
    modimg(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_check_help_shows_options() {
    let dir = TempDir::new().unwrap();
    modimg(dir.path())
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--blocklist"))
        .stdout(predicate::str::contains("--block-max-distance"))
        .stdout(predicate::str::contains("--format"));
}

// ============================================================================
// Hash Tests
// ============================================================================

#[test]
fn test_hash_prints_list_line() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");

    modimg(dir.path())
        .arg("hash")
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9a-f]{16}  # frame 0\n$").unwrap());
}

#[test]
fn test_hash_128_bit_with_label() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");

    modimg(dir.path())
        .args(["hash", "--algorithm", "phash128", "--label", "meme-42"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9a-f]{32} meme-42  # frame 0\n$").unwrap());
}

#[test]
fn test_hash_rejects_unknown_algorithm() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");

    modimg(dir.path())
        .args(["hash", "--algorithm", "md5"])
        .arg(&image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown hash algorithm"));
}

// ============================================================================
// Check Tests
// ============================================================================

#[test]
fn test_check_without_lists_is_inconclusive() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");

    modimg(dir.path())
        .arg("check")
        .arg(&image)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("[skipped] pHash allowlist"))
        .stdout(predicate::str::contains("[skipped] pHash blocklist"))
        .stdout(predicate::str::contains("[skipped] OpenNSFW2"))
        .stdout(predicate::str::contains("FINAL: INCONCLUSIVE"));
}

#[test]
fn test_check_blocklisted_image_exits_2() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");
    let blocklist = dir.path().join("blocklist.txt");
    fs::write(&blocklist, format!("# known bad\n{} spam\n", hash_of(dir.path(), &image))).unwrap();

    modimg(dir.path())
        .arg("check")
        .arg(&image)
        .arg("--blocklist")
        .arg(&blocklist)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("[ok] pHash blocklist"))
        .stdout(predicate::str::contains("match_label=spam"))
        .stdout(predicate::str::contains("short-circuited by pHash blocklist match"))
        .stdout(predicate::str::contains("FINAL: BLOCK"));
}

#[test]
fn test_check_blocklist_from_env() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");
    let blocklist = dir.path().join("blocklist.txt");
    fs::write(&blocklist, hash_of(dir.path(), &image)).unwrap();

    modimg(dir.path())
        .arg("check")
        .arg(&image)
        .arg("--quiet")
        .env("PHASH_BLOCKLIST", &blocklist)
        .assert()
        .code(2)
        .stdout("FINAL: BLOCK\n");
}

#[test]
fn test_hash_output_appended_to_blocklist_uses_default_label() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");
    let output = modimg(dir.path()).arg("hash").arg(&image).output().unwrap();
    let blocklist = dir.path().join("blocklist.txt");
    fs::write(&blocklist, &output.stdout).unwrap();

    modimg(dir.path())
        .arg("check")
        .arg(&image)
        .arg("--blocklist")
        .arg(&blocklist)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("match_label=block"));
}

#[test]
fn test_check_allowlisted_image_exits_0() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");
    let allowlist = dir.path().join("allowlist.txt");
    fs::write(&allowlist, format!("0x{} trusted", hash_of(dir.path(), &image))).unwrap();

    modimg(dir.path())
        .arg("check")
        .arg(&image)
        .arg("--allowlist")
        .arg(&allowlist)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("FINAL: ALLOW"));
}

#[test]
fn test_check_json_report() {
    let dir = TempDir::new().unwrap();
    let image = write_stripes(dir.path(), "stripes.png");
    let blocklist = dir.path().join("blocklist.txt");
    fs::write(&blocklist, hash_of(dir.path(), &image)).unwrap();

    let output = modimg(dir.path())
        .arg("check")
        .arg(&image)
        .args(["--format", "json", "--blocklist"])
        .arg(&blocklist)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["verdict"], "BLOCK");
    assert_eq!(report["decided_by"], "pHash blocklist");
    assert_eq!(report["results"][1]["details"]["match_label"], "block");
}

#[test]
fn test_check_missing_file_exits_66() {
    let dir = TempDir::new().unwrap();

    modimg(dir.path())
        .args(["check", "does-not-exist.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to load image"));
}

#[test]
fn test_check_undecodable_file_exits_65() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("notes.png");
    fs::write(&bogus, "definitely not an image").unwrap();

    modimg(dir.path())
        .arg("check")
        .arg(&bogus)
        .assert()
        .code(65);
}
