use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_tone(path: &Path, sample_rate: u32, samples: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for index in 0..samples {
        writer.write_sample(((index % 64) as i16 - 32) * 256).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn play_drains_a_clip_and_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("ping.wav");
    write_tone(&clip, 16000, 1600);

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hubbub"));
    cmd.arg("play")
        .arg(&clip)
        .timeout(Duration::from_secs(30))
        .assert()
        .success();
}

#[test]
fn play_mixes_several_files_at_foreign_rates() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.wav");
    let second = dir.path().join("second.wav");
    write_tone(&first, 16000, 1600);
    write_tone(&second, 44100, 4410);

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hubbub"));
    cmd.arg("play")
        .arg(&first)
        .arg(&second)
        .timeout(Duration::from_secs(30))
        .assert()
        .success();
}

#[test]
fn play_rejects_a_missing_file() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hubbub"));
    cmd.args(["play", "/no/such/clip.wav"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read"));
}

#[test]
fn play_rejects_payloads_that_are_not_wav() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("notes.txt");
    std::fs::write(&bogus, b"these are not audio samples").unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hubbub"));
    cmd.arg("play")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported clip format"));
}

#[test]
fn help_lists_the_play_subcommand() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hubbub"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("play"));
}
