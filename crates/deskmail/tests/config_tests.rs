// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading as the binary sees it: an explicit file plus
//! `DESKMAIL_*` environment overrides.

use std::io::Write;

use serial_test::serial;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn environment_overrides_file() {
    let file = write_config("[ingest]\nreference_prefix = \"LAB\"\n");

    // SAFETY: serialized with every other test that touches the environment.
    unsafe { std::env::set_var("DESKMAIL_INGEST_REFERENCE_PREFIX", "HELP") };
    let loaded = deskmail_config::load_and_validate_path(file.path());
    unsafe { std::env::remove_var("DESKMAIL_INGEST_REFERENCE_PREFIX") };

    assert_eq!(loaded.unwrap().ingest.reference_prefix, "HELP");
}

#[test]
#[serial]
fn invalid_prefix_is_reported() {
    let file = write_config("[ingest]\nreference_prefix = \"acct-1\"\n");

    let errors = deskmail_config::load_and_validate_path(file.path()).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| e.to_string().contains("reference_prefix"))
    );
}
