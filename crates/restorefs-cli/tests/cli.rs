use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rusqlite::{params, Connection};
use std::process::Command;

fn write_backup(src: &assert_fs::fixture::ChildPath) {
    src.create_dir_all().unwrap();
    let conn = Connection::open(src.child("Manifest.db").path()).unwrap();
    conn.execute_batch(
        "CREATE TABLE Files (fileID TEXT PRIMARY KEY, domain TEXT, relativePath TEXT, flags INTEGER, file BLOB);",
    )
    .unwrap();
    conn.execute(
        "INSERT INTO Files VALUES (?1, ?2, ?3, ?4, ?5)",
        params!["ab12cd34", "AppDomain-com.example.app", "Documents/notes.txt", 1, Vec::<u8>::new()],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO Files VALUES (?1, ?2, ?3, ?4, ?5)",
        params!["cd000001", "AppDomain-com.example.app", "Documents", 2, Vec::<u8>::new()],
    )
    .unwrap();
    src.child("ab").create_dir_all().unwrap();
    src.child("ab/ab12cd34").write_str("hello backup").unwrap();
}

#[test]
fn restore_happy_path() {
    let td = assert_fs::TempDir::new().unwrap();
    let src = td.child("backup");
    write_backup(&src);

    Command::cargo_bin("restorefs")
        .unwrap()
        .current_dir(td.path())
        .args(["--src", "backup", "--dst", "out"])
        .assert()
        .success();

    td.child("out/AppDomain/com.example.app/Documents/notes.txt")
        .assert("hello backup");
}

#[test]
fn default_directories_are_src_and_dst() {
    let td = assert_fs::TempDir::new().unwrap();
    write_backup(&td.child("src"));

    Command::cargo_bin("restorefs")
        .unwrap()
        .current_dir(td.path())
        .assert()
        .success();

    td.child("dst/AppDomain/com.example.app/Documents/notes.txt")
        .assert(predicate::path::is_file());
}

#[test]
fn missing_manifest_exits_nonzero() {
    let td = assert_fs::TempDir::new().unwrap();
    td.child("empty").create_dir_all().unwrap();

    Command::cargo_bin("restorefs")
        .unwrap()
        .current_dir(td.path())
        .args(["--src", "empty", "--dst", "out"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("manifest unavailable"));
}

#[test]
fn missing_blob_exits_nonzero() {
    let td = assert_fs::TempDir::new().unwrap();
    let src = td.child("backup");
    write_backup(&src);
    std::fs::remove_file(src.child("ab/ab12cd34").path()).unwrap();

    Command::cargo_bin("restorefs")
        .unwrap()
        .current_dir(td.path())
        .args(["--src", "backup", "--dst", "out"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("is not a regular file"));
}
