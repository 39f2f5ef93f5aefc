use std::fs;

use folders::{
    compile, decode, encoder,
    error::Error,
    eval::{self, StreamIo},
    parser, store,
};
use tempfile::tempdir;

const PROGRAM: &str = "\
int i
string s
while i < 4:
    s = s + 'a'
    i = i + 1
if s == \"aaaa\":
    print(s)
print(-1.25)
";

#[test]
fn tree_survives_the_file_system() {
    let dir = tempdir().unwrap();
    let build = dir.path().join("build");

    let (ctr, root) = compile(PROGRAM).unwrap();
    store::write(&ctr, root, &build).unwrap();
    assert_eq!(store::count_folders(&build).unwrap(), ctr.len() - 1);

    let (loaded, loaded_root) = store::read(&build).unwrap();
    assert_eq!(loaded.len(), ctr.len());
    assert_eq!(
        decode::decode_program(&loaded, loaded_root).unwrap(),
        parser::parse(PROGRAM).unwrap()
    );

    let io = eval::execute(&loaded, loaded_root, StreamIo::new("".as_bytes(), Vec::new())).unwrap();
    let (_, output) = io.into_parts();
    assert_eq!(String::from_utf8(output).unwrap(), "aaaa-1.25");
}

#[test]
fn write_replaces_previous_output() {
    let dir = tempdir().unwrap();
    let build = dir.path().join("build");
    fs::create_dir_all(build.join("stale")).unwrap();
    fs::write(build.join("notes.txt"), "old").unwrap();

    let (ctr, root) = encoder::encode(&parser::parse("print(1)\n").unwrap());
    store::write(&ctr, root, &build).unwrap();

    assert!(!build.join("stale").exists());
    assert!(!build.join("notes.txt").exists());
    assert!(store::read(&build).is_ok());
}

#[test]
fn foreign_entries_are_rejected() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("a")).unwrap();
    fs::write(dir.path().join("b"), "").unwrap();
    assert!(matches!(
        store::read(dir.path()),
        Err(Error::MalformedStore(..))
    ));

    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("a")).unwrap();
    fs::create_dir(dir.path().join("c")).unwrap();
    assert!(matches!(
        store::read(dir.path()),
        Err(Error::MalformedStore(..))
    ));

    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("Folder")).unwrap();
    assert!(matches!(
        store::read(dir.path()),
        Err(Error::MalformedStore(..))
    ));
}
