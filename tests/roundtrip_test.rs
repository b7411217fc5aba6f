#![cfg(unix)]

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::{symlink, MetadataExt, PermissionsExt};
use std::path::Path;

use rand::{thread_rng, Rng};
use tempfile::tempdir;
use treetar::pack::pack_tree;
use treetar::unpack::unpack_stream;

/// A tree exercising every entry kind: nested directories, regular files
/// (one of them large and random), a symlink and a hard-linked pair.
fn build_tree(root: &Path) -> std::path::PathBuf {
    let top = root.join("top");
    fs::create_dir_all(top.join("alpha")).unwrap();
    fs::create_dir_all(top.join("beta/empty")).unwrap();

    let mut bulk = vec![0u8; 64 * 1024];
    thread_rng().fill(&mut bulk[..]);
    fs::write(top.join("alpha/bulk.bin"), &bulk).unwrap();

    let mut f = File::create(top.join("alpha/file-a")).unwrap();
    f.write_all(b"alpha contents").unwrap();
    drop(f);
    fs::set_permissions(top.join("alpha/file-a"), fs::Permissions::from_mode(0o640)).unwrap();

    symlink("alpha/file-a", top.join("link-to-a")).unwrap();

    fs::write(top.join("hard1"), b"linked twice").unwrap();
    fs::hard_link(top.join("hard1"), top.join("hard2")).unwrap();

    top
}

fn assert_trees_equal(a: &Path, b: &Path) {
    let list = |d: &Path| {
        let mut v: Vec<_> = fs::read_dir(d).unwrap().map(|e| e.unwrap().file_name()).collect();
        v.sort();
        v
    };
    let names = list(a);
    assert_eq!(names, list(b), "children differ under {:?} vs {:?}", a, b);

    for name in names {
        let pa = a.join(&name);
        let pb = b.join(&name);
        let ma = fs::symlink_metadata(&pa).unwrap();
        let mb = fs::symlink_metadata(&pb).unwrap();

        if ma.file_type().is_symlink() {
            assert!(mb.file_type().is_symlink(), "{:?} should be a symlink", pb);
            assert_eq!(fs::read_link(&pa).unwrap(), fs::read_link(&pb).unwrap());
        } else if ma.is_dir() {
            assert!(mb.is_dir(), "{:?} should be a directory", pb);
            assert_eq!(ma.mode() & 0o7777, mb.mode() & 0o7777, "dir mode of {:?}", pb);
            assert_trees_equal(&pa, &pb);
        } else {
            assert!(mb.is_file(), "{:?} should be a file", pb);
            assert_eq!(ma.mode() & 0o7777, mb.mode() & 0o7777, "file mode of {:?}", pb);
            assert_eq!(fs::read(&pa).unwrap(), fs::read(&pb).unwrap(), "contents of {:?}", pb);
        }
    }
}

#[test]
fn roundtrip_preserves_structure_contents_and_links() {
    let src = tempdir().unwrap();
    let top = build_tree(src.path());

    let mut buf = Vec::new();
    treetar::create(&top, &mut buf).unwrap();

    let out = tempdir().unwrap();
    treetar::extract(&buf[..], out.path()).unwrap();

    let restored = out.path().join("top");
    assert_trees_equal(&top, &restored);

    // Hard-link equivalence: the restored pair shares one inode.
    let h1 = fs::metadata(restored.join("hard1")).unwrap();
    let h2 = fs::metadata(restored.join("hard2")).unwrap();
    assert_eq!(h1.ino(), h2.ino());
    assert_eq!(fs::read(restored.join("hard2")).unwrap(), b"linked twice");
}

#[test]
fn contents_mode_roundtrip_of_the_sup_tree() {
    let src = tempdir().unwrap();
    let outer = src.path().join("outer");
    fs::create_dir_all(outer.join("inner")).unwrap();
    fs::write(outer.join("inner/file"), b"sup").unwrap();
    symlink("file", outer.join("inner/link")).unwrap();

    let mut buf = Vec::new();
    treetar::create(format!("{}/", outer.display()), &mut buf).unwrap();

    let out = tempdir().unwrap();
    treetar::extract(&buf[..], out.path()).unwrap();

    // No wrapping "outer" entry: the contents sit directly at the root.
    assert!(!out.path().join("outer").exists());
    assert_eq!(fs::read(out.path().join("inner/file")).unwrap(), b"sup");
    let target = fs::read_link(out.path().join("inner/link")).unwrap();
    assert_eq!(target, Path::new("file"));
}

#[test]
fn single_file_roundtrip() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("lonely"), b"just me").unwrap();

    let mut buf = Vec::new();
    treetar::create(src.path().join("lonely"), &mut buf).unwrap();

    let out = tempdir().unwrap();
    treetar::extract(&buf[..], out.path()).unwrap();
    assert_eq!(fs::read(out.path().join("lonely")).unwrap(), b"just me");
}

#[test]
fn in_process_and_selected_backend_extract_the_same_tree() {
    let src = tempdir().unwrap();
    let top = build_tree(src.path());

    // In-process pipeline on both sides.
    let mut in_process = Vec::new();
    pack_tree(&top, &mut in_process).unwrap();
    let out1 = tempdir().unwrap();
    unpack_stream(&in_process[..], out1.path()).unwrap();

    // Whatever Backend::detect picks (system tar where available).
    let mut selected = Vec::new();
    treetar::create(&top, &mut selected).unwrap();
    let out2 = tempdir().unwrap();
    treetar::extract(&selected[..], out2.path()).unwrap();

    assert_trees_equal(out1.path(), out2.path());
}

#[test]
fn system_stream_extracts_in_process_and_vice_versa() {
    let src = tempdir().unwrap();
    let top = build_tree(src.path());

    // Stream produced by the selected backend, materialized in-process.
    let mut buf = Vec::new();
    treetar::create(&top, &mut buf).unwrap();
    let out = tempdir().unwrap();
    unpack_stream(&buf[..], out.path()).unwrap();
    assert_trees_equal(&top, &out.path().join("top"));

    // Stream produced in-process, materialized by the selected backend.
    let mut buf = Vec::new();
    pack_tree(&top, &mut buf).unwrap();
    let out = tempdir().unwrap();
    treetar::extract(&buf[..], out.path()).unwrap();
    assert_trees_equal(&top, &out.path().join("top"));
}

#[test]
fn empty_directory_contents_mode_yields_an_empty_destination() {
    let src = tempdir().unwrap();
    let empty = src.path().join("empty");
    fs::create_dir(&empty).unwrap();

    let mut buf = Vec::new();
    treetar::create(format!("{}/", empty.display()), &mut buf).unwrap();

    let out = tempdir().unwrap();
    treetar::extract(&buf[..], out.path()).unwrap();
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn tgz_roundtrip_produces_a_gzip_stream() {
    let src = tempdir().unwrap();
    let top = build_tree(src.path());

    let mut buf = Vec::new();
    treetar::tgz::create(&top, &mut buf).unwrap();
    assert_eq!(&buf[..2], &[0x1f, 0x8b], "gzip magic");

    let out = tempdir().unwrap();
    treetar::tgz::extract(&buf[..], out.path()).unwrap();
    assert_trees_equal(&top, &out.path().join("top"));
}
