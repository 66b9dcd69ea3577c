use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use archforge_core::{ArchiveFormat, ErrorKind, SourceSpec};
use archforge_pack::{build_archive, resolve, write_atomic, ArchiveWriter, ZipPacker};

fn temp_dir(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    path.push(format!("archforge-pack-{}-{}", name, stamp));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let file = fs::File::open(path).expect("open archive");
    let mut archive = zip::ZipArchive::new(file).expect("parse archive");
    let mut entries = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx).expect("entry");
        let mut content = Vec::new();
        entry.read_to_end(&mut content).expect("read entry");
        entries.push((entry.name().to_string(), content));
    }
    entries
}

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write file");
    }
}

#[test]
fn inline_content_scenario() {
    let dir = temp_dir("inline");
    let output = dir.join("out.zip");
    let spec = SourceSpec::inline("This is some content", "content.txt");

    let descriptor = build_archive(&spec, ArchiveFormat::Zip, &output).expect("build");

    assert!(output.exists());
    assert_eq!(
        read_entries(&output),
        vec![(
            "content.txt".to_string(),
            b"This is some content".to_vec()
        )]
    );
    let stat_size = fs::metadata(&output).expect("stat").len();
    assert_eq!(descriptor.byte_size, stat_size);
    assert_eq!(descriptor.output_path, output);
    assert_eq!(descriptor.content_digest.len(), 64);
}

#[test]
fn inline_builds_are_idempotent() {
    let dir = temp_dir("idempotent");
    let spec = SourceSpec::inline("This is some content", "content.txt");

    let first = build_archive(&spec, ArchiveFormat::Zip, &dir.join("first.zip")).expect("build");
    let second =
        build_archive(&spec, ArchiveFormat::Zip, &dir.join("second.zip")).expect("build");

    assert_eq!(first.content_digest, second.content_digest);
    assert_eq!(first.byte_size, second.byte_size);
    assert!(second.is_unchanged_from(&first));
    assert_eq!(
        fs::read(dir.join("first.zip")).expect("read"),
        fs::read(dir.join("second.zip")).expect("read")
    );
}

#[test]
fn content_change_changes_digest() {
    let dir = temp_dir("changed");
    let output = dir.join("out.zip");
    let before = build_archive(
        &SourceSpec::inline("version one", "content.txt"),
        ArchiveFormat::Zip,
        &output,
    )
    .expect("build");
    let after = build_archive(
        &SourceSpec::inline("version two", "content.txt"),
        ArchiveFormat::Zip,
        &output,
    )
    .expect("rebuild");
    assert!(!after.is_unchanged_from(&before));
    assert_eq!(read_entries(&output)[0].1, b"version two".to_vec());
}

#[test]
fn single_file_scenario() {
    let dir = temp_dir("single-file");
    write_tree(&dir, &[("test-fixtures/test-file.txt", "This is test content")]);
    let output = dir.join("zip_file_acc_test.zip");

    build_archive(
        &SourceSpec::file(dir.join("test-fixtures/test-file.txt")),
        ArchiveFormat::Zip,
        &output,
    )
    .expect("build");

    assert_eq!(
        read_entries(&output),
        vec![(
            "test-file.txt".to_string(),
            b"This is test content".to_vec()
        )]
    );
}

#[test]
fn directory_scenario_has_only_file_entries() {
    let dir = temp_dir("directory");
    let root = dir.join("fixtures").join("dir");
    write_tree(&root, &[("a.txt", "alpha"), ("sub/b.txt", "bravo")]);
    fs::create_dir_all(root.join("empty")).expect("empty dir");
    let output = dir.join("out.zip");

    build_archive(&SourceSpec::directory(&root), ArchiveFormat::Zip, &output).expect("build");

    assert_eq!(
        read_entries(&output),
        vec![
            ("a.txt".to_string(), b"alpha".to_vec()),
            ("sub/b.txt".to_string(), b"bravo".to_vec()),
        ]
    );
}

#[test]
fn directory_digest_ignores_creation_order() {
    let dir = temp_dir("reorder");
    let files = [
        ("a.txt", "alpha"),
        ("b.txt", "bravo"),
        ("nested/c.txt", "charlie"),
        ("nested/deeper/d.txt", "delta"),
        ("z.txt", "zulu"),
    ];
    let forward = dir.join("forward");
    write_tree(&forward, &files);
    let mut reversed_files = files;
    reversed_files.reverse();
    let backward = dir.join("backward");
    write_tree(&backward, &reversed_files);

    let first = build_archive(
        &SourceSpec::directory(&forward),
        ArchiveFormat::Zip,
        &dir.join("forward.zip"),
    )
    .expect("build forward");
    let second = build_archive(
        &SourceSpec::directory(&backward),
        ArchiveFormat::Zip,
        &dir.join("backward.zip"),
    )
    .expect("build backward");

    assert_eq!(first.content_digest, second.content_digest);
    assert_eq!(first.byte_size, second.byte_size);
}

#[test]
fn round_trip_preserves_binary_content() {
    let dir = temp_dir("round-trip");
    let root = dir.join("src");
    fs::create_dir_all(root.join("bin")).expect("mkdir");
    let binary: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    fs::write(root.join("bin").join("blob.dat"), &binary).expect("write");
    fs::write(root.join("empty.txt"), b"").expect("write");
    let output = dir.join("out.zip");

    build_archive(&SourceSpec::directory(&root), ArchiveFormat::Zip, &output).expect("build");

    assert_eq!(
        read_entries(&output),
        vec![
            ("bin/blob.dat".to_string(), binary),
            ("empty.txt".to_string(), Vec::new()),
        ]
    );
}

#[test]
fn traversal_name_is_rejected_before_writing() {
    let dir = temp_dir("name-safety");
    let output = dir.join("out.zip");
    let err = build_archive(
        &SourceSpec::inline("pwned", "../evil.txt"),
        ArchiveFormat::Zip,
        &output,
    )
    .expect_err("rejected");
    assert_eq!(err.kind(), ErrorKind::InvalidEntryName);
    assert!(!output.exists());
    assert_eq!(fs::read_dir(&dir).expect("read dir").count(), 0);
}

#[test]
fn output_inside_source_directory_is_left_out() {
    let dir = temp_dir("output-inside");
    write_tree(&dir, &[("a.txt", "alpha")]);
    let output = dir.join("z.zip");

    let first = build_archive(&SourceSpec::directory(&dir), ArchiveFormat::Zip, &output)
        .expect("first build");
    assert_eq!(
        read_entries(&output),
        vec![("a.txt".to_string(), b"alpha".to_vec())]
    );

    // The previous archive now sits in the tree being archived.
    let second = build_archive(&SourceSpec::directory(&dir), ArchiveFormat::Zip, &output)
        .expect("second build");
    assert_eq!(first.content_digest, second.content_digest);
    assert_eq!(first.byte_size, second.byte_size);
    assert_eq!(
        read_entries(&output),
        vec![("a.txt".to_string(), b"alpha".to_vec())]
    );
    let leftovers: Vec<_> = fs::read_dir(&dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name())
        .filter(|name| name.to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[cfg(unix)]
#[test]
fn symlinked_file_content_is_read_through_the_link() {
    let dir = temp_dir("symlink");
    write_tree(&dir, &[("outside/real.txt", "target bytes")]);
    let root = dir.join("src");
    write_tree(&root, &[("plain.txt", "plain")]);
    std::os::unix::fs::symlink(dir.join("outside").join("real.txt"), root.join("alias.txt"))
        .expect("symlink");
    let output = dir.join("out.zip");

    build_archive(&SourceSpec::directory(&root), ArchiveFormat::Zip, &output).expect("build");

    assert_eq!(
        read_entries(&output),
        vec![
            ("alias.txt".to_string(), b"target bytes".to_vec()),
            ("plain.txt".to_string(), b"plain".to_vec()),
        ]
    );
}

#[test]
fn missing_source_file_is_unreadable() {
    let dir = temp_dir("missing-source");
    let output = dir.join("out.zip");
    let err = build_archive(
        &SourceSpec::file(dir.join("does-not-exist.txt")),
        ArchiveFormat::Zip,
        &output,
    )
    .expect_err("error");
    assert_eq!(err.kind(), ErrorKind::SourceUnreadable);
    assert!(!output.exists());
}

#[test]
fn missing_output_directory_is_write_failure() {
    let dir = temp_dir("missing-output-dir");
    let output = dir.join("not-there").join("out.zip");
    let err = build_archive(
        &SourceSpec::inline("x", "x.txt"),
        ArchiveFormat::Zip,
        &output,
    )
    .expect_err("error");
    assert_eq!(err.kind(), ErrorKind::WriteFailed);
}

/// Accepts `budget` bytes and then reports a full disk.
struct FullDisk<'a> {
    inner: &'a mut fs::File,
    budget: usize,
}

impl Write for FullDisk<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::other("no space left on device"));
        }
        let allowed = buf.len().min(self.budget);
        let written = self.inner.write(&buf[..allowed])?;
        self.budget -= written;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FullDisk<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn disk_full_midway_leaves_no_archive() {
    let dir = temp_dir("disk-full");
    let root = dir.join("src");
    let noisy: String = (0..4096u32)
        .map(|idx| format!("{:08x}", idx.wrapping_mul(2_654_435_761)))
        .collect();
    write_tree(
        &root,
        &[
            ("one.txt", "first entry"),
            ("three.txt", "third entry"),
            ("two.txt", noisy.as_str()),
        ],
    );
    let out_dir = dir.join("out");
    fs::create_dir_all(&out_dir).expect("mkdir");
    let output = out_dir.join("out.zip");

    // Room for the two small entries but not for two.txt.
    let budget = 160;
    let spec = SourceSpec::directory(&root);
    let mut entries = resolve(&spec).expect("resolve");
    let err = write_atomic(&output, |file, _temp| {
        let mut sink = FullDisk {
            inner: file,
            budget,
        };
        ZipPacker.write(&mut entries, &mut sink, &output)
    })
    .expect_err("disk full");

    assert_eq!(err.kind(), ErrorKind::WriteFailed);
    assert!(!output.exists());
    assert_eq!(fs::read_dir(&out_dir).expect("read dir").count(), 0);
}
