//! Blocking tar access. Callers on the async side go through `spawn_blocking`.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;
use xz2::read::XzDecoder;

use super::member::{ArchiveMember, normalize_path};
use crate::FetchError;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];

/// Compression wrapped around a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    /// Sniff the leading bytes and rewind the reader
    pub fn detect<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        let mut magic = Vec::with_capacity(XZ_MAGIC.len());
        reader
            .by_ref()
            .take(XZ_MAGIC.len() as u64)
            .read_to_end(&mut magic)?;
        reader.seek(SeekFrom::Start(0))?;

        let compression = if magic.starts_with(GZIP_MAGIC) {
            Compression::Gzip
        } else if magic.starts_with(BZIP2_MAGIC) {
            Compression::Bzip2
        } else if magic.starts_with(XZ_MAGIC) {
            Compression::Xz
        } else {
            Compression::None
        };
        Ok(compression)
    }
}

fn archive_error(err: io::Error) -> FetchError {
    FetchError::Archive(err.to_string())
}

fn open_archive(path: &Path) -> Result<Archive<Box<dyn Read>>, FetchError> {
    let mut file = File::open(path)?;
    let compression = Compression::detect(&mut file)?;
    debug!(path = ?path, ?compression, "Opening archive");

    let reader: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(GzDecoder::new(BufReader::new(file))),
        Compression::Bzip2 => Box::new(BzDecoder::new(BufReader::new(file))),
        Compression::Xz => Box::new(XzDecoder::new(BufReader::new(file))),
        Compression::None => Box::new(BufReader::new(file)),
    };
    Ok(Archive::new(reader))
}

/// List every entry of the archive at `path`, in archive order.
pub fn scan_members(path: &Path) -> Result<Vec<ArchiveMember>, FetchError> {
    let mut archive = open_archive(path)?;
    let mut members = Vec::new();

    for (index, entry) in archive.entries().map_err(archive_error)?.enumerate() {
        let entry = entry.map_err(archive_error)?;
        let raw_path = entry.path().map_err(archive_error)?;
        members.push(ArchiveMember {
            index,
            path: normalize_path(&raw_path.to_string_lossy()),
            size: entry.size(),
            is_file: entry.header().entry_type().is_file(),
        });
    }

    debug!(path = ?path, entries = members.len(), "Scanned archive");
    Ok(members)
}

/// Copy the data of `member` into `writer`, returning the number of bytes written.
///
/// `on_progress` receives the running total after every chunk.
pub fn extract_member<W: Write>(
    path: &Path,
    member: &ArchiveMember,
    writer: &mut W,
    chunk_size: usize,
    on_progress: &mut dyn FnMut(u64),
) -> Result<u64, FetchError> {
    let mut archive = open_archive(path)?;

    for (index, entry) in archive.entries().map_err(archive_error)?.enumerate() {
        let mut entry = entry.map_err(archive_error)?;
        if index != member.index {
            continue;
        }
        let written = copy_chunked(&mut entry, writer, chunk_size, on_progress)?;
        writer.flush()?;
        return Ok(written);
    }

    Err(FetchError::Archive(format!(
        "entry #{} ({}) not found on second pass",
        member.index, member.path
    )))
}

/// `io::copy` with a caller-chosen buffer size and a progress hook
pub(crate) fn copy_chunked<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    on_progress: &mut dyn FnMut(u64),
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..read])?;
        total += read as u64;
        on_progress(total);
    }

    Ok(total)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use flate2::write::GzEncoder;
    use std::io::Cursor;
    use xz2::write::XzEncoder;
    use tempfile::tempdir;

    /// Build a tar archive in memory. `None` content makes a directory entry.
    pub(crate) fn build_tar(entries: &[(&str, Option<&[u8]>)], gzip: bool) -> Vec<u8> {
        let compression = if gzip {
            Compression::Gzip
        } else {
            Compression::None
        };
        build_compressed_tar(entries, compression)
    }

    pub(crate) fn build_compressed_tar(
        entries: &[(&str, Option<&[u8]>)],
        compression: Compression,
    ) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            match content {
                Some(data) => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_size(data.len() as u64);
                    header.set_mode(0o644);
                    header.set_cksum();
                    builder.append_data(&mut header, path, *data).unwrap();
                }
                None => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    header.set_cksum();
                    builder.append_data(&mut header, path, io::empty()).unwrap();
                }
            }
        }
        let tar_bytes = builder.into_inner().unwrap();

        match compression {
            Compression::None => tar_bytes,
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&tar_bytes).unwrap();
                encoder.finish().unwrap()
            }
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(&tar_bytes).unwrap();
                encoder.finish().unwrap()
            }
            Compression::Xz => {
                let mut encoder = XzEncoder::new(Vec::new(), 6);
                encoder.write_all(&tar_bytes).unwrap();
                encoder.finish().unwrap()
            }
        }
    }

    #[test]
    fn test_detect_compression() {
        let mut plain = Cursor::new(build_tar(&[("a.txt", Some(b"a"))], false));
        assert_eq!(Compression::detect(&mut plain).unwrap(), Compression::None);
        assert_eq!(plain.position(), 0);

        let mut gz = Cursor::new(build_tar(&[("a.txt", Some(b"a"))], true));
        assert_eq!(Compression::detect(&mut gz).unwrap(), Compression::Gzip);
        assert_eq!(gz.position(), 0);

        let mut bz = Cursor::new(build_compressed_tar(
            &[("a.txt", Some(b"a"))],
            Compression::Bzip2,
        ));
        assert_eq!(Compression::detect(&mut bz).unwrap(), Compression::Bzip2);
        assert_eq!(bz.position(), 0);

        let mut xz = Cursor::new(build_compressed_tar(&[("a.txt", Some(b"a"))], Compression::Xz));
        assert_eq!(Compression::detect(&mut xz).unwrap(), Compression::Xz);
        assert_eq!(xz.position(), 0);

        // shorter than the longest magic
        let mut short = Cursor::new(vec![0x1f, 0x8b]);
        assert_eq!(Compression::detect(&mut short).unwrap(), Compression::Gzip);

        let mut empty = Cursor::new(Vec::new());
        assert_eq!(Compression::detect(&mut empty).unwrap(), Compression::None);
    }

    #[test]
    fn test_scan_and_extract_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.tar.gz");
        let payload = vec![7u8; 20_000];
        std::fs::write(
            &path,
            build_tar(
                &[
                    ("flux-lora/", None),
                    ("flux-lora/readme.md", Some(b"hello")),
                    ("flux-lora/flux-lora.safetensors", Some(&payload)),
                ],
                true,
            ),
        )
        .unwrap();

        let members = scan_members(&path).unwrap();
        assert_eq!(members.len(), 3);
        assert!(!members[0].is_file);
        assert_eq!(members[0].path, "flux-lora");
        assert_eq!(members[2].path, "flux-lora/flux-lora.safetensors");
        assert_eq!(members[2].size, 20_000);

        let mut out = Vec::new();
        let mut reports = Vec::new();
        let written =
            extract_member(&path, &members[2], &mut out, 8192, &mut |n| reports.push(n)).unwrap();
        assert_eq!(written, 20_000);
        assert_eq!(out, payload);
        assert_eq!(reports.last(), Some(&20_000));
        assert!(reports.len() >= 3);
    }

    #[test]
    fn test_extract_plain_tar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.tar");
        std::fs::write(
            &path,
            build_tar(&[("a.bin", Some(b"first")), ("b.bin", Some(b"second"))], false),
        )
        .unwrap();

        let members = scan_members(&path).unwrap();
        let mut out = Vec::new();
        extract_member(&path, &members[1], &mut out, 4, &mut |_| {}).unwrap();
        assert_eq!(out, b"second");
    }

    #[test]
    fn test_scan_and_extract_bzip2_and_xz() {
        let dir = tempdir().unwrap();
        let payload = vec![9u8; 12_345];

        for (name, compression) in [
            ("bundle.tar.bz2", Compression::Bzip2),
            ("bundle.tar.xz", Compression::Xz),
        ] {
            let path = dir.path().join(name);
            std::fs::write(
                &path,
                build_compressed_tar(
                    &[
                        ("docs/readme.md", Some(b"hello")),
                        ("flux-lora/flux-lora.safetensors", Some(&payload)),
                    ],
                    compression,
                ),
            )
            .unwrap();

            let members = scan_members(&path).unwrap();
            assert_eq!(members.len(), 2, "{name}");
            assert_eq!(members[1].path, "flux-lora/flux-lora.safetensors");

            let mut out = Vec::new();
            let written = extract_member(&path, &members[1], &mut out, 4096, &mut |_| {}).unwrap();
            assert_eq!(written, 12_345);
            assert_eq!(out, payload, "{name}");
        }
    }

    #[test]
    fn test_garbage_is_an_archive_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.tar");
        std::fs::write(&path, vec![0x42u8; 1024]).unwrap();

        let err = scan_members(&path).unwrap_err();
        assert!(matches!(err, FetchError::Archive(_)));
    }
}
