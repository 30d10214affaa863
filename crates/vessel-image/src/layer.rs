//! Filesystem layer packing and unpacking.
//!
//! A layer blob is a tar archive (optionally gzip-compressed) of one
//! incremental filesystem diff. Blobs are content-addressed by their
//! SHA-256 digest and unpacked into per-digest directories.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vessel_common::error::{Result, VesselError};
use vessel_common::types::Sha256Digest;

/// Metadata for a single filesystem layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRecord {
    /// Content digest of the layer blob.
    pub digest: Sha256Digest,
    /// Digest of the parent layer, if this is not a base layer.
    pub parent: Option<Sha256Digest>,
    /// Size of the layer blob in bytes.
    pub size_bytes: u64,
    /// ISO-8601 timestamp of when the layer entered the store.
    pub created_at: String,
}

/// Packs a directory into a gzip-compressed tar blob.
///
/// Entries are stored with paths relative to `src_dir`, so unpacking
/// reproduces the directory contents. Returns the blob size in bytes.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or the archive cannot
/// be written.
pub fn pack_layer(src_dir: &Path, blob_out: &Path) -> Result<u64> {
    let file =
        std::fs::File::create(blob_out).map_err(|e| VesselError::io(blob_out.to_path_buf(), e))?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", src_dir)
        .map_err(|e| VesselError::io(src_dir.to_path_buf(), e))?;
    let encoder = builder
        .into_inner()
        .map_err(|e| VesselError::io(blob_out.to_path_buf(), e))?;
    let file = encoder
        .finish()
        .map_err(|e| VesselError::io(blob_out.to_path_buf(), e))?;

    let size_bytes = file
        .metadata()
        .map_err(|e| VesselError::io(blob_out.to_path_buf(), e))?
        .len();
    tracing::info!(blob = %blob_out.display(), size = size_bytes, "layer packed");
    Ok(size_bytes)
}

/// Unpacks a layer blob into the target directory.
///
/// Supports both plain tar and gzip-compressed blobs; the format is
/// detected from the gzip magic bytes rather than the file name, since
/// blobs are stored under their digest.
///
/// # Errors
///
/// Returns an error if the blob cannot be read or extraction fails.
pub fn unpack_layer(blob: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(target).map_err(|e| VesselError::io(target.to_path_buf(), e))?;

    let file = std::fs::File::open(blob).map_err(|e| VesselError::io(blob.to_path_buf(), e))?;

    if is_gzip_blob(blob)? {
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        archive
            .unpack(target)
            .map_err(|e| VesselError::io(target.to_path_buf(), e))?;
    } else {
        let mut archive = tar::Archive::new(file);
        archive
            .unpack(target)
            .map_err(|e| VesselError::io(target.to_path_buf(), e))?;
    }

    tracing::info!(blob = %blob.display(), target = %target.display(), "layer unpacked");
    Ok(())
}

/// Checks the gzip magic bytes at the start of a blob.
fn is_gzip_blob(path: &Path) -> Result<bool> {
    let mut file = std::fs::File::open(path).map_err(|e| VesselError::io(path.to_path_buf(), e))?;
    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == [0x1f, 0x8b]),
        // Shorter than two bytes cannot be gzip.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(VesselError::io(path.to_path_buf(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate_dir(dir: &Path) {
        std::fs::create_dir_all(dir.join("etc")).expect("mkdir");
        std::fs::write(dir.join("etc/issue"), "vessel test rootfs\n").expect("write");
        std::fs::write(dir.join("hello.txt"), "hello from layer").expect("write");
    }

    #[test]
    fn pack_then_unpack_reproduces_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src");
        populate_dir(&src);

        let blob = dir.path().join("blob");
        let size = pack_layer(&src, &blob).expect("pack");
        assert!(size > 0);

        let out = dir.path().join("out");
        unpack_layer(&blob, &out).expect("unpack");
        assert!(out.join("etc/issue").exists());
        let content = std::fs::read_to_string(out.join("hello.txt")).expect("read");
        assert_eq!(content, "hello from layer");
    }

    #[test]
    fn unpack_handles_plain_tar() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blob = dir.path().join("plain.tar");
        let file = std::fs::File::create(&blob).expect("create");
        let mut builder = tar::Builder::new(file);
        let data = b"plain tar layer";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "plain.txt", &data[..])
            .expect("append");
        builder.finish().expect("finish");

        let out = dir.path().join("out");
        unpack_layer(&blob, &out).expect("unpack");
        let content = std::fs::read_to_string(out.join("plain.txt")).expect("read");
        assert_eq!(content, "plain tar layer");
    }

    #[test]
    fn unpack_missing_blob_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(unpack_layer(&dir.path().join("missing"), &dir.path().join("out")).is_err());
    }

    #[test]
    fn gzip_detection_uses_magic_bytes_not_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gz = dir.path().join("noext");
        std::fs::write(&gz, [0x1f, 0x8b, 0x08, 0x00]).expect("write");
        assert!(is_gzip_blob(&gz).expect("sniff"));

        let plain = dir.path().join("fake.gz");
        std::fs::write(&plain, b"not gzip").expect("write");
        assert!(!is_gzip_blob(&plain).expect("sniff"));

        let tiny = dir.path().join("tiny");
        std::fs::write(&tiny, [0x1f]).expect("write");
        assert!(!is_gzip_blob(&tiny).expect("sniff"));
    }
}
