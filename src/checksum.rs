use std::fs::File;
use std::io::Read;
use std::path::Path;
use log::debug;
use md5::Md5;
use sha1::{Digest, Sha1};
use crate::artifact::Companion;

const CHUNK_SIZE: usize = 4096;

/// Write the MD5 digest of `path` to `<path>.md5` and return it.
pub fn write_md5(path: &Path) -> std::io::Result<String> {
    write_digest::<Md5>(path, Companion::Md5)
}

/// Write the SHA1 digest of `path` to `<path>.sha1` and return it.
pub fn write_sha1(path: &Path) -> std::io::Result<String> {
    write_digest::<Sha1>(path, Companion::Sha1)
}

/// Lowercase hex digest of the file contents, read in fixed-size chunks.
pub fn digest_file<D: Digest>(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// The companion file holds the bare digest, without a trailing newline.
fn write_digest<D: Digest>(path: &Path, companion: Companion) -> std::io::Result<String> {
    let digest = digest_file::<D>(path)?;
    let target = companion.path_for(path);
    debug!("Writing {} checksum to {}", companion.extension(), target.display());
    std::fs::write(&target, &digest)?;
    Ok(digest)
}
