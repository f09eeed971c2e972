use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::PhotoCopyError;
use crate::ports::FileSystem;

const BUFFER_SIZE: usize = 64 * 1024;

/// Reads `path` through `fs` in fixed-size chunks and returns the
/// canonical uppercase-hex SHA-256 digest. Never called eagerly: only the
/// Collision Resolver triggers this, and only for files that reach a
/// potential conflict.
pub fn compute_checksum(fs: &dyn FileSystem, path: &Path) -> Result<String, PhotoCopyError> {
    let mut reader = fs.open_read(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUFFER_SIZE];

    loop {
        let read = reader
            .read(&mut buf)
            .map_err(|err| PhotoCopyError::access(path, err))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode_upper(hasher.finalize()))
}
