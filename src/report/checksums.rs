use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{ArtifactError, EcotopeResult};
use crate::report::io::RunDir;

const CHUNK: usize = 1 << 20;

/// Streaming blake3 of one file, hex encoded.
pub fn hash_file(path: impl AsRef<Path>) -> EcotopeResult<String> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| ArtifactError::Checksum {
        file: path.display().to_string(),
        msg: e.to_string(),
    })?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = file.read(&mut buf).map_err(|e| ArtifactError::Checksum {
            file: path.display().to_string(),
            msg: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Write `checksums/<file>.blake3` for every existing artifact in `files`.
pub fn write_checksums(run: &RunDir, files: &[PathBuf]) -> EcotopeResult<()> {
    let dir = run.checksums_dir();
    fs::create_dir_all(&dir).map_err(|e| {
        ArtifactError::RunDir(format!("Failed to create {}: {e}", dir.display()))
    })?;
    for path in files.iter().filter(|p| p.exists()) {
        let digest = hash_file(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArtifactError::Checksum {
                file: path.display().to_string(),
                msg: "artifact has no file name".to_string(),
            })?;
        let out = dir.join(format!("{name}.blake3"));
        fs::write(&out, &digest).map_err(|e| ArtifactError::Checksum {
            file: out.display().to_string(),
            msg: e.to_string(),
        })?;
    }
    Ok(())
}
