// intake-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use std::io::Write;
use std::path::Path;

const TEMP_PREFIX: &str = ".intake-upload-";

/// Replace `path` with `content` in one rename. Readers see either the old
/// blob or the new one, never a partial upload.
///
/// The temporary file lives next to the target so the rename never crosses
/// a filesystem. The parent directory must exist.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut staged = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)?;
    staged.write_all(content.as_ref())?;
    staged.as_file().sync_all()?;

    staged
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;
    Ok(())
}
