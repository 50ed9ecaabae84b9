use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// A temporary upload written to disk before the media round-trip.
///
/// The file is removed when the value is dropped, so both the success and the
/// failure path release the spooled bytes.
#[derive(Debug)]
pub struct SpooledFile {
    path: PathBuf,
    file_name: String,
}

impl SpooledFile {
    pub async fn write(file_name: &str, bytes: &[u8]) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("profilo-{}", Ulid::new()));
        tokio::fs::write(&path, bytes)
            .await
            .context("failed to spool upload to disk")?;
        Ok(Self {
            path,
            file_name: file_name.to_string(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::SpooledFile;
    use anyhow::Result;

    #[tokio::test]
    async fn write_then_drop_removes_file() -> Result<()> {
        let spooled = SpooledFile::write("avatar.png", b"png-bytes").await?;
        let path = spooled.path().to_path_buf();
        assert_eq!(spooled.file_name(), "avatar.png");
        assert_eq!(std::fs::read(&path)?, b"png-bytes");

        drop(spooled);
        assert!(!path.exists());
        Ok(())
    }
}
