use std::path::{Path, PathBuf};

use tokio::fs::{create_dir_all, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Creates the parent directory of `path` if it has one.
pub async fn prepare_io(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent).await?;
    }
    Ok(())
}

/// Reads the whole file, or `None` if it does not exist yet.
pub async fn read_io_file(path: &Path) -> anyhow::Result<Option<Vec<u8>>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut bytes = Vec::new();
    BufReader::new(File::open(path).await?)
        .read_to_end(&mut bytes)
        .await?;
    Ok(Some(bytes))
}

/// Replaces the file contents. Data goes to a sibling temp file first and is
/// renamed over the target once flushed and synced.
pub async fn write_io_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    prepare_io(path).await?;
    let tmp = temp_path(path);
    let file = File::create(&tmp).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).await?;
    writer.flush().await?;
    writer.get_ref().sync_all().await?;
    drop(writer);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let read = read_io_file(&dir.path().join("absent.json")).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state/db.json");
        write_io_file(&path, b"first").await.unwrap();
        write_io_file(&path, b"second").await.unwrap();

        let read = read_io_file(&path).await.unwrap().unwrap();
        assert_eq!(read, b"second");
        assert!(!temp_path(&path).exists());
    }
}
