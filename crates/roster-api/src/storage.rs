use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

/// On-disk store for uploaded artifacts.
///
/// Each artifact is a flat file at `{dir}/{key}` where `key` is a server
/// generated UUID. Client filenames never reach the filesystem.
pub struct ArtifactStore {
    dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub key: String,
    pub size: i64,
    pub sha256: String,
}

impl ArtifactStore {
    pub async fn new(dir: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Artifact storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Write a new artifact and return its key and digest.
    pub async fn put(&self, data: &[u8]) -> std::io::Result<StoredArtifact> {
        let key = Uuid::new_v4().to_string();
        let sha256 = hex::encode(Sha256::digest(data));

        let mut file = fs::File::create(self.path(&key)).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(StoredArtifact {
            key,
            size: data.len() as i64,
            sha256,
        })
    }

    pub async fn read(&self, key: &str) -> std::io::Result<Vec<u8>> {
        if key.parse::<Uuid>().is_err() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("malformed artifact key '{}'", key),
            ));
        }
        fs::read(self.path(key)).await
    }

    pub async fn delete(&self, key: &str) -> std::io::Result<()> {
        match fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Artifact {} already gone", key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Reduce a client-supplied filename to a safe display name: path
/// components dropped, only `[A-Za-z0-9._-]` kept, no leading dots.
/// Returns `None` when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.chars().take(200).collect())
    }
}
