//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::info;

/// Ensure the document storage directory exists.
pub async fn ensure_env(documents_dir: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(documents_dir).await.is_err() {
        info!(%documents_dir, "creating document storage directory");
    }
    tokio::fs::create_dir_all(documents_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {documents_dir}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ensure_env;

    #[tokio::test]
    async fn creates_missing_directory() {
        let dir = std::env::temp_dir().join(format!("ff-env-{}", std::process::id())).join("docs");
        let path = dir.to_string_lossy().to_string();
        ensure_env(&path).await.unwrap();
        assert!(tokio::fs::metadata(&path).await.unwrap().is_dir());
        // 再次调用应当幂等
        ensure_env(&path).await.unwrap();
    }
}
