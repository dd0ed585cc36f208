use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use reelgrab_core::models::media::MediaRequest;

use crate::core::error::FetchError;
use crate::core::filename::{media_file_name, sanitize_path_component};

/// Hands out destination paths under `<root>/<scope>/`. Directory creation is
/// serialized; names carry a random id plus a nanosecond stamp so concurrent
/// requests never collide, even for the same scope.
#[derive(Debug, Clone)]
pub struct WorkspaceAllocator {
    root: PathBuf,
    dir_lock: Arc<Mutex<()>>,
}

impl WorkspaceAllocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dir_lock: Arc::new(Mutex::new(())),
        }
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn scope_dir(&self, scope: &str) -> PathBuf {
        self.root.join(sanitize_path_component(scope))
    }

    pub async fn allocate(&self, request: &MediaRequest) -> Result<PathBuf, FetchError> {
        let dir = self.scope_dir(request.scope());
        {
            let _guard = self.dir_lock.lock().await;
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| FetchError::io(&dir, e))?;
        }

        let unique = uuid::Uuid::new_v4().simple().to_string();
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_micros() * 1000);
        let name = media_file_name(
            request.platform().as_str(),
            request.scope(),
            &unique,
            nanos,
            "mp4",
        );
        let path = dir.join(name);
        tracing::debug!("[workspace] allocated {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn request(scope: &str) -> MediaRequest {
        MediaRequest::new("https://www.instagram.com/reel/Cabc123/", scope).unwrap()
    }

    #[tokio::test]
    async fn allocates_inside_scope_dir() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = WorkspaceAllocator::new(dir.path());

        let path = alloc.allocate(&request("42")).await.unwrap();
        assert_eq!(path.parent().unwrap(), dir.path().join("42"));
        assert!(dir.path().join("42").is_dir());

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("instagram_42_"));
        assert!(name.ends_with(".mp4"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn hostile_scope_stays_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = WorkspaceAllocator::new(dir.path());

        let path = alloc.allocate(&request("../../outside")).await.unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.parent().unwrap().parent().unwrap(), dir.path());
    }

    #[tokio::test]
    async fn concurrent_same_scope_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = WorkspaceAllocator::new(dir.path());

        let mut handles = Vec::new();
        for _ in 0..64 {
            let alloc = alloc.clone();
            handles.push(tokio::spawn(async move {
                alloc.allocate(&request("shared")).await.unwrap()
            }));
        }

        let mut seen = HashSet::new();
        for h in handles {
            assert!(seen.insert(h.await.unwrap()));
        }
        assert_eq!(seen.len(), 64);
    }

    #[tokio::test]
    async fn concurrent_distinct_scopes_create_their_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = WorkspaceAllocator::new(dir.path());

        let mut handles = Vec::new();
        for i in 0..8 {
            let alloc = alloc.clone();
            handles.push(tokio::spawn(async move {
                alloc.allocate(&request(&format!("scope{i}"))).await.unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        for i in 0..8 {
            assert!(dir.path().join(format!("scope{i}")).is_dir());
        }
    }

    #[tokio::test]
    async fn unwritable_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let alloc = WorkspaceAllocator::new(&blocker);

        let err = alloc.allocate(&request("1")).await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }
}
