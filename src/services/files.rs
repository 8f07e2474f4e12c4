use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::FileRepository;

pub struct FileService {
    files: Arc<dyn FileRepository>,
}

impl FileService {
    pub fn new(files: Arc<dyn FileRepository>) -> Self {
        Self { files }
    }

    /// Remove an uploaded file. Refused while any print job still points at it.
    pub async fn delete_file(&self, user_id: Uuid, file_id: Uuid) -> AppResult<()> {
        let file = self
            .files
            .find_file(file_id)
            .await?
            .filter(|f| f.user_id == user_id)
            .ok_or_else(|| AppError::not_found("File", file_id))?;

        if self.files.is_referenced(file.id).await? {
            warn!(file_id = %file.id, "Refusing to delete file referenced by a print job");
            return Err(AppError::Conflict(format!(
                "File {} is used by a print job and cannot be deleted",
                file.id
            )));
        }

        self.files.delete_file(file.id).await?;
        info!(file_id = %file.id, user_id = %user_id, "File deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoredFile};
    use chrono::Utc;

    fn file(user_id: Uuid) -> StoredFile {
        StoredFile {
            id: Uuid::new_v4(),
            user_id,
            filename: "thesis.pdf".to_string(),
            url: "https://files.example/thesis.pdf".to_string(),
            pages: 12,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_delete_unreferenced_file() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let stored = file(user);
        store.insert_file(&stored).await.unwrap();

        let service = FileService::new(store.clone());
        service.delete_file(user, stored.id).await.unwrap();

        assert!(store.find_file(stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_other_users_file_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let stored = file(Uuid::new_v4());
        store.insert_file(&stored).await.unwrap();

        let service = FileService::new(store.clone());
        let err = service.delete_file(Uuid::new_v4(), stored.id).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.find_file(stored.id).await.unwrap().is_some());
    }
}
