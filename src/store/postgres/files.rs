use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{to_i32, to_u32, PgStore};
use crate::store::{FileRepository, StoredFile};

#[derive(sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    user_id: Uuid,
    filename: String,
    url: String,
    pages: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<FileRow> for StoredFile {
    type Error = anyhow::Error;

    fn try_from(row: FileRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            filename: row.filename,
            url: row.url,
            pages: to_u32(row.pages, "pages")?,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl FileRepository for PgStore {
    async fn find_file(&self, id: Uuid) -> Result<Option<StoredFile>> {
        let row = sqlx::query_as::<_, FileRow>(
            "SELECT id, user_id, filename, url, pages, created_at FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredFile::try_from).transpose()
    }

    async fn insert_file(&self, file: &StoredFile) -> Result<()> {
        sqlx::query(
            "INSERT INTO files (id, user_id, filename, url, pages, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(file.id)
        .bind(file.user_id)
        .bind(&file.filename)
        .bind(&file.url)
        .bind(to_i32(file.pages, "pages")?)
        .bind(file.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_referenced(&self, id: Uuid) -> Result<bool> {
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM print_jobs WHERE file_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(referenced)
    }

    async fn delete_file(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
