use crate::{Error, ListingParams, error::Result};
use cinedb_types::general::name_key;
use futures::{StreamExt as _, TryStreamExt as _};
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGenre {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

pub type GenreRepository = GenreRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct GenreRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> GenreRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Inserts genre, the stored record is returned by the same statement
    pub async fn create(&self, payload: CreateGenre) -> Result<Genre> {
        sqlx::query_as::<_, Genre>(
            "INSERT INTO genre (name, name_key) VALUES (?, ?) RETURNING id, name",
        )
        .bind(&payload.name)
        .bind(name_key(&payload.name))
        .fetch_one(&self.executor)
        .await
        .map_err(|e| Error::unique_as_conflict(e, format!("Genre {}", payload.name)))
    }

    pub async fn update(&self, id: i64, payload: CreateGenre) -> Result<Genre> {
        sqlx::query_as::<_, Genre>(
            "UPDATE genre SET name = ?, name_key = ? WHERE id = ? RETURNING id, name",
        )
        .bind(&payload.name)
        .bind(name_key(&payload.name))
        .bind(id)
        .fetch_optional(&self.executor)
        .await
        .map_err(|e| Error::unique_as_conflict(e, format!("Genre {}", payload.name)))?
        .ok_or_else(|| {
            debug!("No genre updated for id {id}");
            Error::RecordNotFound(format!("Genre {id}"))
        })
    }

    /// Case insensitive lookup of the name
    pub async fn exists_by_name(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM genre WHERE name_key = ?")
            .bind(name_key(name))
            .fetch_optional(&self.executor)
            .await?;
        Ok(found.is_some())
    }

    pub async fn count(&self) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM genre")
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    /// Page of genres sorted by name
    pub async fn list(&self, params: ListingParams) -> Result<Vec<Genre>> {
        let records = sqlx::query_as::<_, Genre>(
            "SELECT id, name FROM genre ORDER BY name, id LIMIT ? OFFSET ?",
        )
        .bind(params.limit)
        .bind(params.offset)
        .fetch(&self.executor)
        .take(crate::MAX_LIMIT)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(records)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM genre WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("Genre {id}")))
        } else {
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<Genre> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genre WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("Genre {id}")))
    }
}
