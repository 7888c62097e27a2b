use crate::{Error, ListingParams, error::Result};
use futures::{StreamExt as _, TryStreamExt as _};
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use time::Date;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateActor {
    pub name: String,
    pub birth_date: Date,
    pub photo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub birth_date: Date,
    /// URL of stored photo
    pub photo: Option<String>,
}

pub type ActorRepository = ActorRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct ActorRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ActorRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Inserts actor, the stored record is returned by the same statement
    pub async fn create(&self, payload: CreateActor) -> Result<Actor> {
        let actor = sqlx::query_as::<_, Actor>(
            "INSERT INTO actor (name, birth_date, photo) VALUES (?, ?, ?) \
             RETURNING id, name, birth_date, photo",
        )
        .bind(&payload.name)
        .bind(payload.birth_date)
        .bind(&payload.photo)
        .fetch_one(&self.executor)
        .await?;
        Ok(actor)
    }

    /// Replaces all fields of the actor
    pub async fn update(&self, id: i64, payload: CreateActor) -> Result<Actor> {
        sqlx::query_as::<_, Actor>(
            "UPDATE actor SET name = ?, birth_date = ?, photo = ? WHERE id = ? \
             RETURNING id, name, birth_date, photo",
        )
        .bind(&payload.name)
        .bind(payload.birth_date)
        .bind(&payload.photo)
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| {
            debug!("No actor updated for id {id}");
            Error::RecordNotFound(format!("Actor {id}"))
        })
    }

    pub async fn count(&self) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM actor")
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    /// Page of actors sorted by name
    pub async fn list(&self, params: ListingParams) -> Result<Vec<Actor>> {
        let records = sqlx::query_as::<_, Actor>(
            "SELECT id, name, birth_date, photo FROM actor ORDER BY name, id LIMIT ? OFFSET ?",
        )
        .bind(params.limit)
        .bind(params.offset)
        .fetch(&self.executor)
        .take(crate::MAX_LIMIT)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(records)
    }

    /// Deletes actor and returns deleted record, so caller can clean up its photo
    pub async fn delete(&self, id: i64) -> Result<Actor> {
        sqlx::query_as::<_, Actor>(
            "DELETE FROM actor WHERE id = ? RETURNING id, name, birth_date, photo",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Actor {id}")))
    }

    pub async fn get(&self, id: i64) -> Result<Actor> {
        sqlx::query_as::<_, Actor>("SELECT id, name, birth_date, photo FROM actor WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("Actor {id}")))
    }
}
