use cinedb_dal::actor::ActorRepository;
use cinedb_store::{FileStorage as _, StorageBackend, ACTORS_CONTAINER};
use tracing::{debug, error};

use crate::{
    cache::{cache_responses, CacheTag},
    retry::RetryPolicy,
    state::AppState,
};
use axum::routing::get;

crate::repository_from_request!(ActorRepository);

/// Removes stored photo, actor without photo does not touch the storage
async fn delete_photo(
    storage: &StorageBackend,
    retry: &RetryPolicy,
    photo: Option<&str>,
) -> Result<(), cinedb_store::error::StoreError> {
    match photo {
        Some(reference) => {
            retry
                .run(|| storage.delete(Some(reference), ACTORS_CONTAINER))
                .await
        }
        None => {
            debug!("Actor has no photo");
            Ok(())
        }
    }
}

pub mod crud_api {
    use super::*;
    use crate::error::ApiResult;
    use crate::rest_api::dto::{ActorDto, ActorForm};
    use crate::rest_api::{Page, Paging};
    use crate::validate::{ApiPath, Garde};
    use axum::{
        extract::{Query, State},
        response::IntoResponse,
        Json,
    };
    use cinedb_store::FileStorage as _;
    use http::StatusCode;
    use tracing::{info, warn};

    pub async fn list(
        repository: ActorRepository,
        State(state): State<AppState>,
        Garde(Query(paging)): Garde<Query<Paging>>,
    ) -> ApiResult<impl IntoResponse> {
        let retry = state.retry();
        retry.run(|| cinedb_dal::ping(state.pool())).await?;
        let total = retry.run(|| repository.count()).await?;
        let params = paging.into_listing_params();
        let actors = retry.run(|| repository.list(params)).await?;
        info!("Listed {} actors of {total}", actors.len());
        let rows: Vec<ActorDto> = actors.into_iter().map(ActorDto::from).collect();
        Ok(Page::new(total, rows))
    }

    pub async fn get(
        ApiPath(id): ApiPath<i64>,
        repository: ActorRepository,
        State(state): State<AppState>,
    ) -> ApiResult<impl IntoResponse> {
        let actor = state.retry().run(|| repository.get(id)).await?;
        info!("Found actor {id}");
        Ok((StatusCode::OK, Json(ActorDto::from(actor))))
    }

    pub async fn create(
        repository: ActorRepository,
        State(state): State<AppState>,
        form: ActorForm,
    ) -> ApiResult<impl IntoResponse> {
        let retry = state.retry();
        let storage = state.storage();
        let photo = match &form.foto {
            Some(file) => Some(retry.run(|| storage.store(ACTORS_CONTAINER, file)).await?),
            None => None,
        };
        let payload = form.to_entity(photo.clone())?;
        let actor = match retry.run(|| repository.create(payload.clone())).await {
            Ok(actor) => actor,
            Err(e) => {
                if let Err(cleanup) = delete_photo(storage, retry, photo.as_deref()).await {
                    error!("Failed to remove photo of actor not created: {cleanup}");
                }
                return Err(e.into());
            }
        };
        state.cache().invalidate(CacheTag::Actors);
        info!("Created actor {} with id {}", actor.name, actor.id);
        Ok(StatusCode::NO_CONTENT)
    }

    pub async fn update(
        ApiPath(id): ApiPath<i64>,
        repository: ActorRepository,
        State(state): State<AppState>,
        form: ActorForm,
    ) -> ApiResult<impl IntoResponse> {
        let retry = state.retry();
        let actor = retry.run(|| repository.get(id)).await?;
        let photo = match &form.foto {
            Some(file) => Some(
                retry
                    .run(|| {
                        state
                            .storage()
                            .edit(actor.photo.as_deref(), ACTORS_CONTAINER, file)
                    })
                    .await?,
            ),
            None => actor.photo,
        };
        let payload = form.to_entity(photo)?;
        retry
            .run(|| repository.update(id, payload.clone()))
            .await?;
        state.cache().invalidate(CacheTag::Actors);
        info!("Updated actor {id}");
        Ok(StatusCode::NO_CONTENT)
    }

    pub async fn delete(
        ApiPath(id): ApiPath<i64>,
        repository: ActorRepository,
        State(state): State<AppState>,
    ) -> ApiResult<impl IntoResponse> {
        let retry = state.retry();
        let actor = retry.run(|| repository.delete(id)).await?;
        state.cache().invalidate(CacheTag::Actors);
        // record is deleted already, failed photo removal is only logged
        if let Err(e) = delete_photo(state.storage(), retry, actor.photo.as_deref()).await {
            warn!("Photo of deleted actor {id} was not removed: {e}");
        }
        info!("Deleted actor {id}");
        Ok(StatusCode::NO_CONTENT)
    }
}

pub fn router(state: &AppState) -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route(
            "/{id}",
            get(crud_api::get)
                .put(crud_api::update)
                .delete(crud_api::delete),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.cache().tagged(CacheTag::Actors),
            cache_responses,
        ))
}
