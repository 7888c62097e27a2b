use cinedb_dal::genre::GenreRepository;

use crate::{
    cache::{cache_responses, CacheTag},
    state::AppState,
};
use axum::routing::get;

crate::repository_from_request!(GenreRepository);

pub mod crud_api {
    use super::*;
    use crate::error::{ApiError, ApiResult};
    use crate::rest_api::dto::{CreateGenreDto, GenreDto};
    use crate::rest_api::{Page, Paging};
    use crate::validate::{ApiPath, Garde};
    use axum::{
        extract::{Query, State},
        response::IntoResponse,
        Json,
    };
    use cinedb_dal::genre::CreateGenre;
    use http::{header, StatusCode};
    use tracing::info;

    pub async fn list(
        repository: GenreRepository,
        State(state): State<AppState>,
        Garde(Query(paging)): Garde<Query<Paging>>,
    ) -> ApiResult<impl IntoResponse> {
        let retry = state.retry();
        let total = retry.run(|| repository.count()).await?;
        let params = paging.into_listing_params();
        let genres = retry.run(|| repository.list(params)).await?;
        info!("Listed {} genres of {total}", genres.len());
        let rows: Vec<GenreDto> = genres.into_iter().map(GenreDto::from).collect();
        Ok(Page::new(total, rows))
    }

    pub async fn get(
        ApiPath(id): ApiPath<i64>,
        repository: GenreRepository,
        State(state): State<AppState>,
    ) -> ApiResult<impl IntoResponse> {
        let genre = state.retry().run(|| repository.get(id)).await?;
        info!("Found genre {id}");
        Ok((StatusCode::OK, Json(GenreDto::from(genre))))
    }

    pub async fn create(
        repository: GenreRepository,
        State(state): State<AppState>,
        Garde(Json(payload)): Garde<Json<CreateGenreDto>>,
    ) -> ApiResult<impl IntoResponse> {
        let payload = CreateGenre::from(payload);
        let retry = state.retry();
        if retry
            .run(|| repository.exists_by_name(&payload.name))
            .await?
        {
            return Err(ApiError::Conflict(format!("Genre {}", payload.name)));
        }
        let genre = retry.run(|| repository.create(payload.clone())).await?;
        state.cache().invalidate(CacheTag::Genres);
        info!("Created genre {} with id {}", genre.name, genre.id);

        let location = state.build_url(&format!("api/generos/{}", genre.id))?;
        Ok((
            StatusCode::CREATED,
            [(header::LOCATION, location.to_string())],
            Json(GenreDto::from(genre)),
        ))
    }

    pub async fn update(
        ApiPath(id): ApiPath<i64>,
        repository: GenreRepository,
        State(state): State<AppState>,
        Garde(Json(payload)): Garde<Json<CreateGenreDto>>,
    ) -> ApiResult<impl IntoResponse> {
        let payload = CreateGenre::from(payload);
        state
            .retry()
            .run(|| repository.update(id, payload.clone()))
            .await?;
        state.cache().invalidate(CacheTag::Genres);
        info!("Updated genre {id}");
        Ok(StatusCode::NO_CONTENT)
    }

    pub async fn delete(
        ApiPath(id): ApiPath<i64>,
        repository: GenreRepository,
        State(state): State<AppState>,
    ) -> ApiResult<impl IntoResponse> {
        state.retry().run(|| repository.delete(id)).await?;
        state.cache().invalidate(CacheTag::Genres);
        info!("Deleted genre {id}");
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
            state.cache().tagged(CacheTag::Genres),
            cache_responses,
        ))
}
