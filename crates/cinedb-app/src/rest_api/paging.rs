use axum::{
    response::{IntoResponse, Response},
    Json,
};
use cinedb_dal::ListingParams;
use garde::Validate;
use http::{HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

/// Response header with total count of records, name is part of client contract
pub const TOTAL_COUNT_HEADER: &str = "cantidad-total-reistros";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Default, Validate, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[garde(range(min = 1))]
    pagina: Option<u32>,
    #[garde(range(min = 1))]
    registros_por_pagina: Option<u32>,
}

impl Paging {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            pagina: Some(page),
            registros_por_pagina: Some(page_size),
        }
    }

    /// Requested page size, larger sizes are clamped to [`MAX_PAGE_SIZE`]
    pub fn page_size(&self) -> u32 {
        self.registros_por_pagina
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page(&self) -> u32 {
        self.pagina.unwrap_or(1).max(1)
    }

    pub fn into_listing_params(self) -> ListingParams {
        let limit = i64::from(self.page_size());
        let offset = (i64::from(self.page()) - 1) * limit;
        ListingParams { offset, limit }
    }
}

/// One page of records, total count goes to [`TOTAL_COUNT_HEADER`]
#[derive(Debug)]
pub struct Page<T> {
    pub total: u64,
    pub rows: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(total: u64, rows: Vec<T>) -> Self {
        Self { total, rows }
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(
                HeaderName::from_static(TOTAL_COUNT_HEADER),
                HeaderValue::from(self.total),
            )],
            Json(self.rows),
        )
            .into_response()
    }
}
