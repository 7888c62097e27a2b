//! Short lived cache of GET responses, invalidated by resource kind.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use dashmap::DashMap;
use http::{HeaderMap, Method, StatusCode};
use tokio::time::Instant;
use tracing::{debug, error};

/// Cached responses are larger than this only by mistake
const MAX_CACHED_BODY: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Actors,
    Genres,
}

const TAGS_COUNT: usize = 2;

impl CacheTag {
    fn index(self) -> usize {
        match self {
            CacheTag::Actors => 0,
            CacheTag::Genres => 1,
        }
    }
}

struct CachedResponse {
    tag: CacheTag,
    headers: HeaderMap,
    body: Bytes,
    expires: Instant,
}

struct OutputCacheInner {
    entries: DashMap<String, CachedResponse>,
    /// bumped on each invalidation, so responses computed before it are not stored
    generations: [AtomicU64; TAGS_COUNT],
    ttl: Duration,
}

#[derive(Clone)]
pub struct OutputCache {
    inner: Arc<OutputCacheInner>,
}

impl OutputCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(OutputCacheInner {
                entries: DashMap::new(),
                generations: Default::default(),
                ttl,
            }),
        }
    }

    fn generation(&self, tag: CacheTag) -> u64 {
        self.inner.generations[tag.index()].load(Ordering::Acquire)
    }

    fn lookup(&self, key: &str) -> Option<Response> {
        let hit = match self.inner.entries.get(key) {
            Some(entry) if entry.expires > Instant::now() => {
                let mut response = Response::new(Body::from(entry.body.clone()));
                *response.headers_mut() = entry.headers.clone();
                Some(response)
            }
            Some(_) => None,
            None => return None,
        };
        if hit.is_none() {
            self.inner
                .entries
                .remove_if(key, |_, entry| entry.expires <= Instant::now());
        }
        hit
    }

    fn store(&self, key: String, tag: CacheTag, generation: u64, headers: HeaderMap, body: Bytes) {
        if self.generation(tag) != generation {
            debug!("Not caching {key}, {tag:?} changed meanwhile");
            return;
        }
        self.inner.entries.insert(
            key,
            CachedResponse {
                tag,
                headers,
                body,
                expires: Instant::now() + self.inner.ttl,
            },
        );
    }

    /// Evicts all cached responses of given resource kind
    pub fn invalidate(&self, tag: CacheTag) {
        self.inner.generations[tag.index()].fetch_add(1, Ordering::AcqRel);
        self.inner.entries.retain(|_, entry| entry.tag != tag);
        debug!("Invalidated cache for {tag:?}");
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// State for [`cache_responses`] middleware
    pub fn tagged(&self, tag: CacheTag) -> TaggedCache {
        TaggedCache {
            cache: self.clone(),
            tag,
        }
    }
}

#[derive(Clone)]
pub struct TaggedCache {
    cache: OutputCache,
    tag: CacheTag,
}

/// Full path and query as requested by client.
///
/// Nested routers see the uri with their prefix stripped, so the original uri
/// is preferred.
fn cache_key(tag: CacheTag, request: &Request) -> String {
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or_else(|| request.uri());
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{tag:?}:{path}")
}

/// Middleware serving GET requests from cache and storing successful responses
pub async fn cache_responses(
    State(TaggedCache { cache, tag }): State<TaggedCache>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }
    let key = cache_key(tag, &request);
    if let Some(response) = cache.lookup(&key) {
        debug!("Cache hit for {key}");
        return response;
    }

    let generation = cache.generation(tag);
    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }
    let (parts, body) = response.into_parts();
    match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(body) => {
            cache.store(key, tag, generation, parts.headers.clone(), body.clone());
            Response::from_parts(parts, Body::from(body))
        }
        Err(e) => {
            error!("Failed to read response body for cache: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
