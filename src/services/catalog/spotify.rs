//! Spotify Web API catalog
//!
//! Implements both ports against the public Web API:
//! 1. Search: /search?type=track → simplified tracks
//! 2. Lookup: /tracks/{id}, then /artists/{id} for the primary artist's genres
//! 3. Batch lookup: /tracks?ids=, in groups of at most 50 ids
//!
//! Responses are cached in Redis when a cache is configured and the request names a
//! concrete market. `from_token` results depend on the caller, so they bypass the cache.
use crate::{
    cache::{Cache, CacheKey},
    cached,
    error::{AppError, AppResult},
    models::{
        Artist, SpotifyErrorResponse, SpotifySearchResponse, SpotifyTracksResponse, Track,
    },
    services::catalog::{CatalogContext, CatalogLookup, CatalogSearch, SearchRequest},
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const TRACK_CACHE_TTL: u64 = 86400; // 1 day
const ARTIST_CACHE_TTL: u64 = 86400; // 1 day

/// Largest page the search endpoint serves
pub const MAX_SEARCH_LIMIT: u32 = 50;

/// Most ids one /tracks call accepts
const MAX_BATCH_IDS: usize = 50;

#[derive(Clone)]
pub struct SpotifyCatalog {
    http_client: HttpClient,
    api_url: String,
    cache: Option<Cache>,
}

impl SpotifyCatalog {
    pub fn new(api_url: String, cache: Option<Cache>, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// Authenticated GET that maps non-2xx statuses onto `AppError`
    async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &CatalogContext,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&ctx.access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        Ok(response.json().await?)
    }

    /// Cache usable for market-dependent responses of this request
    fn market_cache(&self, ctx: &CatalogContext) -> Option<Cache> {
        if ctx.has_concrete_market() {
            self.cache.clone()
        } else {
            None
        }
    }

    async fn fetch_artist(&self, ctx: &CatalogContext, artist_id: &str) -> AppResult<Artist> {
        cached!(
            self.cache,
            CacheKey::Artist(artist_id.to_string()),
            ARTIST_CACHE_TTL,
            async move {
                let path = format!("/artists/{}", artist_id);
                let artist: Artist = self.get_json(ctx, &path, &[]).await?;
                Ok(artist)
            }
        )
    }
}

/// Maps a failed Web API response to the matching error variant
fn error_for_status(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<SpotifyErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited(message),
        _ => AppError::ExternalApi(format!(
            "Spotify API returned status {}: {}",
            status, message
        )),
    }
}

#[async_trait::async_trait]
impl CatalogSearch for SpotifyCatalog {
    async fn search_items(
        &self,
        ctx: &CatalogContext,
        request: &SearchRequest,
    ) -> AppResult<Vec<Track>> {
        if request.query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let limit = request.limit.clamp(1, MAX_SEARCH_LIMIT);
        let cache = self.market_cache(ctx);

        cached!(
            cache,
            CacheKey::Search {
                query: request.query.clone(),
                region: ctx.region.clone(),
                limit,
            },
            SEARCH_CACHE_TTL,
            async move {
                let limit_param = limit.to_string();
                let item_type = request.item_type.to_string();

                let response: SpotifySearchResponse = self
                    .get_json(
                        ctx,
                        "/search",
                        &[
                            ("q", request.query.as_str()),
                            ("type", item_type.as_str()),
                            ("limit", limit_param.as_str()),
                            ("market", ctx.region.as_str()),
                        ],
                    )
                    .await?;

                let tracks: Vec<Track> = response
                    .tracks
                    .map(|page| page.items.into_iter().flatten().collect())
                    .unwrap_or_default();

                tracing::debug!(
                    query = %request.query,
                    limit,
                    results = tracks.len(),
                    provider = "spotify",
                    "Track search completed"
                );

                Ok(tracks)
            }
        )
    }
}

#[async_trait::async_trait]
impl CatalogLookup for SpotifyCatalog {
    async fn get_track(&self, ctx: &CatalogContext, id: &str) -> AppResult<Track> {
        if id.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Track id cannot be empty".to_string(),
            ));
        }

        let cache = self.market_cache(ctx);
        let mut track: Track = cached!(
            cache,
            CacheKey::Track {
                id: id.to_string(),
                region: ctx.region.clone(),
            },
            TRACK_CACHE_TTL,
            async move {
                let path = format!("/tracks/{}", id);
                let track: Track = self
                    .get_json(ctx, &path, &[("market", ctx.region.as_str())])
                    .await?;
                Ok(track)
            }
        )?;

        // Genres only live on the full artist object
        if let Some(primary) = track.artists.first_mut() {
            if primary.genres.is_none() {
                match self.fetch_artist(ctx, &primary.id).await {
                    Ok(artist) => primary.genres = artist.genres,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            artist_id = %primary.id,
                            "Artist lookup failed, continuing without genres"
                        );
                    }
                }
            }
        }

        Ok(track)
    }

    async fn get_tracks(&self, ctx: &CatalogContext, ids: &[String]) -> AppResult<Vec<Track>> {
        let batches = id_batches(ids);
        if batches.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one track id is required".to_string(),
            ));
        }

        let mut tracks = Vec::with_capacity(ids.len());
        for batch in &batches {
            let response: SpotifyTracksResponse = self
                .get_json(
                    ctx,
                    "/tracks",
                    &[("ids", batch.as_str()), ("market", ctx.region.as_str())],
                )
                .await?;
            tracks.extend(response.tracks.into_iter().flatten());
        }

        tracing::debug!(
            requested = ids.len(),
            found = tracks.len(),
            batches = batches.len(),
            "Batch track lookup completed"
        );

        Ok(tracks)
    }
}

/// Comma-joined `ids` parameters, blank ids dropped, at most `MAX_BATCH_IDS` per call
fn id_batches(ids: &[String]) -> Vec<String> {
    let ids: Vec<&str> = ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    ids.chunks(MAX_BATCH_IDS)
        .map(|chunk| chunk.join(","))
        .collect()
}
