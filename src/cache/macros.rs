/// Read-through caching for catalog calls.
///
/// `$cache` is an `Option<Cache>`. A hit is returned directly. On a miss, or when no
/// cache is configured, the block runs and its value is handed to the background
/// writer. A failed cache read is logged and treated as a miss.
///
/// # Arguments
/// * `$cache`: `Option<Cache>` exposing `get_from_cache` and `set_in_background`.
/// * `$key`: The `CacheKey` for the value.
/// * `$ttl`: Time-to-live in seconds.
/// * `$block`: Future producing `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, CacheKey::Artist(id.to_string()), ARTIST_CACHE_TTL, async move {
///     fetch_artist(id).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.as_ref() {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, using origin");
                    None
                }
            },
            None => None,
        };

        let result: $crate::error::AppResult<_> = match hit {
            Some(hit) => Ok(hit),
            None => {
                let computed: $crate::error::AppResult<_> = $block.await;
                let value = computed?;
                if let Some(cache) = $cache.as_ref() {
                    cache.set_in_background(&key, &value, $ttl);
                }
                Ok(value)
            }
        };
        result
    }};
}
