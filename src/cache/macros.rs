/// A macro to simplify read-through caching using Redis.
///
/// Checks the cache for `$key`. On a hit the cached value is returned. On a
/// miss the provided future is awaited, its value is queued for a background
/// cache write, and the value is returned. A failed cache read is logged and
/// treated as a miss, so the cache can never be the reason a lookup fails.
///
/// # Arguments
/// * `$cache`: The cache instance. Must have `get_from_cache` and `set_in_background` methods.
/// * `$key`: The key to use for caching the value.
/// * `$ttl`: The time-to-live (TTL) for the cached value in seconds.
/// * `$block`: The future to await if the value is not found in cache. Its error
///   type must match the error type of the enclosing function.
///
/// # Example
/// ```ignore
/// let details = cached!(self.cache, CacheKey::MovieDetails(movie_id), TTL, async move {
///     fetch_details_from_api(movie_id).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) => Ok(cached),
            lookup => {
                if let Err(e) = lookup {
                    ::tracing::warn!(error = %e, key = %$key, "Cache read failed, treating as miss");
                }
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
