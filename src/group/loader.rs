//! Data Loader
//!
//! The capability a group calls on a cache miss to produce a value.

use async_trait::async_trait;

use crate::error::Result;

// == Loader ==
/// Source of truth for a group's values.
///
/// Must behave as a pure function of `key` from the cache's point of view:
/// concurrent calls for one key are collapsed into one, and a key may be
/// loaded again after it is evicted.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<u8>>;
}

// == Loader Fn ==
/// Adapts a synchronous closure into a [`Loader`].
pub struct LoaderFn<F>(pub F);

#[async_trait]
impl<F> Loader for LoaderFn<F>
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    async fn load(&self, key: &str) -> Result<Vec<u8>> {
        (self.0)(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[tokio::test]
    async fn test_loader_fn() {
        let loader = LoaderFn(|key: &str| {
            if key == "Tom" {
                Ok(b"630".to_vec())
            } else {
                Err(CacheError::KeyNotFound(key.to_string()))
            }
        });

        assert_eq!(loader.load("Tom").await, Ok(b"630".to_vec()));
        assert_eq!(
            loader.load("Sam").await,
            Err(CacheError::KeyNotFound("Sam".to_string()))
        );
    }
}
