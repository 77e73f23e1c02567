// ── Detail fetcher boundary ──
//
// The engine talks to the backend only through `CatalogBackend`, so tests
// (and alternative transports) can stand in for the HTTP client.

use futures_util::future::BoxFuture;
use s3view_api::{BackendClient, ImageRecord, StaticInfo, SummaryRecord, TimeRange};
use url::Url;

use crate::error::CoreError;
use crate::model::ObjectKey;

pub trait CatalogBackend: Send + Sync + 'static {
    /// Every summary, optionally bounded by modification time.
    fn fetch_summaries(
        &self,
        range: Option<TimeRange>,
    ) -> BoxFuture<'_, Result<Vec<SummaryRecord>, CoreError>>;

    /// Authoritative record for one image.
    fn fetch_detail<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<ImageRecord, CoreError>>;

    /// Browsable URL for a backend cache key.
    fn resolve_cache_key(&self, cache_key: &str) -> Option<Url>;

    /// Notification endpoint, if this backend has one.
    fn notification_url(&self) -> Option<Url> {
        None
    }

    /// Deployment metadata.
    fn fetch_static_info(&self) -> BoxFuture<'_, Result<StaticInfo, CoreError>> {
        Box::pin(async {
            Err(CoreError::Internal(
                "backend does not serve deployment info".into(),
            ))
        })
    }
}

impl CatalogBackend for BackendClient {
    fn fetch_summaries(
        &self,
        range: Option<TimeRange>,
    ) -> BoxFuture<'_, Result<Vec<SummaryRecord>, CoreError>> {
        Box::pin(async move { Ok(self.all_image_summaries(range).await?) })
    }

    fn fetch_detail<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<ImageRecord, CoreError>> {
        Box::pin(async move { Ok(self.image(key.bucket(), key.key()).await?) })
    }

    fn resolve_cache_key(&self, cache_key: &str) -> Option<Url> {
        self.cache_url(cache_key).ok()
    }

    fn notification_url(&self) -> Option<Url> {
        self.ws_url().ok()
    }

    fn fetch_static_info(&self) -> BoxFuture<'_, Result<StaticInfo, CoreError>> {
        Box::pin(async move { Ok(self.static_info().await?) })
    }
}
