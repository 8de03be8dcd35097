//! Backend REST client implementation.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use saverush_core::{CouponId, ProductId};

use super::cache::{CacheValue, product_key};
use super::types::{
    AddToCartRequest, ApiEnvelope, ApplyCouponRequest, CheckoutRequest, CouponPricing,
    LoginRequest, LoginResponse, PlacedOrder, Product, RemoteCart, UpdateCartRequest,
};
use super::{AuthApi, BackendError, CartApi};
use crate::config::BackendConfig;
use crate::models::BearerToken;

/// Maximum number of body characters kept in error messages and logs.
const BODY_SNIPPET_LEN: usize = 200;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the SaveRush backend REST API.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<String, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                base_url: config.api_url.clone(),
                cache,
            }),
        }
    }

    /// Base URL all endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Endpoint for `path` followed by `id` as a single percent-encoded segment.
    fn resource_endpoint(&self, path: &str, id: &str) -> Result<Url, BackendError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(BackendError::InvalidId(id.to_string()));
        }

        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidId(id.to_string()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Send a request to an API-relative path and unwrap the response envelope.
    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        token: Option<&BearerToken>,
        body: Option<&B>,
    ) -> Result<Option<T>, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        self.send(method, url, token, body).await
    }

    async fn send<B, T>(
        &self,
        method: Method,
        url: Url,
        token: Option<&BearerToken>,
        body: Option<&B>,
    ) -> Result<Option<T>, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let path = url.path().to_string();
        let mut request = self.inner.client.request(method.clone(), url);

        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose()));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        debug!(%method, path = %path, status = status.as_u16(), "backend response");

        parse_response(status, &headers, &text)
    }

    /// Like [`Self::request`] but requires the envelope to carry data.
    async fn request_data<B, T>(
        &self,
        method: Method,
        path: &str,
        token: Option<&BearerToken>,
        body: Option<&B>,
    ) -> Result<T, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.request(method, path, token, body)
            .await?
            .ok_or(BackendError::EmptyResponse)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Get a product by id.
    ///
    /// Results are cached for the configured catalog TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let cache_key = product_key(id.as_str());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.resource_endpoint("products/", id.as_str())?;
        let product: Product = self
            .send::<(), _>(Method::GET, url, None, None)
            .await?
            .ok_or(BackendError::EmptyResponse)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Drop every cached catalog entry.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Response handling
// =============================================================================

/// Map an HTTP response to the envelope payload or a [`BackendError`].
fn parse_response<T: DeserializeOwned>(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> Result<Option<T>, BackendError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(BackendError::RateLimited(retry_after));
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(BackendError::Unauthorized);
    }

    if !status.is_success() {
        let message = envelope_message(body).unwrap_or_else(|| snippet(body));
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(message));
        }
        tracing::error!(
            status = %status,
            body = %snippet(body),
            "Backend returned non-success status"
        );
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: ApiEnvelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(
                error = %e,
                body = %snippet(body),
                "Failed to parse backend response"
            );
            return Err(BackendError::Parse(e));
        }
    };

    if !envelope.success {
        return Err(BackendError::Api {
            message: envelope.message.unwrap_or_default(),
        });
    }

    Ok(envelope.data)
}

/// Pull `message` out of an error body, if it is an envelope.
fn envelope_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .filter(|message| !message.is_empty())
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_LEN).collect()
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl CartApi for BackendClient {
    #[instrument(skip(self, token))]
    async fn get_cart(&self, token: &BearerToken) -> Result<RemoteCart, BackendError> {
        Ok(self
            .request::<(), RemoteCart>(Method::GET, "cart", Some(token), None)
            .await?
            .unwrap_or_default())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn add_item(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, BackendError> {
        let body = AddToCartRequest {
            product_id,
            quantity,
            variant_id: None,
        };
        Ok(self
            .request(Method::POST, "cart/add", Some(token), Some(&body))
            .await?
            .unwrap_or_default())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn update_item(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, BackendError> {
        let body = UpdateCartRequest {
            product_id,
            quantity,
        };
        Ok(self
            .request(Method::PUT, "cart/update", Some(token), Some(&body))
            .await?
            .unwrap_or_default())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn remove_item(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
    ) -> Result<RemoteCart, BackendError> {
        let url = self.resource_endpoint("cart/remove/", product_id.as_str())?;
        Ok(self
            .send::<(), RemoteCart>(Method::DELETE, url, Some(token), None)
            .await?
            .unwrap_or_default())
    }

    #[instrument(skip(self, token))]
    async fn clear_cart(&self, token: &BearerToken) -> Result<(), BackendError> {
        self.request::<(), serde_json::Value>(Method::DELETE, "cart/clear", Some(token), None)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token, request))]
    async fn checkout(
        &self,
        token: &BearerToken,
        request: &CheckoutRequest,
    ) -> Result<PlacedOrder, BackendError> {
        self.request_data(Method::POST, "cart/checkout", Some(token), Some(request))
            .await
    }

    #[instrument(skip(self, token), fields(coupon_id = %coupon_id))]
    async fn apply_coupon(
        &self,
        token: &BearerToken,
        coupon_id: &CouponId,
    ) -> Result<CouponPricing, BackendError> {
        let body = ApplyCouponRequest { coupon_id };
        self.request_data(Method::POST, "coupons/apply", Some(token), Some(&body))
            .await
    }

    #[instrument(skip(self, token))]
    async fn remove_coupon(&self, token: &BearerToken) -> Result<CouponPricing, BackendError> {
        self.request_data::<(), _>(Method::POST, "coupons/remove", Some(token), None)
            .await
    }
}

#[async_trait]
impl AuthApi for BackendClient {
    #[instrument(skip(self, id_token))]
    async fn exchange_token(&self, id_token: &SecretString) -> Result<LoginResponse, BackendError> {
        let body = LoginRequest {
            id_token: id_token.expose_secret(),
        };
        self.request_data(Method::POST, "auth/login", None, Some(&body))
            .await
    }
}
