//! Typed HTTP client for the Muse Mart API.
//!
//! Every call maps to one endpoint under `/api`. Protected calls take the
//! bearer token explicitly; the client holds no session state.
//!
//! ```no_run
//! # async fn demo() -> Result<(), muse_client::ClientError> {
//! let client = muse_client::MuseClient::new("http://localhost:5000")?;
//! let auth = client.login("ada@example.com", "hunter22").await?;
//! let mine = client.my_orders(&auth.token).await?;
//! # Ok(()) }
//! ```

use muse_types::api::{
    AuthResponse, CategoryResponse, CreateProductRequest, ErrorResponse, LoginRequest,
    OrderResponse, PlaceOrderRequest, ProductQuery, ProductResponse, SignupRequest,
    SubCategoryResponse, UpdateOrderStatusRequest, UpdateProductRequest, UserResponse,
};
use muse_types::models::OrderStatus;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors returned by [`MuseClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or an unreadable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Clone)]
pub struct MuseClient {
    client: reqwest::Client,
    base_url: String,
}

impl MuseClient {
    /// Client for a server at `base_url` (scheme, host and port; no `/api`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    // -- Auth --

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<AuthResponse, ClientError> {
        let body = SignupRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            phone: phone.map(str::to_string),
        };
        self.send(self.request(Method::POST, "/auth/signup", None).json(&body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        self.send(self.request(Method::POST, "/auth/login", None).json(&body))
            .await
    }

    pub async fn profile(&self, token: &str) -> Result<UserResponse, ClientError> {
        self.send(self.request(Method::GET, "/profile", Some(token))).await
    }

    // -- Catalog --

    pub async fn create_product(
        &self,
        token: &str,
        product: &CreateProductRequest,
    ) -> Result<ProductResponse, ClientError> {
        self.send_json(Method::POST, "/products", token, product).await
    }

    pub async fn my_products(&self, token: &str) -> Result<Vec<ProductResponse>, ClientError> {
        self.send(self.request(Method::GET, "/my-products", Some(token))).await
    }

    pub async fn update_product(
        &self,
        token: &str,
        product_id: &str,
        patch: &UpdateProductRequest,
    ) -> Result<ProductResponse, ClientError> {
        self.send_json(Method::PUT, &format!("/products/{product_id}"), token, patch)
            .await
    }

    /// Public catalog search; unset filter fields are left off the query string.
    pub async fn list_products(
        &self,
        filter: &ProductQuery,
    ) -> Result<Vec<ProductResponse>, ClientError> {
        self.send(self.request(Method::GET, "/products", None).query(filter))
            .await
    }

    pub async fn get_product(&self, product_id: &str) -> Result<ProductResponse, ClientError> {
        self.send(self.request(Method::GET, &format!("/products/{product_id}"), None))
            .await
    }

    pub async fn categories(&self) -> Result<Vec<CategoryResponse>, ClientError> {
        self.send(self.request(Method::GET, "/categories", None)).await
    }

    pub async fn subcategories(
        &self,
        category_id: &str,
    ) -> Result<Vec<SubCategoryResponse>, ClientError> {
        let path = format!("/categories/{category_id}/subcategories");
        self.send(self.request(Method::GET, &path, None)).await
    }

    // -- Orders --

    pub async fn place_order(
        &self,
        token: &str,
        order: &PlaceOrderRequest,
    ) -> Result<OrderResponse, ClientError> {
        self.send_json(Method::POST, "/orders", token, order).await
    }

    pub async fn my_orders(&self, token: &str) -> Result<Vec<OrderResponse>, ClientError> {
        self.send(self.request(Method::GET, "/my-orders", Some(token))).await
    }

    pub async fn received_orders(&self, token: &str) -> Result<Vec<OrderResponse>, ClientError> {
        self.send(self.request(Method::GET, "/received-orders", Some(token)))
            .await
    }

    pub async fn update_order_status(
        &self,
        token: &str,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<OrderResponse, ClientError> {
        let body = UpdateOrderStatusRequest {
            status: Some(status.as_str().to_string()),
        };
        self.send_json(Method::PATCH, &format!("/orders/{order_id}/status"), token, &body)
            .await
    }

    // -- Plumbing --

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/api{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(method, path, Some(token)).json(body))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Error bodies are `{"message": ...}`; fall back to the raw text.
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.message)
            .unwrap_or(text);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
