use std::path::Path;

use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tap::TapFallible;
use tokio::sync::broadcast;
use validator::Validate;

use types::domain::{
    Account, AccountUpdate, AuthToken, HairProfile, HairProfileCreate, HairProfileUpdate,
    LoginRequest, RegisterRequest, User,
};
use types::error::ApiError;
use types::scan::{
    HistoryQuery, Ingredient, Product, ProductCreate, ScanByBarcodeRequest,
    ScanByIngredientsRequest, ScanResult,
};

use crate::session::SharedSession;

/// Published whenever the backend rejects the stored credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    Expired,
}

/// Gateway to the scanner REST backend.
///
/// All requests go through one path that attaches the bearer token and, on a
/// `401`, clears the session and publishes [`AuthEvent::Expired`]. Call sites
/// only ever see an [`ApiError`].
#[derive(Clone)]
pub struct Client {
    client: ReqwestClient,
    base_url: String,
    session: SharedSession,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl Client {
    pub fn new(base_url: impl Into<String>, session: SharedSession) -> Self {
        let (auth_events, _) = broadcast::channel(8);
        Self {
            client: ReqwestClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            auth_events,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // auth

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthToken, ApiError> {
        request.validate()?;
        let full_name = request.full_name.clone();
        let token: AuthToken = self
            .send(self.client.post(self.url("/auth/register")).json(&request))
            .await?;
        let mut session = self.session.write().await;
        session.set_token(token.access_token.clone());
        session.set_user(User {
            full_name: Some(full_name),
            ..User::from(&token)
        });
        info!("Registered {}", token.email);
        Ok(token)
    }

    /// Stores the returned token, then loads the full user and hair profile.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthToken, ApiError> {
        request.validate()?;
        let token: AuthToken = self
            .send(self.client.post(self.url("/auth/login")).json(&request))
            .await?;
        {
            let mut session = self.session.write().await;
            session.set_token(token.access_token.clone());
            session.set_user(User::from(&token));
        }
        info!("Logged in as {}", token.email);
        self.rehydrate().await;
        Ok(token)
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.send(self.client.get(self.url("/auth/me"))).await
    }

    pub async fn logout(&self) {
        self.session.write().await.clear();
        info!("Logged out");
    }

    /// Refreshes user and hair profile for a stored token. Both calls run
    /// together and each success is applied on its own, so one failing
    /// half leaves the other in place.
    pub async fn rehydrate(&self) {
        if !self.session.read().await.is_authenticated() {
            return;
        }
        let (user, hair_profile) = tokio::join!(self.me(), self.get_hair_profile());
        let mut session = self.session.write().await;
        if !session.is_authenticated() {
            debug!("Session expired during rehydration");
            return;
        }
        match user {
            Ok(user) => session.set_user(user),
            Err(e) => warn!("Failed to refresh user: {}", e),
        }
        match hair_profile {
            Ok(profile) => session.set_hair_profile(Some(profile)),
            Err(e) => warn!("Failed to refresh hair profile: {}", e),
        }
    }

    // hair profile

    pub async fn create_hair_profile(
        &self,
        request: HairProfileCreate,
    ) -> Result<HairProfile, ApiError> {
        let profile: HairProfile = self
            .send(self.client.post(self.url("/hair-profiles")).json(&request))
            .await?;
        self.session
            .write()
            .await
            .set_hair_profile(Some(profile.clone()));
        Ok(profile)
    }

    pub async fn get_hair_profile(&self) -> Result<HairProfile, ApiError> {
        self.send(self.client.get(self.url("/hair-profiles"))).await
    }

    pub async fn update_hair_profile(
        &self,
        request: HairProfileUpdate,
    ) -> Result<HairProfile, ApiError> {
        let profile: HairProfile = self
            .send(self.client.put(self.url("/hair-profiles")).json(&request))
            .await?;
        self.session
            .write()
            .await
            .set_hair_profile(Some(profile.clone()));
        Ok(profile)
    }

    pub async fn delete_hair_profile(&self) -> Result<(), ApiError> {
        self.send_empty(self.client.delete(self.url("/hair-profiles")))
            .await?;
        self.session.write().await.set_hair_profile(None);
        Ok(())
    }

    // scans

    pub async fn scan_by_ingredients(
        &self,
        request: ScanByIngredientsRequest,
    ) -> Result<ScanResult, ApiError> {
        request.validate()?;
        self.send(
            self.client
                .post(self.url("/scans/ingredients"))
                .json(&request),
        )
        .await
    }

    pub async fn scan_by_barcode(
        &self,
        request: ScanByBarcodeRequest,
    ) -> Result<ScanResult, ApiError> {
        request.validate()?;
        self.send(self.client.post(self.url("/scans/barcode")).json(&request))
            .await
    }

    /// Uploads a photo of an ingredient label for server-side OCR.
    pub async fn scan_by_image(&self, path: &Path) -> Result<ScanResult, ApiError> {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::IMAGE {
            return Err(ApiError::validation(format!(
                "{} is not an image",
                path.display()
            )));
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::validation(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "label".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| ApiError::validation(e.to_string()))?;
        self.send(
            self.client
                .post(self.url("/scans/image"))
                .multipart(Form::new().part("file", part)),
        )
        .await
    }

    pub async fn scan_history(&self, query: HistoryQuery) -> Result<Vec<ScanResult>, ApiError> {
        self.send(self.client.get(self.url("/scans/history")).query(&query))
            .await
    }

    pub async fn get_scan(&self, scan_id: &str) -> Result<ScanResult, ApiError> {
        let path = format!("/scans/{}", urlencoding::encode(scan_id));
        self.send(self.client.get(self.url(&path))).await
    }

    pub async fn delete_scan(&self, scan_id: &str) -> Result<(), ApiError> {
        let path = format!("/scans/{}", urlencoding::encode(scan_id));
        self.send_empty(self.client.delete(self.url(&path))).await
    }

    // products

    pub async fn create_product(&self, request: ProductCreate) -> Result<Product, ApiError> {
        request.validate()?;
        self.send(self.client.post(self.url("/products")).json(&request))
            .await
    }

    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        self.send(
            self.client
                .get(self.url("/products/search"))
                .query(&[("q", query)]),
        )
        .await
    }

    pub async fn product_by_barcode(&self, barcode: &str) -> Result<Product, ApiError> {
        let path = format!("/products/barcode/{}", urlencoding::encode(barcode));
        self.send(self.client.get(self.url(&path))).await
    }

    pub async fn get_product(&self, product_id: &str) -> Result<Product, ApiError> {
        let path = format!("/products/{}", urlencoding::encode(product_id));
        self.send(self.client.get(self.url(&path))).await
    }

    // ingredients

    pub async fn search_ingredients(&self, query: &str) -> Result<Vec<Ingredient>, ApiError> {
        self.send(
            self.client
                .get(self.url("/ingredients/search"))
                .query(&[("q", query)]),
        )
        .await
    }

    pub async fn get_ingredient(&self, name: &str) -> Result<Ingredient, ApiError> {
        let path = format!("/ingredients/{}", urlencoding::encode(name));
        self.send(self.client.get(self.url(&path))).await
    }

    pub async fn list_ingredients(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<Ingredient>, ApiError> {
        let mut request = self.client.get(self.url("/ingredients"));
        if let Some(category) = category {
            request = request.query(&[("category", category)]);
        }
        self.send(request).await
    }

    // account

    pub async fn get_account(&self) -> Result<Account, ApiError> {
        self.send(self.client.get(self.url("/users/profile"))).await
    }

    pub async fn update_account(&self, request: AccountUpdate) -> Result<Account, ApiError> {
        request.validate()?;
        let account: Account = self
            .send(self.client.put(self.url("/users/profile")).json(&request))
            .await?;
        let mut session = self.session.write().await;
        if let Some(user) = session.user().cloned() {
            session.set_user(User {
                email: account.email.clone(),
                full_name: Some(account.full_name.clone()),
                ..user
            });
        }
        Ok(account)
    }

    // transport

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .tap_err(|e| warn!("Failed to decode response: {}", e))
            .map_err(|e| ApiError::decode(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, mut request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.session.read().await.token().map(str::to_owned);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .tap_err(|e| warn!("Request failed: {}", e))
            .map_err(|e| ApiError::network(e.to_string()))?;

        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_response(status.as_u16(), status.canonical_reason(), &body);
        if status == StatusCode::UNAUTHORIZED {
            self.expire_session().await;
        }
        Err(error)
    }

    async fn expire_session(&self) {
        warn!("Backend rejected credentials, clearing session");
        self.session.write().await.clear();
        // no subscribers just means no screen is listening yet
        let _ = self.auth_events.send(AuthEvent::Expired);
    }
}
