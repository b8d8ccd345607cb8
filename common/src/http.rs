//! HTTP実装（reqwest、ネイティブ/wasm共通）

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::GatewayError;
use crate::gateway::{op, require, ApiRoutes, BackendGateway};
use crate::types::{
    ChatReply, KnowledgeGraph, PhotoListing, Ping, ProfileEntry, ReviewReply, SelectionReceipt,
    UploadFile, UploadReceipt,
};

/// reqwestによるBackendGateway
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    routes: ApiRoutes,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, routes: ApiRoutes) -> Self {
        Self::with_client(Client::new(), base_url, routes)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, routes: ApiRoutes) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            routes,
        }
    }

    /// リクエストタイムアウト付き（wasmではブラウザ側に任せる）
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_timeout(
        base_url: impl Into<String>,
        routes: ApiRoutes,
        timeout: std::time::Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::transport("client", e.to_string()))?;
        Ok(Self::with_client(client, base_url, routes))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn profiles_url(&self, path: &str) -> String {
        ApiRoutes::join(&self.base_url, &self.routes.profiles, path)
    }

    fn photos_url(&self, path: &str) -> String {
        ApiRoutes::join(&self.base_url, &self.routes.photos, path)
    }

    fn assistant_url(&self, path: &str) -> String {
        ApiRoutes::join(&self.base_url, &self.routes.assistant, path)
    }

    /// プロフィール名はパスの1セグメントとしてエスケープする
    fn graph_url(&self, profile: &str) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&ApiRoutes::join(&self.base_url, &self.routes.graph, ""))
            .map_err(|e| GatewayError::transport(op::FETCH_GRAPH, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::transport(op::FETCH_GRAPH, "base URL cannot have a path"))?
            .pop_if_empty()
            .push(profile);
        Ok(url)
    }

    /// 送信して非2xxを型付きエラーへ変換
    ///
    /// 失敗時のボディは自由形式なので、パースせず文字列として保持する。
    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response, GatewayError> {
        tracing::debug!(operation, "backend request");

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::transport(operation, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(operation, status = status.as_u16(), "backend rejected request");
            return Err(GatewayError::status(operation, status.as_u16(), body));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| GatewayError::decode(operation, e.to_string()))
    }
}

#[async_trait(?Send)]
impl BackendGateway for HttpGateway {
    async fn list_profiles(&self) -> Result<Vec<ProfileEntry>, GatewayError> {
        let request = self.client.get(self.profiles_url("list"));
        self.send_json(op::LIST_PROFILES, request).await
    }

    async fn create_profile(&self, name: &str) -> Result<(), GatewayError> {
        require(op::CREATE_PROFILE, "name", name)?;
        let request = self.client.post(self.profiles_url("create")).query(&[("name", name)]);
        self.send(op::CREATE_PROFILE, request).await.map(|_| ())
    }

    async fn delete_profile(&self, name: &str) -> Result<(), GatewayError> {
        require(op::DELETE_PROFILE, "name", name)?;
        let request = self.client.delete(self.profiles_url("delete")).query(&[("name", name)]);
        self.send(op::DELETE_PROFILE, request).await.map(|_| ())
    }

    async fn select_profile(&self, name: &str) -> Result<(), GatewayError> {
        require(op::SELECT_PROFILE, "name", name)?;
        let request = self.client.post(self.profiles_url("select")).query(&[("name", name)]);
        self.send(op::SELECT_PROFILE, request).await.map(|_| ())
    }

    async fn list_photos(&self, profile: &str) -> Result<PhotoListing, GatewayError> {
        require(op::LIST_PHOTOS, "profile", profile)?;
        let request = self.client.get(self.photos_url("list")).query(&[("profile", profile)]);
        self.send_json(op::LIST_PHOTOS, request).await
    }

    async fn upload_photo(&self, profile: &str, file: &UploadFile) -> Result<UploadReceipt, GatewayError> {
        require(op::UPLOAD_PHOTO, "profile", profile)?;
        require(op::UPLOAD_PHOTO, "file", &file.name)?;
        if file.bytes.is_empty() {
            return Err(GatewayError::invalid_argument(op::UPLOAD_PHOTO, "file"));
        }

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|_| GatewayError::invalid_argument(op::UPLOAD_PHOTO, "mime_type"))?;
        let form = Form::new().part("file", part);

        let request = self
            .client
            .post(self.assistant_url("upload"))
            .query(&[("profile", profile)])
            .multipart(form);
        self.send_json(op::UPLOAD_PHOTO, request).await
    }

    async fn select_photo(&self, profile: &str, filename: &str) -> Result<SelectionReceipt, GatewayError> {
        require(op::SELECT_PHOTO, "profile", profile)?;
        require(op::SELECT_PHOTO, "image_name", filename)?;
        let request = self
            .client
            .post(self.assistant_url("select"))
            .query(&[("profile", profile), ("image_name", filename)]);
        self.send_json(op::SELECT_PHOTO, request).await
    }

    async fn chat(&self, profile: &str, message: &str) -> Result<ChatReply, GatewayError> {
        require(op::CHAT, "profile", profile)?;
        require(op::CHAT, "user_message", message)?;
        let request = self
            .client
            .post(self.assistant_url("chat"))
            .form(&[("profile", profile), ("user_message", message)]);
        self.send_json(op::CHAT, request).await
    }

    async fn year_in_review(&self, profile: &str) -> Result<ReviewReply, GatewayError> {
        require(op::YEAR_IN_REVIEW, "profile", profile)?;
        let request = self
            .client
            .post(self.assistant_url("year_in_review"))
            .form(&[("profile", profile)]);
        self.send_json(op::YEAR_IN_REVIEW, request).await
    }

    async fn fetch_graph(&self, profile: &str) -> Result<KnowledgeGraph, GatewayError> {
        require(op::FETCH_GRAPH, "profile", profile)?;
        let request = self.client.get(self.graph_url(profile)?);
        self.send_json(op::FETCH_GRAPH, request).await
    }

    async fn ping(&self) -> Result<Ping, GatewayError> {
        let request = self.client.get(self.assistant_url("ping"));
        self.send_json(op::PING, request).await
    }
}
