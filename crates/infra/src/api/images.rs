//! Image endpoints and batch operations
//!
//! Uploads are validated before any request is sent: every file must carry
//! an `image/*` media type and the user must be signed in. Batch calls check
//! both once for the whole batch, so an invalid batch costs zero requests.

use std::sync::Arc;

use chrono::Local;
use photox_core::{run_sequential, settle_all, BatchProgress, BatchResult, ImageProbe};
use photox_domain::{format_file_size, ImageFile, ImageRecord, UploadItem, UploadOptions};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument};

use super::client::ApiClient;
use super::community::favorite_path;
use super::errors::{ApiError, ValidationError};
use super::request::{ApiRequest, MultipartBody};
use super::types::{BatchUploadResponse, BatchUploadSummary, ListParams, Page, UploadResponse};
use crate::media::DecodingImageProbe;

const UPLOAD_PATH: &str = "/images/upload/";
const BATCH_UPLOAD_PATH: &str = "/images/batch-upload/";
const IMAGES_PATH: &str = "/images/";
const FEED_PATH: &str = "/images/feed/";
const DELETE_PROCESSED_PATH: &str = "/images/delete-processed/";
const AI_PROCESS_LOCAL_PATH: &str = "/images/ai-process-local/";
const RECOMMENDATIONS_PATH: &str = "/images/recommendations/";

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-file report of a titled batch upload
pub type UploadBatch = BatchResult<UploadItem, ImageRecord, ApiError>;

/// Per-id report of a fanned-out batch operation
pub type IdBatch = BatchResult<i64, Value, ApiError>;

fn image_path(id: i64) -> String {
    format!("/images/{id}/")
}

fn tags_path(id: i64) -> String {
    format!("/images/{id}/tags/")
}

fn action_path(id: i64, action: &str) -> String {
    format!("/images/{id}/{action}/")
}

/// First file that is not an image fails the whole batch
fn ensure_images<'a>(
    files: impl IntoIterator<Item = &'a ImageFile>,
) -> Result<(), ValidationError> {
    match files.into_iter().find(|file| !file.is_image()) {
        Some(file) => Err(ValidationError::NotAnImage { file_name: file.name.clone() }),
        None => Ok(()),
    }
}

/// Image service
#[derive(Clone)]
pub struct ImageService {
    client: ApiClient,
    probe: Arc<dyn ImageProbe>,
}

impl ImageService {
    /// Service probing dimensions with [`DecodingImageProbe`]
    pub fn new(client: ApiClient) -> Self {
        Self::with_probe(client, Arc::new(DecodingImageProbe::new()))
    }

    pub fn with_probe(client: ApiClient, probe: Arc<dyn ImageProbe>) -> Self {
        Self { client, probe }
    }

    /// Upload one image and return its display record.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`] before any request when the file is not an
    ///   image or nobody is signed in
    /// - the classified upload failure
    /// - [`ApiError::Probe`] when the upload succeeded but the dimensions
    ///   could not be read
    #[instrument(skip(self, file, options), fields(file = %file.name, size = file.size()))]
    pub async fn upload_image(
        &self,
        file: ImageFile,
        options: UploadOptions,
    ) -> Result<ImageRecord, ApiError> {
        ensure_images([&file])?;
        self.ensure_signed_in().await?;

        let title = options.title.filter(|title| !title.is_empty());
        self.upload_one(&file, title, options.is_public).await
    }

    /// Upload several files in one multipart request.
    ///
    /// The title and visibility apply to every file.
    #[instrument(skip(self, files, options), fields(files = files.len()))]
    pub async fn upload_images(
        &self,
        files: Vec<ImageFile>,
        options: UploadOptions,
    ) -> Result<BatchUploadSummary, ApiError> {
        ensure_images(&files)?;
        self.ensure_signed_in().await?;

        let total = files.len();
        let mut form = MultipartBody::new();
        for file in files {
            form = form.file("images", file);
        }
        if let Some(title) = options.title.filter(|title| !title.is_empty()) {
            form = form.text("title", title);
        }
        if let Some(is_public) = options.is_public {
            form = form.text("is_public", is_public.to_string());
        }

        let response: BatchUploadResponse =
            self.client.send(ApiRequest::post(BATCH_UPLOAD_PATH).multipart(form)).await?;
        let summary = BatchUploadSummary::from_response(response, total);
        info!(success = summary.success, failed = summary.failed, total, "Batch upload finished");
        Ok(summary)
    }

    /// Upload files one at a time, each with its own title.
    ///
    /// Progress is sent after every file, failed or not, as
    /// `round((i + 1) / total * 100)`. A failed file is recorded and the
    /// next one is attempted.
    ///
    /// # Errors
    ///
    /// Only validation failures fail the call; per-file failures are in
    /// the returned report.
    #[instrument(skip(self, items, progress), fields(files = items.len()))]
    pub async fn upload_images_with_titles(
        &self,
        items: Vec<UploadItem>,
        is_public: Option<bool>,
        progress: Option<UnboundedSender<BatchProgress>>,
    ) -> Result<UploadBatch, ApiError> {
        ensure_images(items.iter().map(|item| &item.file))?;
        self.ensure_signed_in().await?;

        let report = run_sequential(
            items,
            |_, item: &UploadItem| {
                let item = item.clone();
                async move {
                    self.upload_one(&item.file, Some(item.title.clone()), is_public).await
                }
            },
            progress,
        )
        .await;
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn get_image(&self, id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(image_path(id))).await
    }

    #[instrument(skip(self, update))]
    pub async fn update_image<B: Serialize>(
        &self,
        id: i64,
        update: &B,
    ) -> Result<Value, ApiError> {
        let body = serde_json::to_value(update)
            .map_err(|err| ApiError::Internal(format!("failed to encode update: {err}")))?;
        self.client.execute(ApiRequest::put(image_path(id)).json(body)).await
    }

    /// Delete one image; the server answers 204 with no body
    #[instrument(skip(self))]
    pub async fn delete_image(&self, id: i64) -> Result<(), ApiError> {
        self.client.execute(ApiRequest::delete(image_path(id))).await.map(|_| ())
    }

    /// Current user's images
    #[instrument(skip(self))]
    pub async fn list_images(&self, params: &ListParams) -> Result<Page<Value>, ApiError> {
        let mut request = ApiRequest::get(IMAGES_PATH);
        for (name, value) in params.pairs() {
            request = request.query(name, value);
        }
        Page::<Value>::from_payload(self.client.execute(request).await?)
    }

    /// Follow a `next`/`previous` link from an earlier page
    #[instrument(skip(self))]
    pub async fn list_images_at(&self, page_url: &str) -> Result<Page<Value>, ApiError> {
        Page::<Value>::from_payload(self.client.execute(ApiRequest::get(page_url)).await?)
    }

    #[instrument(skip(self))]
    pub async fn feed(
        &self,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<Value>, ApiError> {
        let mut request = ApiRequest::get(FEED_PATH);
        if let Some(page) = page {
            request = request.query("page", page);
        }
        if let Some(page_size) = page_size {
            request = request.query("page_size", page_size);
        }
        Page::<Value>::from_payload(self.client.execute(request).await?)
    }

    /// Delete every id concurrently; one failure never stops the others.
    ///
    /// # Errors
    ///
    /// Fails before any request when nobody is signed in.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_delete_images(&self, ids: Vec<i64>) -> Result<IdBatch, ApiError> {
        self.ensure_signed_in().await?;

        let client = &self.client;
        Ok(settle_all(ids, |id: &i64| {
            let request = ApiRequest::delete(image_path(*id));
            async move { client.execute(request).await }
        })
        .await)
    }

    /// Favorite every id concurrently; one failure never stops the others.
    ///
    /// # Errors
    ///
    /// Fails before any request when nobody is signed in.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_favorite(&self, ids: Vec<i64>) -> Result<IdBatch, ApiError> {
        self.ensure_signed_in().await?;

        let client = &self.client;
        Ok(settle_all(ids, |id: &i64| {
            let request = ApiRequest::post(favorite_path(*id));
            async move { client.execute(request).await }
        })
        .await)
    }

    /// Remove a server-side processed copy by file name
    #[instrument(skip(self))]
    pub async fn delete_processed_image(&self, file_name: &str) -> Result<Value, ApiError> {
        let request =
            ApiRequest::delete(DELETE_PROCESSED_PATH).json(json!({ "file_name": file_name }));
        self.client.execute(request).await
    }

    #[instrument(skip(self))]
    pub async fn image_tags(&self, id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(tags_path(id))).await
    }

    #[instrument(skip(self, tags))]
    pub async fn add_user_tags(&self, id: i64, tags: &[String]) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::post(tags_path(id)).json(json!({ "tags": tags }))).await
    }

    #[instrument(skip(self, tags))]
    pub async fn remove_user_tags(&self, id: i64, tags: &[String]) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::delete(tags_path(id)).json(json!({ "tags": tags }))).await
    }

    /// Generated description; cached server-side after the first call
    #[instrument(skip(self))]
    pub async fn ai_description(&self, id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::post(action_path(id, "ai_description"))).await
    }

    /// Apply a style, adjustments or enhancements to a stored image
    #[instrument(skip(self, params))]
    pub async fn ai_process<B: Serialize>(&self, id: i64, params: &B) -> Result<Value, ApiError> {
        let body = serde_json::to_value(params)
            .map_err(|err| ApiError::Internal(format!("failed to encode params: {err}")))?;
        self.client.execute(ApiRequest::post(action_path(id, "ai-process")).json(body)).await
    }

    /// Process a local file without storing it.
    ///
    /// `params` travels as a JSON string in the `params` form field.
    #[instrument(skip(self, file, params), fields(file = %file.name))]
    pub async fn ai_process_local<B: Serialize>(
        &self,
        file: ImageFile,
        params: &B,
    ) -> Result<Value, ApiError> {
        ensure_images([&file])?;
        self.ensure_signed_in().await?;
        let params = serde_json::to_string(params)
            .map_err(|err| ApiError::Internal(format!("failed to encode params: {err}")))?;

        let form = MultipartBody::new().file("image", file).text("params", params);
        self.client.execute(ApiRequest::post(AI_PROCESS_LOCAL_PATH).multipart(form)).await
    }

    #[instrument(skip(self))]
    pub async fn style_analysis(&self, id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::post(action_path(id, "style-analysis"))).await
    }

    /// Images recommended from the user's tag history
    #[instrument(skip(self))]
    pub async fn recommendations(&self) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(RECOMMENDATIONS_PATH)).await
    }

    /// Another user's public images
    #[instrument(skip(self))]
    pub async fn user_public_images(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<Page<Value>, ApiError> {
        let mut request =
            ApiRequest::get(IMAGES_PATH).query("user", user_id).query("is_public", true);
        for (name, value) in params.pairs() {
            request = request.query(name, value);
        }
        Page::<Value>::from_payload(self.client.execute(request).await?)
    }

    async fn ensure_signed_in(&self) -> Result<(), ValidationError> {
        if self.client.is_authenticated().await {
            Ok(())
        } else {
            Err(ValidationError::NotSignedIn)
        }
    }

    async fn upload_one(
        &self,
        file: &ImageFile,
        title: Option<String>,
        is_public: Option<bool>,
    ) -> Result<ImageRecord, ApiError> {
        let mut form = MultipartBody::new().file("image", file.clone());
        if let Some(title) = &title {
            form = form.text("title", title.clone());
        }
        if let Some(is_public) = is_public {
            form = form.text("is_public", is_public.to_string());
        }

        let response: UploadResponse =
            self.client.send(ApiRequest::post(UPLOAD_PATH).multipart(form)).await?;
        info!(id = response.id, file = %file.name, "Image uploaded");

        self.to_record(file, response, title).await
    }

    /// Build the display record; the upload itself has already succeeded.
    async fn to_record(
        &self,
        file: &ImageFile,
        response: UploadResponse,
        title: Option<String>,
    ) -> Result<ImageRecord, ApiError> {
        let dimensions = self.probe.dimensions(file).await.map_err(|err| ApiError::Probe {
            file_name: file.name.clone(),
            message: err.to_string(),
        })?;

        Ok(ImageRecord {
            id: response.id,
            thumbnail: response.image_url.clone(),
            url: response.image_url,
            size: format_file_size(file.size()),
            dimensions,
            format: file.format_tag(),
            created_at: Local::now().format(CREATED_AT_FORMAT).to_string(),
            title,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use photox_domain::{ClientConfig, Dimensions, PhotoxError, TokenPair};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::TokenStore;

    struct FixedProbe(Option<Dimensions>);

    #[async_trait]
    impl ImageProbe for FixedProbe {
        async fn dimensions(&self, _file: &ImageFile) -> photox_domain::Result<Dimensions> {
            self.0.ok_or_else(|| PhotoxError::Decode("truncated header".to_string()))
        }
    }

    async fn service(server: &MockServer, probe: FixedProbe) -> ImageService {
        let tokens = Arc::new(TokenStore::in_memory());
        tokens.store_tokens(TokenPair::new("access", Some("refresh".into()))).await.unwrap();
        let client = ApiClient::builder()
            .config(ClientConfig::new(server.uri(), Duration::from_secs(5)))
            .token_store(tokens)
            .build()
            .unwrap();
        ImageService::with_probe(client, Arc::new(probe))
    }

    fn jpeg(name: &str, len: usize) -> ImageFile {
        ImageFile::new(name, "image/jpeg", vec![0; len])
    }

    #[tokio::test]
    async fn upload_normalizes_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"id": 42, "image_url": "http://cdn/42.jpg"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let probe = FixedProbe(Some(Dimensions { width: 640, height: 480 }));
        let service = service(&server, probe).await;
        let record = service
            .upload_image(
                jpeg("cat.jpg", 1536),
                UploadOptions { title: Some("cat".into()), is_public: Some(true) },
            )
            .await
            .unwrap();

        assert_eq!(record.id, 42);
        assert_eq!(record.thumbnail, "http://cdn/42.jpg");
        assert_eq!(record.url, "http://cdn/42.jpg");
        assert_eq!(record.size, "1.5 KB");
        assert_eq!(record.dimensions.to_string(), "640x480");
        assert_eq!(record.format, "JPEG");
        assert_eq!(record.title.as_deref(), Some("cat"));
        assert_eq!(record.created_at.len(), "2024-01-01 00:00:00".len());
    }

    #[tokio::test]
    async fn probe_failure_is_distinct_from_upload_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": 1, "image_url": "u"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server, FixedProbe(None)).await;
        let err =
            service.upload_image(jpeg("bad.jpg", 10), UploadOptions::default()).await.unwrap_err();

        match err {
            ApiError::Probe { file_name, message } => {
                assert_eq!(file_name, "bad.jpg");
                assert!(message.contains("truncated header"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_upload_rejects_non_image_before_sending() {
        let server = MockServer::start().await;
        let service = service(&server, FixedProbe(None)).await;

        let err = service
            .upload_image(
                ImageFile::new("notes.txt", "text/plain", vec![1]),
                UploadOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "file notes.txt is not an image");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_upload_endpoint_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(BATCH_UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(207).set_body_json(json!({
                "success_count": 1,
                "error_count": 1,
                "results": [{"id": 5}],
                "errors": [{"file": "b.jpg", "error": "corrupt"}],
                "message": "partial"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server, FixedProbe(None)).await;
        let summary = service
            .upload_images(vec![jpeg("a.jpg", 4), jpeg("b.jpg", 4)], UploadOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.success, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.message, "partial");
    }

    #[tokio::test]
    async fn list_follows_absolute_page_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "next": null,
                "results": [{"id": 3}]
            })))
            .mount(&server)
            .await;

        let service = service(&server, FixedProbe(None)).await;
        let next = format!("{}/images/?page=2", server.uri());
        let page = service.list_images_at(&next).await.unwrap();

        assert_eq!(page.count, Some(3));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), Some("page=2"));
    }

    #[tokio::test]
    async fn ai_endpoints_target_image_actions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/8/ai_description/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"description": "fog"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/images/8/ai-process/"))
            .and(body_json(json!({"style": "film", "enhancements": ["denoise"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "/p/8.jpg"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/images/8/style-analysis/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"style": "noir"})))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server, FixedProbe(None)).await;
        let params = json!({"style": "film", "enhancements": ["denoise"]});

        assert_eq!(service.ai_description(8).await.unwrap()["description"], "fog");
        assert_eq!(service.ai_process(8, &params).await.unwrap()["url"], "/p/8.jpg");
        assert_eq!(service.style_analysis(8).await.unwrap()["style"], "noir");
    }

    #[tokio::test]
    async fn local_processing_sends_params_as_form_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(AI_PROCESS_LOCAL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "/tmp/x.jpg"})))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server, FixedProbe(None)).await;
        let params = json!({"adjustments": {"brightness": 10}});
        let processed = service.ai_process_local(jpeg("local.jpg", 4), &params).await.unwrap();

        assert_eq!(processed["url"], "/tmp/x.jpg");
        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"image\"; filename=\"local.jpg\""));
        assert!(body.contains("name=\"params\""));
        assert!(body.contains(r#"{"adjustments":{"brightness":10}}"#));
    }

    #[tokio::test]
    async fn local_processing_rejects_non_image() {
        let server = MockServer::start().await;
        let service = service(&server, FixedProbe(None)).await;

        let err = service
            .ai_process_local(ImageFile::new("clip.mp4", "video/mp4", vec![1]), &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(ValidationError::NotAnImage { .. })));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recommendations_are_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECOMMENDATIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2}])))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server, FixedProbe(None)).await;
        assert_eq!(service.recommendations().await.unwrap(), json!([{"id": 2}]));
    }

    #[tokio::test]
    async fn public_images_filter_by_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IMAGES_PATH))
            .and(query_param("user", "5"))
            .and(query_param("is_public", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "next": null,
                "results": [{"id": 11}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server, FixedProbe(None)).await;
        let page = service.user_public_images(5, &ListParams::default()).await.unwrap();

        assert_eq!(page.count, Some(1));
        assert_eq!(page.results, vec![json!({"id": 11})]);
    }
}
