use crate::csrf::{is_same_origin, CsrfGuard};
use crate::models::{FileGroup, FileMetadata, InitUploadRequest, UploadSession};
use crate::util::page_origin;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    /// Same-origin 403: expired anti-forgery token or missing permission.
    Forbidden,
    NotFound,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn forbidden() -> Self {
        Self {
            kind: ApiErrorKind::Forbidden,
            message: "Forbidden".to_string(),
        }
    }

    fn not_found(url: &str) -> Self {
        Self {
            kind: ApiErrorKind::NotFound,
            message: format!("Not Found: {url}"),
        }
    }

    fn http(status: StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind == ApiErrorKind::Forbidden
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Map a response status to the error taxonomy.
///
/// Only same-origin 403s count as `Forbidden`; object storage answers 403 for
/// expired presigned URLs, which is an ordinary upload failure.
pub(crate) fn classify_status(
    status: StatusCode,
    same_origin: bool,
    url: &str,
) -> Result<(), ApiError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::FORBIDDEN && same_origin {
        Err(ApiError::forbidden())
    } else if status == StatusCode::NOT_FOUND {
        Err(ApiError::not_found(url))
    } else {
        Err(ApiError::http(status, String::new(), "Request failed"))
    }
}

/// Resolve `path` against `origin`; absolute URLs are kept.
pub(crate) fn absolute_url(origin: &str, path: &str) -> ApiResult<reqwest::Url> {
    if let Ok(u) = reqwest::Url::parse(path) {
        return Ok(u);
    }
    reqwest::Url::parse(origin)
        .and_then(|base| base.join(path))
        .map_err(ApiError::parse)
}

pub(crate) fn files_list_path(group_id: &str) -> String {
    format!("/api/files?groupId={}", urlencoding::encode(group_id))
}

pub(crate) fn file_download_path(file_id: &str, group_id: &str) -> String {
    format!(
        "/api/files/{}/download?groupId={}",
        urlencoding::encode(file_id),
        urlencoding::encode(group_id)
    )
}

pub(crate) fn file_delete_path(file_id: &str, group_id: &str) -> String {
    format!(
        "/api/files/{}?groupId={}",
        urlencoding::encode(file_id),
        urlencoding::encode(group_id)
    )
}

pub(crate) fn complete_path(group_id: &str) -> String {
    format!("/api/files/{}/complete", urlencoding::encode(group_id))
}

/// The single HTTP entry point of the runtime.
///
/// Every request gets the anti-forgery header when eligible, and hidden form
/// fields are re-synced after each response, whether it succeeded or not.
#[derive(Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    csrf: Rc<CsrfGuard>,
}

impl HttpClient {
    pub fn new(csrf: Rc<CsrfGuard>) -> Self {
        Self {
            client: reqwest::Client::new(),
            csrf,
        }
    }

    fn origin() -> String {
        page_origin().unwrap_or_default()
    }

    fn builder(&self, method: Method, path: &str) -> ApiResult<reqwest::RequestBuilder> {
        let url = absolute_url(&Self::origin(), path)?;
        Ok(self.client.request(method, url))
    }

    async fn execute(&self, builder: reqwest::RequestBuilder) -> ApiResult<reqwest::Response> {
        let mut req = builder.build().map_err(ApiError::network)?;
        self.csrf.prepare(&mut req);

        let url = req.url().to_string();
        let same_origin = is_same_origin(&url, &Self::origin());

        let result = self.client.execute(req).await;
        self.csrf.sync_document();
        let res = result.map_err(ApiError::network)?;

        match classify_status(res.status(), same_origin, &url) {
            Ok(()) => Ok(res),
            Err(e) if e.is_forbidden() => {
                self.csrf.on_forbidden();
                Err(e)
            }
            Err(mut e) => {
                if e.kind == ApiErrorKind::Http {
                    let body = res.text().await.unwrap_or_default();
                    e.message.push_str(&body);
                }
                Err(e)
            }
        }
    }

    async fn request_json<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl serde::Serialize>,
    ) -> ApiResult<T> {
        let mut req = self.builder(method, path)?;
        if let Some(b) = body {
            req = req.json(b);
        }
        let res = self.execute(req).await?;
        res.json().await.map_err(ApiError::parse)
    }

    /// GET an HTML fragment.
    pub async fn fetch_fragment(&self, url: &str) -> ApiResult<String> {
        let req = self.builder(Method::GET, url)?;
        let res = self.execute(req).await?;
        res.text().await.map_err(ApiError::network)
    }

    /// Send a url-encoded form body.
    pub async fn submit_form(&self, method: &str, action: &str, body: String) -> ApiResult<()> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(ApiError::parse)?;
        let req = if method == Method::GET {
            let sep = if action.contains('?') { '&' } else { '?' };
            self.builder(method, &format!("{action}{sep}{body}"))?
        } else {
            self.builder(method, action)?
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body)
        };
        self.execute(req).await.map(|_| ())
    }

    pub async fn post_empty(&self, url: &str) -> ApiResult<()> {
        let req = self.builder(Method::POST, url)?;
        self.execute(req).await.map(|_| ())
    }

    pub async fn init_upload(&self, req: &InitUploadRequest) -> ApiResult<UploadSession> {
        self.request_json(Method::POST, "/api/files/init", Some(req))
            .await
    }

    /// Direct-to-storage upload. The presigned URL carries its own credentials.
    pub async fn put_object(
        &self,
        presigned_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<()> {
        let mut req = self.builder(Method::PUT, presigned_url)?.body(bytes);
        if !content_type.is_empty() {
            req = req.header(CONTENT_TYPE, content_type);
        }
        self.execute(req).await.map(|_| ())
    }

    pub async fn complete_upload(
        &self,
        group_id: &str,
        metadatas: &[FileMetadata],
    ) -> ApiResult<FileGroup> {
        self.request_json(Method::POST, &complete_path(group_id), Some(&metadatas))
            .await
    }

    pub async fn list_files(&self, group_id: &str) -> ApiResult<FileGroup> {
        self.request_json(Method::GET, &files_list_path(group_id), None::<&()>)
            .await
    }

    pub async fn delete_file(&self, file_id: &str, group_id: &str) -> ApiResult<()> {
        let req = self.builder(Method::DELETE, &file_delete_path(file_id, group_id))?;
        self.execute(req).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::OK, true, "/x").is_ok());
        assert!(classify_status(StatusCode::NO_CONTENT, true, "/x").is_ok());

        let e = classify_status(StatusCode::FORBIDDEN, true, "/x").unwrap_err();
        assert!(e.is_forbidden());

        let e = classify_status(StatusCode::NOT_FOUND, true, "/nope.html").unwrap_err();
        assert_eq!(e.kind, ApiErrorKind::NotFound);
        assert!(e.to_string().contains("Not Found"));

        let e = classify_status(StatusCode::INTERNAL_SERVER_ERROR, true, "/x").unwrap_err();
        assert_eq!(e.kind, ApiErrorKind::Http);
    }

    #[test]
    fn test_cross_origin_forbidden_is_plain_http_error() {
        let e = classify_status(StatusCode::FORBIDDEN, false, "https://s3/x").unwrap_err();
        assert_eq!(e.kind, ApiErrorKind::Http);
        assert!(!e.is_forbidden());
    }

    #[test]
    fn test_absolute_url() {
        let u = absolute_url("https://cmms.example.com", "/plant/list.html?x=1").expect("join");
        assert_eq!(u.as_str(), "https://cmms.example.com/plant/list.html?x=1");

        let u = absolute_url("https://cmms.example.com", "https://s3.example.net/b/k").expect("abs");
        assert_eq!(u.host_str(), Some("s3.example.net"));

        assert!(absolute_url("", "/relative").is_err());
    }

    #[test]
    fn test_file_endpoint_paths() {
        assert_eq!(files_list_path("F250119001"), "/api/files?groupId=F250119001");
        assert_eq!(
            file_download_path("f 1", "G1"),
            "/api/files/f%201/download?groupId=G1"
        );
        assert_eq!(file_delete_path("f1", "G&1"), "/api/files/f1?groupId=G%261");
        assert_eq!(complete_path("G1"), "/api/files/G1/complete");
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::config::EnvConfig;
    use crate::notify::Notifier;
    use crate::util::document;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;
    use web_sys::{HtmlDocument, HtmlInputElement};

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn test_failed_request_still_refreshes_form_tokens() {
        let doc = document().expect("document");
        doc.clone()
            .dyn_into::<HtmlDocument>()
            .expect("html document")
            .set_cookie("XSRF-TOKEN=after-failure; path=/")
            .expect("cookie should be writable");
        let form = doc.create_element("form").expect("form");
        form.set_attribute("method", "post").expect("method");
        doc.body().expect("body").append_child(&form).expect("append");

        let csrf = Rc::new(CsrfGuard::new(&EnvConfig::default(), Notifier::new(60_000)));
        let http = HttpClient::new(csrf);
        let result = http.fetch_fragment("/__cmms_missing__/nothing.html").await;
        assert!(result.is_err());

        let value = form
            .query_selector("input[name=_csrf]")
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            .map(|input| input.value());
        assert_eq!(value.as_deref(), Some("after-failure"));
        form.remove();
    }
}
