//! Attachment upload widget.
//!
//! Files go straight to object storage through presigned URLs. The backend
//! only hands out the URLs (`/api/files/init`) and records the result
//! (`/api/files/{groupId}/complete`).

pub(crate) mod render;
pub(crate) mod validate;

use self::render::{file_id_of, item_count, item_name, remove_item, render_items, DELETE_ATTR};
use self::validate::{check_batch, Candidate, Limits, UploadError};
use crate::api::ApiResult;
use crate::config::EnvConfig;
use crate::models::{FileMetadata, InitUploadRequest, UploadInfo, UploadSession};
use crate::state::Runtime;
use crate::util::{closest_from_target, confirm, document, find_all, mark_once, ListenerScope};
use futures_util::future::join_all;
use leptos::logging::{error, log, warn};
use leptos::task::spawn_local;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{DragEvent, Element, Event, File, FileList, HtmlInputElement};

pub(crate) const WIDGET_SELECTOR: &str =
    "[data-attachments][data-upload], [data-attachments][data-ref-entity]";
const GROUP_FIELD: &str = "input[name=\"file_group_id\"]";
const DRAG_CLASS: &str = "drag-over";

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct UploadOptions {
    pub group_id: Option<String>,
    pub ref_entity: Option<String>,
    pub ref_id: Option<String>,
    pub max_files: usize,
    pub max_file_size: u64,
    pub allowed_types: Vec<String>,
}

impl UploadOptions {
    /// Container data attributes over configured defaults.
    pub fn from_attrs(attr: impl Fn(&str) -> Option<String>, config: &EnvConfig) -> Self {
        let text = |name: &str| attr(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            group_id: text("data-group-id"),
            ref_entity: text("data-ref-entity"),
            ref_id: text("data-ref-id"),
            max_files: text("data-max-files")
                .and_then(|v| v.parse().ok())
                .unwrap_or(config.max_files),
            max_file_size: text("data-max-file-size")
                .and_then(|v| v.parse().ok())
                .unwrap_or(config.max_file_size),
            allowed_types: text("data-allowed-types")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_else(|| config.allowed_types.clone()),
        }
    }

    fn limits(&self) -> Limits<'_> {
        Limits {
            max_files: self.max_files,
            max_file_size: self.max_file_size,
            allowed_types: &self.allowed_types,
        }
    }
}

/// Pair each selected file with the storage slot handed out for it.
///
/// The backend answers in request order; surplus entries on either side are dropped.
pub(crate) fn pair_by_index<'a, T>(
    files: &'a [T],
    infos: &'a [UploadInfo],
) -> impl Iterator<Item = (&'a T, &'a UploadInfo)> {
    files.iter().zip(infos.iter())
}

pub(crate) fn success_message(count: usize) -> String {
    format!("{count}개 파일이 성공적으로 업로드되었습니다.")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn files_of(list: Option<FileList>) -> Vec<File> {
    let Some(list) = list else {
        return Vec::new();
    };
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

async fn read_bytes(file: &File) -> Result<Vec<u8>, String> {
    let buf = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("{e:?}"))?;
    Ok(js_sys::Uint8Array::new(&buf).to_vec())
}

pub(crate) struct UploadWidget {
    container: Element,
    list: Element,
    input: HtmlInputElement,
    add_button: Element,
    group_field: Option<HtmlInputElement>,
    options: RefCell<UploadOptions>,
    runtime: Runtime,
}

impl UploadWidget {
    /// Validate markup and wire a container. Nothing is touched on error.
    pub fn attach(
        container: &Element,
        runtime: &Runtime,
        scope: &ListenerScope,
    ) -> Result<Rc<Self>, UploadError> {
        let list = container
            .query_selector(".attachments-list")
            .ok()
            .flatten()
            .ok_or(UploadError::Markup(".attachments-list"))?;
        let input = container
            .query_selector("input[type=file]")
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            .ok_or(UploadError::Markup("input[type=file]"))?;
        let add_button = container
            .query_selector("[data-attachments-add]")
            .ok()
            .flatten()
            .ok_or(UploadError::Markup("[data-attachments-add]"))?;
        let group_field = container
            .query_selector(GROUP_FIELD)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());

        let mut options =
            UploadOptions::from_attrs(|name| container.get_attribute(name), &runtime.config);
        if let Some(field) = &group_field {
            let v = field.value();
            if !v.trim().is_empty() {
                options.group_id = Some(v);
            }
        }

        let widget = Rc::new(Self {
            container: container.clone(),
            list,
            input,
            add_button,
            group_field,
            options: RefCell::new(options),
            runtime: runtime.clone(),
        });
        widget.install_listeners(scope);
        Ok(widget)
    }

    fn group_id(&self) -> Option<String> {
        self.options.borrow().group_id.clone()
    }

    fn install_listeners(self: &Rc<Self>, scope: &ListenerScope) {
        let input = self.input.clone();
        scope.listen(&self.add_button, "click", false, move |ev: Event| {
            ev.prevent_default();
            input.click();
        });

        let w = self.clone();
        scope.listen(&self.input, "change", false, move |_ev: Event| {
            let files = files_of(w.input.files());
            // Let the same file be picked again later.
            w.input.set_value("");
            if !files.is_empty() {
                w.handle_selection(files);
            }
        });

        let container = self.container.clone();
        scope.listen(&self.container, "dragover", false, move |ev: Event| {
            ev.prevent_default();
            let _ = container.class_list().add_1(DRAG_CLASS);
        });

        let container = self.container.clone();
        scope.listen(&self.container, "dragleave", false, move |ev: Event| {
            ev.prevent_default();
            let _ = container.class_list().remove_1(DRAG_CLASS);
        });

        let w = self.clone();
        scope.listen(&self.container, "drop", false, move |ev: Event| {
            ev.prevent_default();
            let _ = w.container.class_list().remove_1(DRAG_CLASS);
            let files = ev
                .dyn_ref::<DragEvent>()
                .and_then(|d| d.data_transfer())
                .map(|dt| files_of(dt.files()))
                .unwrap_or_default();
            if !files.is_empty() {
                w.handle_selection(files);
            }
        });

        let w = self.clone();
        scope.listen(&self.list, "click", false, move |ev: Event| {
            let Some(button) = closest_from_target(ev.target(), &format!("[{DELETE_ATTR}]")) else {
                return;
            };
            ev.prevent_default();
            if let Some(file_id) = file_id_of(&button) {
                w.delete_file(file_id);
            }
        });
    }

    pub async fn load_existing(&self) {
        let Some(group_id) = self.group_id() else {
            return;
        };
        match self.runtime.http.list_files(&group_id).await {
            Ok(group) => {
                if let Some(doc) = document() {
                    render_items(&doc, &self.list, &group.items, &group_id);
                }
            }
            Err(e) if e.is_forbidden() => {}
            Err(e) => {
                error!("[cmms-upload] loading files of {group_id} failed: {e}");
                self.runtime
                    .notifier
                    .error("기존 파일을 불러오는데 실패했습니다.");
            }
        }
    }

    /// Validate a selection and upload whatever passes.
    pub fn handle_selection(self: &Rc<Self>, files: Vec<File>) {
        let candidates: Vec<Candidate> = files
            .iter()
            .map(|f| Candidate {
                name: f.name(),
                size: f.size() as u64,
                mime: f.type_(),
            })
            .collect();

        let checked = {
            let options = self.options.borrow();
            check_batch(&candidates, item_count(&self.list), &options.limits())
        };
        for rejection in &checked.rejected {
            warn!("[cmms-upload] {rejection}");
            match rejection {
                UploadError::TooMany { .. } => self.runtime.notifier.warning(rejection.to_string()),
                _ => self.runtime.notifier.error(rejection.to_string()),
            }
        }

        let accepted: Vec<File> = checked
            .accepted
            .into_iter()
            .filter_map(|i| files.get(i).cloned())
            .collect();
        if accepted.is_empty() {
            return;
        }

        // Only one toast is visible; rejections take precedence.
        if checked.rejected.is_empty() {
            self.runtime
                .notifier
                .info(format!("{}개 파일 업로드 중...", accepted.len()));
        }
        let w = self.clone();
        spawn_local(async move {
            w.upload_batch(accepted).await;
        });
    }

    async fn upload_batch(&self, files: Vec<File>) {
        let names: Vec<String> = files.iter().map(|f| f.name()).collect();
        let session = match self.create_session(names).await {
            Ok(s) => s,
            Err(e) if e.is_forbidden() => return,
            Err(e) => {
                error!("[cmms-upload] init failed: {e}");
                self.runtime.notifier.error("파일 업로드를 시작할 수 없습니다.");
                return;
            }
        };

        let metadatas = self.upload_to_storage(&files, &session).await;
        if metadatas.is_empty() {
            return;
        }
        self.complete_upload(&session.group_id, metadatas).await;
    }

    /// Ask the backend for presigned URLs. Adopts the group id on the first batch.
    async fn create_session(&self, file_names: Vec<String>) -> ApiResult<UploadSession> {
        let req = {
            let o = self.options.borrow();
            InitUploadRequest {
                group_id: o.group_id.clone(),
                ref_entity: o.ref_entity.clone(),
                ref_id: o.ref_id.clone(),
                file_names,
            }
        };
        let session = self.runtime.http.init_upload(&req).await?;

        if self.group_id().is_none() && !session.group_id.is_empty() {
            self.options.borrow_mut().group_id = Some(session.group_id.clone());
            if let Some(field) = &self.group_field {
                field.set_value(&session.group_id);
            }
        }
        Ok(session)
    }

    async fn upload_one(&self, file: &File, info: &UploadInfo) -> Option<FileMetadata> {
        let name = file.name();
        let content_type = file.type_();

        let result = async {
            let bytes = read_bytes(file).await?;
            let checksum = sha256_hex(&bytes);
            let size = bytes.len() as u64;
            self.runtime
                .http
                .put_object(&info.presigned_url, &content_type, bytes)
                .await
                .map_err(|e| e.to_string())?;
            Ok::<_, String>((checksum, size))
        }
        .await;

        match result {
            Ok((checksum, size)) => {
                self.runtime.notifier.success(format!("{name} 업로드 완료"));
                Some(FileMetadata {
                    file_id: info.file_id.clone(),
                    original_name: name,
                    s3_key: info.s3_key.clone(),
                    content_type,
                    size,
                    checksum,
                })
            }
            Err(e) => {
                error!("[cmms-upload] {name}: {e}");
                self.runtime
                    .notifier
                    .error(format!("{name} 업로드 실패: {e}"));
                None
            }
        }
    }

    /// Upload all files concurrently. One failure never cancels the others.
    async fn upload_to_storage(&self, files: &[File], session: &UploadSession) -> Vec<FileMetadata> {
        if session.upload_infos.len() != files.len() {
            warn!(
                "[cmms-upload] {} files but {} upload slots",
                files.len(),
                session.upload_infos.len()
            );
        }
        let uploads = pair_by_index(files, &session.upload_infos)
            .map(|(file, info)| self.upload_one(file, info));
        join_all(uploads).await.into_iter().flatten().collect()
    }

    async fn complete_upload(&self, group_id: &str, metadatas: Vec<FileMetadata>) {
        match self.runtime.http.complete_upload(group_id, &metadatas).await {
            Ok(group) => {
                if let Some(doc) = document() {
                    render_items(&doc, &self.list, &group.items, group_id);
                }
                log!("[cmms-upload] stored {} files in {group_id}", metadatas.len());
                self.runtime.notifier.success(success_message(metadatas.len()));
            }
            Err(e) if e.is_forbidden() => {}
            Err(e) => {
                error!("[cmms-upload] complete for {group_id} failed: {e}");
                self.runtime
                    .notifier
                    .error("파일 정보를 저장하는데 실패했습니다.");
            }
        }
    }

    pub fn delete_file(self: &Rc<Self>, file_id: String) {
        let Some(group_id) = self.group_id() else {
            return;
        };
        let name = item_name(&self.list, &file_id).unwrap_or_else(|| file_id.clone());
        if !confirm(&format!("{name} 파일을 삭제하시겠습니까?")) {
            return;
        }

        let w = self.clone();
        spawn_local(async move {
            match w.runtime.http.delete_file(&file_id, &group_id).await {
                Ok(()) => {
                    if let Some(doc) = document() {
                        remove_item(&doc, &w.list, &file_id);
                    }
                    w.runtime
                        .notifier
                        .success(format!("{name} 파일이 삭제되었습니다."));
                }
                Err(e) if e.is_forbidden() => {}
                Err(e) => {
                    error!("[cmms-upload] delete {file_id} failed: {e}");
                    w.runtime.notifier.error("파일 삭제에 실패했습니다.");
                }
            }
        });
    }
}

/// Attach a widget to every upload container under `root` not yet wired.
pub(crate) fn discover(root: &Element, runtime: &Runtime, scope: &ListenerScope) {
    for container in find_all(root, WIDGET_SELECTOR) {
        if container.has_attribute("data-cmms-bound-upload") {
            continue;
        }
        match UploadWidget::attach(&container, runtime, scope) {
            Ok(widget) => {
                mark_once(&container, "upload");
                spawn_local(async move {
                    widget.load_existing().await;
                });
            }
            Err(e) => warn!("[cmms-upload] {e}; container left as is"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_attrs_override_config() {
        let config = EnvConfig::default();
        let attrs = |name: &str| match name {
            "data-group-id" => Some("F250119001".to_string()),
            "data-ref-entity" => Some("PLANT".to_string()),
            "data-ref-id" => Some(" P-1 ".to_string()),
            "data-max-files" => Some("3".to_string()),
            "data-allowed-types" => Some("image/*, application/pdf,".to_string()),
            _ => None,
        };
        let o = UploadOptions::from_attrs(attrs, &config);
        assert_eq!(o.group_id.as_deref(), Some("F250119001"));
        assert_eq!(o.ref_id.as_deref(), Some("P-1"));
        assert_eq!(o.max_files, 3);
        assert_eq!(o.max_file_size, config.max_file_size);
        assert_eq!(o.allowed_types, vec!["image/*", "application/pdf"]);
    }

    #[test]
    fn test_options_fall_back_on_blank_or_bad_values() {
        let config = EnvConfig::default();
        let attrs = |name: &str| match name {
            "data-group-id" => Some("  ".to_string()),
            "data-max-file-size" => Some("lots".to_string()),
            _ => None,
        };
        let o = UploadOptions::from_attrs(attrs, &config);
        assert_eq!(o.group_id, None);
        assert_eq!(o.max_file_size, 10 * 1024 * 1024);
        assert_eq!(o.allowed_types, config.allowed_types);
    }

    #[test]
    fn test_pair_by_index_drops_surplus() {
        let info = |id: &str| UploadInfo {
            file_id: id.to_string(),
            presigned_url: format!("https://s3.example.net/{id}"),
            s3_key: id.to_string(),
        };
        let files = ["a", "b", "c"];
        let infos = [info("1"), info("2")];
        let pairs: Vec<_> = pair_by_index(&files, &infos)
            .map(|(f, i)| (*f, i.file_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2")]);
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_success_message() {
        assert_eq!(success_message(2), "2개 파일이 성공적으로 업로드되었습니다.");
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture(html: &str) -> Element {
        let doc = document().expect("document");
        let root = doc.create_element("div").expect("div");
        root.set_inner_html(html);
        doc.body().expect("body").append_child(&root).expect("append");
        root
    }

    #[wasm_bindgen_test]
    fn test_incomplete_markup_is_left_untouched() {
        let root = fixture(r#"<div data-attachments data-upload><input type="file"></div>"#);
        let container = root.first_element_child().expect("container");
        let scope = ListenerScope::detachable();
        let err = UploadWidget::attach(&container, &Runtime::new(EnvConfig::default()), &scope)
            .err()
            .expect("markup error");
        assert_eq!(err, UploadError::Markup(".attachments-list"));

        discover(&root, &Runtime::new(EnvConfig::default()), &scope);
        assert_eq!(scope.len(), 0);
        assert!(!container.has_attribute("data-cmms-bound-upload"));
        root.remove();
    }

    #[wasm_bindgen_test]
    fn test_group_field_seeds_options() {
        let root = fixture(
            r#"<div data-attachments data-ref-entity="PLANT" data-ref-id="P1">
                 <input type="hidden" name="file_group_id" value="G-7">
                 <ul class="attachments-list"></ul>
                 <input type="file" hidden>
                 <button type="button" data-attachments-add>추가</button>
               </div>"#,
        );
        let container = root.first_element_child().expect("container");
        let scope = ListenerScope::detachable();
        let widget = UploadWidget::attach(&container, &Runtime::new(EnvConfig::default()), &scope)
            .ok()
            .expect("widget");
        assert_eq!(widget.group_id().as_deref(), Some("G-7"));
        assert_eq!(widget.options.borrow().ref_entity.as_deref(), Some("PLANT"));

        // Listeners hold the widget; clearing the scope releases it.
        assert!(Rc::strong_count(&widget) > 1);
        scope.clear();
        assert_eq!(Rc::strong_count(&widget), 1);
        root.remove();
    }
}
