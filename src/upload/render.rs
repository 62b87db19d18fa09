//! Attachment list markup, shared by the upload widget and the plain picker.

use crate::api::file_download_path;
use crate::models::FileItem;
use crate::util::{find_all, format_file_size};
use web_sys::{Document, Element};

pub(crate) const ITEM_CLASS: &str = "attachment-item";
pub(crate) const EMPTY_TEXT: &str = "첨부된 파일이 없습니다.";
pub(crate) const DELETE_ATTR: &str = "data-attachment-delete";
pub(crate) const REMOVE_CLASS: &str = "btn-remove";

fn items(list: &Element) -> Vec<Element> {
    find_all(list, &format!("li.{ITEM_CLASS}"))
}

/// Keep exactly one `li.empty` while the list has no items, none otherwise.
pub(crate) fn sync_placeholder(doc: &Document, list: &Element) {
    let empty = items(list).is_empty();
    let placeholders = find_all(list, "li.empty");

    if !empty {
        for p in placeholders {
            p.remove();
        }
        return;
    }
    if placeholders.len() == 1 {
        return;
    }
    for p in placeholders {
        p.remove();
    }
    if let Ok(li) = doc.create_element("li") {
        li.set_class_name("empty");
        li.set_text_content(Some(EMPTY_TEXT));
        let _ = list.append_child(&li);
    }
}

fn span(doc: &Document, class: &str, text: &str) -> Option<Element> {
    let el = doc.create_element("span").ok()?;
    el.set_class_name(class);
    el.set_text_content(Some(text));
    Some(el)
}

/// A locally selected file that has not been uploaded.
pub(crate) fn selected_item(doc: &Document, name: &str, size: u64) -> Option<Element> {
    let li = doc.create_element("li").ok()?;
    li.set_class_name(ITEM_CLASS);
    let name_el = span(doc, "file-name", name)?;
    let size_el = span(doc, "file-size", &format_file_size(size))?;
    li.append_child(&name_el).ok()?;
    li.append_child(&size_el).ok()?;

    let remove = doc.create_element("button").ok()?;
    remove.set_attribute("type", "button").ok()?;
    remove.set_class_name(REMOVE_CLASS);
    remove.set_text_content(Some("제거"));
    remove
        .set_attribute("aria-label", &format!("{name} 파일 제거"))
        .ok()?;
    li.append_child(&remove).ok()?;
    Some(li)
}

/// A stored file with download link and delete button.
pub(crate) fn stored_item(doc: &Document, item: &FileItem, group_id: &str) -> Option<Element> {
    let li = doc.create_element("li").ok()?;
    li.set_class_name(ITEM_CLASS);
    li.set_attribute("data-file-id", &item.file_id).ok()?;
    if let Some(mime) = item.content_type.as_deref().filter(|m| !m.is_empty()) {
        li.set_attribute("data-content-type", mime).ok()?;
    }

    let info = doc.create_element("div").ok()?;
    info.set_class_name("file-info");
    let name_el = span(doc, "file-name", item.display_name())?;
    let size_el = span(doc, "file-size", &format_file_size(item.size.unwrap_or(0)))?;
    info.append_child(&name_el).ok()?;
    info.append_child(&size_el).ok()?;
    li.append_child(&info).ok()?;

    let actions = doc.create_element("div").ok()?;
    actions.set_class_name("file-actions");

    let download = doc.create_element("a").ok()?;
    download
        .set_attribute("href", &file_download_path(&item.file_id, group_id))
        .ok()?;
    download.set_attribute("target", "_blank").ok()?;
    download.set_class_name("btn btn-sm");
    download.set_text_content(Some("다운로드"));
    actions.append_child(&download).ok()?;

    let delete = doc.create_element("button").ok()?;
    delete.set_attribute("type", "button").ok()?;
    delete.set_class_name("btn btn-sm btn-danger");
    delete.set_attribute(DELETE_ATTR, "").ok()?;
    delete.set_text_content(Some("삭제"));
    actions.append_child(&delete).ok()?;

    li.append_child(&actions).ok()?;
    Some(li)
}

/// Replace the list contents with `files`.
pub(crate) fn render_items(doc: &Document, list: &Element, files: &[FileItem], group_id: &str) {
    list.set_inner_html("");
    for item in files {
        if let Some(li) = stored_item(doc, item, group_id) {
            let _ = list.append_child(&li);
        }
    }
    sync_placeholder(doc, list);
}

fn find_item(list: &Element, file_id: &str) -> Option<Element> {
    items(list)
        .into_iter()
        .find(|li| li.get_attribute("data-file-id").as_deref() == Some(file_id))
}

/// Display name of the item for `file_id`.
pub(crate) fn item_name(list: &Element, file_id: &str) -> Option<String> {
    find_item(list, file_id)?
        .query_selector(".file-name")
        .ok()
        .flatten()?
        .text_content()
}

/// Remove the item for `file_id`. Returns whether one was removed.
pub(crate) fn remove_item(doc: &Document, list: &Element, file_id: &str) -> bool {
    let Some(li) = find_item(list, file_id) else {
        return false;
    };
    li.remove();
    sync_placeholder(doc, list);
    true
}

pub(crate) fn item_count(list: &Element) -> usize {
    items(list).len()
}

/// File id of the list item containing `el`.
pub(crate) fn file_id_of(el: &Element) -> Option<String> {
    el.closest(&format!("li.{ITEM_CLASS}"))
        .ok()
        .flatten()
        .and_then(|li| li.get_attribute("data-file-id"))
        .filter(|id| !id.is_empty())
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::util::document;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn item(id: &str, name: &str) -> FileItem {
        FileItem {
            file_id: id.to_string(),
            original_name: Some(name.to_string()),
            size: Some(2048),
            content_type: Some("application/pdf".to_string()),
        }
    }

    fn list() -> (Document, Element) {
        let doc = document().expect("document");
        let ul = doc.create_element("ul").expect("ul");
        ul.set_class_name("attachments-list");
        (doc, ul)
    }

    #[wasm_bindgen_test]
    fn test_empty_items_render_single_placeholder() {
        let (doc, ul) = list();
        ul.set_inner_html(r#"<li class="empty">old</li><li class="empty">old</li>"#);
        render_items(&doc, &ul, &[], "G1");
        assert_eq!(find_all(&ul, "li.empty").len(), 1);
        assert_eq!(item_count(&ul), 0);
    }

    #[wasm_bindgen_test]
    fn test_stored_item_markup() {
        let (doc, ul) = list();
        render_items(&doc, &ul, &[item("f1", "a.pdf")], "G1");
        let li = ul.query_selector("li[data-file-id=f1]").ok().flatten().expect("item");
        let link = li.query_selector("a").ok().flatten().expect("link");
        assert_eq!(
            link.get_attribute("href").as_deref(),
            Some("/api/files/f1/download?groupId=G1")
        );
        assert_eq!(link.get_attribute("target").as_deref(), Some("_blank"));
        assert_eq!(
            li.get_attribute("data-content-type").as_deref(),
            Some("application/pdf")
        );
        assert!(find_all(&ul, "li.empty").is_empty());
        assert_eq!(
            li.query_selector(".file-size").ok().flatten().and_then(|e| e.text_content()).as_deref(),
            Some("2 KB")
        );
    }

    #[wasm_bindgen_test]
    fn test_stored_item_without_name_or_size() {
        let (doc, ul) = list();
        let bare = FileItem {
            file_id: "f9".to_string(),
            original_name: None,
            size: None,
            content_type: None,
        };
        render_items(&doc, &ul, &[bare], "G1");
        assert_eq!(item_name(&ul, "f9").as_deref(), Some("f9"));
        let size = ul.query_selector(".file-size").ok().flatten().and_then(|e| e.text_content());
        assert_eq!(size.as_deref(), Some("0 Bytes"));
        let li = ul.query_selector("li[data-file-id=f9]").ok().flatten().expect("item");
        assert!(!li.has_attribute("data-content-type"));
    }

    #[wasm_bindgen_test]
    fn test_remove_item_removes_exactly_one() {
        let (doc, ul) = list();
        render_items(&doc, &ul, &[item("f1", "a.pdf"), item("f2", "b.pdf")], "G1");
        assert!(remove_item(&doc, &ul, "f1"));
        assert_eq!(item_count(&ul), 1);
        assert!(ul.query_selector("li[data-file-id=f2]").ok().flatten().is_some());
        assert!(!remove_item(&doc, &ul, "missing"));

        assert!(remove_item(&doc, &ul, "f2"));
        assert_eq!(find_all(&ul, "li.empty").len(), 1);
    }
}
