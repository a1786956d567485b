use crate::error::ChapterError;
use crate::models::{LogLevel, OutlineEntry};
use crate::services::document::Document;
use crate::services::logger::Logger;
use lopdf::{Object, ObjectId, dictionary};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// In-memory document. Writing a range records it and drops a small marker file.
#[derive(Default)]
pub struct FakeDocument {
    pub pages: Vec<String>,
    pub outline: Vec<OutlineEntry>,
    pub writes: RefCell<Vec<(usize, usize, PathBuf)>>,
    pub fail_writes_after: Option<usize>,
}

impl FakeDocument {
    pub fn with_pages(count: usize) -> Self {
        FakeDocument {
            pages: (1..=count).map(|n| format!("text of page {}", n)).collect(),
            ..Default::default()
        }
    }

    pub fn with_outline(mut self, outline: Vec<OutlineEntry>) -> Self {
        self.outline = outline;
        self
    }

    pub fn written_ranges(&self) -> Vec<(usize, usize)> {
        self.writes.borrow().iter().map(|(a, b, _)| (*a, *b)).collect()
    }

    pub fn written_names(&self) -> Vec<String> {
        self.writes
            .borrow()
            .iter()
            .map(|(_, _, p)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

impl Document for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page_index: usize) -> Result<String, ChapterError> {
        self.pages
            .get(page_index)
            .cloned()
            .ok_or_else(|| ChapterError::ExtractionInput(format!("no page {}", page_index)))
    }

    fn outline(&self) -> Vec<OutlineEntry> {
        self.outline.clone()
    }

    fn write_page_range(&self, first: usize, last: usize, dest: &Path) -> Result<(), ChapterError> {
        if let Some(limit) = self.fail_writes_after {
            if self.writes.borrow().len() >= limit {
                return Err(ChapterError::io(dest, "simulated write failure"));
            }
        }
        std::fs::write(dest, format!("{}-{}", first, last)).map_err(|e| ChapterError::io(dest, e))?;
        self.writes.borrow_mut().push((first, last, dest.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingLogger {
    pub entries: RefCell<Vec<(String, LogLevel)>>,
}

impl RecordingLogger {
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(_, l)| *l == level)
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.messages(level).len()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.borrow().iter().any(|(m, _)| m.contains(needle))
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: &str, level: LogLevel) {
        self.entries.borrow_mut().push((message.to_string(), level));
    }
}

/// A `lopdf` document whose catalog holds `count` empty pages, with their ids in order.
pub fn blank_pages(count: usize) -> (lopdf::Document, Vec<ObjectId>) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_ids: Vec<ObjectId> = (0..count)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            })
        })
        .collect();
    insert_page_tree(&mut doc, pages_id, &page_ids, dictionary! {});
    (doc, page_ids)
}

/// Stores the `/Pages` node and a catalog pointing at it.
pub fn insert_page_tree(
    doc: &mut lopdf::Document,
    pages_id: ObjectId,
    page_ids: &[ObjectId],
    mut extra: lopdf::Dictionary,
) {
    extra.set("Type", "Pages");
    extra.set(
        "Kids",
        page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
    );
    extra.set("Count", page_ids.len() as i64);
    extra.set(
        "MediaBox",
        vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
    );
    doc.objects.insert(pages_id, Object::Dictionary(extra));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
}

pub fn set_catalog_entry(doc: &mut lopdf::Document, key: &str, value: impl Into<Object>) {
    let root = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
    doc.get_object_mut(root)
        .and_then(Object::as_dict_mut)
        .unwrap()
        .set(key, value);
}

/// One bookmark for [`attach_outline`].
pub struct OutlineSpec {
    pub level: usize,
    pub title: Object,
    pub page: ObjectId,
}

impl OutlineSpec {
    pub fn new(level: usize, title: &str, page: ObjectId) -> Self {
        Self::with_title(level, Object::string_literal(title), page)
    }

    pub fn with_title(level: usize, title: Object, page: ObjectId) -> Self {
        OutlineSpec { level, title, page }
    }
}

/// Builds a linked `/Outlines` tree from a pre-order list of bookmarks.
pub fn attach_outline(doc: &mut lopdf::Document, items: &[OutlineSpec]) {
    let root_id = doc.new_object_id();
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

    for (i, item) in items.iter().enumerate() {
        let parent = items[..i]
            .iter()
            .rposition(|p| p.level < item.level)
            .map_or(root_id, |j| ids[j]);
        let mut dict = dictionary! {
            "Title" => item.title.clone(),
            "Parent" => parent,
            "Dest" => vec![Object::Reference(item.page), Object::Name(b"Fit".to_vec())],
        };

        let later = &items[i + 1..];
        if let Some(k) = later.iter().position(|c| c.level <= item.level) {
            if later[k].level == item.level {
                dict.set("Next", ids[i + 1 + k]);
            }
        }
        if later.first().is_some_and(|c| c.level == item.level + 1) {
            dict.set("First", ids[i + 1]);
        }
        doc.objects.insert(ids[i], Object::Dictionary(dict));
    }

    let mut root = dictionary! { "Type" => "Outlines" };
    if let Some(&first) = ids.first() {
        root.set("First", first);
    }
    doc.objects.insert(root_id, Object::Dictionary(root));
    set_catalog_entry(doc, "Outlines", root_id);
}
