use crate::models::OutlineEntry;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};

// Bounds for malformed files: nesting, reference chains and name indirections.
const MAX_DEPTH: usize = 64;

/// Page number reported for bookmarks whose destination is not a local page.
pub const UNRESOLVED_PAGE: i64 = -1;

/// Reads the `/Outlines` tree in document order, one entry per bookmark.
///
/// Repeated titles are kept. Entries pointing outside the document, or at
/// something we cannot follow, carry [`UNRESOLVED_PAGE`].
pub fn read_outline(doc: &Document) -> Vec<OutlineEntry> {
    let reader = OutlineReader::new(doc);
    let Some(root) = reader.catalog_entry(b"Outlines").and_then(|o| o.as_dict().ok()) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut visited = HashSet::new();
    let mut pending: Vec<(ObjectId, usize)> = Vec::new();
    if let Some(first) = reference(root, b"First") {
        pending.push((first, 1));
    }

    while let Some((id, level)) = pending.pop() {
        if level > MAX_DEPTH || !visited.insert(id) {
            continue;
        }
        let Some(item) = doc.get_object(id).ok().and_then(|o| o.as_dict().ok()) else {
            continue;
        };

        let title = reader
            .resolve(item.get(b"Title").ok())
            .and_then(text_string)
            .unwrap_or_default();
        let page = reader.item_page(item).unwrap_or(UNRESOLVED_PAGE);
        entries.push(OutlineEntry::new(level, title, page));

        // Children are visited before the next sibling
        if let Some(next) = reference(item, b"Next") {
            pending.push((next, level));
        }
        if let Some(child) = reference(item, b"First") {
            pending.push((child, level + 1));
        }
    }

    entries
}

struct OutlineReader<'a> {
    doc: &'a Document,
    catalog: Option<&'a Dictionary>,
    page_numbers: HashMap<ObjectId, i64>,
}

impl<'a> OutlineReader<'a> {
    fn new(doc: &'a Document) -> Self {
        let catalog = doc
            .trailer
            .get(b"Root")
            .ok()
            .and_then(|root| follow(doc, root))
            .and_then(|root| root.as_dict().ok());
        let page_numbers = doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| (id, number as i64))
            .collect();

        OutlineReader {
            doc,
            catalog,
            page_numbers,
        }
    }

    fn resolve(&self, object: Option<&'a Object>) -> Option<&'a Object> {
        follow(self.doc, object?)
    }

    fn catalog_entry(&self, key: &[u8]) -> Option<&'a Object> {
        self.resolve(self.catalog?.get(key).ok())
    }

    fn item_page(&self, item: &'a Dictionary) -> Option<i64> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.destination_page(dest, 0);
        }

        let action = self.resolve(item.get(b"A").ok())?.as_dict().ok()?;
        match action.get(b"S") {
            Ok(Object::Name(kind)) if kind.as_slice() == b"GoTo" => {}
            _ => return None,
        }
        self.destination_page(action.get(b"D").ok()?, 0)
    }

    fn destination_page(&self, dest: &'a Object, depth: usize) -> Option<i64> {
        if depth > MAX_DEPTH {
            return None;
        }

        match self.resolve(Some(dest))? {
            Object::Array(parts) => match parts.first()? {
                Object::Reference(page_id) => self.page_numbers.get(page_id).copied(),
                _ => None,
            },
            Object::Dictionary(wrapper) => {
                self.destination_page(wrapper.get(b"D").ok()?, depth + 1)
            }
            Object::Name(name) | Object::String(name, _) => {
                self.destination_page(self.named_destination(name)?, depth + 1)
            }
            _ => None,
        }
    }

    fn named_destination(&self, name: &[u8]) -> Option<&'a Object> {
        // PDF 1.1 style /Dests dictionary in the catalog
        if let Some(Object::Dictionary(dests)) = self.catalog_entry(b"Dests") {
            if let Ok(dest) = dests.get(name) {
                return Some(dest);
            }
        }

        let names = self.catalog_entry(b"Names")?.as_dict().ok()?;
        let tree = self.resolve(names.get(b"Dests").ok())?.as_dict().ok()?;
        self.name_tree_lookup(tree, name, 0)
    }

    fn name_tree_lookup(
        &self,
        node: &'a Dictionary,
        name: &[u8],
        depth: usize,
    ) -> Option<&'a Object> {
        if depth > MAX_DEPTH {
            return None;
        }

        if let Some(Object::Array(pairs)) = self.resolve(node.get(b"Names").ok()) {
            for pair in pairs.chunks_exact(2) {
                if let Some(Object::String(key, _)) = self.resolve(Some(&pair[0])) {
                    if key.as_slice() == name {
                        return Some(&pair[1]);
                    }
                }
            }
        }

        let Some(Object::Array(kids)) = self.resolve(node.get(b"Kids").ok()) else {
            return None;
        };
        kids.iter()
            .filter_map(|kid| self.resolve(Some(kid))?.as_dict().ok())
            .find_map(|kid| self.name_tree_lookup(kid, name, depth + 1))
    }
}

fn follow<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn reference(dict: &Dictionary, key: &[u8]) -> Option<ObjectId> {
    match dict.get(key) {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    }
}

fn text_string(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE or UTF-8 with a byte order mark,
/// PDFDocEncoding otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        return String::from_utf8_lossy(rest).into_owned();
    }

    bytes.iter().map(|&b| pdf_doc_char(b)).collect()
}

fn pdf_doc_char(byte: u8) -> char {
    match byte {
        0x18 => '\u{02D8}',
        0x19 => '\u{02C7}',
        0x1A => '\u{02C6}',
        0x1B => '\u{02D9}',
        0x1C => '\u{02DD}',
        0x1D => '\u{02DB}',
        0x1E => '\u{02DA}',
        0x1F => '\u{02DC}',
        0x80 => '\u{2022}',
        0x81 => '\u{2020}',
        0x82 => '\u{2021}',
        0x83 => '\u{2026}',
        0x84 => '\u{2014}',
        0x85 => '\u{2013}',
        0x86 => '\u{0192}',
        0x87 => '\u{2044}',
        0x88 => '\u{2039}',
        0x89 => '\u{203A}',
        0x8A => '\u{2212}',
        0x8B => '\u{2030}',
        0x8C => '\u{201E}',
        0x8D => '\u{201C}',
        0x8E => '\u{201D}',
        0x8F => '\u{2018}',
        0x90 => '\u{2019}',
        0x91 => '\u{201A}',
        0x92 => '\u{2122}',
        0x93 => '\u{FB01}',
        0x94 => '\u{FB02}',
        0x95 => '\u{0141}',
        0x96 => '\u{0152}',
        0x97 => '\u{0160}',
        0x98 => '\u{0178}',
        0x99 => '\u{017D}',
        0x9A => '\u{0131}',
        0x9B => '\u{0142}',
        0x9C => '\u{0153}',
        0x9D => '\u{0161}',
        0x9E => '\u{017E}',
        0x7F | 0x9F => char::REPLACEMENT_CHARACTER,
        0xA0 => '\u{20AC}',
        // Everything else matches Latin-1
        other => other as char,
    }
}
