//! Script loading from `.txt` and `.docx` files
//!
//! Whatever the source, the result is plain text with every bit of markup
//! stripped, so nothing the stage renders can carry live HTML.

use crate::error::LoadError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

/// Default size ceiling (10 MiB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

const UTF8_BOM: &str = "\u{feff}";
const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Docx,
}

impl DocumentKind {
    /// Match a file name's extension, case-insensitively
    pub fn from_name(name: &str) -> Result<Self, LoadError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("txt") => Ok(Self::Text),
            Some("docx") => Ok(Self::Docx),
            Some(other) => Err(LoadError::UnsupportedExtension(other.to_string())),
            None => Err(LoadError::UnsupportedExtension("(none)".to_string())),
        }
    }
}

/// A loaded script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub name: String,
    pub content: String,
    pub kind: DocumentKind,
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    max_bytes: u64,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

impl DocumentLoader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Load from disk; the size is checked before anything is read
    pub fn load_path(&self, path: &Path) -> Result<LoadedDocument, LoadError> {
        let size = fs::metadata(path)?.len();
        self.check_size(size)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = fs::read(path)?;
        self.load_bytes(&name, &bytes)
    }

    /// Load an in-memory file named `name`
    ///
    /// Checks run in order: oversize, empty, extension.
    pub fn load_bytes(&self, name: &str, bytes: &[u8]) -> Result<LoadedDocument, LoadError> {
        self.check_size(bytes.len() as u64)?;
        let kind = DocumentKind::from_name(name)?;

        let raw = match kind {
            DocumentKind::Text => decode_text(bytes),
            DocumentKind::Docx => extract_docx(bytes)?,
        };

        log::info!("Loaded {} ({:?}, {} bytes)", name, kind, bytes.len());
        Ok(LoadedDocument {
            name: name.to_string(),
            content: sanitize(&raw),
            kind,
        })
    }

    fn check_size(&self, size: u64) -> Result<(), LoadError> {
        if size > self.max_bytes {
            return Err(LoadError::OversizeFile {
                size,
                limit: self.max_bytes,
            });
        }
        if size == 0 {
            return Err(LoadError::EmptyFile);
        }
        Ok(())
    }
}

/// UTF-8, lossy, without a leading byte order mark
fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix(UTF8_BOM).unwrap_or(&text).to_string()
}

/// Raw text of a Word document's body
///
/// Runs are concatenated, `w:tab` becomes a tab, `w:br`/`w:cr` a newline and
/// paragraphs are separated by a blank line.
pub fn extract_docx(bytes: &[u8]) -> Result<String, LoadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| LoadError::Parse(format!("not a docx archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| LoadError::Parse(format!("{}: {}", DOCX_BODY, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| LoadError::Parse(format!("{}: {}", DOCX_BODY, e)))?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                b"w:p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| LoadError::Parse(format!("bad text run: {}", e)))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(LoadError::Parse(format!(
                    "malformed document.xml at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join("\n\n").trim_end().to_string())
}

/// Passes before giving up on decoding nested entities
const MAX_SANITIZE_PASSES: usize = 16;

/// Strip all markup and return plain text
///
/// Elements are removed but their text kept, except `script` and `style`
/// whose contents go too. Entities produced by the cleaner are decoded back,
/// and cleaning repeats until the text stops changing so that decoded
/// entities never turn into markup. The result is a fixed point:
/// `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_SANITIZE_PASSES {
        let next = decode_entities(&clean_markup(&current));
        if next == current {
            return current;
        }
        current = next;
    }
    log::warn!("Markup still changing after {} passes; keeping it escaped", MAX_SANITIZE_PASSES);
    clean_markup(&current)
}

fn clean_markup(text: &str) -> String {
    let dropped: HashSet<&str> = ["script", "style"].into_iter().collect();
    ammonia::Builder::empty()
        .clean_content_tags(dropped)
        .clean(text)
        .to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
