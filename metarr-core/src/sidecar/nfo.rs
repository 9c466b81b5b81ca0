// ============================================================================
// metarr-core/src/sidecar/nfo.rs
// ============================================================================
//
// NFO SIDECARS: Kodi-style XML metadata
//
// The document is kept as text so that edits touch only the element being
// changed and every unknown element survives a rewrite. A typed `NfoData`
// view is parsed with quick-xml's serde deserializer after every decode and
// every edit, and it is what the fill pipeline reads.
//
// KEY COMPONENTS:
// - NfoRw: locked reader/writer over the textual document
// - NfoData: typed view (titles, credits, plot, dates, show info)
// - tag_for_field: fill-pipeline key -> NFO element used for write-back

// ---- Standard library imports ----
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

// ---- External crate imports ----
use log::{debug, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use quick_xml::escape::{escape, unescape};
use regex::Regex;
use serde::Deserialize;

// ---- Internal crate imports ----
use super::lock::SidecarGuard;
use super::pool::PooledBuffer;
use super::{SidecarValues, rewrite_file};
use crate::error::{CoreError, CoreResult};
use crate::model::CreditField;

pub const XML_PREAMBLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Root elements accepted as-is; anything else is wrapped in `<movie>`.
const KNOWN_ROOTS: &[&str] = &["movie", "episodedetails", "tvshow", "musicvideo"];

// ============================================================================
// TYPED VIEW
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NfoActor {
    pub name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfoTitle {
    pub main: String,
    pub original: String,
    pub sub: String,
    pub plaintext: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfoShowInfo {
    pub show: String,
    pub season: String,
    pub episode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NfoData {
    title: Option<String>,
    originaltitle: Option<String>,
    sorttitle: Option<String>,
    subtitle: Option<String>,
    tagline: Option<String>,

    #[serde(rename = "actor")]
    pub actors: Vec<NfoActor>,
    #[serde(rename = "director")]
    pub directors: Vec<String>,
    #[serde(rename = "producer")]
    pub producers: Vec<String>,
    #[serde(rename = "publisher")]
    pub publishers: Vec<String>,
    #[serde(rename = "studio")]
    pub studios: Vec<String>,
    #[serde(rename = "writer")]
    writer_elements: Vec<String>,
    #[serde(rename = "credits")]
    credit_elements: Vec<String>,

    pub description: Option<String>,
    pub plot: Option<String>,
    url: Option<String>,

    showtitle: Option<String>,
    season: Option<String>,
    episode: Option<String>,

    pub premiered: Option<String>,
    #[serde(rename = "releasedate")]
    pub release_date: Option<String>,
    pub year: Option<String>,
    pub aired: Option<String>,
    #[serde(rename = "genre")]
    pub genres: Vec<String>,
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

impl NfoData {
    pub fn title(&self) -> NfoTitle {
        let sub = match text(&self.subtitle) {
            s if s.is_empty() => text(&self.tagline),
            s => s,
        };
        NfoTitle {
            main: text(&self.title),
            original: text(&self.originaltitle),
            sub,
            plaintext: text(&self.sorttitle),
        }
    }

    pub fn show_info(&self) -> NfoShowInfo {
        NfoShowInfo {
            show: text(&self.showtitle),
            season: text(&self.season),
            episode: text(&self.episode),
        }
    }

    /// The `<url>` element.
    pub fn webpage_info(&self) -> String {
        text(&self.url)
    }

    /// `<writer>` and `<credits>` elements, in that order.
    pub fn writers(&self) -> Vec<String> {
        self.writer_elements
            .iter()
            .chain(&self.credit_elements)
            .cloned()
            .collect()
    }

    /// Flattens the typed view into fill-pipeline field names.
    pub fn values(&self) -> SidecarValues {
        let mut values = SidecarValues::default();
        let title = self.title();
        values.put("title", &title.main);
        values.put("fulltitle", &title.original);
        values.put("subtitle", &title.sub);

        let description = text(&self.description);
        let plot = text(&self.plot);
        let synopsis = if plot.is_empty() { &description } else { &plot };
        values.put("description", if description.is_empty() { &plot } else { &description });
        values.put("synopsis", synopsis);
        values.put("summary", synopsis);

        let actors: Vec<String> = self.actors.iter().filter_map(|a| a.name.clone()).collect();
        values.put_list(CreditField::Actor, actors);
        values.put_list(CreditField::Director, self.directors.clone());
        values.put_list(CreditField::Producer, self.producers.clone());
        values.put_list(CreditField::Publisher, self.publishers.clone());
        values.put_list(CreditField::Studio, self.studios.clone());
        values.put_list(CreditField::Writer, self.writers());

        let release = match text(&self.release_date) {
            r if r.is_empty() => text(&self.premiered),
            r => r,
        };
        values.put("release_date", &release);
        values.put("date", &text(&self.aired));
        values.put("year", &text(&self.year));
        values.put("webpage_url", &self.webpage_info());

        let show = self.show_info();
        values.put("show", &show.show);
        values.put("season_number", &show.season);
        values.put("episode_sort", &show.episode);

        let genres: Vec<&str> = self
            .genres
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .collect();
        values.put("genre", &genres.join("; "));
        values
    }
}

/// NFO element that stores a fill-pipeline field, if there is one.
pub fn tag_for_field(field: &str) -> Option<&'static str> {
    let tag = match field {
        "title" => "title",
        "fulltitle" => "originaltitle",
        "subtitle" => "subtitle",
        "description" => "description",
        "synopsis" => "plot",
        "release_date" => "premiered",
        "date" => "aired",
        "year" => "year",
        "webpage_url" => "url",
        "director" => "director",
        "studio" => "studio",
        "producer" => "producer",
        "publisher" => "publisher",
        "writer" => "credits",
        "genre" => "genre",
        "show" => "showtitle",
        "season_number" => "season",
        "episode_sort" => "episode",
        _ => return None,
    };
    Some(tag)
}

// ============================================================================
// TEXT NORMALISATION
// ============================================================================

fn first_element_name(text: &str) -> Option<&str> {
    let mut rest = text;
    loop {
        let start = rest.find('<')?;
        rest = &rest[start + 1..];
        if rest.starts_with('?') || rest.starts_with('!') {
            continue;
        }
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        return Some(&rest[..end]);
    }
}

/// Inserts the XML preamble and a `<movie>` root when missing.
/// Returns the document and the root element name.
pub fn normalise_document(raw: &str) -> (String, String) {
    let body = raw.trim_start_matches('\u{feff}').trim();
    let (preamble, rest) = if body.starts_with("<?xml") {
        match body.find("?>") {
            Some(end) => (body[..end + 2].to_string(), body[end + 2..].trim()),
            None => (XML_PREAMBLE.to_string(), body),
        }
    } else {
        (XML_PREAMBLE.to_string(), body)
    };

    match first_element_name(rest) {
        Some(root) if KNOWN_ROOTS.contains(&root) => {
            let root = root.to_string();
            (format!("{preamble}\n{rest}\n"), root)
        }
        _ => (
            format!("{preamble}\n<movie>\n{rest}\n</movie>\n"),
            "movie".to_string(),
        ),
    }
}

/// Compiled patterns for one element name.
#[derive(Clone)]
struct ElementPatterns {
    /// `<tag ...>content</tag>`, content in group 1
    element: Regex,
    /// `<tag ... />`
    empty: Regex,
}

static ELEMENT_PATTERNS: Lazy<Mutex<HashMap<String, ElementPatterns>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn element_patterns(tag: &str) -> CoreResult<ElementPatterns> {
    if let Some(patterns) = ELEMENT_PATTERNS.lock().get(tag) {
        return Ok(patterns.clone());
    }
    let t = regex::escape(tag);
    let compile = |pattern: String| Regex::new(&pattern).map_err(|e| CoreError::Xml(e.to_string()));
    let patterns = ElementPatterns {
        element: compile(format!(r"(?s)<{t}(?:\s[^>]*)?>(.*?)</{t}\s*>"))?,
        empty: compile(format!(r"<{t}(?:\s[^>]*)?/>"))?,
    };
    ELEMENT_PATTERNS
        .lock()
        .insert(tag.to_string(), patterns.clone());
    Ok(patterns)
}

fn is_valid_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

// ============================================================================
// READER / WRITER
// ============================================================================

#[derive(Debug)]
pub struct NfoRw {
    path: PathBuf,
    file: File,
    buf: PooledBuffer,
    text: String,
    root: String,
    data: NfoData,
    dirty: bool,
    no_file_overwrite: bool,
    backed_up: bool,
    _guard: SidecarGuard,
}

impl NfoRw {
    /// Opens and decodes `path` while holding `guard`.
    pub fn open(path: &Path, guard: SidecarGuard, no_file_overwrite: bool) -> CoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| CoreError::sidecar(path, e))?;
        let mut rw = Self {
            path: path.to_path_buf(),
            file,
            buf: PooledBuffer::take(),
            text: String::new(),
            root: "movie".to_string(),
            data: NfoData::default(),
            dirty: false,
            no_file_overwrite,
            backed_up: false,
            _guard: guard,
        };
        rw.decode()?;
        Ok(rw)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, normalises it and parses the typed view.
    pub fn decode(&mut self) -> CoreResult<&NfoData> {
        self.buf.clear();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut self.buf))
            .map_err(|e| CoreError::sidecar(&self.path, e))?;
        let raw = std::str::from_utf8(&self.buf).map_err(|e| CoreError::sidecar(&self.path, e))?;

        let (text, root) = normalise_document(raw);
        // A normalised document differs from disk and is written back on the
        // next committed edit.
        self.dirty = text.trim() != raw.trim();
        self.text = text;
        self.root = root;
        self.reparse()?;
        Ok(&self.data)
    }

    pub fn refresh(&mut self) -> CoreResult<&NfoData> {
        self.decode()
    }

    fn reparse(&mut self) -> CoreResult<()> {
        self.data = quick_xml::de::from_str(&self.text)
            .map_err(|e| CoreError::sidecar(&self.path, format!("invalid NFO: {e}")))?;
        Ok(())
    }

    pub fn data(&self) -> &NfoData {
        &self.data
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn values(&self) -> SidecarValues {
        self.data.values()
    }

    /// Unescaped text of the first `<tag>` element.
    pub fn get_str(&self, tag: &str) -> Option<String> {
        let patterns = element_patterns(tag).ok()?;
        let caps = patterns.element.captures(&self.text)?;
        let inner = caps.get(1)?.as_str();
        if inner.contains('<') {
            return None;
        }
        Some(match unescape(inner) {
            Ok(v) => v.into_owned(),
            Err(_) => inner.to_string(),
        })
    }

    /// Replaces the content of `<tag>` or inserts the element before the
    /// root's closing tag. Returns whether the document changed.
    pub fn set_str(&mut self, tag: &str, value: &str) -> CoreResult<bool> {
        if !is_valid_tag_name(tag) {
            return Err(CoreError::Xml(format!("'{tag}' is not a valid element name")));
        }
        if self.get_str(tag).as_deref() == Some(value) {
            return Ok(false);
        }
        let escaped = escape(value);
        let element = format!("<{tag}>{escaped}</{tag}>");

        let patterns = element_patterns(tag)?;
        let updated = if let Some(caps) = patterns.element.captures(&self.text) {
            let inner = caps.get(1).map(|m| m.range()).unwrap_or(0..0);
            let mut text = self.text.clone();
            text.replace_range(inner, &escaped);
            text
        } else if let Some(m) = patterns.empty.find(&self.text) {
            let mut text = self.text.clone();
            text.replace_range(m.range(), &element);
            text
        } else {
            let closing = format!("</{}>", self.root);
            let at = self.text.rfind(&closing).ok_or_else(|| {
                CoreError::sidecar(&self.path, format!("missing {closing} closing tag"))
            })?;
            let mut text = self.text.clone();
            text.insert_str(at, &format!("  {element}\n"));
            text
        };

        let previous = std::mem::replace(&mut self.text, updated);
        if let Err(e) = self.reparse() {
            warn!("Edit of <{}> produced an unparsable NFO, reverting: {}", tag, e);
            self.text = previous;
            self.reparse()?;
            return Err(e);
        }
        self.dirty = true;
        Ok(true)
    }

    pub fn write_to_file(&mut self) -> CoreResult<()> {
        if self.no_file_overwrite && !self.backed_up {
            crate::fsutil::backup_file(&self.path)?;
            self.backed_up = true;
        }
        self.buf.clear();
        self.buf.extend_from_slice(self.text.as_bytes());
        rewrite_file(&mut self.file, &self.path, &self.buf)?;
        self.dirty = false;
        debug!("Wrote NFO sidecar {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::lock::lock_sidecar;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<movie>
  <title>Hello &amp; Goodbye</title>
  <originaltitle>Hello Original</originaltitle>
  <plot>A plot.</plot>
  <actor><name>Ann</name><role>Lead</role></actor>
  <director>Dee</director>
  <actor><name>Bob</name></actor>
  <premiered>2023-04-05</premiered>
  <fileinfo><streamdetails><video><codec>h264</codec></video></streamdetails></fileinfo>
  <url>https://ex/v/1</url>
</movie>
"#;

    fn open(path: &Path) -> NfoRw {
        NfoRw::open(path, lock_sidecar(path), false).unwrap()
    }

    #[test]
    fn parses_typed_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.nfo");
        std::fs::write(&path, SAMPLE).unwrap();
        let rw = open(&path);
        let data = rw.data();
        assert_eq!(data.title().main, "Hello & Goodbye");
        assert_eq!(data.title().original, "Hello Original");
        assert_eq!(data.actors.len(), 2);
        assert_eq!(data.actors[0].role.as_deref(), Some("Lead"));
        assert_eq!(data.webpage_info(), "https://ex/v/1");

        let values = rw.values();
        assert_eq!(values.get("synopsis"), Some("A plot."));
        assert_eq!(values.get("summary"), Some("A plot."));
        assert_eq!(values.get("description"), Some("A plot."));
        assert_eq!(values.get("release_date"), Some("2023-04-05"));
        assert_eq!(values.lists[&CreditField::Actor], vec!["Ann", "Bob"]);
    }

    #[test]
    fn missing_preamble_and_root_are_inserted() {
        let (doc, root) = normalise_document("<title>Bare</title>");
        assert!(doc.starts_with(XML_PREAMBLE));
        assert!(doc.contains("<movie>\n<title>Bare</title>\n</movie>"));
        assert_eq!(root, "movie");

        let (doc, root) = normalise_document("<episodedetails><title>E</title></episodedetails>");
        assert!(doc.starts_with(XML_PREAMBLE));
        assert_eq!(root, "episodedetails");
        assert!(!doc.contains("<movie>"));
    }

    #[test]
    fn edits_keep_unknown_elements_and_escape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.nfo");
        std::fs::write(&path, SAMPLE).unwrap();
        {
            let mut rw = open(&path);
            assert_eq!(rw.get_str("title").as_deref(), Some("Hello & Goodbye"));
            assert!(rw.set_str("title", "Tom <& Jerry>").unwrap());
            assert!(rw.set_str("genre", "Comedy").unwrap());
            assert!(!rw.set_str("genre", "Comedy").unwrap());
            rw.write_to_file().unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<title>Tom &lt;&amp; Jerry&gt;</title>"));
        assert!(text.contains("<codec>h264</codec>"));
        assert!(text.contains("  <genre>Comedy</genre>\n</movie>"));

        let rw = open(&path);
        assert_eq!(rw.data().title().main, "Tom <& Jerry>");
    }

    #[test]
    fn invalid_tag_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.nfo");
        std::fs::write(&path, SAMPLE).unwrap();
        let mut rw = open(&path);
        assert!(rw.set_str("bad tag", "x").is_err());
    }

    #[test]
    fn unchanged_document_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.nfo");
        std::fs::write(&path, SAMPLE).unwrap();
        {
            let mut rw = open(&path);
            rw.write_to_file().unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), SAMPLE.trim());
    }

    #[test]
    fn element_patterns_are_compiled_once_per_tag() {
        let first = element_patterns("cachedtag").unwrap();
        assert!(ELEMENT_PATTERNS.lock().contains_key("cachedtag"));
        let second = element_patterns("cachedtag").unwrap();
        assert_eq!(first.element.as_str(), second.element.as_str());
        assert!(second.element.is_match("<cachedtag lang=\"en\">x</cachedtag>"));
        assert!(second.empty.is_match("<cachedtag />"));
        assert!(!second.element.is_match("<cachedtagger>x</cachedtagger>"));
    }
}
