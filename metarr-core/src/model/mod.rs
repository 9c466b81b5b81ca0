// ============================================================================
// metarr-core/src/model/mod.rs
// ============================================================================
//
// DATA MODEL: The per-video FileData record
//
// A FileData is created by the batch orchestrator for every matched
// video/sidecar pair and is then owned by exactly one worker. The fill
// pipeline populates its metadata groups from the sidecar, the transcode
// builder reads them back as container tags, and the executor records the
// output paths on it.
//
// KEY COMPONENTS:
// - FileData: paths, metadata groups, edit operations and flags
// - Field groups: Titles, Descriptions, Credits, Dates, Web, Show, Other
// - CreditField: credit names in inference priority order
// - ops: immutable edit-operation records shared by the whole run

pub mod ops;

pub use ops::*;

// ---- Standard library imports ----
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};

// ============================================================================
// PATHS
// ============================================================================

/// Sidecar flavour, chosen from the sidecar extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SidecarKind {
    Json,
    Nfo,
}

impl SidecarKind {
    /// Determines the kind from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "nfo" => Some(Self::Nfo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// `None` for metadata-only items
    pub original_video: Option<PathBuf>,
    pub video_dir: PathBuf,
    pub sidecar_path: PathBuf,
    pub sidecar_kind: SidecarKind,
    pub temp_output: Option<PathBuf>,
    pub final_output: Option<PathBuf>,
    pub renamed_video: Option<PathBuf>,
    pub renamed_sidecar: Option<PathBuf>,
}

// ============================================================================
// FIELD GROUPS
// ============================================================================

macro_rules! string_group {
    ($(#[$meta:meta])* $name:ident { $($field:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: String,)+
        }

        impl $name {
            /// Sidecar keys of this group, in declaration order.
            pub const KEYS: &'static [&'static str] = &[$($key),+];

            pub fn get(&self, key: &str) -> Option<&str> {
                match key {
                    $($key => Some(self.$field.as_str()),)+
                    _ => None,
                }
            }

            pub fn get_mut(&mut self, key: &str) -> Option<&mut String> {
                match key {
                    $($key => Some(&mut self.$field),)+
                    _ => None,
                }
            }
        }
    };
}

string_group!(Titles {
    title => "title",
    fulltitle => "fulltitle",
    subtitle => "subtitle",
});

string_group!(
    /// `long_description` is read from the hyphenated `long-description`
    /// key and `long_underscore_description` from `long_description`.
    Descriptions {
        long_description => "long-description",
        long_underscore_description => "long_description",
        description => "description",
        synopsis => "synopsis",
        summary => "summary",
        comment => "comment",
    }
);

string_group!(Dates {
    release_date => "release_date",
    originally_available_at => "originally_available_at",
    date => "date",
    upload_date => "upload_date",
    year => "year",
    creation_time => "creation_time",
    formatted_date => "formatted_date",
    string_date => "string_date",
});

string_group!(Show {
    show => "show",
    episode_id => "episode_id",
    episode_sort => "episode_sort",
    season_number => "season_number",
    season_title => "season_title",
});

string_group!(Other {
    language => "language",
    genre => "genre",
    hd_video => "hd_video",
});

/// Web fields plus the ordered list of URLs handed to the scraper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Web {
    pub webpage_url: String,
    pub video_url: String,
    pub domain: String,
    pub referer: String,
    /// Duplicates are kept, retry order matters
    pub try_urls: Vec<String>,
}

impl Web {
    pub const KEYS: &'static [&'static str] = &["webpage_url", "video_url", "domain", "referer"];

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "webpage_url" => Some(&self.webpage_url),
            "video_url" => Some(&self.video_url),
            "domain" => Some(&self.domain),
            "referer" => Some(&self.referer),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "webpage_url" => Some(&mut self.webpage_url),
            "video_url" => Some(&mut self.video_url),
            "domain" => Some(&mut self.domain),
            "referer" => Some(&mut self.referer),
            _ => None,
        }
    }
}

/// Credit fields, declared in inference priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CreditField {
    Creator,
    Performer,
    Author,
    Artist,
    Channel,
    Director,
    Actor,
    Studio,
    Producer,
    Writer,
    Uploader,
    Publisher,
    Composer,
}

impl CreditField {
    /// All credit fields in priority order.
    pub const ALL: [CreditField; 13] = [
        CreditField::Creator,
        CreditField::Performer,
        CreditField::Author,
        CreditField::Artist,
        CreditField::Channel,
        CreditField::Director,
        CreditField::Actor,
        CreditField::Studio,
        CreditField::Producer,
        CreditField::Writer,
        CreditField::Uploader,
        CreditField::Publisher,
        CreditField::Composer,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CreditField::Creator => "creator",
            CreditField::Performer => "performer",
            CreditField::Author => "author",
            CreditField::Artist => "artist",
            CreditField::Channel => "channel",
            CreditField::Director => "director",
            CreditField::Actor => "actor",
            CreditField::Studio => "studio",
            CreditField::Producer => "producer",
            CreditField::Writer => "writer",
            CreditField::Uploader => "uploader",
            CreditField::Publisher => "publisher",
            CreditField::Composer => "composer",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Singular credit strings plus parallel ordered lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credits {
    singular: BTreeMap<CreditField, String>,
    lists: BTreeMap<CreditField, Vec<String>>,
}

impl Credits {
    pub fn get(&self, field: CreditField) -> &str {
        self.singular.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn get_mut(&mut self, field: CreditField) -> &mut String {
        self.singular.entry(field).or_default()
    }

    pub fn set(&mut self, field: CreditField, value: impl Into<String>) {
        self.singular.insert(field, value.into());
    }

    pub fn list(&self, field: CreditField) -> &[String] {
        self.lists.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stores `values` as the list form of `field`. A non-empty list also
    /// overwrites the singular value with the `"; "`-joined form.
    pub fn set_list(&mut self, field: CreditField, values: Vec<String>) {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return;
        }
        self.set(field, values.join("; "));
        self.lists.insert(field, values);
    }

    /// The value emitted into the container: the joined list when present,
    /// else the singular string.
    pub fn display_value(&self, field: CreditField) -> String {
        let list = self.list(field);
        if list.is_empty() {
            self.get(field).trim().to_string()
        } else {
            list.join("; ")
        }
    }

    pub fn all_filled(&self) -> bool {
        CreditField::ALL.iter().all(|f| !self.get(*f).is_empty())
    }

    pub fn all_empty(&self) -> bool {
        CreditField::ALL.iter().all(|f| self.get(*f).is_empty())
    }
}

// ============================================================================
// FILE DATA
// ============================================================================

/// Per-video record carried through fill, edit, probe and transcode.
#[derive(Debug, Clone)]
pub struct FileData {
    pub batch_id: u64,
    pub paths: Paths,

    pub titles: Titles,
    pub descriptions: Descriptions,
    pub credits: Credits,
    pub dates: Dates,
    pub web: Web,
    pub show: Show,
    pub other: Other,

    pub meta_ops: Arc<MetaOps>,
    pub filename_ops: Arc<FilenameOps>,

    pub meta_already_exists: bool,
    pub model_overwrite: bool,
    pub has_embedded_thumbnail: bool,
}

impl FileData {
    /// Builds a record for `sidecar` and, unless metadata-only, `video`.
    pub fn new(
        batch_id: u64,
        video: Option<PathBuf>,
        sidecar: PathBuf,
        meta_ops: Arc<MetaOps>,
        filename_ops: Arc<FilenameOps>,
    ) -> CoreResult<Self> {
        let sidecar_kind = SidecarKind::from_path(&sidecar).ok_or_else(|| {
            CoreError::sidecar(&sidecar, "unsupported sidecar extension")
        })?;
        let video_dir = video
            .as_deref()
            .unwrap_or(sidecar.as_path())
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            batch_id,
            paths: Paths {
                original_video: video,
                video_dir,
                sidecar_path: sidecar,
                sidecar_kind,
                temp_output: None,
                final_output: None,
                renamed_video: None,
                renamed_sidecar: None,
            },
            titles: Titles::default(),
            descriptions: Descriptions::default(),
            credits: Credits::default(),
            dates: Dates::default(),
            web: Web::default(),
            show: Show::default(),
            other: Other::default(),
            meta_ops,
            filename_ops,
            meta_already_exists: false,
            model_overwrite: false,
            has_embedded_thumbnail: false,
        })
    }

    /// Looks a value up by its sidecar key across all groups.
    pub fn field(&self, key: &str) -> Option<&str> {
        if let Some(field) = CreditField::from_key(key) {
            return Some(self.credits.get(field));
        }
        self.titles
            .get(key)
            .or_else(|| self.descriptions.get(key))
            .or_else(|| self.dates.get(key))
            .or_else(|| self.web.get(key))
            .or_else(|| self.show.get(key))
            .or_else(|| self.other.get(key))
    }

    /// Mutable access to a value by its sidecar key across all groups.
    pub fn field_mut(&mut self, key: &str) -> Option<&mut String> {
        if let Some(field) = CreditField::from_key(key) {
            return Some(self.credits.get_mut(field));
        }
        if Titles::KEYS.contains(&key) {
            return self.titles.get_mut(key);
        }
        if Descriptions::KEYS.contains(&key) {
            return self.descriptions.get_mut(key);
        }
        if Dates::KEYS.contains(&key) {
            return self.dates.get_mut(key);
        }
        if Web::KEYS.contains(&key) {
            return self.web.get_mut(key);
        }
        if Show::KEYS.contains(&key) {
            return self.show.get_mut(key);
        }
        self.other.get_mut(key)
    }

    /// Values for the fixed template tags that do not come from the sidecar.
    pub fn template_tag(&self, tag: &str) -> Option<&str> {
        let value = match tag {
            "year" => self.dates.year.as_str(),
            "author" => self.credits.get(CreditField::Author),
            "director" => self.credits.get(CreditField::Director),
            "domain" => self.web.domain.as_str(),
            "video_title" => self.titles.title.as_str(),
            "video_url" => self.web.video_url.as_str(),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }

    /// True when there is no video to transcode.
    pub fn is_metadata_only(&self) -> bool {
        self.paths.original_video.is_none()
    }

    /// Input extension with a leading dot, lowercased.
    pub fn input_ext(&self) -> String {
        self.paths
            .original_video
            .as_deref()
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default()
    }

    /// Video file name without the extension.
    pub fn video_base(&self) -> String {
        self.paths
            .original_video
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
