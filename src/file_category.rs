/// File categorization by extension.
///
/// Maps a file extension to a broad category (e.g. "Images", "Documents")
/// through a fixed lookup table. The lookup is total: any extension that is
/// not listed resolves to [`Category::Other`].
///
/// # Examples
///
/// ```
/// use foldersort::file_category::{Category, classify};
///
/// assert_eq!(classify(".jpg"), Category::Image);
/// assert_eq!(classify("PDF"), Category::Document);
/// assert_eq!(classify(".nope"), Category::Other);
/// ```
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Represents a broad file category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Image files (PNG, JPG, GIF, etc.)
    #[serde(rename = "Images", alias = "images", alias = "Image", alias = "image")]
    Image,
    /// Audio files (MP3, WAV, FLAC, etc.)
    #[serde(rename = "Audio", alias = "audio")]
    Audio,
    /// Video files (MP4, MKV, AVI, etc.)
    #[serde(rename = "Videos", alias = "videos", alias = "Video", alias = "video")]
    Video,
    /// Document files (PDF, DOCX, TXT, etc.)
    #[serde(
        rename = "Documents",
        alias = "documents",
        alias = "Document",
        alias = "document"
    )]
    Document,
    /// Archive files (ZIP, RAR, 7Z, etc.)
    #[serde(rename = "Archives", alias = "archives", alias = "Archive", alias = "archive")]
    Archive,
    /// Source code and structured data files
    #[serde(rename = "Code", alias = "code")]
    Code,
    /// Spreadsheet files (XLSX, CSV, ODS, etc.)
    #[serde(
        rename = "Spreadsheets",
        alias = "spreadsheets",
        alias = "Spreadsheet",
        alias = "spreadsheet"
    )]
    Spreadsheet,
    /// Presentation files (PPTX, KEY, ODP, etc.)
    #[serde(
        rename = "Presentations",
        alias = "presentations",
        alias = "Presentation",
        alias = "presentation"
    )]
    Presentation,
    /// Font files (TTF, OTF, WOFF, etc.)
    #[serde(rename = "Fonts", alias = "fonts", alias = "Font", alias = "font")]
    Font,
    /// Anything the table does not list
    #[serde(rename = "Other", alias = "other")]
    Other,
}

impl Category {
    /// Returns the destination folder name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use foldersort::file_category::Category;
    ///
    /// assert_eq!(Category::Image.dir_name(), "Images");
    /// assert_eq!(Category::Other.dir_name(), "Other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Image => "Images",
            Category::Audio => "Audio",
            Category::Video => "Videos",
            Category::Document => "Documents",
            Category::Archive => "Archives",
            Category::Code => "Code",
            Category::Spreadsheet => "Spreadsheets",
            Category::Presentation => "Presentations",
            Category::Font => "Fonts",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Maps file extensions to categories.
///
/// Keys are stored lowercase with a leading dot, so `".JPG"`, `"jpg"` and
/// `".jpg"` all hit the same entry.
#[derive(Debug, Clone)]
pub struct FileMapper {
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with all standard mappings.
    pub fn new() -> Self {
        let mut mapper = Self {
            extension_map: HashMap::new(),
        };
        mapper.populate_standard_mappings();
        mapper
    }

    fn populate_standard_mappings(&mut self) {
        const TABLE: &[(Category, &[&str])] = &[
            (
                Category::Image,
                &[
                    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "svg", "ico",
                    "heic", "heif", "raw",
                ],
            ),
            (Category::Audio, &["mp3", "wav", "aac", "m4a", "flac", "ogg", "wma"]),
            (
                Category::Video,
                &["mp4", "mov", "avi", "wmv", "flv", "mkv", "webm", "3gp"],
            ),
            (
                Category::Document,
                &[
                    "pdf", "doc", "docx", "txt", "rtf", "odt", "pages", "md", "html", "htm",
                ],
            ),
            (Category::Spreadsheet, &["xls", "xlsx", "numbers", "csv", "ods"]),
            (Category::Presentation, &["ppt", "pptx", "key", "odp"]),
            (
                Category::Archive,
                &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"],
            ),
            (
                Category::Code,
                &[
                    "py", "java", "c", "cpp", "h", "hpp", "js", "ts", "css", "php", "rs", "go",
                    "sh", "bash", "json", "xml", "yaml", "yml", "toml",
                ],
            ),
            (Category::Font, &["ttf", "otf", "woff", "woff2"]),
        ];

        for (category, extensions) in TABLE {
            for ext in *extensions {
                self.add_extension_mapping(ext, *category);
            }
        }
    }

    /// Adds (or replaces) an extension to category mapping.
    ///
    /// The extension may be given with or without its leading dot.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map.insert(normalize_extension(ext), category);
    }

    /// Maps a file extension to a category, returning `None` if unlisted.
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&normalize_extension(ext)).copied()
    }

    /// Classifies an extension. Never fails: unlisted extensions are [`Category::Other`].
    ///
    /// # Examples
    ///
    /// ```
    /// use foldersort::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.classify(".PNG"), Category::Image);
    /// assert_eq!(mapper.classify(""), Category::Other);
    /// ```
    pub fn classify(&self, ext: &str) -> Category {
        self.extension_to_category(ext).unwrap_or(Category::Other)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

static STANDARD_MAPPER: LazyLock<FileMapper> = LazyLock::new(FileMapper::new);

/// Classifies an extension against the standard table.
pub fn classify(ext: &str) -> Category {
    STANDARD_MAPPER.classify(ext)
}

/// Lowercases an extension and ensures it carries exactly one leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return String::new();
    }
    format!(".{}", trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Image.dir_name(), "Images");
        assert_eq!(Category::Audio.dir_name(), "Audio");
        assert_eq!(Category::Video.dir_name(), "Videos");
        assert_eq!(Category::Document.dir_name(), "Documents");
        assert_eq!(Category::Archive.dir_name(), "Archives");
        assert_eq!(Category::Code.dir_name(), "Code");
        assert_eq!(Category::Spreadsheet.dir_name(), "Spreadsheets");
        assert_eq!(Category::Presentation.dir_name(), "Presentations");
        assert_eq!(Category::Font.dir_name(), "Fonts");
        assert_eq!(Category::Other.dir_name(), "Other");
    }

    #[test]
    fn test_classify_is_case_insensitive_for_every_listed_extension() {
        let mapper = FileMapper::default();
        for (ext, category) in &mapper.extension_map {
            assert_eq!(mapper.classify(ext), *category);
            assert_eq!(mapper.classify(&ext.to_uppercase()), *category, "{ext}");
        }
    }

    #[test]
    fn test_classify_unknown_is_other() {
        for ext in [".xyz", ".unknown", "", ".", "..", ".jpgx"] {
            assert_eq!(classify(ext), Category::Other, "{ext:?}");
        }
    }

    #[test]
    fn test_classify_with_or_without_dot() {
        assert_eq!(classify("pdf"), Category::Document);
        assert_eq!(classify(".pdf"), Category::Document);
        assert_eq!(classify(".Mp3"), Category::Audio);
        assert_eq!(classify("tar"), Category::Archive);
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("JPG"), ".jpg");
        assert_eq!(normalize_extension(".Tar"), ".tar");
        assert_eq!(normalize_extension(""), "");
    }

    #[test]
    fn test_custom_mapping() {
        let mut mapper = FileMapper::default();
        mapper.add_extension_mapping(".CUSTOM", Category::Code);
        mapper.add_extension_mapping("csv", Category::Document);

        assert_eq!(mapper.classify("custom"), Category::Code);
        assert_eq!(mapper.classify(".csv"), Category::Document);
    }

    #[test]
    fn test_category_deserializes_from_folder_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            category: Category,
        }
        let parsed: Wrapper = toml::from_str(r#"category = "Images""#).unwrap();
        assert_eq!(parsed.category, Category::Image);
        let parsed: Wrapper = toml::from_str(r#"category = "document""#).unwrap();
        assert_eq!(parsed.category, Category::Document);
    }
}
