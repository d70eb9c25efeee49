//! Output naming for downloaded images.
//!
//! Nothing typed by the user reaches the filesystem unsanitized:
//! - the person folder is `sanitize_folder_name(person_name)`
//! - each file is `<label>_<hash8>.<ext>`, where `hash8` is the first eight
//!   hex digits of the MD5 of the source URL
//!
//! Names are deterministic, so re-running a session for the same person
//! overwrites rather than duplicates.

use std::sync::LazyLock;

use regex::Regex;
use md5::{Digest, Md5};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

/// Folder name for a person, e.g. `"Jane  O'Doe"` → `"Jane_ODoe"`.
///
/// Falls back to `"unnamed"` when nothing printable is left.
pub fn sanitize_folder_name(person_name: &str) -> String {
    let stripped = NON_WORD.replace_all(person_name.trim(), "");
    let joined = SEPARATORS.replace_all(&stripped, "_");
    let name = joined.trim_matches('_');
    if name.is_empty() {
        "unnamed".to_string()
    } else {
        name.to_string()
    }
}

/// Source label reduced to `[A-Za-z0-9_-]`.
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// First eight hex digits of the MD5 of `url`.
pub fn url_hash8(url: &str) -> String {
    let digest = Md5::digest(url.as_bytes());
    hex::encode(&digest[..4])
}

/// `<label>_<hash8>.<ext>`
pub fn image_file_name(source_label: &str, url: &str, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        sanitize_label(source_label),
        url_hash8(url),
        extension.trim_start_matches('.')
    )
}
