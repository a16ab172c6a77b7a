//! Utility functions for destination paths and directories

use crate::config::FileNaming;
use crate::error::DirectoryError;
use crate::types::DownloadJob;
use std::path::{Path, PathBuf};

/// Filename used when a URL has no usable last path segment
const FALLBACK_FILENAME: &str = "download";

/// Compute where a job's file is written
///
/// The layout is `<output_root>/<owner_id>/<position>-<basename>`. The position
/// prefix keeps two attachments of one card apart when their URLs end in the same
/// filename. The result depends only on the job, never on the filesystem.
///
/// # Examples
///
/// ```
/// use board_attachments::{DownloadJob, FileNaming};
/// use board_attachments::utils::destination_path;
/// use std::path::Path;
///
/// let job = DownloadJob {
///     owner_id: "c1".to_string(),
///     attachment_id: "a1".to_string(),
///     position: 0,
///     source_url: "http://x/img.png".to_string(),
/// };
/// assert_eq!(
///     destination_path(Path::new("attachments"), &job, FileNaming::Raw),
///     Path::new("attachments/c1/0-img.png")
/// );
/// ```
#[must_use]
pub fn destination_path(output_root: &Path, job: &DownloadJob, naming: FileNaming) -> PathBuf {
    let basename = match naming {
        FileNaming::Raw => url_basename(&job.source_url),
        FileNaming::Decoded => url_basename_decoded(&job.source_url),
    };
    owner_dir(output_root, &job.owner_id).join(format!("{}-{}", job.position, basename))
}

/// Directory holding every file of one card
#[must_use]
pub fn owner_dir(output_root: &Path, owner_id: &str) -> PathBuf {
    output_root.join(owner_id)
}

/// Text after the last `/` of a URL, taken literally
///
/// Trailing slashes are ignored. The query string and any percent escapes stay in
/// the name, so a file lands under the same name the exporting tool's own
/// downloader would give it. See [`url_basename_decoded`] for the tidier variant.
///
/// # Examples
///
/// ```
/// use board_attachments::utils::url_basename;
///
/// assert_eq!(url_basename("https://host/a/My%20Scan.png"), "My%20Scan.png");
/// assert_eq!(url_basename("https://host/a/b/"), "b");
/// ```
#[must_use]
pub fn url_basename(url: &str) -> String {
    let segment = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    plain_file_name(segment)
}

/// Last path segment of a URL, percent-decoded
///
/// Query string and fragment are not part of the name. Separators produced by
/// decoding (`%2F`) are replaced with `_` so the name stays a single component.
/// Unparseable URLs fall back to the text after the last `/`.
///
/// # Examples
///
/// ```
/// use board_attachments::utils::url_basename_decoded;
///
/// assert_eq!(url_basename_decoded("https://host/a/b/report%20v2.pdf?x=1"), "report v2.pdf");
/// assert_eq!(url_basename_decoded("https://host/"), "download");
/// ```
#[must_use]
pub fn url_basename_decoded(url: &str) -> String {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .map(str::to_string),
        Err(_) => {
            let without_suffix = url.split(['?', '#']).next().unwrap_or_default();
            without_suffix
                .rsplit('/')
                .find(|s| !s.is_empty())
                .map(str::to_string)
        }
    };

    let Some(segment) = segment else {
        return FALLBACK_FILENAME.to_string();
    };

    let decoded = urlencoding::decode(&segment)
        .map(|d| d.into_owned())
        .unwrap_or(segment);
    plain_file_name(&decoded)
}

/// Replace separators and NUL with `_`; `.`, `..` and empty become the fallback name
fn plain_file_name(raw: &str) -> String {
    let name: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();

    if is_plain_component(&name) {
        name
    } else {
        FALLBACK_FILENAME.to_string()
    }
}

/// Whether a string can be used verbatim as one path component
///
/// Rejects empty strings, `.`, `..`, and anything containing a separator or NUL.
#[must_use]
pub fn is_plain_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Create a directory and its parents unless it already exists
///
/// Safe to call concurrently for the same path: an "already exists" race between
/// two callers is not an error.
pub async fn ensure_dir(path: &Path) -> Result<(), DirectoryError> {
    match tokio::fs::create_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(DirectoryError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Expand a leading `~/` to the current user's home directory
///
/// Paths without the prefix, and systems without a home directory, are returned unchanged.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

/// Default output root: an `attachments` directory next to the export file
#[must_use]
pub fn default_output_root(export_path: &Path) -> PathBuf {
    export_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("attachments")
}
