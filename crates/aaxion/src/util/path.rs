use std::path::{Path, PathBuf};

/// Characters that are rejected in file names on at least one major platform.
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Make `name` safe to use as a single path component.
///
/// Reserved characters and control characters are replaced by `_`, runs of
/// whitespace collapse into one space, and trailing dots and spaces are
/// dropped since Windows refuses them.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(['.', ' '])
        .to_string()
}

/// Name used when neither a name nor its fallback survives sanitizing.
pub const DEFAULT_FILE_NAME: &str = "output";

/// Like [`sanitize_file_name`], but never returns an empty name.
///
/// A name made only of dots or spaces sanitizes to nothing and would produce
/// a hidden `.ext` file, so `fallback` is used instead, then
/// [`DEFAULT_FILE_NAME`].
pub fn sanitize_file_name_or(name: &str, fallback: &str) -> String {
    [name, fallback]
        .into_iter()
        .map(sanitize_file_name)
        .find(|sanitized| !sanitized.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

pub trait AaxionPathExt {
    /// Append `.{ext}` to the file name, keeping any dots already in it.
    ///
    /// Unlike [`Path::with_extension`], `Vol. 1` becomes `Vol. 1.m4a` rather
    /// than `Vol.m4a`.
    fn join_with_extension(&self, stem: &str, ext: &str) -> PathBuf;
}

impl AaxionPathExt for Path {
    fn join_with_extension(&self, stem: &str, ext: &str) -> PathBuf {
        self.join(format!("{stem}.{ext}"))
    }
}
