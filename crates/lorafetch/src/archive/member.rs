//! # Archive members
//!
//! Picking the weights file out of an archive listing. Selection is a stable
//! ordered scan over file entries where the first match wins:
//!
//! 1. an entry at `.../{dir_name}/{file_name}`;
//! 2. otherwise an entry below a `{dir_name}` directory (at any depth) whose
//!    file name carries the expected extension.

use std::path::Path;

/// Default directory the weights file is packaged under
pub const DEFAULT_DIR_NAME: &str = "flux-lora";

/// Default weights file name inside that directory
pub const DEFAULT_FILE_NAME: &str = "flux-lora.safetensors";

/// The archive member to look for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTarget {
    pub dir_name: String,
    pub file_name: String,
    /// Extension without the leading dot. Also used to name cache entries.
    pub extension: String,
}

impl MemberTarget {
    /// Build a target; the extension is taken from `file_name`.
    pub fn new(dir_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let extension = Path::new(&file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            dir_name: dir_name.into(),
            file_name,
            extension,
        }
    }

    /// `"{dir_name}/{file_name}"`
    pub fn suffix(&self) -> String {
        format!("{}/{}", self.dir_name, self.file_name)
    }

    fn matches_exact(&self, path: &str) -> bool {
        let suffix = self.suffix();
        match path.strip_suffix(suffix.as_str()) {
            Some(prefix) => prefix.is_empty() || prefix.ends_with('/'),
            None => false,
        }
    }

    fn matches_fallback(&self, path: &str) -> bool {
        let Some((dirs, name)) = path.rsplit_once('/') else {
            return false;
        };
        if !dirs.split('/').any(|segment| segment == self.dir_name) {
            return false;
        }
        if self.extension.is_empty() {
            return true;
        }
        let wanted = format!(".{}", self.extension.to_ascii_lowercase());
        name.to_ascii_lowercase().ends_with(&wanted)
    }
}

impl Default for MemberTarget {
    fn default() -> Self {
        Self::new(DEFAULT_DIR_NAME, DEFAULT_FILE_NAME)
    }
}

/// One entry of a tar archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Position of the entry in archive order
    pub index: usize,
    /// Normalized path, `/`-separated, without leading `/` or `./`
    pub path: String,
    /// Size of the entry data in bytes
    pub size: u64,
    /// Regular file (as opposed to directory, link, device...)
    pub is_file: bool,
}

impl ArchiveMember {
    /// Last path segment
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Canonicalize an archive path: `\` becomes `/`, empty and `.` segments go.
pub fn normalize_path(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Select the member to extract, or `None` if nothing qualifies.
pub fn select_member<'a>(
    members: &'a [ArchiveMember],
    target: &MemberTarget,
) -> Option<&'a ArchiveMember> {
    let mut files = members.iter().filter(|m| m.is_file);
    files
        .clone()
        .find(|m| target.matches_exact(&m.path))
        .or_else(|| files.find(|m| target.matches_fallback(&m.path)))
}
