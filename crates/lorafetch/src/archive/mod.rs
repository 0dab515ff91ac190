//! # Tar archives
//!
//! Member listing, selection and single-member extraction for downloaded
//! tar bundles (plain, gzip, bzip2 or xz).

mod member;
pub(crate) mod reader;

pub use member::{
    ArchiveMember, DEFAULT_DIR_NAME, DEFAULT_FILE_NAME, MemberTarget, normalize_path,
    select_member,
};
pub use reader::{Compression, extract_member, scan_members};
