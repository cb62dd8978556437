//! Wrappers over the external calibre binaries.
//!
//! `ebook-convert` builds the digest EPUB from a recipe; `calibre-smtp`
//! mails the finished file. Both are boundary collaborators: this crate
//! owns their argument contracts and exit-status mapping, nothing more.

pub mod convert;
pub mod smtp;

pub use convert::{ConvertJob, build_epub, ebook_convert_version};
pub use smtp::SmtpSettings;
