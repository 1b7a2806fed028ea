//! Optional audit hook for tolerant reads.
//!
//! Installing a hook on a reader ([`JsonReader::with_audit`]) changes
//! exactly one behavior: the enum adapter reports an unrecognized constant
//! as an event and returns null instead of failing. Everything else about
//! the reader is unchanged.
//!
//! [`JsonReader::with_audit`]: crate::reader::JsonReader::with_audit

/// Receives enum-mismatch events from a reader.
pub trait JsonAudit: Send + Sync {
    /// An enum adapter met `name` at `path` and recognized no constant.
    fn unknown_enum(&self, path: &str, name: &str);
}
