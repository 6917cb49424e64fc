//! Taxonomy path matching shared by case filtering and retrieval scoping.
//!
//! Paths are segment vectors like `["Engineering", "Runtime", "GC"]`.
//! Matching is case-insensitive and segment-wise: a prefix must match
//! whole segments, so `["HR"]` does not match `["HRIS", "Payroll"]`.

/// True iff `prefix` is a case-insensitive, segment-wise prefix of `path`.
///
/// An empty `prefix` matches every path, including the empty one.
pub fn path_starts_with(path: &[String], prefix: &[String]) -> bool {
    if prefix.len() > path.len() {
        return false;
    }

    prefix
        .iter()
        .zip(path.iter())
        .all(|(p, s)| p.eq_ignore_ascii_case(s))
}
