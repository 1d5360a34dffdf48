//! HTTP Range request parsing module
//!
//! Single-range `bytes=` headers only. Anything else (other units,
//! multi-range lists, malformed integers) is "not a byte range" and the
//! request falls back to a normal full response.

/// A parsed, not yet resolved, `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-end`, both bounds inclusive
    FromTo(u64, u64),
    /// `bytes=start-`, open end
    From(u64),
    /// `bytes=-n`, the last `n` bytes
    Suffix(u64),
}

/// A range resolved against the actual file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRange {
    /// Serviceable byte window, both offsets inclusive
    Window {
        /// First byte offset to serve
        start: u64,
        /// Last byte offset to serve
        end: u64,
    },
    /// No serviceable window; the response must be 416
    Unsatisfiable,
}

/// Parse a `Range` header value.
///
/// Returns `None` when the header is not a single byte range, in which case
/// the caller serves the request as if no `Range` header were present.
///
/// # Examples
/// ```
/// use static_front::http::range::{parse, RangeSpec};
///
/// assert_eq!(parse("bytes=0-99"), Some(RangeSpec::FromTo(0, 99)));
/// assert_eq!(parse("bytes=100-"), Some(RangeSpec::From(100)));
/// assert_eq!(parse("bytes=-500"), Some(RangeSpec::Suffix(500)));
/// assert_eq!(parse("lines=0-99"), None);
/// ```
pub fn parse(header: &str) -> Option<RangeSpec> {
    let spec = header.strip_prefix("bytes=")?;

    // Multi-range requests are not supported
    if spec.contains(',') {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return end.parse().ok().map(RangeSpec::Suffix);
    }

    let start: u64 = start.parse().ok()?;
    if end.is_empty() {
        return Some(RangeSpec::From(start));
    }

    let end: u64 = end.parse().ok()?;
    Some(RangeSpec::FromTo(start, end))
}

/// Resolve a parsed range against the statted file size.
///
/// A suffix range is clamped to a minimum start of 0, an open end runs
/// through the end of the file, and an explicit end is clamped to
/// `size - 1`. A window whose resolved `start >= end` is unsatisfiable;
/// this includes one-byte ranges and any range against an empty file.
pub fn resolve(spec: RangeSpec, size: u64) -> ResolvedRange {
    let last = size.saturating_sub(1);
    let (start, end) = match spec {
        RangeSpec::FromTo(start, end) => (start, end.min(last)),
        RangeSpec::From(start) => (start, last),
        RangeSpec::Suffix(n) => (size.saturating_sub(n), last),
    };

    if start >= end {
        return ResolvedRange::Unsatisfiable;
    }
    ResolvedRange::Window { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_range() {
        assert_eq!(parse("bytes=1-2"), Some(RangeSpec::FromTo(1, 2)));
        assert_eq!(
            resolve(RangeSpec::FromTo(1, 2), 6),
            ResolvedRange::Window { start: 1, end: 2 }
        );
    }

    #[test]
    fn test_open_range() {
        assert_eq!(
            resolve(RangeSpec::From(50), 100),
            ResolvedRange::Window { start: 50, end: 99 }
        );
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(
            resolve(RangeSpec::Suffix(2), 6),
            ResolvedRange::Window { start: 4, end: 5 }
        );
        // Suffix larger than the file serves the whole file
        assert_eq!(
            resolve(RangeSpec::Suffix(500), 100),
            ResolvedRange::Window { start: 0, end: 99 }
        );
    }

    #[test]
    fn test_end_clamped_to_size() {
        assert_eq!(
            resolve(RangeSpec::FromTo(0, 999), 10),
            ResolvedRange::Window { start: 0, end: 9 }
        );
    }

    #[test]
    fn test_unsatisfiable() {
        // Inverted window
        assert_eq!(resolve(RangeSpec::FromTo(2, 1), 6), ResolvedRange::Unsatisfiable);
        // One-byte windows are below the serviceable minimum
        assert_eq!(resolve(RangeSpec::FromTo(3, 3), 6), ResolvedRange::Unsatisfiable);
        // Start beyond end of file
        assert_eq!(resolve(RangeSpec::From(200), 100), ResolvedRange::Unsatisfiable);
        // Nothing is serviceable out of an empty file
        assert_eq!(resolve(RangeSpec::From(0), 0), ResolvedRange::Unsatisfiable);
        assert_eq!(resolve(RangeSpec::Suffix(0), 6), ResolvedRange::Unsatisfiable);
    }

    #[test]
    fn test_not_a_byte_range() {
        assert_eq!(parse("lines=1-2"), None);
        assert_eq!(parse("bytes=0-9,20-29"), None);
        assert_eq!(parse("bytes=a-b"), None);
        assert_eq!(parse("bytes=-"), None);
        assert_eq!(parse("bytes=1-2-3"), None);
        assert_eq!(parse("0-9"), None);
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(parse("bytes= 1 - 2 "), Some(RangeSpec::FromTo(1, 2)));
    }
}
