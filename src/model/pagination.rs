//! Pagination offsets and the free-text footer annotation.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::ValidationError;

/// Where processing starts and where the printed page counter resets.
///
/// The two values are independent: numbering may begin before or after
/// the first processed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationConfig {
    /// First page (1-indexed) that is redacted; earlier pages pass through.
    pub process_start_page: u32,
    /// Original page that is labelled "page 1".
    pub page_number_start: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            process_start_page: 1,
            page_number_start: 1,
        }
    }
}

impl PaginationConfig {
    pub fn new(process_start_page: u32, page_number_start: u32) -> Self {
        Self {
            process_start_page,
            page_number_start,
        }
    }

    /// Check both values against `[1, total]`.
    pub fn validate(&self, total: u32) -> Result<(), ValidationError> {
        check_page("processStartPage", self.process_start_page, total)?;
        check_page("pageNumberStart", self.page_number_start, total)
    }

    /// Label numbers for `page`: `(n, m)` in "page n of m".
    ///
    /// `None` for pages before the numbering start.
    pub fn label_numbers(&self, page: u32, total: u32) -> Option<(u32, u32)> {
        if page < self.page_number_start || self.page_number_start > total {
            return None;
        }
        let start = self.page_number_start.max(1);
        Some((page - start + 1, total - start + 1))
    }
}

fn check_page(field: &'static str, value: u32, total: u32) -> Result<(), ValidationError> {
    if value == 0 || value > total {
        return Err(ValidationError::PageOutOfRange {
            field,
            value,
            total,
        });
    }
    Ok(())
}

/// Free text printed under the page label, at most [`FooterAnnotation::MAX_CHARS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FooterAnnotation(String);

impl FooterAnnotation {
    pub const MAX_CHARS: usize = 100;

    /// NFC-normalize `text` and reject it when longer than the limit.
    pub fn new(text: &str) -> Result<Self, ValidationError> {
        let normalized: String = text.nfc().collect();
        let actual = normalized.chars().count();
        if actual > Self::MAX_CHARS {
            return Err(ValidationError::TooLong {
                max: Self::MAX_CHARS,
                actual,
            });
        }
        Ok(Self(normalized))
    }

    /// Like [`FooterAnnotation::new`] but cuts stale overlong values instead of failing.
    pub fn truncated(text: &str) -> Self {
        Self(text.nfc().take(Self::MAX_CHARS).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Non-empty lines of the annotation.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

impl std::fmt::Display for FooterAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let cfg = PaginationConfig::default();
        assert_eq!(cfg.process_start_page, 1);
        assert_eq!(cfg.page_number_start, 1);
        assert!(cfg.validate(1).is_ok());
    }

    #[test]
    fn test_pagination_no_ordering_constraint() {
        assert!(PaginationConfig::new(5, 2).validate(10).is_ok());
        assert!(PaginationConfig::new(2, 5).validate(10).is_ok());
    }

    #[test]
    fn test_pagination_bounds() {
        let err = PaginationConfig::new(0, 1).validate(10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::PageOutOfRange {
                field: "processStartPage",
                value: 0,
                total: 10
            }
        );
        assert!(PaginationConfig::new(1, 11).validate(10).is_err());
    }

    #[test]
    fn test_label_numbers() {
        let cfg = PaginationConfig::new(1, 3);
        assert_eq!(cfg.label_numbers(2, 10), None);
        assert_eq!(cfg.label_numbers(3, 10), Some((1, 8)));
        assert_eq!(cfg.label_numbers(10, 10), Some((8, 8)));
        assert_eq!(PaginationConfig::new(1, 12).label_numbers(10, 10), None);
    }

    #[test]
    fn test_footer_length_limit() {
        assert!(FooterAnnotation::new(&"a".repeat(100)).is_ok());
        let err = FooterAnnotation::new(&"a".repeat(101)).unwrap_err();
        assert_eq!(err, ValidationError::TooLong { max: 100, actual: 101 });

        // Counted in characters, not bytes.
        assert!(FooterAnnotation::new(&"頁".repeat(100)).is_ok());
    }

    #[test]
    fn test_footer_normalization() {
        // "e" + combining acute composes to a single character.
        let text = FooterAnnotation::new("Caf\u{0065}\u{0301}").unwrap();
        assert_eq!(text.as_str(), "Caf\u{00e9}");
        assert_eq!(FooterAnnotation::truncated(&"x".repeat(150)).as_str().len(), 100);
    }

    #[test]
    fn test_footer_lines() {
        let text = FooterAnnotation::new("Confidential\n\n  Internal use  ").unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["Confidential", "Internal use"]);
        assert!(FooterAnnotation::new("   ").unwrap().is_empty());
    }
}
