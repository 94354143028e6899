//! Post and comment text rules shared by forms and services.

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::domain::error::DomainError;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

/// Number of characters shown when a post is referenced outside its own page.
pub const PREVIEW_LEN: usize = 15;

pub const MAX_POST_LEN: usize = 10_000;
pub const MAX_COMMENT_LEN: usize = 2_000;

/// Short preview of a post body, used in listings and log lines.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_LEN).collect()
}

pub fn validate_post_text(text: &str) -> Result<(), DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("post text must not be empty"));
    }
    if trimmed.chars().count() > MAX_POST_LEN {
        return Err(DomainError::validation(format!(
            "post text exceeds {MAX_POST_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_comment_text(text: &str) -> Result<(), DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("comment text must not be empty"));
    }
    if trimmed.chars().count() > MAX_COMMENT_LEN {
        return Err(DomainError::validation(format!(
            "comment text exceeds {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(())
}

pub fn format_human_date(when: OffsetDateTime) -> String {
    when.date()
        .format(HUMAN_DATE_FORMAT)
        .expect("valid calendar date")
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn preview_truncates_long_text() {
        let text = "a rather long post body that keeps going";
        assert_eq!(preview(text), "a rather long p");
        assert_eq!(preview(text).chars().count(), PREVIEW_LEN);
    }

    #[test]
    fn preview_keeps_short_text_whole() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn empty_post_text_is_rejected() {
        let err = validate_post_text("   ").expect_err("blank text rejected");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn empty_comment_text_is_rejected() {
        let err = validate_comment_text("").expect_err("blank comment rejected");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn human_date_format() {
        let when = datetime!(2024-03-07 12:00 UTC);
        assert_eq!(format_human_date(when), "March 7, 2024");
    }
}
