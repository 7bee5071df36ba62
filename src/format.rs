// SPDX-License-Identifier: MPL-2.0

//! Display helpers shared by every front end.

use crate::protocol::Metadata;
use crate::protocol::keys::short_npub;
use unicode_segmentation::UnicodeSegmentation;

/// Compact engagement count: `"" / 7 / 1.2K / 3.4M`. Zero renders empty.
pub fn format_count(count: u32) -> String {
    match count {
        // rounds to 1000.0K otherwise
        c if c >= 999_950 => format!("{:.1}M", c as f64 / 1_000_000.0),
        c if c >= 1_000 => format!("{:.1}K", c as f64 / 1_000.0),
        c if c > 0 => c.to_string(),
        _ => String::new(),
    }
}

/// Age of a note relative to `now` (both Unix seconds).
pub fn format_relative_time(created_at: u64, now: u64) -> String {
    let seconds = now.saturating_sub(created_at);
    let (minutes, hours, days) = (seconds / 60, seconds / 3600, seconds / 86_400);

    if seconds < 60 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if hours < 24 {
        format!("{}h", hours)
    } else if days < 7 {
        format!("{}d", days)
    } else {
        chrono::DateTime::from_timestamp(created_at as i64, 0)
            .map(|t| t.format("%b %d").to_string())
            .unwrap_or_default()
    }
}

/// First `max_graphemes` user-perceived characters of `text` on one line,
/// with an ellipsis when cut.
pub fn preview(text: &str, max_graphemes: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut graphemes = flat.graphemes(true);
    let head: String = graphemes.by_ref().take(max_graphemes).collect();
    if graphemes.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

/// Best name to show for a profile.
pub fn display_name(meta: Option<&Metadata>, pubkey: &str) -> String {
    let non_empty = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    meta.and_then(|m| non_empty(&m.display_name).or_else(|| non_empty(&m.name)))
        .unwrap_or_else(|| short_npub(pubkey))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "");
        assert_eq!(format_count(7), "7");
        assert_eq!(format_count(1_234), "1.2K");
        assert_eq!(format_count(3_400_000), "3.4M");
        assert_eq!(format_count(999_949), "999.9K");
        assert_eq!(format_count(999_950), "1.0M");
    }

    #[test]
    fn test_relative_time() {
        let now = 1_700_000_000;
        assert_eq!(format_relative_time(now - 5, now), "now");
        assert_eq!(format_relative_time(now + 30, now), "now");
        assert_eq!(format_relative_time(now - 5 * 60, now), "5m");
        assert_eq!(format_relative_time(now - 3 * 3600, now), "3h");
        assert_eq!(format_relative_time(now - 2 * 86_400, now), "2d");
        // 2023-11-14 minus 30 days
        assert_eq!(format_relative_time(now - 30 * 86_400, now), "Oct 15");
    }

    #[test]
    fn test_preview_is_grapheme_safe() {
        assert_eq!(preview("hello world", 20), "hello world");
        assert_eq!(preview("hello\n\n  world", 20), "hello world");
        assert_eq!(preview("abcdef", 3), "abc…");
        // family emoji is one grapheme made of several code points
        assert_eq!(preview("👨‍👩‍👧x", 1), "👨‍👩‍👧…");
    }

    #[test]
    fn test_display_name_fallbacks() {
        let pubkey = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
        let named = Metadata {
            name: Some("fiatjaf".to_string()),
            display_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(display_name(Some(&named), pubkey), "fiatjaf");

        let anonymous = display_name(None, pubkey);
        assert!(anonymous.starts_with("npub1"));
        assert!(anonymous.contains("..."));
    }
}
