// ABOUTME: Pure text-scanning primitives used by dialogue step validation.
// ABOUTME: Token recognition for yes/no/cancel, mentions, weekdays, times, patterns, ordinals.

use std::sync::OnceLock;

use chrono::{NaiveTime, Weekday};
use regex::Regex;

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<@([A-Z0-9]+)>").expect("mention regex"))
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // H:MM or HH:MM with an optional AM/PM suffix, no separating space.
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2}):(\d{2})(am|pm)?\b").expect("time regex"))
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]+").expect("word regex"))
}

/// Whether the text is an affirmative answer.
pub fn is_affirmative(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "yes" | "y" | "yep" | "yeah" | "ok"
    )
}

/// Whether the text is a negative answer.
pub fn is_negative(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "no" | "n" | "nope" | "nah")
}

/// Whether the text is the dialogue cancellation keyword.
pub fn is_cancel(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("cancel")
}

/// Extract zero-or-more mention-form user references, returning the raw
/// user ids in order of appearance.
pub fn extract_mentions(text: &str) -> Vec<String> {
    mention_re()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Extract weekday tokens. Full names are matched case-insensitively;
/// `weekday`/`weekdays` expands to Mon–Fri and `everyday` to all seven.
/// Duplicates collapse, order of first appearance is kept.
pub fn extract_weekdays(text: &str) -> Vec<Weekday> {
    use Weekday::*;
    let mut days: Vec<Weekday> = Vec::new();
    let push = |d: Weekday, days: &mut Vec<Weekday>| {
        if !days.contains(&d) {
            days.push(d);
        }
    };

    for word in word_re().find_iter(text) {
        match word.as_str().to_lowercase().as_str() {
            "monday" => push(Mon, &mut days),
            "tuesday" => push(Tue, &mut days),
            "wednesday" => push(Wed, &mut days),
            "thursday" => push(Thu, &mut days),
            "friday" => push(Fri, &mut days),
            "saturday" => push(Sat, &mut days),
            "sunday" => push(Sun, &mut days),
            "weekday" | "weekdays" => {
                for d in [Mon, Tue, Wed, Thu, Fri] {
                    push(d, &mut days);
                }
            }
            "everyday" => {
                for d in [Mon, Tue, Wed, Thu, Fri, Sat, Sun] {
                    push(d, &mut days);
                }
            }
            _ => {}
        }
    }
    days
}

/// Extract the first time-of-day token. Without a suffix the hour is read
/// against a 24-hour clock; with AM/PM it is converted (12am = 00, 12pm = 12).
pub fn extract_time(text: &str) -> Option<NaiveTime> {
    let caps = time_re().captures(text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;

    match caps.get(3).map(|m| m.as_str().to_lowercase()) {
        Some(suffix) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            if suffix == "am" {
                if hour == 12 {
                    hour = 0;
                }
            } else if hour != 12 {
                hour += 12;
            }
        }
        None => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Extract a slash-delimited regular expression. The delimiters are
/// stripped and the inner pattern must compile; otherwise `None`.
pub fn extract_pattern(text: &str) -> Option<String> {
    let start = text.find('/')?;
    let end = text.rfind('/')?;
    if end <= start {
        return None;
    }
    let inner = &text[start + 1..end];
    if inner.is_empty() || Regex::new(inner).is_err() {
        return None;
    }
    Some(inner.to_string())
}

/// Extract an ordinal question selector: first/second/last → 0/1/2.
pub fn extract_ordinal(text: &str) -> Option<u8> {
    let lower = text.to_lowercase();
    for (token, index) in [("first", 0), ("second", 1), ("last", 2)] {
        if word_re()
            .find_iter(&lower)
            .any(|w| w.as_str() == token)
        {
            return Some(index);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday::*;

    #[test]
    fn affirmative_and_negative_tokens() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative(" Yes "));
        assert!(is_negative("NO"));
        assert!(!is_affirmative("maybe"));
        assert!(!is_negative("maybe"));
    }

    #[test]
    fn cancel_is_case_insensitive() {
        assert!(is_cancel("cancel"));
        assert!(is_cancel("  CANCEL "));
        assert!(!is_cancel("cancel everything"));
    }

    #[test]
    fn mentions_extract_in_order() {
        assert_eq!(extract_mentions("<@U1> and <@U2>"), vec!["U1", "U2"]);
        assert!(extract_mentions("nobody here").is_empty());
    }

    #[test]
    fn weekday_names() {
        assert_eq!(extract_weekdays("Monday and friday"), vec![Mon, Fri]);
    }

    #[test]
    fn weekdays_expands_to_mon_fri() {
        assert_eq!(extract_weekdays("weekdays"), vec![Mon, Tue, Wed, Thu, Fri]);
    }

    #[test]
    fn everyday_expands_to_all_seven() {
        assert_eq!(extract_weekdays("everyday").len(), 7);
    }

    #[test]
    fn weekday_duplicates_collapse() {
        assert_eq!(extract_weekdays("monday monday weekdays"), vec![Mon, Tue, Wed, Thu, Fri]);
    }

    #[test]
    fn time_24h_clock() {
        assert_eq!(extract_time("at 9:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(extract_time("13:05 sharp"), NaiveTime::from_hms_opt(13, 5, 0));
    }

    #[test]
    fn time_am_pm_suffix() {
        assert_eq!(extract_time("9:30AM"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(extract_time("9:30pm"), NaiveTime::from_hms_opt(21, 30, 0));
        assert_eq!(extract_time("12:00am"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(extract_time("12:15PM"), NaiveTime::from_hms_opt(12, 15, 0));
    }

    #[test]
    fn time_rejects_nonsense() {
        assert_eq!(extract_time("25:00"), None);
        assert_eq!(extract_time("9:75"), None);
        assert_eq!(extract_time("13:00pm"), None);
        assert_eq!(extract_time("no time here"), None);
    }

    #[test]
    fn pattern_requires_slash_delimiters() {
        assert_eq!(extract_pattern("/done.*/").as_deref(), Some("done.*"));
        assert_eq!(extract_pattern("use /a|b/ please").as_deref(), Some("a|b"));
        assert_eq!(extract_pattern("no delimiters"), None);
        assert_eq!(extract_pattern("//"), None);
    }

    #[test]
    fn pattern_must_compile() {
        assert_eq!(extract_pattern("/([unclosed/"), None);
    }

    #[test]
    fn ordinals_map_to_question_indices() {
        assert_eq!(extract_ordinal("the first one"), Some(0));
        assert_eq!(extract_ordinal("Second"), Some(1));
        assert_eq!(extract_ordinal("LAST question"), Some(2));
        assert_eq!(extract_ordinal("third"), None);
    }
}
