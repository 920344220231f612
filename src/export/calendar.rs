use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Duration, OffsetDateTime};

use crate::recipes::model::Recipe;

const DEFAULT_PHASE_MINUTES: i64 = 30;

/// Minutes in a free-text duration such as "1 hr 15 mins" or "45".
///
/// Zero or unparseable input counts as 30 minutes.
pub fn parse_duration_minutes(text: &str) -> i64 {
    lazy_static! {
        static ref HOURS_RE: Regex = Regex::new(r"(?i)(\d+)\s*(?:hr|hour|h)").unwrap();
        static ref MINS_RE: Regex = Regex::new(r"(?i)(\d+)\s*(?:min|m)").unwrap();
        static ref NUM_RE: Regex = Regex::new(r"(\d+)").unwrap();
    }
    let first = |re: &Regex| -> Option<i64> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    };

    let hours = first(&HOURS_RE);
    let mins = first(&MINS_RE);
    let mut total = hours
        .unwrap_or(0)
        .checked_mul(60)
        .and_then(|h| h.checked_add(mins.unwrap_or(0)))
        .unwrap_or(0);
    if hours.is_none() && mins.is_none() {
        total = first(&NUM_RE).unwrap_or(0);
    }
    if total == 0 {
        DEFAULT_PHASE_MINUTES
    } else {
        total
    }
}

/// Title with every non-ASCII-alphanumeric character replaced by `_`, plus `.ics`.
pub fn ics_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.ics")
}

/// RFC 5545 TEXT escaping; line breaks become a literal `\n`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn ics_stamp(t: OffsetDateTime) -> Result<String, time::error::Format> {
    t.format(format_description!("[year][month][day]T[hour][minute][second]Z"))
}

/// Start of the next full hour (UTC).
fn next_full_hour(now: OffsetDateTime) -> anyhow::Result<OffsetDateTime> {
    let secs = now.unix_timestamp();
    Ok(OffsetDateTime::from_unix_timestamp((secs / 3600 + 1) * 3600)?)
}

/// One VEVENT cooking session starting at the next full hour after `now`.
pub fn build_ics(recipe: &Recipe, url: Option<&str>, now: OffsetDateTime) -> anyhow::Result<String> {
    let start = next_full_hour(now)?;
    let total = parse_duration_minutes(&recipe.prep_time)
        .checked_add(parse_duration_minutes(&recipe.cook_time))
        .unwrap_or(0);
    // Out-of-range durations fall back to the default prep + cook.
    let end = start
        .checked_add(Duration::seconds(total.saturating_mul(60)))
        .or_else(|| start.checked_add(Duration::minutes(2 * DEFAULT_PHASE_MINUTES)))
        .context("event end out of range")?;

    let ingredients = recipe
        .ingredients
        .iter()
        .map(|i| format!("• {}", escape_text(i)))
        .collect::<Vec<_>>()
        .join("\\n");
    let instructions = recipe
        .instructions
        .iter()
        .enumerate()
        .map(|(n, s)| format!("{}. {}", n + 1, escape_text(s)))
        .collect::<Vec<_>>()
        .join("\\n");

    let mut description = format!(
        "Prep: {} | Cook: {}\\n\\n{}\\n\\nIngredients:\\n{ingredients}\\n\\nInstructions:\\n{instructions}",
        escape_text(&recipe.prep_time),
        escape_text(&recipe.cook_time),
        escape_text(&recipe.description),
    );
    let url: Option<String> = url.map(|u| u.chars().filter(|c| !c.is_control()).collect());
    if let Some(url) = &url {
        description.push_str(&format!("\\n\\nView Recipe: {}", escape_text(url)));
    }

    let uid_millis = now.unix_timestamp_nanos() / 1_000_000;
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Liberian Kitchen//Recipe Generator//EN".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}-{}@liberiankitchen.ai", recipe.id, uid_millis),
        format!("DTSTAMP:{}", ics_stamp(now)?),
        format!("DTSTART:{}", ics_stamp(start)?),
        format!("DTEND:{}", ics_stamp(end)?),
        format!("SUMMARY:Cook {}", escape_text(&recipe.title)),
        format!("DESCRIPTION:{description}"),
    ];
    if let Some(url) = url {
        lines.push(format!("URL:{url}"));
    }
    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    Ok(lines.join("\r\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn durations() {
        assert_eq!(parse_duration_minutes("1 hr 30 mins"), 90);
        assert_eq!(parse_duration_minutes("2 hours"), 120);
        assert_eq!(parse_duration_minutes("45 minutes"), 45);
        assert_eq!(parse_duration_minutes("20"), 20);
        assert_eq!(parse_duration_minutes("overnight"), 30);
        assert_eq!(parse_duration_minutes("0 mins"), 30);
        assert_eq!(parse_duration_minutes(""), 30);
    }

    #[test]
    fn filenames_keep_only_ascii_alphanumerics() {
        assert_eq!(ics_filename("Jollof Rice"), "Jollof_Rice.ics");
        assert_eq!(ics_filename("Palm-Butter (Spicy)"), "Palm_Butter__Spicy_.ics");
    }

    #[test]
    fn event_spans_prep_and_cook_from_next_hour() {
        let recipe: Recipe = serde_json::from_value(serde_json::json!({
            "id": "6f1c3c38-0c2a-4b59-9d0a-0d5a3c1e2f10",
            "title": "Jollof Rice",
            "description": "Rich.\nSmoky.",
            "ingredients": ["rice", "tomato"],
            "instructions": ["Blend", "Simmer"],
            "prepTime": "20 mins",
            "cookTime": "1 hr",
        }))
        .unwrap();
        let now = datetime!(2024-03-05 14:27:09 UTC);

        let ics = build_ics(&recipe, Some("https://kitchen.test/r/1"), now).unwrap();
        let lines: Vec<&str> = ics.split("\r\n").collect();

        assert_eq!(lines[0], "BEGIN:VCALENDAR");
        assert_eq!(
            lines[4],
            format!("UID:{}-{}@liberiankitchen.ai", recipe.id, 1_709_648_829_000i64)
        );
        assert!(lines.contains(&"DTSTAMP:20240305T142709Z"));
        assert!(lines.contains(&"DTSTART:20240305T150000Z"));
        assert!(lines.contains(&"DTEND:20240305T162000Z"));
        assert!(lines.contains(&"SUMMARY:Cook Jollof Rice"));
        assert!(lines.contains(&"URL:https://kitchen.test/r/1"));

        let desc = lines.iter().find(|l| l.starts_with("DESCRIPTION:")).unwrap();
        assert!(desc.contains("Rich.\\nSmoky."));
        assert!(desc.contains("• rice\\n• tomato"));
        assert!(desc.contains("1. Blend\\n2. Simmer"));
        assert_eq!(*lines.last().unwrap(), "END:VCALENDAR");
    }

    #[test]
    fn url_lines_are_optional() {
        let recipe: Recipe =
            serde_json::from_value(serde_json::json!({"id": uuid::Uuid::new_v4(), "title": "Kala"}))
                .unwrap();
        let ics = build_ics(&recipe, None, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert!(!ics.contains("URL:"));
        assert!(ics.contains("DTSTART:19700101T010000Z"));
        assert!(ics.contains("DTEND:19700101T020000Z"));
    }

    #[test]
    fn oversized_durations_fall_back_to_defaults() {
        assert_eq!(parse_duration_minutes("99999999999999999999 hours"), 30);
        assert_eq!(parse_duration_minutes("200000000000000000 hours"), 30);

        let recipe: Recipe = serde_json::from_value(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "title": "Cassava Bread",
            "prepTime": "99999999 hours",
        }))
        .unwrap();
        let ics = build_ics(&recipe, None, datetime!(2024-03-05 14:27:09 UTC)).unwrap();
        assert!(ics.contains("DTSTART:20240305T150000Z"));
        assert!(ics.contains("DTEND:20240305T160000Z"));
    }

    #[test]
    fn text_values_are_escaped() {
        assert_eq!(escape_text("a;b,c\\d"), "a\\;b\\,c\\\\d");
        assert_eq!(escape_text("one\r\ntwo\nthree\rfour"), "one\\ntwo\\nthree\\nfour");
    }

    #[test]
    fn line_breaks_cannot_add_properties() {
        let recipe: Recipe = serde_json::from_value(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "title": "Stew\r\nATTENDEE:mailto:evil@x.test",
            "ingredients": ["salt, to taste\nORGANIZER:evil"],
            "instructions": ["Stir;\r\nserve"],
        }))
        .unwrap();
        let ics = build_ics(
            &recipe,
            Some("https://k.test/\r\nORGANIZER:evil"),
            OffsetDateTime::UNIX_EPOCH,
        )
        .unwrap();
        let lines: Vec<&str> = ics.split("\r\n").collect();

        assert_eq!(lines.len(), 13);
        assert!(!lines
            .iter()
            .any(|l| l.starts_with("ATTENDEE") || l.starts_with("ORGANIZER")));
        assert!(lines.contains(&"SUMMARY:Cook Stew\\nATTENDEE:mailto:evil@x.test"));
        assert!(lines.contains(&"URL:https://k.test/ORGANIZER:evil"));
        let desc = lines.iter().find(|l| l.starts_with("DESCRIPTION:")).unwrap();
        assert!(desc.contains("• salt\\, to taste\\nORGANIZER:evil"));
        assert!(desc.contains("1. Stir\\;\\nserve"));
    }
}
