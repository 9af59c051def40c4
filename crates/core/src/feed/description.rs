//! `Label: Value` description format used by the tracker's RSS items.

use tracing::{debug, warn};

use super::FeedEntry;

const SEPARATOR: &str = "<br/>";

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_count(label: &str, value: &str) -> i64 {
    value.parse().unwrap_or_else(|_| {
        warn!(label = label, value = value, "Unable to parse count, using 0");
        0
    })
}

/// Split a raw description into typed fields. `guid`, `link` and `title` are left empty.
pub fn parse_description(raw: &str) -> FeedEntry {
    let mut entry = FeedEntry::default();

    for part in raw.split(SEPARATOR) {
        if part.trim().is_empty() {
            continue;
        }

        let Some((label, value)) = part.split_once(':') else {
            warn!(part = part, "Unable to parse label and value from description part");
            continue;
        };
        let label = label.trim();
        let value = value.trim();

        match label {
            "Author(s)" => entry.authors = split_list(value),
            "Narrator(s)" => entry.narrators = split_list(value),
            "Series" => entry.series = split_list(value),
            "Category" => entry.category = value.to_string(),
            "Summary" => entry.summary = value.to_string(),
            "Tags" => entry.tags = value.to_string(),
            "Description" => entry.description = value.to_string(),
            "Leechers" => entry.leechers = parse_count(label, value),
            "Seeders" => entry.seeders = parse_count(label, value),
            "Added" => entry.added = value.to_string(),
            other => debug!(label = other, "Ignoring unknown description label"),
        }
    }

    entry
}

/// Render the description fields of `entry` in the tracker's format. Empty fields are omitted.
pub fn format_description(entry: &FeedEntry) -> String {
    let mut parts = Vec::new();
    let mut push = |label: &str, value: String| {
        if !value.is_empty() {
            parts.push(format!("{}: {}", label, value));
        }
    };

    push("Author(s)", entry.authors.join(", "));
    push("Narrator(s)", entry.narrators.join(", "));
    push("Series", entry.series.join(", "));
    push("Category", entry.category.clone());
    push("Summary", entry.summary.clone());
    push("Tags", entry.tags.clone());
    push("Description", entry.description.clone());
    push("Leechers", entry.leechers.to_string());
    push("Seeders", entry.seeders.to_string());
    push("Added", entry.added.clone());

    parts.join(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tracker_description() {
        let raw = "Author(s): Brandon Sanderson, Janci Patterson<br/>\
                   Narrator(s): Michael Kramer<br/>\
                   Series: Skyward #4<br/>\
                   Category: Audiobooks - Science Fiction<br/>\
                   Summary: The final book.<br/>\
                   Tags: sci-fi, space<br/>\
                   Description: Spensa returns: home at last.<br/>\
                   Leechers: 3<br/>\
                   Seeders: 27<br/>\
                   Added: 2024-01-02 03:04:05";
        let entry = parse_description(raw);

        assert_eq!(entry.authors, vec!["Brandon Sanderson", "Janci Patterson"]);
        assert_eq!(entry.narrators, vec!["Michael Kramer"]);
        assert_eq!(entry.series, vec!["Skyward #4"]);
        assert_eq!(entry.category, "Audiobooks - Science Fiction");
        assert_eq!(entry.tags, "sci-fi, space");
        // Only the first colon separates label from value.
        assert_eq!(entry.description, "Spensa returns: home at last.");
        assert_eq!(entry.leechers, 3);
        assert_eq!(entry.seeders, 27);
        assert_eq!(entry.added, "2024-01-02 03:04:05");
    }

    #[test]
    fn test_parse_skips_junk_parts() {
        let raw = "<br/>  <br/>no colon here<br/>Unknown: value<br/>Author(s):  Solo  ";
        let entry = parse_description(raw);
        assert_eq!(entry.authors, vec!["Solo"]);
        assert!(entry.category.is_empty());
    }

    #[test]
    fn test_parse_bad_counts_default_to_zero() {
        let entry = parse_description("Leechers: many<br/>Seeders: -<br/>Category: Ebooks - Fantasy");
        assert_eq!(entry.leechers, 0);
        assert_eq!(entry.seeders, 0);
        assert_eq!(entry.category, "Ebooks - Fantasy");
    }

    #[test]
    fn test_format_then_parse_preserves_fields() {
        let entry = FeedEntry {
            authors: vec!["J.R.R. Tolkien".to_string(), "Christopher Tolkien".to_string()],
            narrators: vec!["Andy Serkis".to_string()],
            series: vec!["Middle-earth".to_string()],
            category: "Audiobooks - Fantasy".to_string(),
            summary: "Hobbits.".to_string(),
            tags: "classic".to_string(),
            description: "There and back again".to_string(),
            leechers: 1,
            seeders: 99,
            added: "2023-05-06".to_string(),
            ..Default::default()
        };

        assert_eq!(parse_description(&format_description(&entry)), entry);
    }
}
