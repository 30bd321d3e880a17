//! utilities used across base34
use {
    crate::models::RawTag,
    chrono::{TimeZone, Utc},
    std::cmp::Ordering,
    tracing::Level,
};

/// pull the trailing `(1234)` count out of an autocompletion label
///
/// returns 0 when the label doesn't end in a parenthesised number
pub fn extract_count(label: &str) -> u64 {
    let Some(inner) = label.strip_suffix(')') else {
        return 0;
    };
    let Some(open) = inner.rfind('(') else {
        return 0;
    };
    let digits = &inner[open + 1..];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }

    digits.parse().unwrap_or(0)
}

/// decode the html entities the booru leaves in tag names
///
/// handles the named entities it is known to emit plus decimal/hex numeric references.
/// anything unrecognised is left alone
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        let decoded = candidate.find(';').and_then(|end| {
            let entity = &candidate[1..end];
            decode_entity(entity).map(|c| (c, end + 1))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// decode a single entity body (the part between `&` and `;`)
fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "eacute" => Some('é'),
        _ => {
            let number = entity.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// turn a raw tag name into its display label
///
/// underscores become spaces, whitespace runs collapse, entities are decoded, ends are trimmed
pub fn format_label(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    decode_entities(&collapsed).trim().to_string()
}

/// sort a post's tags by category, then alphabetically
pub fn sort_tags(tags: &mut [RawTag]) {
    tags.sort_by(|a, b| {
        a.kind
            .rank()
            .cmp(&b.kind.rank())
            .then_with(|| compare_labels(&a.tag, &b.tag))
    });
}

/// case-insensitive order, ties broken by the exact bytes
fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// render a millisecond timestamp relative to `now_ms`, e.g. `"3 hours ago"`
pub fn format_relative(timestamp_ms: i64, now_ms: i64) -> String {
    let seconds = (now_ms - timestamp_ms).max(0) as f64 / 1000.0;
    let minutes = seconds / 60.0;
    let hours = minutes / 60.0;
    let days = hours / 24.0;
    let weeks = days / 7.0;
    let months = days / 30.5;
    let years = days / 365.25;

    let (value, unit) = if seconds < 60.0 {
        return "Just now".to_string();
    } else if minutes < 60.0 {
        (minutes, "minute")
    } else if hours < 24.0 {
        (hours, "hour")
    } else if days < 7.0 {
        (days, "day")
    } else if days < 30.5 {
        (weeks, "week")
    } else if days < 365.25 {
        (months, "month")
    } else {
        (years, "year")
    };

    let rounded = value.round() as u64;
    if rounded == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", rounded, unit)
    }
}

/// render a millisecond timestamp relative to the current time
pub fn format_created_at(timestamp_ms: i64) -> String {
    format_relative(timestamp_ms, Utc::now().timestamp_millis())
}

/// render a millisecond timestamp as an absolute utc date
pub fn format_date(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// render a count in short compact notation, e.g. `1.2K` or `34M`
pub fn compact_number(n: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (1_000_000_000_000, "T"),
        (1_000_000_000, "B"),
        (1_000_000, "M"),
        (1_000, "K"),
    ];

    if n < 1_000 {
        return n.to_string();
    }

    let mut index = UNITS
        .iter()
        .position(|(size, _)| n >= *size)
        .unwrap_or(UNITS.len() - 1);

    loop {
        let (size, suffix) = UNITS[index];
        let scaled = n as f64 / size as f64;
        let rounded = if scaled < 10.0 {
            (scaled * 10.0).round() / 10.0
        } else {
            scaled.round()
        };

        if rounded >= 1000.0 && index > 0 {
            index -= 1;
            continue;
        }

        let text = if rounded.fract() == 0.0 {
            format!("{}", rounded as u64)
        } else {
            format!("{:.1}", rounded)
        };

        return format!("{}{}", text, suffix);
    }
}

/// rewrite a media url so it's fetched through the relay's proxy route
pub fn proxied_url(url: &str, proxy_base: &str) -> String {
    format!("{}?query={}", proxy_base, urlencoding::encode(url))
}

/// convert a string to a log level
///
/// anything unrecognised maps to [`Level::ERROR`]
pub fn string_to_log_level(lvl: &str) -> Level {
    match lvl.to_lowercase().as_str() {
        "d" | "debug" | "dbg" => Level::DEBUG,
        "t" | "trace" | "trc" => Level::TRACE,
        "e" | "error" | "err" => Level::ERROR,
        "i" | "info" | "inf" => Level::INFO,
        "w" | "warn" | "wrn" => Level::WARN,
        _ => Level::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::models::TagType};

    #[test]
    fn test_extract_count() {
        assert_eq!(extract_count("tag_name (1234)"), 1234);
        assert_eq!(extract_count("tag_name"), 0);
        assert_eq!(extract_count("tag_name (12) extra"), 0);
        assert_eq!(extract_count("weird (1a)"), 0);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label("blue_sky"), "blue sky");
        assert_eq!(format_label("__a___b__"), "a b");
        assert_eq!(format_label("pok&eacute;mon"), "pokémon");
        assert_eq!(format_label("&#034;quoted&#034;"), "\"quoted\"");
        assert_eq!(format_label("rock_&#038;_roll"), "rock & roll");
        assert_eq!(format_label("don&#039;t"), "don't");
    }

    #[test]
    fn test_decode_entities_leaves_unknown_alone() {
        assert_eq!(decode_entities("a & b"), "a & b");
        assert_eq!(decode_entities("&bogus; &#x41;"), "&bogus; A");
    }

    #[test]
    fn test_sort_tags_orders_by_type_then_name() {
        let mut tags = vec![
            RawTag {
                tag: "zebra".into(),
                count: 1,
                kind: TagType::General,
            },
            RawTag {
                tag: "animated".into(),
                count: 1,
                kind: TagType::Metadata,
            },
            RawTag {
                tag: "Apple".into(),
                count: 1,
                kind: TagType::General,
            },
            RawTag {
                tag: "someone".into(),
                count: 1,
                kind: TagType::Artist,
            },
        ];

        sort_tags(&mut tags);
        let order: Vec<&str> = tags.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(order, vec!["someone", "Apple", "zebra", "animated"]);
    }

    #[test]
    fn test_format_relative() {
        let now = 1_000_000_000_000;
        assert_eq!(format_relative(now - 5_000, now), "Just now");
        assert_eq!(format_relative(now - 60_000, now), "1 minute ago");
        assert_eq!(format_relative(now - 3 * 3_600_000, now), "3 hours ago");
        assert_eq!(format_relative(now - 2 * 86_400_000, now), "2 days ago");
        assert_eq!(format_relative(now - 14 * 86_400_000, now), "2 weeks ago");
        assert_eq!(format_relative(now - 61 * 86_400_000, now), "2 months ago");
        assert_eq!(format_relative(now - 800 * 86_400_000, now), "2 years ago");
    }

    #[test]
    fn test_compact_number() {
        assert_eq!(compact_number(999), "999");
        assert_eq!(compact_number(1_000), "1K");
        assert_eq!(compact_number(1_234), "1.2K");
        assert_eq!(compact_number(12_345), "12K");
        assert_eq!(compact_number(1_500_000), "1.5M");
        assert_eq!(compact_number(999_999), "1M");
    }

    #[test]
    fn test_proxied_url() {
        assert_eq!(
            proxied_url("https://api-cdn.rule34.xxx/a b.png", "/api/proxy"),
            "/api/proxy?query=https%3A%2F%2Fapi-cdn.rule34.xxx%2Fa%20b.png"
        );
    }

    #[test]
    fn test_string_to_log_level() {
        assert_eq!(string_to_log_level("WRN"), Level::WARN);
        assert_eq!(string_to_log_level("nonsense"), Level::ERROR);
    }
}
