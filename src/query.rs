//! turning the tag list into the upstream's query grammar
//!
//! serialization happens in two stages. [`parse_tags`] runs on the client and turns the active
//! tags plus the blocked content into modifier-prefixed strings, which is what travels over
//! `/api/search`. [`build_upstream_query`] runs next to the upstream and turns those strings into
//! the final `tags` parameter
use {
    crate::models::{Modifier, TagWithModifier},
    hashbrown::HashSet,
};

/// trim a tag and replace internal whitespace runs with `_`
pub fn normalize_tag(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

/// serialize the active tags and blocked content into modifier-prefixed strings
///
/// every blocked token becomes a `-token` exclusion unless the same tag is already part of the
/// query, either as an exclusion or because it was asked for explicitly
pub fn parse_tags(tags: &[TagWithModifier], blocked: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(tags.len() + blocked.len());
    let mut seen: HashSet<String> = HashSet::new();

    for tag in tags {
        let name = normalize_tag(tag.label());
        if name.is_empty() {
            continue;
        }

        let entry = format!("{}{}", tag.modifier.prefix(), name);
        if seen.insert(entry.clone()) {
            out.push(entry);
        }
    }

    let requested: HashSet<String> = tags
        .iter()
        .filter(|t| t.modifier != Modifier::Exclude)
        .map(|t| normalize_tag(t.label()))
        .collect();

    for token in blocked.iter().flat_map(|b| b.split_whitespace()) {
        if requested.contains(token) {
            continue;
        }

        let entry = format!("{}{}", Modifier::Exclude.prefix(), token);
        if seen.insert(entry.clone()) {
            out.push(entry);
        }
    }

    out
}

/// build the upstream `tags` parameter from modifier-prefixed strings
///
/// the sort directive comes first, then the optional tags as one `( a ~ b )` group, then every
/// other tag in order. the group is always present, `( )` when nothing is optional. `+` prefixes
/// are dropped, `-` prefixes are kept
pub fn build_upstream_query(sort: &str, query: &[String]) -> String {
    let mut optional = Vec::new();
    let mut rest = Vec::new();

    for raw in query {
        let (modifier, name) = Modifier::split(raw.trim());
        let name = normalize_tag(name);
        if name.is_empty() {
            continue;
        }

        match modifier {
            Modifier::Optional => optional.push(name),
            Modifier::Include => rest.push(name),
            Modifier::Exclude => rest.push(format!("{}{}", Modifier::Exclude.prefix(), name)),
        }
    }

    let mut parts = vec![sort.to_string(), format!("( {} )", optional.join(" ~ "))];
    parts.extend(rest);
    parts.join(" ")
}

/// both stages at once
pub fn serialize_query(sort: &str, tags: &[TagWithModifier], blocked: &[String]) -> String {
    build_upstream_query(sort, &parse_tags(tags, blocked))
}

#[cfg(test)]
mod tests {
    use {super::*, crate::models::Tag};

    fn tag(label: &str, modifier: Modifier) -> TagWithModifier {
        TagWithModifier::new(Tag::typed(label), modifier)
    }

    #[test]
    fn test_parse_tags_prefixes_and_appends_blocked() {
        let tags = vec![
            tag("blue sky", Modifier::Include),
            tag("cat", Modifier::Optional),
            tag("dog", Modifier::Optional),
            tag("rain", Modifier::Exclude),
        ];
        let blocked = vec!["ai_generated".to_string(), "gore".to_string()];

        assert_eq!(
            parse_tags(&tags, &blocked),
            vec![
                "+blue_sky",
                "~cat",
                "~dog",
                "-rain",
                "-ai_generated",
                "-gore"
            ]
        );
    }

    #[test]
    fn test_parse_tags_splits_multi_token_presets() {
        let blocked = vec!["zoophilia zoo canine*".to_string(), "zoo".to_string()];

        assert_eq!(
            parse_tags(&[], &blocked),
            vec!["-zoophilia", "-zoo", "-canine*"]
        );
    }

    #[test]
    fn test_parse_tags_does_not_exclude_what_was_asked_for() {
        let tags = vec![tag("gore", Modifier::Include), tag("scat", Modifier::Exclude)];
        let blocked = vec!["gore".to_string(), "scat".to_string()];

        assert_eq!(parse_tags(&tags, &blocked), vec!["+gore", "-scat"]);
    }

    #[test]
    fn test_build_upstream_query_groups_optional_tags_first() {
        let query: Vec<String> = ["+a", "~b", "~c", "-d"].map(String::from).to_vec();

        assert_eq!(
            build_upstream_query("sort:id:desc", &query),
            "sort:id:desc ( b ~ c ) a -d"
        );
    }

    #[test]
    fn test_build_upstream_query_without_optional_tags() {
        let query: Vec<String> = ["+a", "-d"].map(String::from).to_vec();
        assert_eq!(
            build_upstream_query("sort:id:desc", &query),
            "sort:id:desc ( ) a -d"
        );
        assert_eq!(build_upstream_query("sort:id:desc", &[]), "sort:id:desc ( )");
    }

    #[test]
    fn test_build_upstream_query_normalizes_whitespace() {
        let query: Vec<String> = ["+ long  tag ", "plain", "+", "~"].map(String::from).to_vec();
        assert_eq!(
            build_upstream_query("sort:score", &query),
            "sort:score ( ) long_tag plain"
        );
    }

    #[test]
    fn test_serialize_query() {
        let tags = vec![tag("x", Modifier::Include), tag("y", Modifier::Optional)];
        let blocked = vec!["gore".to_string()];

        assert_eq!(
            serialize_query("sort:id:desc", &tags, &blocked),
            "sort:id:desc ( y ) x -gore"
        );
    }
}
