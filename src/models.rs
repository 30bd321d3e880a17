//! Data types shared by the relay, the upstream client and client sessions.
use {
    crate::utils::{format_label, sort_tags},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// The category of a tag.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    /// General descriptive tags.
    #[default]
    General,
    /// Artist tags.
    Artist,
    /// Character tags.
    Character,
    /// Copyright (franchise/series) tags.
    Copyright,
    /// Tags about the post itself.
    Metadata,
    /// Anything the upstream reports that isn't one of the above.
    #[serde(other)]
    Tag,
}

impl TagType {
    /// where tags of this type go when a post's tags are listed
    pub const fn rank(self) -> u8 {
        match self {
            Self::Artist => 1,
            Self::Character => 2,
            Self::Copyright => 3,
            Self::General => 4,
            Self::Metadata => 5,
            Self::Tag => 6,
        }
    }
}

/// The booru a tag or post came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// rule34.xxx
    #[default]
    Rule34,
    /// danbooru.donmai.us
    Danbooru,
    /// gelbooru.com
    Gelbooru,
}

impl TagSource {
    /// the url of a post's page on this booru
    pub fn post_page(self, id: u64) -> String {
        match self {
            Self::Rule34 => format!("https://rule34.xxx/index.php?page=post&s=view&id={}", id),
            Self::Danbooru => format!("https://danbooru.donmai.us/posts/{}", id),
            Self::Gelbooru => format!("https://gelbooru.com/index.php?page=post&s=view&id={}", id),
        }
    }

    /// the hostname used when labelling links to this booru
    pub const fn host(self) -> &'static str {
        match self {
            Self::Rule34 => "rule34.xxx",
            Self::Danbooru => "danbooru.donmai.us",
            Self::Gelbooru => "gelbooru.com",
        }
    }
}

/// How a tag takes part in a query.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// posts must have the tag
    #[default]
    #[serde(rename = "+")]
    Include,
    /// posts must not have the tag
    #[serde(rename = "-")]
    Exclude,
    /// posts must have at least one of the optional tags
    #[serde(rename = "~")]
    Optional,
}

impl Modifier {
    /// the prefix the upstream grammar uses for this modifier
    pub const fn prefix(self) -> char {
        match self {
            Self::Include => '+',
            Self::Exclude => '-',
            Self::Optional => '~',
        }
    }

    /// `+` → `-` → `~` → `+`
    pub const fn next(self) -> Self {
        match self {
            Self::Include => Self::Exclude,
            Self::Exclude => Self::Optional,
            Self::Optional => Self::Include,
        }
    }

    /// split a leading modifier off a raw tag string, defaulting to [`Modifier::Include`]
    pub fn split(raw: &str) -> (Self, &str) {
        if let Some(rest) = raw.strip_prefix('-') {
            (Self::Exclude, rest)
        } else if let Some(rest) = raw.strip_prefix('~') {
            (Self::Optional, rest)
        } else if let Some(rest) = raw.strip_prefix('+') {
            (Self::Include, rest)
        } else {
            (Self::Include, raw)
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A tag as returned by autocompletion.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    /// The human readable label (underscores already turned into spaces).
    pub label: String,
    /// How many posts carry the tag.
    #[serde(default)]
    pub count: u64,
    /// The tag's category.
    #[serde(rename = "type", default)]
    pub kind: TagType,
    /// Which booru the tag came from.
    #[serde(default)]
    pub source: TagSource,
}

impl Tag {
    /// a tag typed in by hand, with no known count
    pub fn typed(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// A tag attached to the active query.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TagWithModifier {
    /// The tag itself.
    #[serde(flatten)]
    pub tag: Tag,
    /// How the tag takes part in the query.
    pub modifier: Modifier,
}

impl TagWithModifier {
    /// attach a modifier to a tag
    pub fn new(tag: Tag, modifier: Modifier) -> Self {
        Self { tag, modifier }
    }

    /// the tag's label
    pub fn label(&self) -> &str {
        &self.tag.label
    }
}

/// A tag as attached to a post.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTag {
    /// The tag name.
    pub tag: String,
    /// How many posts carry the tag.
    #[serde(default)]
    pub count: u64,
    /// The tag's category.
    #[serde(rename = "type", default)]
    pub kind: TagType,
}

/// A post's content rating.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// explicit
    Explicit,
    /// safe
    Safe,
    /// questionable, also used for anything unrecognised
    #[default]
    #[serde(other)]
    Questionable,
}

/// What kind of media a post links to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    /// a still image
    #[default]
    Image,
    /// an mp4 or webm
    Video,
    /// a gif
    Gif,
}

impl PostKind {
    /// work out the media kind from a file url's extension
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);

        if path.ends_with(".mp4") || path.ends_with(".webm") {
            Self::Video
        } else if path.ends_with(".gif") {
            Self::Gif
        } else {
            Self::Image
        }
    }
}

/// A post as served by `/api/search`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Post {
    /// Unique identifier, unique within a result set.
    pub id: u64,
    /// Full size media.
    pub file_url: String,
    /// Downscaled media shown while the full file loads.
    pub preview_url: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Content rating.
    pub rating: Rating,
    /// Vote score.
    pub score: i64,
    /// The raw, space separated tag string.
    pub tags: String,
    /// Space separated source urls.
    #[serde(default)]
    pub source: String,
    /// Number of comments.
    #[serde(default)]
    pub comment_count: u64,
    /// Tags with counts and types, sorted by type then name.
    #[serde(default)]
    pub tag_info: Vec<RawTag>,
    /// The booru the post came from.
    #[serde(rename = "originalSource", default)]
    pub original_source: TagSource,
    /// Creation timestamp in milliseconds.
    pub date: i64,
    /// Media kind derived from the file extension.
    #[serde(rename = "type")]
    pub kind: PostKind,
}

/// A labelled link shown alongside a post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    /// what to call the link
    pub label: String,
    /// where it goes
    pub url: String,
}

impl Post {
    /// whether a video should loop
    pub fn is_loop(&self) -> bool {
        self.tag_info.iter().any(|t| t.tag == "loop")
    }

    /// links to the post page, the file, and every parseable source url
    pub fn references(&self) -> Vec<Reference> {
        let mut references = vec![
            Reference {
                label: self.original_source.host().to_string(),
                url: self.original_source.post_page(self.id),
            },
            Reference {
                label: "File".to_string(),
                url: self.file_url.clone(),
            },
        ];

        for source in self.source.split_whitespace() {
            let Ok(parsed) = url::Url::parse(source) else {
                continue;
            };
            let Some(host) = parsed.host_str() else {
                continue;
            };

            references.push(Reference {
                label: host.trim_start_matches("www.").to_string(),
                url: source.to_string(),
            });
        }

        references
    }
}

/// Body of `POST /api/autocomplete`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AutocompleteRequest {
    /// What the user has typed so far.
    pub query: String,
}

/// Body of `POST /api/search`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Modifier-prefixed tag strings.
    pub query: Vec<String>,
    /// Zero-based page cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

/// Response of `POST /api/search`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SearchPage {
    /// The posts on this page.
    pub data: Vec<Post>,
    /// How many posts match the query in total.
    pub total: u64,
}

/// JSON body of every error response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    /// What went wrong.
    pub error: String,
}

impl ErrorBody {
    /// make a new error body
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// One entry of the upstream autocompletion response.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct UpstreamSuggestion {
    /// The display label, e.g. `"tag_name (1234)"`.
    #[serde(default)]
    pub label: String,
    /// The raw tag name.
    #[serde(default)]
    pub value: String,
    /// The tag's category.
    #[serde(rename = "type", default)]
    pub kind: TagType,
}

impl From<UpstreamSuggestion> for Tag {
    fn from(item: UpstreamSuggestion) -> Self {
        Self {
            label: format_label(&item.value),
            count: crate::utils::extract_count(&item.label),
            kind: item.kind,
            source: TagSource::Rule34,
        }
    }
}

/// A post as returned by the upstream dapi listing.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct UpstreamPost {
    /// Unique identifier.
    pub id: u64,
    /// Full size media.
    #[serde(default)]
    pub file_url: String,
    /// Resized media.
    #[serde(default)]
    pub sample_url: String,
    /// Width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Height in pixels.
    #[serde(default)]
    pub height: u32,
    /// Content rating.
    #[serde(default)]
    pub rating: Rating,
    /// Vote score.
    #[serde(default)]
    pub score: Option<i64>,
    /// Raw tag string.
    #[serde(default)]
    pub tags: String,
    /// Source urls, often null.
    #[serde(default)]
    pub source: Option<String>,
    /// Number of comments.
    #[serde(default)]
    pub comment_count: Option<u64>,
    /// Tags with counts, present when `fields=tag_info` is requested.
    #[serde(default)]
    pub tag_info: Vec<RawTag>,
    /// Last change, in seconds.
    #[serde(default)]
    pub change: i64,
}

impl From<UpstreamPost> for Post {
    fn from(item: UpstreamPost) -> Self {
        let mut tag_info = item.tag_info;
        sort_tags(&mut tag_info);

        for tag in &mut tag_info {
            tag.tag = format_label(&tag.tag);
        }

        Self {
            id: item.id,
            kind: PostKind::from_url(&item.file_url),
            file_url: item.file_url,
            preview_url: item.sample_url,
            width: item.width,
            height: item.height,
            rating: item.rating,
            score: item.score.unwrap_or(0),
            tags: item.tags,
            source: item.source.unwrap_or_default(),
            comment_count: item.comment_count.unwrap_or(0),
            tag_info,
            original_source: TagSource::Rule34,
            date: item.change.saturating_mul(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_cycles_through_all_three() {
        let start = Modifier::Include;
        assert_eq!(start.next(), Modifier::Exclude);
        assert_eq!(start.next().next(), Modifier::Optional);
        assert_eq!(start.next().next().next(), start);
    }

    #[test]
    fn test_modifier_split() {
        assert_eq!(Modifier::split("-gore"), (Modifier::Exclude, "gore"));
        assert_eq!(Modifier::split("~cat"), (Modifier::Optional, "cat"));
        assert_eq!(Modifier::split("+dog"), (Modifier::Include, "dog"));
        assert_eq!(Modifier::split("fox"), (Modifier::Include, "fox"));
    }

    #[test]
    fn test_unknown_tag_type_folds_into_tag() {
        let tag: RawTag =
            serde_json::from_str(r#"{"tag": "x", "count": 3, "type": "species"}"#).unwrap();
        assert_eq!(tag.kind, TagType::Tag);
    }

    #[test]
    fn test_unknown_rating_is_questionable() {
        let ratings: Vec<Rating> =
            serde_json::from_str(r#"["g", "safe", "explicit", "questionable"]"#).unwrap();
        assert_eq!(
            ratings,
            vec![
                Rating::Questionable,
                Rating::Safe,
                Rating::Explicit,
                Rating::Questionable
            ]
        );
        assert_eq!(serde_json::to_string(&Rating::Safe).unwrap(), r#""safe""#);
    }

    #[test]
    fn test_tag_with_modifier_is_flat_on_the_wire() {
        let tag = TagWithModifier::new(Tag::typed("blue sky"), Modifier::Optional);
        let json = serde_json::to_value(&tag).unwrap();

        assert_eq!(json["label"], "blue sky");
        assert_eq!(json["type"], "general");
        assert_eq!(json["source"], "rule34");
        assert_eq!(json["modifier"], "~");
    }

    #[test]
    fn test_post_kind_from_url() {
        assert_eq!(PostKind::from_url("https://x/a.webm"), PostKind::Video);
        assert_eq!(PostKind::from_url("https://x/a.mp4?123"), PostKind::Video);
        assert_eq!(PostKind::from_url("https://x/a.gif"), PostKind::Gif);
        assert_eq!(PostKind::from_url("https://x/a.jpeg"), PostKind::Image);
    }

    #[test]
    fn test_upstream_post_conversion() {
        let raw = r#"{
            "id": 42,
            "file_url": "https://api-cdn.rule34.xxx/images/1/a.mp4",
            "sample_url": "https://api-cdn.rule34.xxx/samples/1/a.jpg",
            "width": 1920,
            "height": 1080,
            "rating": "explicit",
            "score": 12,
            "tags": "loop some_artist",
            "source": null,
            "comment_count": 2,
            "change": 1700000000,
            "tag_info": [
                {"tag": "loop", "count": 10, "type": "metadata"},
                {"tag": "some_artist", "count": 5, "type": "artist"}
            ]
        }"#;

        let post: Post = serde_json::from_str::<UpstreamPost>(raw).unwrap().into();

        assert_eq!(post.kind, PostKind::Video);
        assert_eq!(post.preview_url, "https://api-cdn.rule34.xxx/samples/1/a.jpg");
        assert_eq!(post.date, 1_700_000_000_000);
        assert_eq!(post.source, "");
        assert_eq!(post.tag_info[0].tag, "some artist");
        assert_eq!(post.tag_info[1].tag, "loop");
        assert!(post.is_loop());
    }

    #[test]
    fn test_post_serializes_with_client_field_names() {
        let json = serde_json::to_value(Post::default()).unwrap();
        assert!(json.get("originalSource").is_some());
        assert_eq!(json["type"], "image");
    }

    #[test]
    fn test_references_skip_unparseable_sources() {
        let post = Post {
            id: 7,
            file_url: "https://api-cdn.rule34.xxx/images/a.png".to_string(),
            source: "https://www.pixiv.net/en/artworks/1 not-a-url https://x.com/a".to_string(),
            ..Post::default()
        };

        let labels: Vec<String> = post.references().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["rule34.xxx", "File", "pixiv.net", "x.com"]);
    }
}
