//! rendering sessions for the terminal
use {
    crate::{
        models::{Modifier, Post, PostKind, Rating, TagType, TagWithModifier},
        session::{
            autocomplete::{SuggestionState, Suggestions},
            search::{PostsState, SearchSession},
        },
        store::preferences::{BLOCKED_CONTENT_PRESETS, Preferences},
        utils::{compact_number, format_created_at, format_date, proxied_url},
    },
    owo_colors::OwoColorize,
    std::fmt::Write,
};

/// the text shown before the first search
pub const CONTENT_WARNING: &str = "This client shows content from rule34.xxx, which hosts \
     explicit adult material. You must be 18 or older (or the age of majority where you live) \
     to continue.";

/// decides how media urls are shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLinks {
    /// where the relay's proxy route lives, if there is one to use
    pub proxy_base: Option<String>,
    /// whether proxying is wanted
    pub use_proxy: bool,
    /// whether media should be hidden entirely
    pub privacy_mode: bool,
}

impl MediaLinks {
    /// combine preferences with the proxy route that's reachable from here
    pub fn new(prefs: &Preferences, proxy_base: Option<String>) -> Self {
        Self {
            proxy_base,
            use_proxy: prefs.use_proxy,
            privacy_mode: prefs.privacy_mode,
        }
    }

    /// the url to show for a media file
    pub fn link(&self, url: &str) -> String {
        if self.privacy_mode {
            return "[hidden]".to_string();
        }

        match (&self.proxy_base, self.use_proxy) {
            (Some(base), true) => proxied_url(url, base),
            _ => url.to_string(),
        }
    }
}

/// the colored prefix of a modifier
fn modifier_badge(modifier: Modifier) -> String {
    match modifier {
        Modifier::Include => "+".bright_green().to_string(),
        Modifier::Exclude => "-".bright_red().to_string(),
        Modifier::Optional => "~".bright_yellow().to_string(),
    }
}

/// a tag label colored by its type
fn colored_label(label: &str, kind: TagType) -> String {
    match kind {
        TagType::Artist => label.bright_yellow().to_string(),
        TagType::Character => label.bright_green().to_string(),
        TagType::Copyright => label.bright_magenta().to_string(),
        TagType::Metadata => label.bright_black().to_string(),
        TagType::General | TagType::Tag => label.bright_white().to_string(),
    }
}

/// the active query on one line
pub fn render_tags(tags: &[TagWithModifier]) -> String {
    if tags.is_empty() {
        return format!("{} no tags, showing the newest posts", "→".bright_black());
    }

    tags.iter()
        .map(|t| format!("{}{}", modifier_badge(t.modifier), colored_label(t.label(), t.tag.kind)))
        .collect::<Vec<_>>()
        .join("  ")
}

/// the suggestion list
pub fn render_suggestions(state: &SuggestionState) -> String {
    match &state.suggestions {
        Suggestions::Idle => String::new(),
        Suggestions::Loading => format!("{} Loading...", "→".bright_cyan()),
        Suggestions::Empty => format!("{} No results found", "→".bright_black()),
        Suggestions::Ready(items) => {
            let mut out = String::new();

            for (i, tag) in items.iter().enumerate() {
                let marker = if i == state.selected {
                    "›".bright_cyan().to_string()
                } else {
                    " ".to_string()
                };
                let _ = writeln!(
                    out,
                    "{} {} {}",
                    marker,
                    colored_label(&tag.label, tag.kind),
                    compact_number(tag.count).bright_black()
                );
            }

            out
        }
    }
}

/// one post as a small block of lines
pub fn render_post(post: &Post, links: &MediaLinks) -> String {
    let kind = match post.kind {
        PostKind::Image => "image".bright_blue().to_string(),
        PostKind::Video if post.is_loop() => "loop".bright_magenta().to_string(),
        PostKind::Video => "video".bright_magenta().to_string(),
        PostKind::Gif => "gif".bright_cyan().to_string(),
    };
    let rating = match post.rating {
        Rating::Explicit => "explicit".bright_red().to_string(),
        Rating::Questionable => "questionable".bright_yellow().to_string(),
        Rating::Safe => "safe".bright_green().to_string(),
    };

    let mut out = format!(
        "{} {} {} {}x{} ★ {} 💬 {} {} ({})\n",
        format!("#{}", post.id).bold(),
        kind,
        rating,
        post.width,
        post.height,
        compact_number(post.score.max(0) as u64),
        post.comment_count,
        format_created_at(post.date).bright_black(),
        format_date(post.date).bright_black(),
    );

    let _ = writeln!(out, "  {} {}", "file".bright_black(), links.link(&post.file_url));

    if !links.privacy_mode {
        let _ = writeln!(
            out,
            "  {} {}",
            "preview".bright_black(),
            links.link(&post.preview_url)
        );
    }

    let top_tags: Vec<String> = post
        .tag_info
        .iter()
        .take(12)
        .map(|t| colored_label(&t.tag, t.kind))
        .collect();
    if !top_tags.is_empty() {
        let _ = writeln!(out, "  {}", top_tags.join(", "));
    }

    for reference in post.references().into_iter().skip(2) {
        let _ = writeln!(out, "  {} {}", reference.label.bright_black(), reference.url);
    }

    out
}

/// the results area: posts, or the panel explaining why there are none
pub fn render_results(session: &SearchSession, links: &MediaLinks, debug: bool) -> String {
    let mut out = String::new();

    if debug {
        let _ = writeln!(
            out,
            "{} query={:?} pid={} end={}",
            "debug".bright_black(),
            session.query(),
            session.pid(),
            session.is_end()
        );
    }

    match session.posts() {
        PostsState::Loading => {
            let _ = writeln!(out, "{} Loading...", "→".bright_cyan());
        }
        PostsState::Failed(reason) => {
            let _ = writeln!(
                out,
                "{} Connection error\n  Could not reach the server. Check your connection and try again.",
                "✗".bright_red()
            );
            if debug {
                let _ = writeln!(out, "  {}", reason.bright_black());
            }
        }
        PostsState::Loaded(posts) if posts.is_empty() => {
            let _ = writeln!(
                out,
                "{} No results found\n  Try removing some tags or checking for typos.",
                "→".bright_black()
            );
        }
        PostsState::Loaded(posts) => {
            let _ = writeln!(
                out,
                "{} {} of {} posts\n",
                "→".bright_cyan(),
                posts.len().to_string().bright_green(),
                compact_number(session.total()).bright_green()
            );

            for post in posts {
                out.push_str(&render_post(post, links));
                out.push('\n');
            }

            if session.is_end() {
                let _ = writeln!(
                    out,
                    "{} No more results\n  You've reached the end of the results for this query.",
                    "→".bright_black()
                );
            }
        }
    }

    out
}

/// the preferences, one per line
pub fn render_preferences(prefs: &Preferences) -> String {
    let flag = |on: bool| {
        if on {
            "on".bright_green().to_string()
        } else {
            "off".bright_red().to_string()
        }
    };

    let blocked = if prefs.blocked_content.is_empty() {
        "none".bright_black().to_string()
    } else {
        prefs.blocked_content.join(", ")
    };

    format!(
        "blocked content: {}\nuse proxy: {}\nprivacy mode: {}\ndebug: {}\nsaw warning: {}\n",
        blocked,
        flag(prefs.use_proxy),
        flag(prefs.privacy_mode),
        flag(prefs.debug),
        flag(prefs.saw_warning),
    )
}

/// the blocked-content presets, marking the ones in use
pub fn render_presets(prefs: &Preferences) -> String {
    let mut out = String::new();

    for preset in BLOCKED_CONTENT_PRESETS {
        let active = prefs.blocked_content.iter().any(|b| b == preset.value);
        let _ = writeln!(
            out,
            "{} {} {}",
            if active {
                "●".bright_green().to_string()
            } else {
                "○".bright_black().to_string()
            },
            preset.label.bold(),
            preset.value.bright_black()
        );
    }

    out
}
