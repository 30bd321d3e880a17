//! a line-driven session: type to get suggestions, use commands to pick and search
use {
    super::view::{self, MediaLinks},
    crate::{
        error::*,
        getopt,
        models::Tag,
        session::{
            api::SearchApi,
            autocomplete::{Autocompleter, Suggestions},
            input::{InputAction, Key, TagInput},
            search::{LoadMore, SearchSession},
        },
        store::{preferences::PreferencesStore, results::ResultsStore},
    },
    owo_colors::OwoColorize,
    std::{sync::Arc, time::Duration},
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{debug, warn},
};

/// what a line of input means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// new input text
    Text(String),
    /// a key press
    Key(Key),
    /// cycle the modifier
    Cycle,
    /// pick the suggestion at an index (1-based on screen)
    Pick(usize),
    /// remove a tag by label
    Remove(String),
    /// toggle a tag the way clicking it on a post does
    Toggle(String),
    /// load another page
    More,
    /// show the results again
    Show,
    /// show the commands
    Help,
    /// stop
    Quit,
}

/// parse one line of input
pub fn parse_line(line: &str) -> Line {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Key(Key::Enter);
    }

    let Some(command) = trimmed.strip_prefix(':') else {
        return Line::Text(line.trim_end_matches(['\r', '\n']).to_string());
    };
    let (name, arg) = command
        .split_once(' ')
        .map_or((command, ""), |(n, a)| (n, a.trim()));

    match name {
        "q" | "quit" => Line::Quit,
        "n" | "down" | "tab" => Line::Key(Key::Tab),
        "p" | "up" => Line::Key(Key::ShiftTab),
        "esc" => Line::Key(Key::Escape),
        "s" | "search" => Line::Key(Key::CtrlEnter),
        "m" | "mod" => Line::Cycle,
        "more" => Line::More,
        "show" => Line::Show,
        "rm" if !arg.is_empty() => Line::Remove(arg.to_string()),
        "t" | "toggle" if !arg.is_empty() => Line::Toggle(arg.to_string()),
        "pick" => arg
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map_or(Line::Help, Line::Pick),
        _ => Line::Help,
    }
}

/// the commands, for `:help`
const HELP: &str = "\
text        ask for suggestions
(empty)     add the highlighted suggestion or the typed text
:n :p       move the highlight down/up
:pick N     add suggestion N
:m          cycle the modifier (+ - ~)
:s          search
:more       load another page
:rm TAG     remove a tag
:t TAG      toggle a tag
:esc        close the suggestions
:show       show the results again
:q          quit";

/// run the session until `:q` or end of input
pub async fn run(
    api: Arc<dyn SearchApi>,
    prefs: PreferencesStore,
    mut results: ResultsStore,
    proxy_base: Option<String>,
) -> Result<()> {
    let links = MediaLinks::new(prefs.state(), proxy_base);
    let debug_output = prefs.state().debug;
    let debounce = Duration::from_millis(getopt!(session.debounce_ms));

    let mut session = SearchSession::new(api.clone(), prefs.state().blocked_content.clone());
    let mut input = TagInput::new(Autocompleter::from_config(api));

    session.restore(results.state());
    if session.needs_search() {
        let _ = session.search().await;
    }
    show(&session, &input, &links, debug_output);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let has_tags = !session.tags().is_empty();

        let action = match parse_line(&line) {
            Line::Quit => break,
            Line::Help => {
                println!("{}", HELP);
                continue;
            }
            Line::Show => {
                show(&session, &input, &links, debug_output);
                continue;
            }
            Line::Text(text) => {
                input.set_text(text);
                wait_for_suggestions(&input, debounce).await;
                print!("{}", view::render_suggestions(&input.suggestions()));
                continue;
            }
            Line::Cycle => {
                println!("modifier: {}", input.cycle_modifier().bold());
                continue;
            }
            Line::Key(key) => input.on_key(key, has_tags),
            Line::Pick(n) => input.click_suggestion(n - 1),
            Line::Remove(label) => {
                if session.remove_tag(&label) {
                    InputAction::Search
                } else {
                    println!("{} {} isn't in the query", "→".bright_black(), label);
                    continue;
                }
            }
            Line::Toggle(label) => {
                session.toggle_tag(Tag::typed(label));
                InputAction::Search
            }
            Line::More => {
                match session.load_more().await {
                    LoadMore::Appended(n) => debug!(added = n, "appended posts"),
                    LoadMore::End => println!(
                        "{} No more results\n  You've reached the end of the results for this query.",
                        "→".bright_black()
                    ),
                    LoadMore::Skipped => {}
                    LoadMore::Failed => println!("{} Could not load more posts", "✗".bright_red()),
                }
                persist(&mut results, &session);
                show(&session, &input, &links, debug_output);
                continue;
            }
        };

        match action {
            InputAction::AddTag(tag) => {
                session.add_tag(tag);
                println!("{}", view::render_tags(session.tags()));
                persist(&mut results, &session);
            }
            InputAction::Search => {
                let _ = session.search().await;
                persist(&mut results, &session);
                show(&session, &input, &links, debug_output);
            }
            InputAction::None => {
                if input.is_open() {
                    print!("{}", view::render_suggestions(&input.suggestions()));
                }
            }
        }
    }

    Ok(())
}

/// wait until suggestions for the latest input are in, or give up after a while
async fn wait_for_suggestions(input: &TagInput, debounce: Duration) {
    let mut rx = input.completer().subscribe();
    let wait = rx.wait_for(|s| !matches!(s.suggestions, Suggestions::Loading));

    if tokio::time::timeout(debounce + Duration::from_secs(10), wait)
        .await
        .is_err()
    {
        debug!("gave up waiting for suggestions");
    }
}

/// write the session back to the results store
fn persist(results: &mut ResultsStore, session: &SearchSession) {
    if let Err(e) = results.update(|r| *r = session.snapshot()) {
        warn!(error = %e, "failed to save results");
    }
}

/// print the query and the results
fn show(session: &SearchSession, input: &TagInput, links: &MediaLinks, debug_output: bool) {
    println!(
        "\n{}  {}",
        input.modifier().bold(),
        view::render_tags(session.tags())
    );
    print!("{}", view::render_results(session, links, debug_output));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(""), Line::Key(Key::Enter));
        assert_eq!(parse_line("blue sky\n"), Line::Text("blue sky".to_string()));
        assert_eq!(parse_line(":n"), Line::Key(Key::Tab));
        assert_eq!(parse_line(":s"), Line::Key(Key::CtrlEnter));
        assert_eq!(parse_line(":pick 2"), Line::Pick(2));
        assert_eq!(parse_line(":pick 0"), Line::Help);
        assert_eq!(parse_line(":rm  blue sky "), Line::Remove("blue sky".to_string()));
        assert_eq!(parse_line(":t cat"), Line::Toggle("cat".to_string()));
        assert_eq!(parse_line(":rm"), Line::Help);
        assert_eq!(parse_line(":wat"), Line::Help);
        assert_eq!(parse_line(":q"), Line::Quit);
    }
}
