//! the tag input: text, modifier, and what keys do
use {
    crate::{
        models::{Modifier, Tag, TagWithModifier},
        session::autocomplete::{Autocompleter, SuggestionState},
    },
    tracing::debug,
};

/// keys the input reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// enter
    Enter,
    /// ctrl/cmd + enter
    CtrlEnter,
    /// escape
    Escape,
    /// arrow down
    Down,
    /// arrow up
    Up,
    /// tab
    Tab,
    /// shift + tab
    ShiftTab,
}

/// what the caller should do after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// add this tag to the query
    AddTag(TagWithModifier),
    /// run the search
    Search,
    /// nothing
    None,
}

/// the tag input box and its suggestion list
pub struct TagInput {
    /// what has been typed
    text: String,
    /// the modifier new tags get
    modifier: Modifier,
    /// whether the suggestion list is showing
    open: bool,
    /// suggestions for the text
    completer: Autocompleter,
}

impl TagInput {
    /// an empty input backed by `completer`
    pub fn new(completer: Autocompleter) -> Self {
        Self {
            text: String::new(),
            modifier: Modifier::Include,
            open: false,
            completer,
        }
    }

    /// the current text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// the modifier new tags get
    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    /// whether the suggestion list is open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// the suggestion state
    pub fn suggestions(&self) -> SuggestionState {
        self.completer.snapshot()
    }

    /// the completer behind the input
    pub fn completer(&self) -> &Autocompleter {
        &self.completer
    }

    /// `+` → `-` → `~`
    pub fn cycle_modifier(&mut self) -> Modifier {
        self.modifier = self.modifier.next();
        self.modifier
    }

    /// replace the text, opening the list and asking for suggestions
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.open = !self.text.trim().is_empty();
        self.completer.input(&self.text);
    }

    /// empty the input and close the list
    pub fn reset(&mut self) {
        self.text.clear();
        self.open = false;
        self.completer.clear();
    }

    /// pick the suggestion at `index`
    pub fn click_suggestion(&mut self, index: usize) -> InputAction {
        match self.completer.get(index) {
            Some(tag) => self.take(tag),
            None => InputAction::None,
        }
    }

    /// handle a key press. `has_tags` is whether the query already holds tags
    pub fn on_key(&mut self, key: Key, has_tags: bool) -> InputAction {
        match key {
            Key::CtrlEnter if self.text.trim().is_empty() && has_tags => {
                self.open = false;
                InputAction::Search
            }
            Key::Enter | Key::CtrlEnter => {
                let typed = self.text.trim();
                if typed.is_empty() {
                    return InputAction::None;
                }

                let tag = self
                    .completer
                    .highlighted()
                    .unwrap_or_else(|| Tag::typed(typed));
                self.take(tag)
            }
            Key::Down | Key::Tab => {
                self.completer.select_next();
                InputAction::None
            }
            Key::Up | Key::ShiftTab => {
                self.completer.select_prev();
                InputAction::None
            }
            // hides the list, the selection stays usable
            Key::Escape => {
                self.open = false;
                InputAction::None
            }
        }
    }

    /// turn a tag into an add action and clear the input
    fn take(&mut self, tag: Tag) -> InputAction {
        debug!(label = %tag.label, modifier = %self.modifier, "tag chosen");
        let action = InputAction::AddTag(TagWithModifier::new(tag, self.modifier));
        self.reset();
        action
    }
}
