//! Screen stack for the front end
//!
//! The app has two screens: a menu that links to the conversation.

/// Screens the app can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Conversation,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Menu => "Menu",
            Screen::Conversation => "Conversation",
        }
    }
}

/// A row on the menu screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: &'static str,
    pub target: Screen,
}

pub const MENU_ENTRIES: [MenuEntry; 1] = [MenuEntry {
    label: "Conversation",
    target: Screen::Conversation,
}];

/// Stack of open screens; the menu is always at the bottom
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Screen>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            stack: vec![Screen::Menu],
        }
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Screen {
        self.stack.last().copied().unwrap_or(Screen::Menu)
    }

    /// Open the screen behind a 1-based menu selection
    pub fn select(&mut self, choice: usize) -> Option<Screen> {
        let entry = choice.checked_sub(1).and_then(|i| MENU_ENTRIES.get(i))?;
        self.stack.push(entry.target);
        Some(entry.target)
    }

    /// Pop the top screen; the menu itself cannot be popped
    pub fn back(&mut self) -> Screen {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        self.current()
    }
}
