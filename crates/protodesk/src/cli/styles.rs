//! Terminal styles for cell tones and messages.
//!
//! Each [`CellTone`] gets the 256-colour approximation of the colour the web
//! grid used for it:
//!
//! | Tone      | Colour          | ANSI 256 |
//! |-----------|-----------------|----------|
//! | null      | lightgray       | 250      |
//! | boolean   | darkblue        | 18       |
//! | number    | mediumblue      | 20       |
//! | string    | darkred         | 88       |
//! | date      | darkslateblue   | 60       |
//! | pointer   | rebeccapurple   | 97       |
//! | relation  | gray            | 244      |
//! | file      | teal            | 30       |
//!
//! Colours are dropped automatically when stdout is not a terminal.

use console::Style;
use protodeskapp::api::MessageLevel;
use protodeskapp::render::CellTone;

pub fn tone(tone: CellTone) -> Style {
    match tone {
        CellTone::Null => Style::new().color256(250),
        CellTone::Boolean => Style::new().color256(18),
        CellTone::Number => Style::new().color256(20),
        CellTone::String => Style::new().color256(88),
        CellTone::Date => Style::new().color256(60),
        CellTone::Pointer => Style::new().color256(97).underlined(),
        CellTone::Relation => Style::new().color256(244).underlined(),
        CellTone::File => Style::new().color256(30).underlined(),
        CellTone::Hidden => Style::new().dim().italic(),
        CellTone::Structured | CellTone::Blank => Style::new(),
    }
}

pub fn header() -> Style {
    Style::new().bold()
}

pub fn muted() -> Style {
    Style::new().color256(244)
}

pub fn message(level: &MessageLevel) -> Style {
    match level {
        MessageLevel::Info => muted(),
        MessageLevel::Success => Style::new().green(),
        MessageLevel::Warning => Style::new().yellow().bold(),
        MessageLevel::Error => Style::new().red().bold(),
    }
}
