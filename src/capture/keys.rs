/// Keyboard surface of the capture popup. Only these control keys are
/// recognised; anything else is routed to the text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    Up,
    Down,
    Tab,
    ShiftTab,
    Enter,
    /// Cmd+Enter: finish from any field.
    CmdEnter,
    Escape,
    Text(String),
}

impl KeyInput {
    /// Parses one line of the terminal driver: `<tab>`, `<cmd-enter>`, ... or free text.
    pub fn from_token(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "<up>" => KeyInput::Up,
            "<down>" => KeyInput::Down,
            "<tab>" => KeyInput::Tab,
            "<shift-tab>" | "<s-tab>" => KeyInput::ShiftTab,
            "<enter>" | "<cr>" => KeyInput::Enter,
            "<cmd-enter>" | "<c-enter>" => KeyInput::CmdEnter,
            "<esc>" | "<escape>" => KeyInput::Escape,
            _ => KeyInput::Text(line.to_string()),
        }
    }
}
