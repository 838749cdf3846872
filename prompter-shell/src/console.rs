//! Operator console commands

use anyhow::{anyhow, bail, Result};
use prompter_bridge::Key;
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  open | close            show or hide the stage window
  play | pause | toggle   playback
  reset                   back to the top, paused
  seek <px>               jump the stage to a position
  speed <px/s>            scroll speed (20-200)
  font <px>               font size (24-72)
  line-height <x>         line height (1.0-3.0)
  colors <text> <bg>      CSS colors, e.g. colors #fff black
  mirror on|off           flip the stage horizontally
  text <words...>         replace the script
  load <path>             load a .txt or .docx script
  key <name>              press a key on the stage (space r home up down esc f11)
  link <url>              open a URL in the system browser
  status                  show the current state
  help                    this text
  quit                    exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Open,
    Close,
    Play,
    Pause,
    Toggle,
    Reset,
    Seek(f64),
    Speed(f64),
    Font(u32),
    LineHeight(f64),
    Colors { text: String, background: String },
    Mirror(bool),
    Text(String),
    Load(PathBuf),
    Key(Key),
    Link(String),
    Status,
    Help,
    Quit,
    /// Blank line
    Nothing,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" => Self::Nothing,
            "open" => Self::Open,
            "close" => Self::Close,
            "play" => Self::Play,
            "pause" => Self::Pause,
            "toggle" => Self::Toggle,
            "reset" => Self::Reset,
            "seek" => Self::Seek(number(word, rest)?),
            "speed" => Self::Speed(number(word, rest)?),
            "font" => Self::Font(
                rest.parse()
                    .map_err(|_| anyhow!("font expects a whole number of pixels"))?,
            ),
            "line-height" => Self::LineHeight(number(word, rest)?),
            "colors" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(text), Some(background), None) => Self::Colors {
                        text: text.to_string(),
                        background: background.to_string(),
                    },
                    _ => bail!("colors expects exactly two values: <text> <background>"),
                }
            }
            "mirror" => match rest.to_ascii_lowercase().as_str() {
                "on" => Self::Mirror(true),
                "off" => Self::Mirror(false),
                _ => bail!("mirror expects on or off"),
            },
            "text" => Self::Text(rest.replace("\\n", "\n")),
            "load" if !rest.is_empty() => Self::Load(PathBuf::from(rest)),
            "load" => bail!("load expects a file path"),
            "key" => Self::Key(parse_key(rest)?),
            "link" if !rest.is_empty() => Self::Link(rest.to_string()),
            "link" => bail!("link expects a URL"),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("Unknown command '{}', type help", other),
        };
        Ok(command)
    }
}

fn number(command: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| anyhow!("{} expects a number", command))
}

fn parse_key(name: &str) -> Result<Key> {
    let key = match name.to_ascii_lowercase().as_str() {
        "space" => Key::Space,
        "home" => Key::Home,
        "up" => Key::ArrowUp,
        "down" => Key::ArrowDown,
        "esc" | "escape" => Key::Escape,
        "f11" => Key::F11,
        single if single.chars().count() == 1 => {
            Key::Char(single.chars().next().unwrap_or(' '))
        }
        _ => bail!("Unknown key '{}'", name),
    };
    Ok(key)
}
