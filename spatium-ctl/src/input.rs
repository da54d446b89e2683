//! Line-oriented operator commands read from stdin.

use std::fmt;

use spatium_types::{ChannelIndex, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorEvent {
    /// `pos <ch> <x> <y>`: move a source on the map
    Move { channel: ChannelIndex, position: Position },
    /// `elev <ch> <deg>`
    Elevation { channel: ChannelIndex, degrees: f32 },
    /// `falloff <value>`
    Falloff(f32),
    Reload,
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "commands: pos <ch> <x> <y> | elev <ch> <deg> | falloff <1-10> | reload | status | quit";

/// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<OperatorEvent>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let event = match (command, args.as_slice()) {
        ("pos" | "p", [ch, x, y]) => OperatorEvent::Move {
            channel: channel(ch)?,
            position: Position::new(number(x)?, number(y)?),
        },
        ("elev" | "e", [ch, deg]) => OperatorEvent::Elevation {
            channel: channel(ch)?,
            degrees: number(deg)?,
        },
        ("falloff" | "f", [value]) => OperatorEvent::Falloff(number(value)?),
        ("reload", []) => OperatorEvent::Reload,
        ("status" | "s", []) => OperatorEvent::Status,
        ("quit" | "q" | "exit", []) => OperatorEvent::Quit,
        ("pos" | "p" | "elev" | "e" | "falloff" | "f" | "reload" | "status" | "s" | "quit" | "q" | "exit", _) => {
            return Err(ParseError(format!("wrong arguments for '{}'; {}", command, HELP)))
        }
        _ => return Err(ParseError(format!("unknown command '{}'; {}", command, HELP))),
    };
    Ok(Some(event))
}

fn channel(word: &str) -> Result<ChannelIndex, ParseError> {
    word.parse::<u32>()
        .ok()
        .and_then(ChannelIndex::try_new)
        .ok_or_else(|| ParseError(format!("'{}' is not a channel number (1..)", word)))
}

fn number(word: &str) -> Result<f32, ParseError> {
    word.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError(format!("'{}' is not a number", word)))
}
