use std::{path::PathBuf, str::FromStr, time::Duration};

use monorail_core::{ArrowKey, TimelineError};

/// One line of an input script, standing in for a raw UI event.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Press on the track at `x`.
    Click(f64),
    /// Press on the monorail handle at `x`.
    Grab(f64),
    Move(f64),
    Release(f64),
    /// Pointer capture lost during a drag.
    Cancel,
    Key { key: ArrowKey, repeat: bool },
    Mute,
    Repeat,
    Wait(Duration),
    Snapshot(PathBuf),
    Status,
}

impl FromStr for Command {
    type Err = TimelineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let arg = words.next();

        let command = match verb {
            "click" => Command::Click(number(verb, arg)?),
            "grab" => Command::Grab(number(verb, arg)?),
            "move" => Command::Move(number(verb, arg)?),
            "release" => Command::Release(number(verb, arg)?),
            "cancel" => Command::Cancel,
            "key" => {
                let key = match arg {
                    Some("left") => ArrowKey::Left,
                    Some("right") => ArrowKey::Right,
                    other => {
                        return Err(TimelineError::config(format!(
                            "`key` expects left or right, got {other:?}"
                        )))
                    }
                };
                let repeat = words.next() == Some("repeat");
                Command::Key { key, repeat }
            }
            "mute" => Command::Mute,
            "repeat" => Command::Repeat,
            "wait" => Command::Wait(Duration::from_millis(number(verb, arg)? as u64)),
            "snapshot" => match arg {
                Some(path) => Command::Snapshot(PathBuf::from(path)),
                None => return Err(TimelineError::config("`snapshot` expects a path")),
            },
            "status" => Command::Status,
            other => {
                return Err(TimelineError::config(format!("unknown command `{other}`")));
            }
        };
        Ok(command)
    }
}

fn number(verb: &str, arg: Option<&str>) -> Result<f64, TimelineError> {
    arg.and_then(|raw| raw.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or_else(|| TimelineError::config(format!("`{verb}` expects a number")))
}

/// Parses one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Option<Result<Command, TimelineError>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.parse())
}
