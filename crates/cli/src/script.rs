//! Headless batch mode
//!
//! One command per line:
//!
//! ```text
//! # comment
//! add Ana Souza        # normal customer
//! add -p Bia           # priority customer
//! next
//! remove 1:Ana Souza
//! position 2:Bia
//! front
//! show
//! clear
//! ```

use std::io::Write;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use ticketq_core::application::ServiceDesk;

use crate::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { name: String, is_priority: bool },
    Next,
    Remove { id: String },
    Position { id: String },
    Front,
    Show,
    Clear,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_lowercase().as_str() {
            "add" => {
                let (is_priority, name) = match rest.split_once(char::is_whitespace) {
                    Some(("-p" | "--priority", name)) => (true, name.trim()),
                    _ if rest == "-p" || rest == "--priority" => (true, ""),
                    _ => (false, rest),
                };
                if name.is_empty() {
                    bail!("add needs a customer name");
                }
                Command::Add {
                    name: name.to_string(),
                    is_priority,
                }
            }
            "next" => Command::Next,
            "remove" | "position" if rest.is_empty() => bail!("{} needs an entry ID", verb),
            "remove" => Command::Remove {
                id: rest.to_string(),
            },
            "position" => Command::Position {
                id: rest.to_string(),
            },
            "front" => Command::Front,
            "show" => Command::Show,
            "clear" => Command::Clear,
            other => bail!("unknown command '{}'", other),
        };
        Ok(command)
    }
}

/// Drop a `#` comment: a whole line starting with `#`, or a trailing one
/// introduced by whitespace. A `#` inside a name or ID is kept.
fn strip_comment(raw: &str) -> &str {
    let line = raw.trim();
    if line.starts_with('#') {
        return "";
    }
    let mut prev_is_space = false;
    for (i, c) in line.char_indices() {
        if c == '#' && prev_is_space {
            return line[..i].trim_end();
        }
        prev_is_space = c.is_whitespace();
    }
    line
}

/// Parse a whole script, skipping blank lines and `#` comments
pub fn parse_script(source: &str) -> Result<Vec<Command>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let line = strip_comment(raw);
            (!line.is_empty()).then_some((i + 1, line))
        })
        .map(|(line_no, line)| {
            line.parse::<Command>()
                .with_context(|| format!("line {}: '{}'", line_no, line))
        })
        .collect()
}

/// Apply commands to the desk, writing one result line per command
pub fn execute<W: Write>(desk: &ServiceDesk, commands: &[Command], out: &mut W) -> Result<()> {
    for command in commands {
        tracing::debug!(?command, "Executing script command");
        match command {
            Command::Add { name, is_priority } => {
                let ticket = desk.register(name, *is_priority)?;
                writeln!(
                    out,
                    "registered {} (ticket {}, position {} of {})",
                    ticket.id, ticket.sequence, ticket.position, ticket.queue_len
                )?;
            }
            Command::Next => match desk.call_next()? {
                Some(entry) => writeln!(out, "called {}", entry.id)?,
                None => writeln!(out, "queue empty")?,
            },
            Command::Remove { id } => {
                if desk.remove(id)? {
                    writeln!(out, "removed {}", id)?;
                } else {
                    writeln!(out, "not found {}", id)?;
                }
            }
            Command::Position { id } => match desk.position_of(id)? {
                Some(position) => writeln!(out, "{} is at position {}", id, position)?,
                None => writeln!(out, "not found {}", id)?,
            },
            Command::Front => match desk.front()? {
                Some(entry) => writeln!(out, "front {}", entry.id)?,
                None => writeln!(out, "queue empty")?,
            },
            Command::Show => {
                let snapshot = desk.snapshot()?;
                let ids: Vec<&str> = snapshot.entries.iter().map(|e| e.id.as_str()).collect();
                writeln!(out, "[{}]", ids.join(", "))?;
            }
            Command::Clear => {
                let discarded = desk.clear()?;
                writeln!(out, "cleared {}", discarded)?;
            }
        }
    }
    Ok(())
}

/// Final state of the desk, as a table or as JSON
pub fn write_summary<W: Write>(desk: &ServiceDesk, json: bool, out: &mut W) -> Result<()> {
    let snapshot = desk.snapshot()?;
    if json {
        writeln!(out, "{}", snapshot.to_json_pretty()?)?;
    } else if snapshot.is_empty() {
        writeln!(out, "queue empty")?;
    } else {
        writeln!(out, "{}", render::queue_summary(&snapshot))?;
        writeln!(out, "{}", render::queue_table(&snapshot))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "add Ana Souza".parse::<Command>().unwrap(),
            Command::Add {
                name: "Ana Souza".into(),
                is_priority: false
            }
        );
        assert_eq!(
            "ADD -p Bia".parse::<Command>().unwrap(),
            Command::Add {
                name: "Bia".into(),
                is_priority: true
            }
        );
        assert_eq!(
            "remove 3:Maria".parse::<Command>().unwrap(),
            Command::Remove { id: "3:Maria".into() }
        );
        assert_eq!("next".parse::<Command>().unwrap(), Command::Next);
    }

    #[test]
    fn test_parse_errors() {
        assert!("add".parse::<Command>().is_err());
        assert!("add -p".parse::<Command>().is_err());
        assert!("remove".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("add Ana\n\n# note\nbogus\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 4"));
    }

    #[test]
    fn test_hash_inside_name_is_kept() {
        let commands = parse_script("add Ana#2\nremove 1:Ana#2   # trailing note\n  # indented note\n").unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Add {
                    name: "Ana#2".into(),
                    is_priority: false
                },
                Command::Remove {
                    id: "1:Ana#2".into()
                },
            ]
        );

        let desk = ServiceDesk::new();
        let mut out = Vec::new();
        execute(&desk, &commands, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("registered 1:Ana#2"));
        assert!(text.contains("removed 1:Ana#2"));
    }

    #[test]
    fn test_execute_script() {
        let commands = parse_script(
            "add Ana      # normal\nadd -p Bia\nadd -p Caio\nshow\nnext\nremove 9:X\nposition 1:Ana\nclear\nadd Davi\n",
        )
        .unwrap();
        let desk = ServiceDesk::new();
        let mut out = Vec::new();
        execute(&desk, &commands, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("[2:Bia, 3:Caio, 1:Ana]"));
        assert!(text.contains("called 2:Bia"));
        assert!(text.contains("not found 9:X"));
        assert!(text.contains("1:Ana is at position 2"));
        assert!(text.contains("cleared 2"));
        assert!(text.contains("registered 4:Davi (ticket 4, position 1 of 1)"));
    }

    #[test]
    fn test_json_summary() {
        let desk = ServiceDesk::new();
        desk.register("Ana", false).unwrap();
        let mut out = Vec::new();
        write_summary(&desk, true, &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["entries"][0]["id"], "1:Ana");
        assert_eq!(value["normal_count"], 1);
    }
}
