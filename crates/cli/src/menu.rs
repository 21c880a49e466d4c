//! Interactive service-desk menu
//!
//! Reads from any `BufRead` and writes to any `Write` so the loop can be
//! driven headlessly in tests.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;
use ticketq_core::application::constants::{PRIORITY_FLAG_NORMAL, PRIORITY_FLAG_PRIORITY};
use ticketq_core::application::ServiceDesk;

use crate::render;

const RULE_WIDTH: usize = 60;

/// Coerce console input to a priority flag.
///
/// Anything other than `0`/`1` falls back to normal service; the second
/// value is a notice for the operator when that happens.
pub fn parse_priority_flag(input: &str) -> (bool, Option<&'static str>) {
    match input.trim().parse::<i32>() {
        Ok(PRIORITY_FLAG_PRIORITY) => (true, None),
        Ok(PRIORITY_FLAG_NORMAL) => (false, None),
        Ok(_) => (false, Some("Priority must be 0 or 1. Using 0.")),
        Err(_) => (false, Some("Invalid value. Using priority 0.")),
    }
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "s" | "y" | "yes")
}

enum Flow {
    Continue,
    /// Skip the "press Enter" pause
    Again,
    Exit,
}

pub struct Menu<'a, R, W> {
    desk: &'a ServiceDesk,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(desk: &'a ServiceDesk, input: R, out: W) -> Self {
        Self { desk, input, out }
    }

    /// Run until the operator exits or input ends
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.header()?;
            let Some(choice) = self.prompt("\nChoose an option: ")? else {
                break;
            };

            let flow = match choice.as_str() {
                "1" => self.register()?,
                "2" => self.call_next()?,
                "3" => self.show()?,
                "4" => self.remove()?,
                "5" => self.clear()?,
                "6" => self.exit()?,
                _ => {
                    writeln!(self.out, "\n{}", "✗ Invalid option. Try again.".red())?;
                    Flow::Continue
                }
            };

            match flow {
                Flow::Exit => break,
                Flow::Again => continue,
                Flow::Continue => {
                    if self.prompt("\nPress Enter to continue...")?.is_none() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Interactive menu finished");
        Ok(())
    }

    /// Print a prompt and read one trimmed line; `None` on end of input
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.out, "{}", text)?;
        self.out.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn confirm(&mut self, text: &str) -> Result<bool> {
        Ok(self
            .prompt(text)?
            .map(|answer| is_confirmation(&answer))
            .unwrap_or(false))
    }

    fn header(&mut self) -> Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        let front = self.desk.front()?;
        writeln!(self.out, "\n{}", rule)?;
        writeln!(self.out, "{}", "SERVICE DESK".bold())?;
        writeln!(self.out, "{}", rule)?;
        writeln!(self.out, "1 - Register customer")?;
        writeln!(self.out, "2 - Call next customer")?;
        writeln!(self.out, "3 - Show full queue")?;
        writeln!(self.out, "4 - Remove customer from queue")?;
        writeln!(self.out, "5 - Clear queue")?;
        writeln!(self.out, "6 - Exit")?;
        writeln!(self.out, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(self.out, "{}", render::next_up_line(front.as_ref()))?;
        writeln!(self.out, "{}", rule)?;
        Ok(())
    }

    fn register(&mut self) -> Result<Flow> {
        let Some(name) = self.prompt("Customer name: ")? else {
            return Ok(Flow::Exit);
        };
        if name.is_empty() {
            writeln!(self.out, "{}", "Name cannot be empty!".red())?;
            return Ok(Flow::Again);
        }

        let Some(raw_flag) = self.prompt("Priority (0=normal, 1=priority): ")? else {
            return Ok(Flow::Exit);
        };
        let (is_priority, notice) = parse_priority_flag(&raw_flag);
        if let Some(notice) = notice {
            writeln!(self.out, "{}", notice.yellow())?;
        }

        match self.desk.register(&name, is_priority) {
            Ok(ticket) => {
                writeln!(self.out)?;
                for line in render::ticket_lines(&ticket) {
                    writeln!(self.out, "{}", line)?;
                }
            }
            Err(e) if e.is_user_error() => writeln!(self.out, "{} {}", "Error:".red(), e)?,
            Err(e) => return Err(e.into()),
        }
        Ok(Flow::Continue)
    }

    fn call_next(&mut self) -> Result<Flow> {
        match self.desk.call_next()? {
            Some(entry) => {
                writeln!(self.out, "\n{}", "CALLING NEXT CUSTOMER:".bold())?;
                writeln!(self.out, "   {}", entry.id.cyan().bold())?;
                writeln!(self.out, "   Please proceed to the counter!")?;
                match self.desk.front()? {
                    Some(next) => writeln!(self.out, "\n   Next to be called: {}", next.id)?,
                    None => writeln!(
                        self.out,
                        "\n   {}",
                        "Attention: nobody else is waiting!".yellow()
                    )?,
                }
            }
            None => writeln!(self.out, "\nQueue is empty. Nobody to call.")?,
        }
        Ok(Flow::Continue)
    }

    fn show(&mut self) -> Result<Flow> {
        let snapshot = self.desk.snapshot()?;
        if snapshot.is_empty() {
            writeln!(self.out, "\nQueue is empty.")?;
        } else {
            writeln!(
                self.out,
                "\n{}",
                format!("FULL QUEUE - {}", render::queue_summary(&snapshot)).bold()
            )?;
            writeln!(self.out, "{}", render::queue_table(&snapshot))?;
        }
        Ok(Flow::Continue)
    }

    fn remove(&mut self) -> Result<Flow> {
        let snapshot = self.desk.snapshot()?;
        let Some(front) = snapshot.front() else {
            writeln!(self.out, "\nQueue is empty.")?;
            return Ok(Flow::Again);
        };

        writeln!(self.out, "\nPeople in line:")?;
        writeln!(self.out, "{}", render::queue_table(&snapshot))?;
        writeln!(self.out, "\nFirst in line: {}", front.id)?;

        let Some(id) = self.prompt("\nID of the person to remove (e.g. '3:Maria'): ")? else {
            return Ok(Flow::Exit);
        };

        if id == front.id
            && !self.confirm("This is the first person in line! Are you sure? (s/n): ")?
        {
            writeln!(self.out, "Operation cancelled.")?;
            return Ok(Flow::Again);
        }

        if self.desk.remove(&id)? {
            writeln!(self.out, "{}", "✓ Person removed from the queue.".green())?;
            match self.desk.front()? {
                Some(next) => writeln!(self.out, "New first in line: {}", next.id)?,
                None => writeln!(self.out, "The queue is now empty.")?,
            }
        } else {
            writeln!(self.out, "{}", "✗ ID not found.".red())?;
        }
        Ok(Flow::Continue)
    }

    fn clear(&mut self) -> Result<Flow> {
        if self.desk.is_empty()? {
            writeln!(self.out, "The queue is already empty.")?;
            return Ok(Flow::Continue);
        }
        if self.confirm("Are you sure you want to clear the WHOLE queue? (s/n): ")? {
            let discarded = self.desk.clear()?;
            writeln!(
                self.out,
                "{}",
                format!("✓ Queue cleared ({} removed).", discarded).green()
            )?;
        } else {
            writeln!(self.out, "Operation cancelled.")?;
        }
        Ok(Flow::Continue)
    }

    fn exit(&mut self) -> Result<Flow> {
        if !self.desk.is_empty()?
            && !self.confirm("There are still people in line! Exit anyway? (s/n): ")?
        {
            writeln!(self.out, "Staying in the system...")?;
            return Ok(Flow::Continue);
        }
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.out, "\n{}", rule)?;
        writeln!(self.out, "{}", "THANK YOU FOR USING THE SERVICE DESK!".bold())?;
        writeln!(self.out, "{}", rule)?;
        Ok(Flow::Exit)
    }
}
