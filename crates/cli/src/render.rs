//! Terminal rendering of tickets and queue listings

use colored::Colorize;
use tabled::{Table, Tabled};
use ticketq_core::application::{QueueSnapshot, Ticket};
use ticketq_core::domain::Entry;

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Ticket")]
    ticket: u64,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Waiting")]
    waiting: String,
}

/// `65_000` -> `"1m 05s"`
pub fn format_wait(millis: i64) -> String {
    let secs = millis.max(0) / 1000;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Queue listing as a table, front first
pub fn queue_table(snapshot: &QueueSnapshot) -> String {
    let rows: Vec<QueueRow> = snapshot
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| QueueRow {
            marker: if i == 0 { ">>>" } else { "" },
            position: i + 1,
            ticket: entry.sequence,
            id: entry.id.clone(),
            class: entry.class().to_string(),
            waiting: format_wait(entry.waited_ms(snapshot.taken_at)),
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn queue_summary(snapshot: &QueueSnapshot) -> String {
    format!(
        "{} waiting ({} priority, {} normal)",
        snapshot.len(),
        snapshot.priority_count,
        snapshot.normal_count
    )
}

pub fn next_up_line(front: Option<&Entry>) -> String {
    match front {
        Some(entry) => format!("{} {}", "NEXT TO BE SERVED:".bold(), entry.id.cyan().bold()),
        None => format!("{} {}", "NEXT TO BE SERVED:".bold(), "nobody in line".dimmed()),
    }
}

pub fn ticket_lines(ticket: &Ticket) -> Vec<String> {
    let mut lines = vec![
        format!("{}", "✓ Customer registered".green().bold()),
        format!("  Ticket:   {}", ticket.sequence),
        format!("  ID:       {}", ticket.id),
    ];
    if ticket.is_priority {
        lines.push(format!(
            "  {}",
            "(priority customer - served before normal customers)".yellow()
        ));
    }
    lines.push(format!(
        "  Position: {} of {}",
        ticket.position, ticket.queue_len
    ));
    if !ticket.is_priority && ticket.priority_ahead > 0 {
        lines.push(format!(
            "  Priority customers ahead: {}",
            ticket.priority_ahead
        ));
    }
    lines
}
