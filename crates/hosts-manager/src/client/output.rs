use hosts_manager_common::Entry;
use serde::Serialize;

use super::OutputFormat;

/// Trait for types that can be displayed in table format
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for Entry {
    fn headers() -> Vec<&'static str> {
        vec!["LINE", "ADDRESS", "HOSTNAME", "COMMENT", "ENABLED"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.line.map(|l| l.to_string()).unwrap_or_default(),
            self.address.clone(),
            self.hostname.clone(),
            self.comment.clone().unwrap_or_default(),
            if self.enabled { "yes" } else { "no" }.to_string(),
        ]
    }
}

/// Print items in the specified format
pub fn print_items<T>(items: &[T], format: OutputFormat)
where
    T: TableDisplay + Serialize,
{
    match format {
        OutputFormat::Table => print!("{}", render_table(items)),
        OutputFormat::Json => print_json(items),
        OutputFormat::Csv => print_csv(items),
    }
}

fn render_table<T: TableDisplay>(items: &[T]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let headers = T::headers();
    let rows: Vec<Vec<String>> = items.iter().map(|i| i.row()).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_line = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = width)
            })
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = format_line(headers.iter().map(|h| h.to_string()).collect());
    for row in rows {
        out.push_str(&format_line(row));
    }
    out
}

fn print_json<T: Serialize>(items: &[T]) {
    match serde_json::to_string_pretty(items) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing to JSON: {}", e),
    }
}

fn print_csv<T: TableDisplay>(items: &[T]) {
    let mut writer = csv::Writer::from_writer(std::io::stdout());

    if let Err(e) = writer.write_record(T::headers()) {
        eprintln!("Error writing CSV headers: {}", e);
        return;
    }

    for item in items {
        if let Err(e) = writer.write_record(item.row()) {
            eprintln!("Error writing CSV row: {}", e);
            return;
        }
    }

    if let Err(e) = writer.flush() {
        eprintln!("Error flushing CSV output: {}", e);
    }
}
