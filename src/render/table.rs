use crate::model::{EndpointReport, Report};

const HEAD: [&str; 6] = [
    "Hits",
    "Res. Mean",
    "Res. Median",
    "Res. Mode",
    "Top Worker",
    "Worker Hits",
];

const PLACEHOLDER: &str = "-";

pub const STALE_WARNING: &str =
    "WARNING: new data has been tracked since the last calculation, results shown may be stale.";

/// Render one boxed table per endpoint, each under a `METHOD TEMPLATE` heading.
pub fn render_table_report(report: &Report<'_>) -> String {
    let mut out = String::new();

    if report.stale {
        out.push('\n');
        out.push_str(STALE_WARNING);
        out.push_str("\n\n");
    }

    for endpoint in &report.endpoints {
        out.push_str(&endpoint.signature.method);
        out.push(' ');
        out.push_str(&endpoint.signature.template);
        out.push('\n');
        out.push_str(&draw_table(&HEAD, &[endpoint_row(endpoint)]));
        out.push_str("\n\n");
    }

    out
}

fn endpoint_row(endpoint: &EndpointReport<'_>) -> Vec<String> {
    let analysis = endpoint.analysis;

    let mean = analysis
        .and_then(|a| a.mean)
        .map(|m| format!("{:.3}", m))
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    // f64 Display drops the fraction for whole numbers: 20.0 => "20".
    let median = analysis
        .and_then(|a| a.median)
        .map(|m| m.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let mode = analysis
        .and_then(|a| a.mode.as_ref())
        .map(|values| {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let (worker, worker_hits) = match endpoint.top_worker {
        Some(w) => (w.id.clone(), w.count.to_string()),
        None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
    };

    vec![
        endpoint.hits.to_string(),
        mean,
        median,
        mode,
        worker,
        worker_hits,
    ]
}

/// Draw an ASCII table with a header row.
fn draw_table(head: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = head.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let rule = {
        let mut s = String::from("+");
        for w in &widths {
            s.push_str(&"-".repeat(w + 2));
            s.push('+');
        }
        s
    };

    let mut lines = vec![rule.clone()];
    lines.push(table_line(head.iter().copied(), &widths));
    lines.push(rule.clone());
    for row in rows {
        lines.push(table_line(row.iter().map(String::as_str), &widths));
    }
    lines.push(rule);

    lines.join("\n")
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (cell, w) in cells.zip(widths) {
        let pad = w - cell.chars().count();
        s.push(' ');
        s.push_str(cell);
        s.push_str(&" ".repeat(pad + 1));
        s.push('|');
    }
    s
}
