/// Render a two-column, right-aligned plain text table.
///
/// The first line holds the headers; each following line is one row, in the
/// order given. Columns are separated by a single space and padded to the
/// widest cell of that column.
pub fn two_column_table(headers: (&str, &str), rows: &[(String, String)]) -> String {
    let left = rows
        .iter()
        .map(|(l, _)| l.chars().count())
        .chain(std::iter::once(headers.0.chars().count()))
        .max()
        .unwrap_or(0);
    let right = rows
        .iter()
        .map(|(_, r)| r.chars().count())
        .chain(std::iter::once(headers.1.chars().count()))
        .max()
        .unwrap_or(0);

    let mut out = format!("{:>left$} {:>right$}", headers.0, headers.1);
    for (l, r) in rows {
        out.push('\n');
        out.push_str(&format!("{l:>left$} {r:>right$}"));
    }
    out
}

/// Format a quantity without a trailing `.0` for whole numbers.
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
