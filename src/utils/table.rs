/// Plain-text table for console pages
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl Table {
    /// Create a new table with the given headers
    pub fn new(headers: &[&str]) -> Self {
        let col_widths = headers.iter().map(|h| h.chars().count()).collect();
        let headers = headers.iter().map(|h| h.to_uppercase()).collect();
        Table {
            headers,
            rows: Vec::new(),
            col_widths,
        }
    }

    /// Add a row; cells past the header count are dropped
    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, col) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(col.chars().count());
            }
        }

        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut output = String::new();

        output.push_str(&self.render_row(&self.headers));
        output.push('\n');
        output.push_str(&self.render_separator());
        output.push('\n');

        for row in &self.rows {
            output.push_str(&self.render_row(row));
            output.push('\n');
        }

        output
    }

    fn render_row(&self, row: &[String]) -> String {
        let cells: Vec<String> = self
            .col_widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let col = row.get(i).map(String::as_str).unwrap_or("");
                let pad = width.saturating_sub(col.chars().count());
                format!("{}{}", col, " ".repeat(pad))
            })
            .collect();
        cells.join(" | ").trim_end().to_string()
    }

    fn render_separator(&self) -> String {
        self.col_widths
            .iter()
            .map(|&width| "-".repeat(width))
            .collect::<Vec<_>>()
            .join("-+-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_table() {
        let mut table = Table::new(&["Id", "Amount", "Status"]);
        table.add_row(vec!["txn_1".into(), "$100.00".into(), "approved".into()]);
        table.add_row(vec!["txn_22".into(), "$5.00".into(), "declined".into()]);

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "ID     | AMOUNT  | STATUS");
        assert_eq!(lines[1], "-------+---------+---------");
        assert_eq!(lines[2], "txn_1  | $100.00 | approved");
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
        assert!(Table::new(&["Type", "Count"]).is_empty());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = Table::new(&["A", "B"]);
        table.add_row(vec!["x".into()]);
        assert!(table.render().lines().nth(2).unwrap().starts_with("x |"));
    }
}
