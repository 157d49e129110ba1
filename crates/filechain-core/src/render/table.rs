use crate::model::Value;
use crate::snapshot::RowStoreSnapshot;

const MAX_CELL_CHARS: usize = 60;

/// Render the first `max_rows` rows of a snapshot as a Markdown table
///
/// Vectors are abbreviated, long strings truncated, and File values shown
/// by path. A footer reports how many rows were shown.
pub fn render_table(snapshot: &RowStoreSnapshot, max_rows: usize) -> String {
    let names = snapshot.schema().names();
    let mut output = String::new();

    if names.is_empty() {
        output.push_str("(no columns)\n");
        return output;
    }

    output.push_str(&format!("| {} |\n", names.join(" | ")));
    output.push_str(&format!(
        "|{}\n",
        names.iter().map(|_| " --- |").collect::<String>()
    ));

    let shown = snapshot.len().min(max_rows);
    for row in &snapshot.rows()[..shown] {
        let cells: Vec<String> = names
            .iter()
            .map(|name| row.get(name).map(format_cell).unwrap_or_default())
            .collect();
        output.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    output.push_str(&format!("\n(showing {} of {} rows)\n", shown, snapshot.len()));
    output
}

fn format_cell(value: &Value) -> String {
    let text = match value {
        Value::File(file) => file.path.clone(),
        other => other.to_string(),
    };
    let text = text.replace('|', "\\|").replace(['\n', '\r'], " ");
    if text.chars().count() > MAX_CELL_CHARS {
        let truncated: String = text.chars().take(MAX_CELL_CHARS - 1).collect();
        format!("{}…", truncated)
    } else {
        text
    }
}
