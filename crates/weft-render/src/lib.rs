//! Fixed-width table and CSV rendering over the attention stack's view.

use thiserror::Error;
use weft_core::stack::StackView;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to finish CSV: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV output was not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

const COL_WIDTH_TID: usize = 5;

/// Human-readable table: name and status lines, then a tid/thread/status
/// table sized to the longest thread name.
pub fn render_table(view: &StackView) -> String {
    let mut out = format!("name: {}\n\nstatus: {}\n\n", view.name, view.status);
    if view.threads.is_empty() {
        return out;
    }

    let longest = view
        .threads
        .iter()
        .map(|row| row.name.len())
        .max()
        .unwrap_or(0);
    let col_width_thread = longest.max("thread".len()) + 1;

    out.push_str(&format!(
        "{:<tid$}{:<thread$}status\n",
        "tid",
        "thread",
        tid = COL_WIDTH_TID,
        thread = col_width_thread
    ));
    out.push_str(&format!(
        "{} {} {} \n",
        "=".repeat(COL_WIDTH_TID - 1),
        "=".repeat(col_width_thread - 1),
        "=".repeat("status".len())
    ));
    for row in &view.threads {
        out.push_str(&format!(
            "{:<tid$}{:<thread$}{}\n",
            row.tid,
            row.name,
            row.status,
            tid = COL_WIDTH_TID,
            thread = col_width_thread
        ));
    }
    out.push('\n');
    out
}

/// The same rows as machine-readable CSV.
pub fn render_csv(view: &StackView) -> Result<String, RenderError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["tid", "thread", "status"])?;
    for row in &view.threads {
        writer.write_record([row.tid.to_string().as_str(), row.name.as_str(), row.status.as_str()])?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use weft_core::stack::AttentionStack;

    fn sample_view() -> StackView {
        let mut stack = AttentionStack::new("daily").expect("stack");
        stack.spawn("build").expect("spawn");
        stack.interrupt("fix-bug").expect("interrupt");
        stack.view()
    }

    #[test]
    fn table_lays_out_fixed_width_columns() {
        let rendered = render_table(&sample_view());
        let expected = concat!(
            "name: daily\n",
            "\n",
            "status: RUN: fix-bug < build\n",
            "\n",
            "tid  thread  status\n",
            "==== ======= ====== \n",
            "0    build   \n",
            "1    fix-bug RUNNING\n",
            "\n",
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn table_widens_to_the_longest_thread_name() {
        let mut stack = AttentionStack::new("daily").expect("stack");
        stack.interrupt("a-rather-long-thread-name").expect("interrupt");
        let rendered = render_table(&stack.view());
        assert!(rendered.contains("tid  thread"));
        assert!(rendered.contains("0    a-rather-long-thread-name RUNNING"));
    }

    #[test]
    fn empty_stack_renders_just_the_header_lines() {
        let stack = AttentionStack::new("daily").expect("stack");
        let rendered = render_table(&stack.view());
        assert_eq!(rendered, "name: daily\n\nstatus: - STOP -\n\n");
    }

    #[test]
    fn csv_exports_every_row() {
        let rendered = render_csv(&sample_view()).expect("csv");
        let expected = "tid,thread,status\n0,build,\n1,fix-bug,RUNNING\n";
        assert_eq!(rendered, expected);
    }
}
