use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // Checkbox list item: optional indent, dash, bracketed status, text.
    // Unrecognized bracket content fails to match and is skipped silently.
    // A trailing carriage return on CRLF content stays out of the text.
    static ref TASK_LINE_RE: Regex =
        Regex::new(r"(?m)^[ \t]*- \[( |/|x)\] ([^\r\n]*)\r?$").unwrap();
    static ref DUE_EMOJI_RE: Regex = Regex::new(r"📅\s*(\d{4}-\d{2}-\d{2})").unwrap();
    static ref DUE_ANGLE_RE: Regex = Regex::new(r"<due:\s*(\d{4}-\d{2}-\d{2})>").unwrap();
    static ref COMPLETED_RE: Regex =
        Regex::new(r"✅\s*(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})").unwrap();
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    fn from_marker(marker: &str) -> Option<TaskStatus> {
        match marker {
            " " => Some(TaskStatus::Todo),
            "/" => Some(TaskStatus::Doing),
            "x" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// One structured fact per matched checkbox line.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub file: String,
    /// 1-indexed source line of the checkbox.
    pub line: usize,
    pub status: TaskStatus,
    pub text: String,
    pub due_date: Option<String>,
    pub completed_at: Option<String>,
}

/// Scan content for checkbox list items and return one record per match.
///
/// Line numbers are 1-indexed, derived from the newline count preceding the
/// match start. The due date is the first emoji-prefixed date, falling back
/// to the first `<due: ...>` marker; the emoji form wins when both are
/// present. The completion timestamp is extracted independently of status,
/// so a mistimestamped todo line still surfaces it.
pub fn extract_tasks(file_id: &str, content: &str) -> Vec<TaskRecord> {
    let mut records = Vec::new();
    for cap in TASK_LINE_RE.captures_iter(content) {
        let status = match TaskStatus::from_marker(&cap[1]) {
            Some(s) => s,
            None => continue,
        };
        let start = cap.get(0).map(|m| m.start()).unwrap_or(0);
        let line = content[..start].matches('\n').count() + 1;
        let text = cap[2].to_string();

        let due_date = DUE_EMOJI_RE
            .captures(&text)
            .or_else(|| DUE_ANGLE_RE.captures(&text))
            .map(|c| c[1].to_string());
        let completed_at = COMPLETED_RE.captures(&text).map(|c| c[1].to_string());

        records.push(TaskRecord {
            file: file_id.to_string(),
            line,
            status,
            text,
            due_date,
            completed_at,
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let content = "- [ ] open\n- [/] in progress\n- [x] closed";
        let tasks = extract_tasks("t.md", content);
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].status, TaskStatus::Todo);
        assert_eq!(tasks[1].status, TaskStatus::Doing);
        assert_eq!(tasks[2].status, TaskStatus::Done);
    }

    #[test]
    fn test_line_numbers_are_one_indexed() {
        let content = "intro\n\n- [ ] first\ntext\n  - [x] nested";
        let tasks = extract_tasks("t.md", content);
        assert_eq!(tasks[0].line, 3);
        assert_eq!(tasks[1].line, 5);
    }

    #[test]
    fn test_due_date_from_emoji() {
        let tasks = extract_tasks("t.md", "- [ ] Buy milk 📅 2026-01-15");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Todo);
        assert_eq!(tasks[0].due_date.as_deref(), Some("2026-01-15"));
        assert!(tasks[0].completed_at.is_none());
    }

    #[test]
    fn test_due_date_from_angle_marker() {
        let tasks = extract_tasks("t.md", "- [ ] File report <due: 2026-03-02>");
        assert_eq!(tasks[0].due_date.as_deref(), Some("2026-03-02"));
    }

    #[test]
    fn test_emoji_due_wins_over_angle_marker() {
        let tasks = extract_tasks("t.md", "- [ ] Both <due: 2026-03-02> 📅 2026-01-15");
        assert_eq!(tasks[0].due_date.as_deref(), Some("2026-01-15"));
    }

    #[test]
    fn test_completion_timestamp() {
        let tasks = extract_tasks("t.md", "- [x] Shipped ✅ 2026-02-10 14:30:00");
        assert_eq!(tasks[0].completed_at.as_deref(), Some("2026-02-10 14:30:00"));
    }

    #[test]
    fn test_completion_extracted_even_on_todo() {
        // Incorrectly timestamped todo lines still surface the timestamp
        let tasks = extract_tasks("t.md", "- [ ] Oops ✅ 2026-02-10 14:30:00");
        assert_eq!(tasks[0].status, TaskStatus::Todo);
        assert_eq!(tasks[0].completed_at.as_deref(), Some("2026-02-10 14:30:00"));
    }

    #[test]
    fn test_unrecognized_markers_skipped() {
        let content = "- [?] unknown\n- no bracket\n* [ ] star bullet\n- [ ] kept";
        let tasks = extract_tasks("t.md", content);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "kept");
    }

    #[test]
    fn test_crlf_content_keeps_carriage_return_out_of_text() {
        let tasks = extract_tasks("t.md", "- [ ] first\r\n- [x] second 📅 2026-01-15\r\n");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].text, "first");
        assert_eq!(tasks[1].text, "second 📅 2026-01-15");
        assert_eq!(tasks[1].due_date.as_deref(), Some("2026-01-15"));
        assert_eq!(tasks[1].line, 2);
    }

    #[test]
    fn test_every_matched_line_yields_one_record() {
        let content = (0..10)
            .map(|i| format!("- [ ] task {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(extract_tasks("t.md", &content).len(), 10);
    }
}
