use similar::{ChangeTag, TextDiff};

/// Line diff between a tracked file's original and latest content.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: String,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub diff_lines: Vec<DiffLine>,
}

#[derive(Debug, Clone)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    pub content: String,
    pub old_line_number: Option<usize>,
    pub new_line_number: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineType {
    Context,
    Addition,
    Deletion,
}

impl FileDiff {
    /// Diff two content versions; `None` means the file did not exist on
    /// that side (creation when old is `None`, deletion when new is).
    pub fn new(path: String, old_content: Option<String>, new_content: Option<String>) -> Self {
        let old = old_content.as_deref().unwrap_or("");
        let new = new_content.as_deref().unwrap_or("");
        let diff_lines = Self::compute_diff(old, new);

        FileDiff {
            path,
            old_content,
            new_content,
            diff_lines,
        }
    }

    pub fn is_creation(&self) -> bool {
        self.old_content.is_none()
    }

    pub fn is_deletion(&self) -> bool {
        self.new_content.is_none()
    }

    fn compute_diff(old_text: &str, new_text: &str) -> Vec<DiffLine> {
        let diff = TextDiff::from_lines(old_text, new_text);
        let mut lines = Vec::new();
        let mut old_line_num = 1;
        let mut new_line_num = 1;

        for change in diff.iter_all_changes() {
            let (line_type, old_num, new_num) = match change.tag() {
                ChangeTag::Delete => {
                    let num = old_line_num;
                    old_line_num += 1;
                    (DiffLineType::Deletion, Some(num), None)
                }
                ChangeTag::Insert => {
                    let num = new_line_num;
                    new_line_num += 1;
                    (DiffLineType::Addition, None, Some(num))
                }
                ChangeTag::Equal => {
                    let old_num = old_line_num;
                    let new_num = new_line_num;
                    old_line_num += 1;
                    new_line_num += 1;
                    (DiffLineType::Context, Some(old_num), Some(new_num))
                }
            };

            lines.push(DiffLine {
                line_type,
                content: change.to_string(),
                old_line_number: old_num,
                new_line_number: new_num,
            });
        }

        lines
    }

    /// Render one unified-diff-style section for this file.
    pub fn render(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("diff --git a/{} b/{}\n", self.path, self.path));
        if self.is_creation() {
            output.push_str("new file mode 100644\n");
            output.push_str(&format!("--- /dev/null\n+++ b/{}\n", self.path));
        } else if self.is_deletion() {
            output.push_str("deleted file mode 100644\n");
            output.push_str(&format!("--- a/{}\n+++ /dev/null\n", self.path));
        } else {
            output.push_str(&format!("--- a/{}\n+++ b/{}\n", self.path, self.path));
        }

        for line in &self.diff_lines {
            let prefix = match line.line_type {
                DiffLineType::Addition => "+",
                DiffLineType::Deletion => "-",
                DiffLineType::Context => " ",
            };
            output.push_str(prefix);
            output.push_str(&line.content);
            if !line.content.ends_with('\n') {
                output.push('\n');
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_computation() {
        let old_text = "line 1\nline 2\nline 3\n";
        let new_text = "line 1\nline 2 modified\nline 3\nline 4\n";

        let diff = FileDiff::new("test.txt".to_string(), Some(old_text.into()), Some(new_text.into()));

        assert!(!diff.diff_lines.is_empty());
        assert!(diff
            .diff_lines
            .iter()
            .any(|l| l.line_type == DiffLineType::Addition));
        assert!(diff
            .diff_lines
            .iter()
            .any(|l| l.line_type == DiffLineType::Deletion));
    }

    #[test]
    fn test_render_modification() {
        let diff = FileDiff::new(
            "a.txt".to_string(),
            Some("line1\nline2\noriginal".to_string()),
            Some("line1\nline2\nmodified".to_string()),
        );
        let text = diff.render();

        assert!(text.contains("--- a/a.txt"));
        assert!(text.contains("-original"));
        assert!(text.contains("+modified"));
    }

    #[test]
    fn test_render_creation() {
        let diff = FileDiff::new("b.txt".to_string(), None, Some("new content".to_string()));
        let text = diff.render();

        assert!(diff.is_creation());
        assert!(text.contains("new file mode 100644"));
        assert!(text.contains("+new content"));
        assert!(!text.contains("-new content"));
    }

    #[test]
    fn test_render_deletion() {
        let diff = FileDiff::new("c.txt".to_string(), Some("gone\n".to_string()), None);
        let text = diff.render();

        assert!(diff.is_deletion());
        assert!(text.contains("deleted file mode 100644"));
        assert!(text.contains("-gone"));
    }
}
