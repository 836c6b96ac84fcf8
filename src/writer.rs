//! Indentation-tracked text sink for generated code.

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// `head {`, then one level deeper. An empty head opens a bare block.
    pub fn open(&mut self, head: impl AsRef<str>) {
        let head = head.as_ref();
        if head.is_empty() {
            self.line("{");
        } else {
            self.line(format!("{head} {{"));
        }
        self.depth += 1;
    }

    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Copies pre-rendered text, re-indented to the current depth.
    pub fn fragment(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn nests_blocks() {
        let mut w = CodeWriter::new();
        w.open("fn f()");
        w.open("if x");
        w.line("a();");
        w.close();
        w.blank();
        w.open("");
        w.line("b();");
        w.close();
        w.close();
        // stray closes never underflow
        w.close();
        assert_eq!(
            w.into_string(),
            "fn f() {\n    if x {\n        a();\n    }\n\n    {\n        b();\n    }\n}\n}\n"
        );
    }

    #[test]
    fn multi_line_fragments_keep_relative_indentation() {
        let mut w = CodeWriter::new();
        w.open("for x in xs");
        w.fragment("if seen(x) {\n    return;\n}");
        w.close();
        assert_eq!(w.into_string(), "for x in xs {\n    if seen(x) {\n        return;\n    }\n}\n");
    }

    #[test]
    fn fragments_are_reindented() {
        let mut w = CodeWriter::new();
        w.open("");
        w.fragment("x();\n\ny();\n");
        w.close();
        assert_eq!(w.into_string(), "{\n    x();\n\n    y();\n}\n");
    }
}
