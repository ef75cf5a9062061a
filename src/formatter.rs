/// CodeFormatter is a builder utility that accumulates generated source text linearly.
/// It keeps track of the current indentation level so that callers can emit nested
/// constructs without worrying about the final layout: every non-empty line is prefixed
/// with one tab per indentation level at the moment it is added.
///
/// ## Typical Usage
/// let mut formatter = CodeFormatter::new();
/// formatter.add("{\n");
/// formatter.inc();
/// formatter.add("statement;\n");      // Becomes "\tstatement;\n"
/// formatter.dec();
/// formatter.add("}\n");
#[derive(Debug, Default)]
pub struct CodeFormatter {
    buffer: String,
    level: usize,
    at_line_start: bool,
}

impl CodeFormatter {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            level: 0,
            at_line_start: true,
        }
    }

    /// Increase indentation for all following lines
    pub fn inc(&mut self) {
        self.level += 1;
    }

    /// Decrease indentation for all following lines. Never goes below zero.
    pub fn dec(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Add appends text, indenting every line that starts within it.
    /// Text may contain multiple lines and does not need to end with a newline, in which case
    /// the next call continues the same line.
    pub fn add(&mut self, text: &str) {
        for line in text.split_inclusive('\n') {
            if self.at_line_start && line != "\n" {
                for _ in 0..self.level {
                    self.buffer.push('\t');
                }
            }
            self.buffer.push_str(line);
            self.at_line_start = line.ends_with('\n');
        }
    }

    /// Adds a complete line, a newline is appended.
    pub fn line(&mut self, text: &str) {
        self.add(text);
        self.add("\n");
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Consumes the formatter returning the accumulated text.
    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::CodeFormatter;

    #[test]
    fn test_nested_indentation() {
        let mut formatter = CodeFormatter::new();
        formatter.add("{\n");
        formatter.inc();
        formatter.add("a;\nb;\n");
        formatter.inc();
        formatter.line("c;");
        formatter.dec();
        formatter.dec();
        formatter.add("}\n");
        assert_eq!("{\n\ta;\n\tb;\n\t\tc;\n}\n", formatter.finish());
    }

    #[test]
    fn test_empty_lines_are_not_indented() {
        let mut formatter = CodeFormatter::new();
        formatter.inc();
        formatter.add("a\n\nb\n");
        assert_eq!("\ta\n\n\tb\n", formatter.as_str());
    }

    #[test]
    fn test_partial_lines_continue() {
        let mut formatter = CodeFormatter::new();
        formatter.inc();
        formatter.add("return ");
        formatter.add("x;\n");
        assert_eq!("\treturn x;\n", formatter.finish());
    }

    #[test]
    fn test_dec_saturates() {
        let mut formatter = CodeFormatter::new();
        formatter.dec();
        assert_eq!(0, formatter.level());
    }
}
