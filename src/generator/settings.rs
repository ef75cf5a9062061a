use std::fmt;
use std::io;

use crate::error::GenerationError;

/// Callback receiving every generated file as (file name, content).
pub type WriteFile = Box<dyn Fn(&str, &str) -> io::Result<()>>;

/// GeneratorSettings bundles everything a backend needs besides the grammar tree.
/// Settings that are absent disable the matching generated feature: no test name means no test
/// harness, a zero debug level means no tracing and so on.
pub struct GeneratorSettings {
    /// Text placed verbatim at the top of every generated file
    pub header: String,

    /// Name of the generated parser type, namespace or class
    pub name: String,

    /// Input file the generated test harness parses
    pub test_name: Option<String>,

    /// Base name of the generated files, derived from `name` when absent
    pub file_name: Option<String>,

    /// Makes the generated test harness print the parse tree
    pub debug: bool,

    /// Tracing detail compiled into generated rules, 0 disables tracing
    pub debug_level: u32,

    /// Emit a benchmark harness next to the parser
    pub bench: bool,

    /// Emit a rule invocation heatmap variant of the parser
    pub heatmap: bool,

    write_file: WriteFile,
}

impl GeneratorSettings {
    pub fn new(name: impl Into<String>, write_file: WriteFile) -> Self {
        Self {
            header: String::new(),
            name: name.into(),
            test_name: None,
            file_name: None,
            debug: false,
            debug_level: 0,
            bench: false,
            heatmap: false,
            write_file,
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_test_name(mut self, test_name: impl Into<String>) -> Self {
        self.test_name = Some(test_name.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_debug_level(mut self, debug_level: u32) -> Self {
        self.debug_level = debug_level;
        self
    }

    pub fn with_bench(mut self, bench: bool) -> Self {
        self.bench = bench;
        self
    }

    pub fn with_heatmap(mut self, heatmap: bool) -> Self {
        self.heatmap = heatmap;
        self
    }

    /// Base name used for generated files, the explicit file name wins over the type name.
    pub fn base_name(&self) -> String {
        match &self.file_name {
            Some(file_name) => file_name.clone(),
            None => self.name.to_lowercase(),
        }
    }

    /// Checks the settings that are required before any traversal starts.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let valid_name = self.name.chars().next().map_or(false, |c| c.is_ascii_alphabetic())
            && self.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(GenerationError::InvalidSettings(format!(
                "type name `{}` must start with a letter and contain only letters, digits or `_`", self.name
            )));
        }

        if let Some(file_name) = &self.file_name {
            if file_name.is_empty() || file_name.contains(['/', '\\']) {
                return Err(GenerationError::InvalidSettings(format!(
                    "output file name `{}` must be a plain file name", file_name
                )));
            }
        }
        Ok(())
    }

    /// Delivers a generated file through the write callback
    pub fn write(&self, file: &str, content: &str) -> Result<(), GenerationError> {
        log::info!("writing {} ({} bytes)", file, content.len());
        (self.write_file)(file, content).map_err(|source| GenerationError::Io {
            file: file.to_owned(),
            source,
        })
    }
}

impl fmt::Debug for GeneratorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorSettings")
            .field("header", &self.header)
            .field("name", &self.name)
            .field("test_name", &self.test_name)
            .field("file_name", &self.file_name)
            .field("debug", &self.debug)
            .field("debug_level", &self.debug_level)
            .field("bench", &self.bench)
            .field("heatmap", &self.heatmap)
            .finish_non_exhaustive()
    }
}
