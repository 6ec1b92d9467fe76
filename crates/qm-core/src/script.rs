//! Parsing of migration files into up and down sections.
//!
//! File layout:
//!
//! ```text
//! -- UP            (optional header)
//! CREATE TABLE t (id INT);
//! -- DOWN          (mandatory, even when the down-section is empty)
//! DROP TABLE t;
//! ```

/// Marker lines that separate the sections of a migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFormat {
    /// Optional header line before the up-section
    pub up_marker: String,

    /// Mandatory line separating the up-section from the down-section
    pub down_marker: String,
}

impl Default for ScriptFormat {
    fn default() -> Self {
        Self {
            up_marker: "-- UP".to_string(),
            down_marker: "-- DOWN".to_string(),
        }
    }
}

/// Parsed sections of one migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSections {
    pub up: String,
    pub down: String,
}

impl ScriptFormat {
    /// Split file content on the down marker.
    ///
    /// Returns `None` when the marker line is missing. Marker lines match
    /// case-insensitively and ignore surrounding whitespace.
    pub fn parse(&self, content: &str) -> Option<ScriptSections> {
        let mut up = Vec::new();
        let mut down = Vec::new();
        let mut seen_down = false;
        let mut seen_content = false;

        for line in content.lines() {
            let trimmed = line.trim();
            if !seen_down && trimmed.eq_ignore_ascii_case(&self.down_marker) {
                seen_down = true;
                continue;
            }
            if !seen_down && !seen_content && trimmed.eq_ignore_ascii_case(&self.up_marker) {
                seen_content = true;
                continue;
            }
            if !trimmed.is_empty() {
                seen_content = true;
            }
            if seen_down {
                down.push(line);
            } else {
                up.push(line);
            }
        }

        if !seen_down {
            return None;
        }

        Some(ScriptSections {
            up: up.join("\n").trim().to_string(),
            down: down.join("\n").trim().to_string(),
        })
    }
}
