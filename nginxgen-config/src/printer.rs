//! Pretty printer
//!
//! Rendering happens in two steps. [`flatten`] turns a tree into unindented
//! lines where blocks open with a trailing `{` and close with `}`.
//! [`pretty_print`] then indents those lines and puts an empty line after
//! every closed block, looking only at the markers.

use crate::tree::Section;
use std::fmt;

/// One level of indentation
pub const INDENT: &str = "    ";

/// Flatten a tree into unindented lines
pub fn flatten(section: &Section) -> Vec<String> {
    section.render()
}

/// Indent the lines and add an empty line after each closed block.
pub fn pretty_print<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut indent: usize = 0;
    let mut output = Vec::new();

    for line in lines {
        let line = line.as_ref();
        let closes = line.starts_with('}');
        if closes {
            indent = indent.saturating_sub(1);
        }
        output.push(format!("{}{}", INDENT.repeat(indent), line));
        if closes {
            output.push(String::new());
        }
        if line.ends_with('{') {
            indent += 1;
        }
    }

    output
}

/// Render a tree to its final text
pub fn render(section: &Section) -> String {
    pretty_print(flatten(section)).join("\n")
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}
