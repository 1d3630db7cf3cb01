//! Markdown analysis.
//!
//! Markdown never fails a cell: the analyzer emits structural warnings
//! (heading level jumps, empty link targets) and a summary under
//! `details.analysis`.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};
use serde_json::Value;

use crate::types::{Diagnostic, ScratchCell, ValidationResult};

pub fn validate(cell: &ScratchCell) -> ValidationResult {
    let mut result = ValidationResult::new(&cell.cell_id, cell.index, cell.language.clone());

    let parser = Parser::new_ext(&cell.content, Options::empty());
    let mut headings = 0u64;
    let mut links = 0u64;
    let mut code_blocks = 0u64;
    let mut last_level: Option<u32> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                headings += 1;
                let depth = heading_depth(level);
                if let Some(previous) = last_level {
                    if depth > previous + 1 {
                        result.add_warning(Diagnostic::new(format!(
                            "Heading level jumps from h{previous} to h{depth}"
                        )));
                    }
                }
                last_level = Some(depth);
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                links += 1;
                if dest_url.is_empty() {
                    result.add_warning(Diagnostic::new("Link has an empty destination"));
                }
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                if dest_url.is_empty() {
                    result.add_warning(Diagnostic::new("Image has an empty destination"));
                }
            }
            Event::Start(Tag::CodeBlock(_)) => code_blocks += 1,
            _ => {}
        }
    }

    result.set_detail("analysis", "headings", Value::Number(headings.into()));
    result.set_detail("analysis", "links", Value::Number(links.into()));
    result.set_detail("analysis", "code_blocks", Value::Number(code_blocks.into()));
    result
}

fn heading_depth(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
