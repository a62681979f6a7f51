//! Text representation of a [`BranchLayout`].
//!
//! One branch per line, nesting expressed by indentation, optional annotation
//! after the branch name:
//!
//! ```text
//! develop
//!   allow-ownership-link PR #123
//!     build-chain
//!   call-ws
//! master
//! ```
//!
//! The indentation unit is taken from the first indented line and kept on the
//! layout so writing it back reproduces the source. Text already in canonical
//! form round-trips byte for byte; other accepted input is normalised.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::{BranchLayout, BranchLayoutEntry, DEFAULT_INDENT};

/// What went wrong on a malformed layout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutParseErrorKind {
  IndentedFirstLine,
  InconsistentIndent,
  IndentTooDeep,
  DuplicateBranch(String),
}

/// Malformed persisted layout.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {}", describe(.kind))]
pub struct LayoutParseError {
  /// One-based line number.
  pub line: usize,
  pub kind: LayoutParseErrorKind,
}

fn describe(kind: &LayoutParseErrorKind) -> String {
  match kind {
    LayoutParseErrorKind::IndentedFirstLine => "the first branch must not be indented".to_string(),
    LayoutParseErrorKind::InconsistentIndent => "indentation is not a multiple of the indentation unit".to_string(),
    LayoutParseErrorKind::IndentTooDeep => "indented more than one level below the previous branch".to_string(),
    LayoutParseErrorKind::DuplicateBranch(name) => format!("branch '{name}' appears more than once"),
  }
}

/// Errors raised while loading or storing a layout file.
#[derive(Debug, Error)]
pub enum LayoutFileError {
  #[error("failed to access layout file {}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("malformed layout file {}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: LayoutParseError,
  },
}

struct ParsedLine<'a> {
  depth: usize,
  name: &'a str,
  annotation: Option<&'a str>,
}

/// Parses the text representation into a [`BranchLayout`].
///
/// Blank lines, `\r\n` endings, trailing whitespace and the run of
/// whitespace between a name and its annotation are accepted but not
/// preserved: the writer emits `\n` endings and a single space before the
/// annotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchLayoutReader;

impl BranchLayoutReader {
  pub fn read(&self, source: &str) -> Result<BranchLayout, LayoutParseError> {
    let mut indent: Option<&str> = None;
    let mut seen = HashSet::new();
    let mut lines: Vec<ParsedLine<'_>> = Vec::new();

    for (index, raw) in source.lines().enumerate() {
      let line_no = index + 1;
      let line = raw.trim_end();
      if line.is_empty() {
        continue;
      }

      let content = line.trim_start_matches([' ', '\t']);
      let prefix = &line[..line.len() - content.len()];
      let error = |kind| LayoutParseError { line: line_no, kind };

      let depth = if prefix.is_empty() {
        0
      } else {
        if lines.is_empty() {
          return Err(error(LayoutParseErrorKind::IndentedFirstLine));
        }
        let unit = *indent.get_or_insert(prefix);
        indent_depth(prefix, unit).ok_or_else(|| error(LayoutParseErrorKind::InconsistentIndent))?
      };

      let previous_depth = lines.last().map_or(0, |previous| previous.depth);
      if depth > previous_depth + 1 {
        return Err(error(LayoutParseErrorKind::IndentTooDeep));
      }

      let (name, annotation) = match content.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest.trim()).filter(|rest| !rest.is_empty())),
        None => (content, None),
      };
      if !seen.insert(name) {
        return Err(error(LayoutParseErrorKind::DuplicateBranch(name.to_string())));
      }

      lines.push(ParsedLine { depth, name, annotation });
    }

    let mut cursor = 0;
    let roots = assemble(&lines, &mut cursor, 0);
    debug!(branches = lines.len(), "parsed branch layout");

    Ok(BranchLayout {
      roots,
      indent: indent.unwrap_or(DEFAULT_INDENT).to_string(),
    })
  }
}

fn indent_depth(prefix: &str, unit: &str) -> Option<usize> {
  if prefix.len() % unit.len() != 0 {
    return None;
  }
  let depth = prefix.len() / unit.len();
  (prefix == unit.repeat(depth)).then_some(depth)
}

fn assemble(lines: &[ParsedLine<'_>], cursor: &mut usize, depth: usize) -> Vec<BranchLayoutEntry> {
  let mut entries = Vec::new();
  while let Some(line) = lines.get(*cursor) {
    if line.depth != depth {
      break;
    }
    *cursor += 1;
    let children = assemble(lines, cursor, depth + 1);
    entries.push(BranchLayoutEntry::new(
      line.name,
      line.annotation.map(str::to_string),
      children,
    ));
  }
  entries
}

/// Renders a [`BranchLayout`] using the indentation it was read with.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchLayoutWriter;

impl BranchLayoutWriter {
  pub fn write(&self, layout: &BranchLayout) -> String {
    let mut out = String::new();
    for root in layout.roots() {
      write_entry(&mut out, root, layout.indent(), 0);
    }
    out
  }
}

fn write_entry(out: &mut String, entry: &BranchLayoutEntry, indent: &str, depth: usize) {
  out.push_str(&indent.repeat(depth));
  out.push_str(entry.name());
  if let Some(annotation) = entry.custom_annotation() {
    out.push(' ');
    out.push_str(annotation);
  }
  out.push('\n');

  for child in entry.children() {
    write_entry(out, child, indent, depth + 1);
  }
}

/// Load a layout file. A missing file is an empty layout.
pub fn read_layout_file<P: AsRef<Path>>(path: P) -> Result<BranchLayout, LayoutFileError> {
  let path = path.as_ref();
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(err) if err.kind() == ErrorKind::NotFound => {
      debug!(path = %path.display(), "layout file missing, using empty layout");
      return Ok(BranchLayout::default());
    }
    Err(source) => {
      return Err(LayoutFileError::Io {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  BranchLayoutReader.read(&content).map_err(|source| LayoutFileError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Store a layout file, replacing previous content.
pub fn write_layout_file<P: AsRef<Path>>(path: P, layout: &BranchLayout) -> Result<(), LayoutFileError> {
  let path = path.as_ref();
  fs::write(path, BranchLayoutWriter.write(layout)).map_err(|source| LayoutFileError::Io {
    path: path.to_path_buf(),
    source,
  })
}
