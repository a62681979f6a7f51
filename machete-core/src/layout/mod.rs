//! Declared branch layout: an ordered forest of branch names.
//!
//! The layout is pure data without any git semantics. It is immutable once
//! constructed; every edit returns a new [`BranchLayout`] and leaves the
//! receiver untouched, so a snapshot can keep the layout it was built from
//! while the caller prepares a modified copy for write-back.

pub mod io;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub use io::{BranchLayoutReader, BranchLayoutWriter, LayoutParseError, LayoutParseErrorKind};

/// Indentation used when a layout is created in memory rather than read.
pub const DEFAULT_INDENT: &str = "  ";

static QUALIFIER_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(rebase|push|slide-out)=no$").expect("qualifier pattern is valid"));

/// Single branch declared in the layout together with its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchLayoutEntry {
  name: String,
  custom_annotation: Option<String>,
  children: Vec<BranchLayoutEntry>,
}

impl BranchLayoutEntry {
  /// Create an entry.
  ///
  /// The annotation is trimmed, line breaks inside it become spaces and blank
  /// text becomes `None`, so the entry always writes back as a single line.
  pub fn new(name: impl Into<String>, custom_annotation: Option<String>, children: Vec<BranchLayoutEntry>) -> Self {
    let custom_annotation = custom_annotation
      .map(|annotation| annotation.replace(['\r', '\n'], " ").trim().to_string())
      .filter(|annotation| !annotation.is_empty());
    Self {
      name: name.into(),
      custom_annotation,
      children,
    }
  }

  /// Entry without annotation or children.
  pub fn leaf(name: impl Into<String>) -> Self {
    Self::new(name, None, Vec::new())
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn custom_annotation(&self) -> Option<&str> {
    self.custom_annotation.as_deref()
  }

  pub fn children(&self) -> &[BranchLayoutEntry] {
    &self.children
  }

  /// Qualifiers embedded in the annotation.
  pub fn qualifiers(&self) -> BranchQualifiers {
    BranchQualifiers::parse(self.custom_annotation())
  }

  fn find(&self, name: &str) -> Option<&BranchLayoutEntry> {
    if self.name == name {
      return Some(self);
    }
    self.children.iter().find_map(|child| child.find(name))
  }

  fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
    names.push(&self.name);
    for child in &self.children {
      child.collect_names(names);
    }
  }
}

/// Per-branch opt-outs written into the annotation (`rebase=no push=no`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchQualifiers {
  pub rebase: bool,
  pub push: bool,
  pub slide_out: bool,
  /// Annotation text with the qualifier tokens removed.
  pub display_annotation: Option<String>,
}

impl Default for BranchQualifiers {
  fn default() -> Self {
    Self {
      rebase: true,
      push: true,
      slide_out: true,
      display_annotation: None,
    }
  }
}

impl BranchQualifiers {
  pub fn parse(annotation: Option<&str>) -> Self {
    let Some(annotation) = annotation else {
      return Self::default();
    };

    let mut qualifiers = Self::default();
    let mut remaining = Vec::new();
    for token in annotation.split_whitespace() {
      match QUALIFIER_PATTERN.captures(token).and_then(|caps| caps.get(1)) {
        Some(key) => match key.as_str() {
          "rebase" => qualifiers.rebase = false,
          "push" => qualifiers.push = false,
          _ => qualifiers.slide_out = false,
        },
        None => remaining.push(token),
      }
    }

    if !remaining.is_empty() {
      qualifiers.display_annotation = Some(remaining.join(" "));
    }
    qualifiers
  }
}

/// Errors produced by copy-on-write layout edits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutEditError {
  #[error("branch '{0}' is not present in the layout")]
  BranchNotFound(String),
  #[error("branch '{0}' is already present in the layout")]
  DuplicateBranch(String),
  #[error("moving '{branch}' under '{new_parent}' would create a cycle")]
  WouldCreateCycle { branch: String, new_parent: String },
  #[error("branch '{0}' is a root branch")]
  RootBranch(String),
  #[error("annotation of '{0}' must fit on a single line")]
  MultilineAnnotation(String),
}

/// Trim an annotation supplied to an edit; line breaks are refused.
fn checked_annotation(name: &str, custom_annotation: Option<String>) -> Result<Option<String>, LayoutEditError> {
  match custom_annotation {
    Some(annotation) if annotation.contains(['\r', '\n']) => {
      Err(LayoutEditError::MultilineAnnotation(name.to_string()))
    }
    Some(annotation) => Ok(Some(annotation.trim().to_string()).filter(|annotation| !annotation.is_empty())),
    None => Ok(None),
  }
}

/// Ordered forest of [`BranchLayoutEntry`] roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchLayout {
  roots: Vec<BranchLayoutEntry>,
  #[serde(skip)]
  indent: String,
}

impl Default for BranchLayout {
  fn default() -> Self {
    Self {
      roots: Vec::new(),
      indent: DEFAULT_INDENT.to_string(),
    }
  }
}

impl BranchLayout {
  /// Build a layout from root entries, rejecting duplicated names.
  pub fn new(roots: Vec<BranchLayoutEntry>) -> Result<Self, LayoutEditError> {
    Self::with_indent(roots, DEFAULT_INDENT)
  }

  /// Same as [`BranchLayout::new`] but keeps a specific indentation unit for
  /// write-back.
  pub fn with_indent(roots: Vec<BranchLayoutEntry>, indent: impl Into<String>) -> Result<Self, LayoutEditError> {
    let layout = Self {
      roots,
      indent: indent.into(),
    };

    let mut seen = HashSet::new();
    for name in layout.branch_names() {
      if !seen.insert(name) {
        return Err(LayoutEditError::DuplicateBranch(name.to_string()));
      }
    }

    Ok(layout)
  }

  pub fn roots(&self) -> &[BranchLayoutEntry] {
    &self.roots
  }

  /// Indentation unit used by [`BranchLayoutWriter`].
  pub fn indent(&self) -> &str {
    &self.indent
  }

  pub fn is_empty(&self) -> bool {
    self.roots.is_empty()
  }

  /// Whether two layouts declare the same forest, ignoring indentation.
  pub fn same_entries(&self, other: &BranchLayout) -> bool {
    self.roots == other.roots
  }

  /// All branch names in depth-first, declaration order.
  pub fn branch_names(&self) -> Vec<&str> {
    let mut names = Vec::new();
    for root in &self.roots {
      root.collect_names(&mut names);
    }
    names
  }

  pub fn find(&self, name: &str) -> Option<&BranchLayoutEntry> {
    self.roots.iter().find_map(|root| root.find(name))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.find(name).is_some()
  }

  /// Declared parent of `name`, `None` for roots and unknown names.
  pub fn parent_of(&self, name: &str) -> Option<&BranchLayoutEntry> {
    fn search<'a>(entry: &'a BranchLayoutEntry, name: &str) -> Option<&'a BranchLayoutEntry> {
      if entry.children.iter().any(|child| child.name == name) {
        return Some(entry);
      }
      entry.children.iter().find_map(|child| search(child, name))
    }

    self.roots.iter().find_map(|root| search(root, name))
  }

  /// Add a leaf entry as the last child of `parent`, or as the last root.
  pub fn with_entry_added(
    &self,
    parent: Option<&str>,
    name: &str,
    custom_annotation: Option<String>,
  ) -> Result<Self, LayoutEditError> {
    if self.contains(name) {
      return Err(LayoutEditError::DuplicateBranch(name.to_string()));
    }

    let custom_annotation = checked_annotation(name, custom_annotation)?;
    let entry = BranchLayoutEntry::new(name, custom_annotation, Vec::new());
    let mut next = self.clone();
    match parent {
      None => next.roots.push(entry),
      Some(parent) => {
        let target =
          find_mut(&mut next.roots, parent).ok_or_else(|| LayoutEditError::BranchNotFound(parent.to_string()))?;
        target.children.push(entry);
      }
    }
    Ok(next)
  }

  /// Remove `name`, splicing its children into its place under its parent
  /// (or among the roots when it was a root).
  pub fn with_entry_removed(&self, name: &str) -> Result<Self, LayoutEditError> {
    let mut next = self.clone();
    if !splice_out(&mut next.roots, name) {
      return Err(LayoutEditError::BranchNotFound(name.to_string()));
    }
    Ok(next)
  }

  /// Move `name` (with its subtree) to become the last child of `new_parent`.
  pub fn with_entry_reparented(&self, name: &str, new_parent: &str) -> Result<Self, LayoutEditError> {
    let entry = self
      .find(name)
      .ok_or_else(|| LayoutEditError::BranchNotFound(name.to_string()))?;
    if !self.contains(new_parent) {
      return Err(LayoutEditError::BranchNotFound(new_parent.to_string()));
    }
    if entry.find(new_parent).is_some() {
      return Err(LayoutEditError::WouldCreateCycle {
        branch: name.to_string(),
        new_parent: new_parent.to_string(),
      });
    }

    let mut next = self.clone();
    let detached = detach(&mut next.roots, name).ok_or_else(|| LayoutEditError::BranchNotFound(name.to_string()))?;
    let target =
      find_mut(&mut next.roots, new_parent).ok_or_else(|| LayoutEditError::BranchNotFound(new_parent.to_string()))?;
    target.children.push(detached);
    Ok(next)
  }

  /// Replace the annotation of `name`. Text spanning several lines is
  /// rejected.
  pub fn with_annotation(&self, name: &str, custom_annotation: Option<String>) -> Result<Self, LayoutEditError> {
    let custom_annotation = checked_annotation(name, custom_annotation)?;
    let mut next = self.clone();
    let target = find_mut(&mut next.roots, name).ok_or_else(|| LayoutEditError::BranchNotFound(name.to_string()))?;
    target.custom_annotation = custom_annotation;
    Ok(next)
  }
}

fn find_mut<'a>(entries: &'a mut [BranchLayoutEntry], name: &str) -> Option<&'a mut BranchLayoutEntry> {
  for entry in entries {
    if entry.name == name {
      return Some(entry);
    }
    if let Some(found) = find_mut(&mut entry.children, name) {
      return Some(found);
    }
  }
  None
}

fn detach(entries: &mut Vec<BranchLayoutEntry>, name: &str) -> Option<BranchLayoutEntry> {
  if let Some(index) = entries.iter().position(|entry| entry.name == name) {
    return Some(entries.remove(index));
  }
  entries.iter_mut().find_map(|entry| detach(&mut entry.children, name))
}

fn splice_out(entries: &mut Vec<BranchLayoutEntry>, name: &str) -> bool {
  if let Some(index) = entries.iter().position(|entry| entry.name == name) {
    let removed = entries.remove(index);
    for (offset, child) in removed.children.into_iter().enumerate() {
      entries.insert(index + offset, child);
    }
    return true;
  }
  entries.iter_mut().any(|entry| splice_out(&mut entry.children, name))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> BranchLayout {
    BranchLayout::new(vec![
      BranchLayoutEntry::new(
        "develop",
        None,
        vec![
          BranchLayoutEntry::new(
            "allow-ownership-link",
            Some("PR #123".to_string()),
            vec![BranchLayoutEntry::leaf("build-chain")],
          ),
          BranchLayoutEntry::leaf("call-ws"),
        ],
      ),
      BranchLayoutEntry::leaf("master"),
    ])
    .unwrap()
  }

  #[test]
  fn branch_names_are_depth_first() {
    assert_eq!(
      sample().branch_names(),
      vec!["develop", "allow-ownership-link", "build-chain", "call-ws", "master"]
    );
  }

  #[test]
  fn duplicate_names_are_rejected() {
    let err = BranchLayout::new(vec![
      BranchLayoutEntry::new("main", None, vec![BranchLayoutEntry::leaf("topic")]),
      BranchLayoutEntry::leaf("topic"),
    ])
    .unwrap_err();
    assert_eq!(err, LayoutEditError::DuplicateBranch("topic".to_string()));
  }

  #[test]
  fn parent_lookup_walks_the_forest() {
    let layout = sample();
    assert_eq!(layout.parent_of("build-chain").map(BranchLayoutEntry::name), Some("allow-ownership-link"));
    assert_eq!(layout.parent_of("call-ws").map(BranchLayoutEntry::name), Some("develop"));
    assert!(layout.parent_of("develop").is_none());
    assert!(layout.parent_of("ghost").is_none());
  }

  #[test]
  fn adding_leaves_original_untouched() {
    let layout = sample();
    let next = layout.with_entry_added(Some("call-ws"), "drop-constraint", None).unwrap();

    assert!(!layout.contains("drop-constraint"));
    assert_eq!(next.parent_of("drop-constraint").map(BranchLayoutEntry::name), Some("call-ws"));
    assert_eq!(
      layout.with_entry_added(None, "master", None).unwrap_err(),
      LayoutEditError::DuplicateBranch("master".to_string())
    );
  }

  #[test]
  fn removing_splices_children_into_place() {
    let next = sample().with_entry_removed("allow-ownership-link").unwrap();

    let develop = next.find("develop").unwrap();
    let children: Vec<_> = develop.children().iter().map(BranchLayoutEntry::name).collect();
    assert_eq!(children, vec!["build-chain", "call-ws"]);
  }

  #[test]
  fn removing_a_root_promotes_children_to_roots() {
    let next = sample().with_entry_removed("develop").unwrap();
    let roots: Vec<_> = next.roots().iter().map(BranchLayoutEntry::name).collect();
    assert_eq!(roots, vec!["allow-ownership-link", "call-ws", "master"]);
  }

  #[test]
  fn reparenting_moves_subtree_and_rejects_cycles() {
    let layout = sample();
    let next = layout.with_entry_reparented("allow-ownership-link", "master").unwrap();
    assert_eq!(next.parent_of("build-chain").map(BranchLayoutEntry::name), Some("allow-ownership-link"));
    assert_eq!(next.parent_of("allow-ownership-link").map(BranchLayoutEntry::name), Some("master"));

    let err = layout.with_entry_reparented("develop", "build-chain").unwrap_err();
    assert!(matches!(err, LayoutEditError::WouldCreateCycle { .. }));
  }

  #[test]
  fn annotation_edits_normalise_blank_text() {
    let layout = sample();
    let next = layout.with_annotation("master", Some("  ".to_string())).unwrap();
    assert_eq!(next.find("master").unwrap().custom_annotation(), None);

    let next = layout.with_annotation("master", Some("release".to_string())).unwrap();
    assert_eq!(next.find("master").unwrap().custom_annotation(), Some("release"));
  }

  #[test]
  fn annotation_edits_keep_each_entry_on_one_line() {
    let layout = sample();
    assert_eq!(
      layout.with_annotation("master", Some("PR #1\nghost".to_string())).unwrap_err(),
      LayoutEditError::MultilineAnnotation("master".to_string())
    );
    assert_eq!(
      layout
        .with_entry_added(Some("master"), "hotfix", Some("a\r\nb".to_string()))
        .unwrap_err(),
      LayoutEditError::MultilineAnnotation("hotfix".to_string())
    );

    let edited = layout.with_annotation("master", Some("  release  ".to_string())).unwrap();
    assert_eq!(edited.find("master").unwrap().custom_annotation(), Some("release"));
    let reread = BranchLayoutReader.read(&BranchLayoutWriter.write(&edited)).unwrap();
    assert_eq!(reread, edited);
  }

  #[test]
  fn constructed_entries_flatten_line_breaks() {
    let entry = BranchLayoutEntry::new("topic", Some(" PR #1\nghost ".to_string()), Vec::new());
    assert_eq!(entry.custom_annotation(), Some("PR #1 ghost"));
  }

  #[test]
  fn qualifiers_are_split_from_display_text() {
    let qualifiers = BranchQualifiers::parse(Some("PR #42 rebase=no slide-out=no"));
    assert!(!qualifiers.rebase);
    assert!(qualifiers.push);
    assert!(!qualifiers.slide_out);
    assert_eq!(qualifiers.display_annotation.as_deref(), Some("PR #42"));

    assert_eq!(BranchQualifiers::parse(None), BranchQualifiers::default());
    assert_eq!(BranchQualifiers::parse(Some("push=no")).display_annotation, None);
  }
}
