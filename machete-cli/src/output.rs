//! # Output Formatting
//!
//! Message helpers with emojis and colors shared by all commands.

use owo_colors::{OwoColorize, Stream, Style};

/// When colored output is used
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
  /// Enable colored output
  Yes,
  /// Enable colored output (alias for Yes)
  Always,
  /// Detect from the terminal
  Auto,
  /// Disable colored output
  No,
  /// Disable colored output (alias for No)
  Never,
}

impl ColorMode {
  /// Apply the mode process-wide.
  pub fn apply(self) {
    match self {
      Self::Always | Self::Yes => owo_colors::set_override(true),
      Self::Never | Self::No => owo_colors::set_override(false),
      Self::Auto => {}
    }
  }
}

/// Output format for commands that can emit machine-readable data
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

/// Look up an emoji by shortcode, falling back to `default`
pub fn get_emoji_or_default(name: &str, default: &str) -> String {
  match emojis::get_by_shortcode(name) {
    Some(emoji) => emoji.to_string(),
    None => default.to_string(),
  }
}

/// Style `text` for stdout when colors are enabled
pub fn paint(text: &str, style: Style) -> String {
  text
    .if_supports_color(Stream::Stdout, |text| text.style(style))
    .to_string()
}

pub fn print_success(message: &str) {
  let check = get_emoji_or_default("check_mark", "✓");
  println!("{} {}", paint(&check, Style::new().green().bold()), message);
}

/// Print an error message to stderr
pub fn print_error(message: &str) {
  let cross = get_emoji_or_default("cross_mark", "✗");
  eprintln!(
    "{} {}",
    cross.if_supports_color(Stream::Stderr, |text| text.red().bold().to_string()),
    message
  );
}

pub fn print_warning(message: &str) {
  let warning = get_emoji_or_default("warning", "⚠");
  println!("{} {}", paint(&warning, Style::new().yellow().bold()), message);
}

pub fn print_info(message: &str) {
  let info = get_emoji_or_default("information", "ℹ");
  println!("{} {}", paint(&info, Style::new().blue().bold()), message);
}

/// Format a branch name
pub fn format_branch(name: &str) -> String {
  paint(name, Style::new().bright_cyan().bold())
}

/// Format a commit hash
pub fn format_commit(hash: &str) -> String {
  paint(hash, Style::new().yellow())
}

/// Format a command line
pub fn format_command(cmd: &str) -> String {
  paint(cmd, Style::new().purple())
}
