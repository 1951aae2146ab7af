#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Terminal output abstractions for workflow narration and confirmation prompts.
//!
//! This crate provides an [`Output`] trait that abstracts over how progress,
//! outcomes and recommended next commands are shown to the operator.
//! Implementations include:
//!
//! - [`Terminal`]: A color-capable terminal renderer for production use
//! - [`Quiet`]: A silent implementation that suppresses output
//! - [`Capture`]: An in-memory recorder used by tests to assert on narration

use std::{
    io::{self, Write},
    result::Result as StdResult,
    sync::{Arc, Mutex, PoisonError},
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

/// Indentation level (in spaces) used for nested output sections.
const INDENT: usize = 4;

/// ASCII control representation of `Ctrl+C`.
const CTRL_C: char = '\u{3}';
/// ASCII control representation of `Ctrl+D`.
const CTRL_D: char = '\u{4}';

/// Determine whether the combination of `code` and `modifiers` represents an
/// interactive cancellation such as `Ctrl+C`, `Ctrl+D`, or `Esc`.
fn is_cancel_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Char(ch) => {
            if modifiers.contains(KeyModifiers::CONTROL)
                && matches!(ch.to_lowercase().next().unwrap_or(ch), 'c' | 'd')
            {
                return true;
            }

            matches!(ch, CTRL_C | CTRL_D)
        }
        KeyCode::Esc => true,
        _ => false,
    }
}

/// Errors produced by [`Output`] implementations when interacting with the user
/// or the terminal.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The requested operation is not supported by this output backend.
    #[error("{0}")]
    Unsupported(&'static str),

    /// A terminal/TTY related failure occurred.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Underlying I/O error while writing/reading to the terminal.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The user cancelled an interactive prompt.
    #[error("Prompt cancelled")]
    Cancelled,
}

/// Convenience alias for output-related fallible operations.
pub type Result<T> = StdResult<T, OutputError>;

/// The kind of a rendered line, which decides its glyph and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Neutral information.
    Message,
    /// An action about to be performed.
    Step,
    /// An action that completed.
    Success,
    /// Something the operator should notice but that did not stop the workflow.
    Warn,
    /// A failure.
    Fail,
    /// The recommended next command.
    Next,
    /// Verbose-only detail.
    Detail,
    /// Unadorned text such as a generated PR body.
    Plain,
}

impl Kind {
    /// Glyph printed in front of lines of this kind.
    fn glyph(self) -> &'static str {
        match self {
            Self::Message => "ℹ  ",
            Self::Step => "→  ",
            Self::Success => "✓  ",
            Self::Warn => "⚠  ",
            Self::Fail => "✗  ",
            Self::Next => "→  Next: ",
            Self::Detail => "   ",
            Self::Plain => "",
        }
    }

    /// Terminal color for this kind, if any.
    fn color(self) -> Option<Color> {
        match self {
            Self::Message | Self::Step => Some(Color::Cyan),
            Self::Success => Some(Color::Green),
            Self::Warn => Some(Color::Rgb(255, 165, 0)),
            Self::Fail => Some(Color::Red),
            Self::Next => Some(Color::Magenta),
            Self::Detail | Self::Plain => None,
        }
    }
}

/// Abstraction over how workflow narration and prompts are produced.
///
/// Every method has a fixed meaning so renderers can decorate consistently;
/// callers never format glyphs themselves.
pub trait Output: Send + Sync {
    /// Emit a line of the given kind. All the convenience methods route here.
    fn emit(&self, kind: Kind, msg: &str) -> Result<()>;

    /// Ask the user to confirm an action; returns `true` if confirmed.
    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Flush any buffered output.
    fn finish(&self) -> Result<()>;

    /// Create a nested output section that indents subsequent messages.
    fn section(&self, header: &str) -> Box<dyn Output>;

    /// Print an informational message.
    fn message(&self, msg: &str) -> Result<()> {
        self.emit(Kind::Message, msg)
    }

    /// Announce an action that is about to run.
    fn step(&self, msg: &str) -> Result<()> {
        self.emit(Kind::Step, msg)
    }

    /// Print a success message.
    fn success(&self, msg: &str) -> Result<()> {
        self.emit(Kind::Success, msg)
    }

    /// Print a warning message.
    fn warn(&self, msg: &str) -> Result<()> {
        self.emit(Kind::Warn, msg)
    }

    /// Print an error/failure message.
    fn fail(&self, msg: &str) -> Result<()> {
        self.emit(Kind::Fail, msg)
    }

    /// Print the recommended next command.
    fn next(&self, command: &str) -> Result<()> {
        self.emit(Kind::Next, command)
    }

    /// Print detail that is only interesting in verbose mode.
    fn detail(&self, msg: &str) -> Result<()> {
        self.emit(Kind::Detail, msg)
    }

    /// Print text verbatim.
    fn plain(&self, msg: &str) -> Result<()> {
        self.emit(Kind::Plain, msg)
    }
}

/// Output implementation that suppresses all messages and rejects interactive
/// prompts.
pub struct Quiet;

impl Output for Quiet {
    fn emit(&self, _kind: Kind, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Err(OutputError::Unsupported(
            "Cannot prompt for confirmation in quiet mode",
        ))
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }

    fn section(&self, _header: &str) -> Box<dyn Output> {
        Box::new(Self)
    }
}

/// Color-capable terminal renderer for narration and prompts.
pub struct Terminal {
    /// Whether to emit ANSI color sequences.
    color_choice: ColorChoice,
    /// Whether [`Kind::Detail`] lines are shown.
    verbose: bool,
    /// Current indentation depth in spaces.
    indent: usize,
}

impl Terminal {
    /// Create a new terminal output.
    ///
    /// - `color`: when `true`, always render colored output; when `false`,
    ///   disable ANSI colors.
    /// - `verbose`: when `true`, detail lines are printed.
    pub fn new(color: bool, verbose: bool) -> Self {
        let color_choice = if color {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            color_choice,
            verbose,
            indent: 0,
        }
    }

    /// Write one line to `stream`, colored by `kind` and indented.
    fn write_line(&self, mut stream: StandardStream, kind: Kind, msg: &str) -> Result<()> {
        let pad = " ".repeat(self.indent);
        if let Some(color) = kind.color() {
            stream.set_color(ColorSpec::new().set_fg(Some(color)))?;
        }
        // Continuation lines of multi-line messages (e.g. captured git output)
        // keep the indentation but not the glyph.
        let mut lines = msg.lines();
        writeln!(stream, "{pad}{}{}", kind.glyph(), lines.next().unwrap_or(""))?;
        for line in lines {
            writeln!(stream, "{pad}   {line}")?;
        }
        stream.reset()?;
        stream.flush()?;
        Ok(())
    }

    /// Read a single key press in raw mode and interpret it as yes/no.
    fn read_yes_no() -> Result<bool> {
        loop {
            if let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read().map_err(|e| OutputError::Terminal(e.to_string()))?
            {
                if kind != KeyEventKind::Press {
                    continue;
                }
                if is_cancel_key(code, modifiers) {
                    return Err(OutputError::Cancelled);
                }
                match code {
                    KeyCode::Char('y' | 'Y') => return Ok(true),
                    KeyCode::Char('n' | 'N') | KeyCode::Enter => return Ok(false),
                    _ => {}
                }
            }
        }
    }
}

impl Output for Terminal {
    fn emit(&self, kind: Kind, msg: &str) -> Result<()> {
        match kind {
            Kind::Detail if !self.verbose => Ok(()),
            Kind::Fail => self.write_line(StandardStream::stderr(self.color_choice), kind, msg),
            _ => self.write_line(StandardStream::stdout(self.color_choice), kind, msg),
        }
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        print!("{}{prompt} [y/N] ", " ".repeat(self.indent));
        io::stdout().flush()?;

        terminal::enable_raw_mode().map_err(|e| OutputError::Terminal(e.to_string()))?;
        let answer = Self::read_yes_no();
        // Always restore terminal mode
        terminal::disable_raw_mode().map_err(|e| OutputError::Terminal(e.to_string()))?;

        match answer {
            Ok(true) => println!("y"),
            Ok(false) => println!("n"),
            Err(_) => println!(),
        }
        answer
    }

    fn finish(&self) -> Result<()> {
        io::stdout().flush()?;
        io::stderr().flush()?;
        Ok(())
    }

    fn section(&self, header: &str) -> Box<dyn Output> {
        if let Err(err) = self.message(header) {
            eprintln!("{header} ({err})");
        }

        Box::new(Self {
            color_choice: self.color_choice,
            verbose: self.verbose,
            indent: self.indent + INDENT,
        })
    }
}

/// A recorded line: its kind, its section depth, and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Kind the line was emitted as.
    pub kind: Kind,
    /// Nesting depth of the section the line was emitted in.
    pub depth: usize,
    /// The message text.
    pub text: String,
}

/// In-memory [`Output`] that records every line. Sections share the buffer.
#[derive(Clone, Default)]
pub struct Capture {
    /// Lines recorded so far, shared between nested sections.
    lines: Arc<Mutex<Vec<Line>>>,
    /// Answer returned from [`Output::confirm`]; `None` rejects prompts.
    answer: Option<bool>,
    /// Section depth of this handle.
    depth: usize,
}

impl Capture {
    /// Create an empty capture that rejects confirmation prompts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty capture that answers every confirmation with `answer`.
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Some(answer),
            ..Self::default()
        }
    }

    /// Snapshot of all recorded lines.
    pub fn lines(&self) -> Vec<Line> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Texts of recorded lines of the given kind.
    pub fn texts(&self, kind: Kind) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.kind == kind)
            .map(|line| line.text)
            .collect()
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.text.contains(needle))
    }
}

impl Output for Capture {
    fn emit(&self, kind: Kind, msg: &str) -> Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Line {
                kind,
                depth: self.depth,
                text: msg.to_string(),
            });
        Ok(())
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.emit(Kind::Message, prompt)?;
        self.answer.ok_or(OutputError::Unsupported(
            "Cannot prompt for confirmation in capture mode",
        ))
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }

    fn section(&self, header: &str) -> Box<dyn Output> {
        if let Err(err) = self.message(header) {
            eprintln!("{header} ({err})");
        }
        Box::new(Self {
            lines: Arc::clone(&self.lines),
            answer: self.answer,
            depth: self.depth + 1,
        })
    }
}
