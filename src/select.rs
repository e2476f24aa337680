//! Selection gateway: choose which candidates go on to confirmation.

use crate::classify::DeletionCandidate;
use crate::config::SelectionMode;
use crate::error::{GoneError, Result};

use colored::Colorize;
use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::queue;
use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32String};
use std::collections::BTreeSet;
use std::io::{self, Write};
use tracing::debug;

/// Rows of the list drawn at once; the window follows the cursor.
const MAX_ROWS: usize = 15;
const CURSOR: &str = "> ";
const CHOSEN: &str = "[✓] ";
const NOT_CHOSEN: &str = "[ ] ";
const HINT: &str = "Type to filter, Tab to select/deselect, Enter to confirm, Esc to cancel";

/// Picks a subset of labels. Returns indices into `labels`, or
/// `SelectionAborted` when the user cancels.
pub trait Selector {
    fn select(&mut self, prompt: &str, labels: &[String]) -> Result<Vec<usize>>;
}

/// Non-interactive: every label is selected.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectAll;

impl Selector for SelectAll {
    fn select(&mut self, _prompt: &str, labels: &[String]) -> Result<Vec<usize>> {
        Ok((0..labels.len()).collect())
    }
}

/// What the selector loop does after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Confirm(Vec<usize>),
    Cancel,
}

/// Filter, cursor and toggled set of a running selection, independent of
/// the terminal.
pub struct FilterState<'a> {
    labels: &'a [String],
    query: String,
    /// Indices into `labels` matching `query`, best match first.
    visible: Vec<usize>,
    cursor: usize,
    chosen: BTreeSet<usize>,
    matcher: Matcher,
}

impl<'a> FilterState<'a> {
    pub fn new(labels: &'a [String]) -> Self {
        let mut state = Self {
            labels,
            query: String::new(),
            visible: Vec::new(),
            cursor: 0,
            chosen: BTreeSet::new(),
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        };
        state.refilter();
        state
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Labels matching the current query, in display order.
    pub fn visible(&self) -> impl Iterator<Item = &str> + '_ {
        self.visible.iter().map(|&i| self.labels[i].as_str())
    }

    pub fn chosen(&self) -> impl Iterator<Item = usize> + '_ {
        self.chosen.iter().copied()
    }

    fn refilter(&mut self) {
        self.cursor = 0;
        if self.query.is_empty() {
            self.visible = (0..self.labels.len()).collect();
            return;
        }

        let pattern = Pattern::new(
            &self.query,
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );
        let labels = self.labels;
        let mut scored: Vec<(u32, usize)> = labels
            .iter()
            .enumerate()
            .filter_map(|(i, label)| {
                let haystack = Utf32String::from(label.as_str());
                pattern
                    .score(haystack.slice(..), &mut self.matcher)
                    .map(|score| (score, i))
            })
            .collect();
        // Stable on ties, so equal scores keep candidate order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        self.visible = scored.into_iter().map(|(_, i)| i).collect();
    }

    fn current(&self) -> Option<usize> {
        self.visible.get(self.cursor).copied()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Step {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Step::Cancel,
            KeyCode::Char('c') if ctrl => return Step::Cancel,
            KeyCode::Enter => return Step::Confirm(self.confirmed()),
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.cursor + 1 < self.visible.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Tab => {
                if let Some(index) = self.current() {
                    if !self.chosen.remove(&index) {
                        self.chosen.insert(index);
                    }
                    if self.cursor + 1 < self.visible.len() {
                        self.cursor += 1;
                    }
                }
            }
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.refilter();
                }
            }
            KeyCode::Char(c) if !ctrl => {
                self.query.push(c);
                self.refilter();
            }
            _ => {}
        }
        Step::Continue
    }

    /// Toggled labels, or the one under the cursor when nothing was toggled.
    fn confirmed(&self) -> Vec<usize> {
        if self.chosen.is_empty() {
            self.current().into_iter().collect()
        } else {
            self.chosen.iter().copied().collect()
        }
    }

    /// Lines of one frame: prompt with query, visible window, hint.
    pub fn render(&self, prompt: &str) -> Vec<String> {
        let mut lines = vec![format!("{prompt} > {}", self.query)];

        let start = self.cursor.saturating_sub(MAX_ROWS - 1);
        for (row, &index) in self.visible.iter().enumerate().skip(start).take(MAX_ROWS) {
            let mark = if self.chosen.contains(&index) {
                CHOSEN.green().to_string()
            } else {
                NOT_CHOSEN.to_string()
            };
            let label = &self.labels[index];
            lines.push(if row == self.cursor {
                format!("{}{mark}{}", CURSOR.cyan(), label.bold())
            } else {
                format!("  {mark}{label}")
            });
        }

        let counter = format!("  {}/{} | {HINT}", self.visible.len(), self.labels.len());
        lines.push(counter.dimmed().to_string());
        lines
    }
}

/// Terminal multi-select with incremental fuzzy filtering, drawn on stderr.
#[derive(Debug, Default)]
pub struct InteractiveSelector;

impl InteractiveSelector {
    fn draw(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
        queue!(out, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                queue!(out, Print("\r\n"))?;
            }
            queue!(out, Print(line))?;
        }
        if lines.len() > 1 {
            queue!(out, MoveUp((lines.len() - 1) as u16))?;
        }
        queue!(out, MoveToColumn(0))?;
        out.flush()
    }

    fn run(prompt: &str, labels: &[String]) -> io::Result<Step> {
        let mut state = FilterState::new(labels);
        let mut out = io::stderr();
        loop {
            Self::draw(&mut out, &state.render(prompt))?;
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.handle_key(key) {
                Step::Continue => {}
                done => {
                    debug!(query = state.query(), "selection finished");
                    return Ok(done);
                }
            }
        }
    }
}

impl Selector for InteractiveSelector {
    fn select(&mut self, prompt: &str, labels: &[String]) -> Result<Vec<usize>> {
        let selection_error = |err: io::Error| GoneError::Selection(err.to_string());

        terminal::enable_raw_mode().map_err(selection_error)?;
        let result = Self::run(prompt, labels);
        let restored = terminal::disable_raw_mode().and_then(|()| {
            let mut out = io::stderr();
            queue!(out, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
            out.flush()
        });

        let step = result.map_err(selection_error)?;
        restored.map_err(selection_error)?;
        match step {
            Step::Confirm(indices) => Ok(indices),
            Step::Cancel | Step::Continue => Err(GoneError::SelectionAborted),
        }
    }
}

pub fn selector_for(mode: SelectionMode) -> Box<dyn Selector> {
    match mode {
        SelectionMode::All => Box::new(SelectAll),
        SelectionMode::Interactive => Box::new(InteractiveSelector),
    }
}

/// Run `selector` over the candidates' display labels and map the answer
/// back to candidates by position.
pub fn select_candidates<'a>(
    selector: &mut dyn Selector,
    prompt: &str,
    candidates: &'a [DeletionCandidate],
) -> Result<Vec<&'a DeletionCandidate>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let labels: Vec<String> = candidates.iter().map(DeletionCandidate::display_label).collect();
    let mut indices = selector.select(prompt, &labels)?;
    indices.sort_unstable();
    indices.dedup();

    Ok(indices
        .into_iter()
        .filter_map(|i| candidates.get(i))
        .collect())
}
