//! Interactive metric switching. A [`MapSwitcher`] redraws the whole map each time a
//! [`SelectionEvents`] source reports a new column, independent of how that choice was made.

use std::io::{BufRead, Write};

use anyhow::Result;
use log::{debug, info, warn};
use polars::frame::DataFrame;

use crate::config::MapConfig;
use crate::map::{JoinedMapData, MapScene};
use crate::metrics::{default_selection, eligible_columns};
use crate::render::{MapRenderer, SceneRenderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    Selected(String),
    Closed,
}

/// Source of selection-changed events.
pub trait SelectionEvents {
    /// Blocks until the next selection is made or the session is closed.
    fn next_event(&mut self, eligible: &[String], current: &str) -> Result<SelectionEvent>;
}

/// Receives every scene the switcher produces. Each call replaces whatever was drawn before.
pub trait RedrawHandler {
    fn redraw(&mut self, scene: &MapScene) -> Result<()>;
}

impl RedrawHandler for MapRenderer {
    fn redraw(&mut self, scene: &MapScene) -> Result<()> {
        self.render(scene)?;
        info!("Map redrawn at {}", self.path().display());
        Ok(())
    }
}

/// Terminal selection source: lists the columns, then reads an index or a column name per line.
/// A blank line, `q`, or end of input closes the session.
pub struct LineSelections<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineSelections<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> SelectionEvents for LineSelections<R, W> {
    fn next_event(&mut self, eligible: &[String], current: &str) -> Result<SelectionEvent> {
        writeln!(self.output, "Metrics:")?;
        for (idx, column) in eligible.iter().enumerate() {
            let marker = if column == current { " *" } else { "" };
            writeln!(self.output, "  [{idx}] {column}{marker}")?;
        }
        write!(self.output, "Select a metric by number or name (blank or q to quit): ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(SelectionEvent::Closed);
        }
        let choice = line.trim();
        if choice.is_empty() || choice.eq_ignore_ascii_case("q") {
            return Ok(SelectionEvent::Closed);
        }
        let column = choice
            .parse::<usize>()
            .ok()
            .and_then(|idx| eligible.get(idx))
            .map_or_else(|| choice.to_string(), Clone::clone);
        Ok(SelectionEvent::Selected(column))
    }
}

/// Holds the joined data, the eligible metric columns, and the current selection, and hands a
/// freshly built scene to its handler on every change.
pub struct MapSwitcher<H> {
    data: JoinedMapData,
    eligible: Vec<String>,
    selected: String,
    handler: H,
    redraws: usize,
}

impl<H: RedrawHandler> MapSwitcher<H> {
    pub fn new(
        data: JoinedMapData,
        metrics: &DataFrame,
        config: &MapConfig,
        handler: H,
    ) -> Result<Self> {
        let eligible = eligible_columns(metrics, &config.excluded_columns);
        let selected = default_selection(&eligible, &config.default_metric)?;
        debug!("Eligible metrics: {eligible:?}, starting with '{selected}'");
        Ok(Self {
            data,
            eligible,
            selected,
            handler,
            redraws: 0,
        })
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn eligible(&self) -> &[String] {
        &self.eligible
    }

    fn scene(&self, metric: &str) -> Result<MapScene> {
        self.data.scene(metric, &format!("{metric} by Country"), None)
    }

    fn redraw(&mut self, metric: &str) -> Result<()> {
        let scene = self.scene(metric)?;
        self.handler.redraw(&scene)?;
        self.redraws += 1;
        Ok(())
    }

    /// Initial draw of the default selection.
    pub fn start(&mut self) -> Result<()> {
        let selected = self.selected.clone();
        self.redraw(&selected)
    }

    /// Clears and redraws for `column`. Returns `false`, leaving the selection unchanged, when
    /// `column` is not eligible.
    pub fn on_selection_changed(&mut self, column: &str) -> Result<bool> {
        if !self.eligible.iter().any(|eligible| eligible == column) {
            warn!(
                "'{column}' is not an eligible metric, keeping '{}'",
                self.selected
            );
            return Ok(false);
        }
        self.redraw(column)?;
        self.selected = column.to_string();
        Ok(true)
    }

    /// Draws the default selection, then processes events until the source closes. Returns the
    /// number of redraws performed.
    pub fn run<E: SelectionEvents>(&mut self, events: &mut E) -> Result<usize> {
        self.start()?;
        loop {
            match events.next_event(&self.eligible, &self.selected)? {
                SelectionEvent::Selected(column) => {
                    self.on_selection_changed(&column)?;
                }
                SelectionEvent::Closed => break,
            }
        }
        info!("Selection closed after {} redraws", self.redraws);
        Ok(self.redraws)
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}
