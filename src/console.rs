//! Terminal rendering of progress events
//!
//! The console owns the receiving end of the progress channel. While an
//! operation runs, [`Console::drive`] interleaves it with event rendering on
//! the same task, then drains whatever is left so every line is printed
//! before the next prompt.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tokio::sync::{Notify, mpsc};

use devbootstrap::{ProgressEvent, Severity};

/// Hand-off between the renderer and a prompt that takes over the terminal.
///
/// Rendering and the prompt both hold the progress bars' draw lock, so a
/// prompt must not open while queued events are still waiting to be printed.
#[derive(Debug, Default)]
pub struct PromptGate {
    requested: Notify,
    granted: Notify,
}

impl PromptGate {
    /// Wait until the console has printed every queued event. Only resolves
    /// while a [`Console::drive`] call is running.
    pub async fn acquire(&self) {
        self.requested.notify_one();
        self.granted.notified().await;
    }
}

pub struct Console<W = StandardStream> {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
    multi: MultiProgress,
    style: ProgressStyle,
    out: W,
    gate: Arc<PromptGate>,
}

impl Console {
    pub fn new(rx: mpsc::UnboundedReceiver<ProgressEvent>) -> Result<Self> {
        Self::with_writer(
            rx,
            MultiProgress::new(),
            StandardStream::stdout(ColorChoice::Auto),
        )
    }
}

impl<W: WriteColor> Console<W> {
    pub fn with_writer(
        rx: mpsc::UnboundedReceiver<ProgressEvent>,
        multi: MultiProgress,
        out: W,
    ) -> Result<Self> {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("Invalid progress bar template")?;

        Ok(Self {
            rx,
            multi,
            style,
            out,
            gate: Arc::new(PromptGate::default()),
        })
    }

    /// Handle for prompts that must hide the spinner while they run
    pub fn progress(&self) -> MultiProgress {
        self.multi.clone()
    }

    pub fn prompt_gate(&self) -> Arc<PromptGate> {
        Arc::clone(&self.gate)
    }

    /// Run `op` to completion while rendering its events
    pub async fn drive<T>(&mut self, label: &str, op: impl Future<Output = T>) -> T {
        let Self {
            rx,
            multi,
            style,
            out,
            gate,
        } = self;

        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(style.clone());
        spinner.set_message(label.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));

        tokio::pin!(op);
        let output = loop {
            // Queued events always go out before a prompt is let in
            tokio::select! {
                biased;
                Some(event) = rx.recv() => render(multi, &spinner, out, &event),
                () = gate.requested.notified() => gate.granted.notify_one(),
                output = &mut op => break output,
            }
        };

        while let Ok(event) = rx.try_recv() {
            render(multi, &spinner, out, &event);
        }
        spinner.finish_and_clear();
        multi.remove(&spinner);

        output
    }
}

fn render<W: WriteColor>(
    multi: &MultiProgress,
    spinner: &ProgressBar,
    out: &mut W,
    event: &ProgressEvent,
) {
    let color = match event.severity {
        Severity::Success => Some(Color::Green),
        Severity::Warning => Some(Color::Yellow),
        Severity::Error | Severity::BuildError => Some(Color::Red),
        Severity::Info | Severity::BuildOutput => None,
    };
    let line = event.render();

    multi.suspend(|| {
        let _ = out.set_color(ColorSpec::new().set_fg(color));
        let _ = writeln!(out, "{line}");
        let _ = out.reset();
    });

    if !matches!(event.severity, Severity::BuildOutput | Severity::BuildError) {
        spinner.set_message(event.text.clone());
    }
}
