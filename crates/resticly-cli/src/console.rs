//! Terminal rendering of notifications and the loading spinner.
//!
//! A background task prints every shown notification to stderr in the active
//! theme's colours and runs a spinner while requests are in flight. On
//! [`Console::finish`] it drains notifications that were already queued.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use resticly_ui::{AppContext, Notification, NotificationEvent, Severity, ThemeMode};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::output::paint;

const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Handle to the printer task.
pub(crate) struct Console {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl Console {
    /// Print notifications to stderr; animate a spinner when stderr is a terminal.
    pub(crate) fn attach(ctx: &AppContext, format: OutputFormat) -> Self {
        let interactive = io::stderr().is_terminal();
        if !interactive {
            colored::control::set_override(false);
        }
        let animate = interactive && format == OutputFormat::Table;
        Self::attach_to(ctx, animate, Box::new(io::stderr()))
    }

    fn attach_to(ctx: &AppContext, animate: bool, out: Box<dyn Write + Send>) -> Self {
        let printer = Printer {
            out,
            themes: ctx.subscribe_theme(),
            loading_label: ctx.text("status.loading", "Loading..."),
            spinner: None,
            animate,
        };
        let stop = CancellationToken::new();
        let task = tokio::spawn(printer.run(
            ctx.notifications().subscribe(),
            ctx.in_flight().subscribe(),
            stop.clone(),
        ));
        Self { stop, task }
    }

    /// Stop the printer after flushing queued notifications.
    pub(crate) async fn finish(self) {
        self.stop.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "notification printer stopped abnormally");
        }
    }
}

struct Printer {
    out: Box<dyn Write + Send>,
    themes: watch::Receiver<ThemeMode>,
    loading_label: String,
    spinner: Option<ProgressBar>,
    animate: bool,
}

impl Printer {
    async fn run(
        mut self,
        mut events: broadcast::Receiver<NotificationEvent>,
        mut loading: watch::Receiver<bool>,
        stop: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Ok(event) => self.render(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notification printer fell behind");
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = loading.changed(), if self.animate => {
                    if changed.is_err() {
                        self.animate = false;
                    } else {
                        let busy = *loading.borrow_and_update();
                        self.set_busy(busy);
                    }
                }
                () = stop.cancelled() => break,
            }
        }
        loop {
            match events.try_recv() {
                Ok(event) => self.render(&event),
                Err(TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        self.set_busy(false);
        let _ = self.out.flush();
    }

    fn render(&mut self, event: &NotificationEvent) {
        let NotificationEvent::Shown(notification) = event else {
            return;
        };
        let theme = *self.themes.borrow();
        let line = toast_line(notification, theme);
        let out = &mut self.out;
        let written = match &self.spinner {
            Some(spinner) => spinner.suspend(|| writeln!(out, "{line}")),
            None => writeln!(out, "{line}"),
        };
        if let Err(err) = written {
            warn!(error = %err, "failed to print notification");
        }
    }

    fn set_busy(&mut self, busy: bool) {
        match (busy, self.spinner.take()) {
            (true, None) => self.spinner = Some(create_spinner(&self.loading_label)),
            (true, Some(spinner)) => self.spinner = Some(spinner),
            (false, Some(spinner)) => spinner.finish_and_clear(),
            (false, None) => {}
        }
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(SPINNER_TICK);
    spinner
}

const fn marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "i",
        Severity::Success => "✓",
        Severity::Warning => "!",
        Severity::Danger => "✗",
    }
}

fn toast_line(notification: &Notification, theme: ThemeMode) -> String {
    let token = theme.palette().severity(notification.severity);
    paint(
        &format!("{} {}", marker(notification.severity), notification.message),
        token,
    )
}
