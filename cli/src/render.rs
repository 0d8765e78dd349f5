use std::io::Write;
use std::path::Path;

use crossterm::style::Stylize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use egrun_core::api::RunEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Plain,
    Good,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Colors only when stdout is a terminal.
    pub fn detect() -> Self {
        Self::new(atty::is(atty::Stream::Stdout))
    }

    fn paint(&self, tone: Tone, text: String) -> String {
        if !self.color {
            return text;
        }
        match tone {
            Tone::Plain => text,
            Tone::Good => text.green().to_string(),
            Tone::Bad => text.red().to_string(),
        }
    }

    pub fn render(&self, event: &RunEvent) -> Vec<OutputLine> {
        let out = |tone, text: String| OutputLine::Stdout(self.paint(tone, text));
        match event {
            RunEvent::RunStarted { project } => {
                vec![out(Tone::Plain, format!("running {}", project.display()))]
            }
            RunEvent::HostLaunched { version } => vec![out(
                Tone::Good,
                format!("-> Enterprise Guide {version} instance created"),
            )],
            RunEvent::ProfileActivated { profile } => {
                vec![out(Tone::Good, format!("-> profile:[{profile}] activated"))]
            }
            RunEvent::ProjectOpened { .. } => vec![out(Tone::Good, "-> egp file opened".into())],
            RunEvent::RunFinished => vec![out(Tone::Good, "-> run finished".into())],
            RunEvent::ProjectSaved { path } => {
                vec![out(Tone::Good, format!("-> saved to {}", path.display()))]
            }
            RunEvent::ProjectClosed => vec![out(Tone::Good, "-> project closed".into())],
            RunEvent::LogsExtracted { dir } => {
                vec![out(Tone::Good, format!("-> logs extracted to {}", dir.display()))]
            }
            RunEvent::ExtractorOutput { stdout, stderr } => {
                let mut lines: Vec<OutputLine> = stdout
                    .lines()
                    .map(|l| OutputLine::Stdout(l.to_string()))
                    .collect();
                lines.extend(stderr.lines().map(|l| OutputLine::Stderr(l.to_string())));
                lines
            }
            RunEvent::LogsRemoved { dir } => {
                vec![out(Tone::Plain, format!("removed {}", dir.display()))]
            }
            RunEvent::Succeeded {
                project,
                elapsed_ms,
            } => vec![
                out(Tone::Good, format!("-> {} succeeded", file_name(project))),
                out(Tone::Plain, format!("elapsed_time:{}[sec]", elapsed_ms / 1000)),
            ],
            RunEvent::Failed { message, .. } => {
                vec![OutputLine::Stderr(self.paint(Tone::Bad, message.clone()))]
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Renders run events on a blocking thread so slow terminals never stall the run.
pub fn spawn_renderer(
    painter: Painter,
) -> (mpsc::UnboundedSender<RunEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<RunEvent>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(event) = rx.blocking_recv() {
            for line in painter.render(&event) {
                let _ = match line {
                    OutputLine::Stdout(msg) => writeln!(out, "{msg}"),
                    OutputLine::Stderr(msg) => writeln!(err, "{msg}"),
                };
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}
