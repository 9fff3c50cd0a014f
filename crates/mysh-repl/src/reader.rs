//! Line reader thread.
//!
//! rustyline blocks, so it lives on its own thread. It reads only when the
//! main task sends it a prompt: while a foreground job owns the terminal the
//! reader sits idle instead of competing with the job for input.
//!
//! ```text
//!  main task ── prompt ──▶ reader thread ── readline() ──▶ ReadEvent ──▶ main task
//! ```

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, ExternalPrinter};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Prints above the prompt and redraws it. Usable from any thread.
pub type Printer = Box<dyn ExternalPrinter + Send>;

/// What one prompt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    Line(String),
    /// Ctrl-C.
    Interrupted,
    /// Ctrl-D, or the editor failed.
    Eof,
}

/// Handle to the reader thread.
#[derive(Debug)]
pub struct LineReader {
    requests: Option<mpsc::Sender<String>>,
    events: UnboundedReceiver<ReadEvent>,
    thread: Option<JoinHandle<()>>,
}

impl LineReader {
    /// Start the reader thread, loading history from `history` if given.
    ///
    /// Also returns the editor's external printer, when the terminal
    /// supports one.
    pub fn spawn(history: Option<PathBuf>) -> Result<(Self, Option<Printer>)> {
        let (request_tx, request_rx) = mpsc::channel::<String>();
        let (event_tx, event_rx) = unbounded_channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<Option<Printer>, String>>(1);

        let thread = std::thread::Builder::new()
            .name("mysh-readline".to_string())
            .spawn(move || {
                let mut editor = match DefaultEditor::new() {
                    Ok(editor) => editor,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                load_history(&mut editor, history.as_deref());

                let printer = editor
                    .create_external_printer()
                    .ok()
                    .map(|p| Box::new(p) as Printer);
                if ready_tx.send(Ok(printer)).is_err() {
                    return;
                }

                read_loop(&mut editor, &request_rx, &event_tx);

                if let Some(path) = &history {
                    save_history(&mut editor, path);
                }
            })
            .context("failed to spawn the line reader")?;

        let printer = ready_rx
            .recv()
            .context("line reader exited during setup")?
            .map_err(|e| anyhow!("failed to create line editor: {e}"))?;

        let reader = Self {
            requests: Some(request_tx),
            events: event_rx,
            thread: Some(thread),
        };
        Ok((reader, printer))
    }

    /// Ask for one line with `prompt`. The answer arrives via [`LineReader::next`].
    pub fn request(&self, prompt: String) -> Result<()> {
        self.requests
            .as_ref()
            .ok_or_else(|| anyhow!("line reader is closed"))?
            .send(prompt)
            .map_err(|_| anyhow!("line reader has stopped"))
    }

    pub async fn next(&mut self) -> Option<ReadEvent> {
        self.events.recv().await
    }

    /// Stop the thread and wait for it to save history.
    ///
    /// Only call with no request outstanding, or this blocks until the
    /// pending prompt is answered.
    pub fn close(mut self) {
        drop(self.requests.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("line reader thread panicked");
            }
        }
    }
}

fn read_loop(
    editor: &mut DefaultEditor,
    requests: &mpsc::Receiver<String>,
    events: &UnboundedSender<ReadEvent>,
) {
    while let Ok(prompt) = requests.recv() {
        let event = match editor.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = editor.add_history_entry(line.as_str()) {
                        tracing::warn!("Failed to add history entry: {}", e);
                    }
                }
                ReadEvent::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReadEvent::Interrupted,
            Err(ReadlineError::Eof) => ReadEvent::Eof,
            Err(e) => {
                tracing::warn!(error = %e, "readline failed");
                ReadEvent::Eof
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

fn load_history(editor: &mut DefaultEditor, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if let Err(e) = editor.load_history(path) {
        // Missing on first run.
        let is_not_found =
            matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
        if !is_not_found {
            tracing::warn!("Failed to load history: {}", e);
        }
    }
}

fn save_history(editor: &mut DefaultEditor, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create history directory: {}", e);
        }
    }
    if let Err(e) = editor.save_history(path) {
        tracing::warn!("Failed to save history: {}", e);
    }
}
