//! Report sink that knows whether a prompt is on screen.

use std::cell::Cell;
use std::rc::Rc;

use mysh_kernel::scheduler::{ReportSink, StdioSink};

use crate::reader::Printer;

/// Shared "a prompt is showing" flag, set by the main loop.
pub type PromptState = Rc<Cell<bool>>;

/// Writes reports to stdio, or above the prompt while one is showing.
pub struct PromptSink {
    printer: Option<Printer>,
    prompting: PromptState,
    stdio: StdioSink,
}

impl PromptSink {
    pub fn new(printer: Option<Printer>, prompting: PromptState) -> Self {
        Self {
            printer,
            prompting,
            stdio: StdioSink,
        }
    }

    /// True if the printer took the text.
    fn above_prompt(&mut self, text: &str) -> bool {
        if !self.prompting.get() {
            return false;
        }
        let Some(printer) = self.printer.as_mut() else {
            return false;
        };
        // Spacing only matters when writing over a live prompt line.
        if text.trim().is_empty() {
            return true;
        }
        printer.print(text.to_string()).is_ok()
    }
}

impl ReportSink for PromptSink {
    fn out(&mut self, text: &str) {
        if !self.above_prompt(text) {
            self.stdio.out(text);
        }
    }

    fn err(&mut self, text: &str) {
        if !self.above_prompt(text) {
            self.stdio.err(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl rustyline::ExternalPrinter for Recorder {
        fn print(&mut self, msg: String) -> rustyline::Result<()> {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(msg);
            }
            Ok(())
        }
    }

    #[test]
    fn test_printer_only_while_prompting() {
        let recorder = Recorder::default();
        let prompting: PromptState = Rc::new(Cell::new(true));
        let mut sink = PromptSink::new(Some(Box::new(recorder.clone())), prompting.clone());

        sink.out("[1] 42 done sleep 1\n");
        sink.out("\n");
        assert_eq!(*recorder.0.lock().unwrap(), vec!["[1] 42 done sleep 1\n"]);

        prompting.set(false);
        sink.out("");
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }
}
