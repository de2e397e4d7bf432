//! The console channel scripts print to and read lines from.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Console input and output as seen by the `io.*` builtins.
pub trait IoChannel: Send + Sync {
    fn write_out(&self, text: &str) -> io::Result<()>;
    fn write_err(&self, text: &str) -> io::Result<()>;
    /// Next input line without its terminator; `None` at end of input.
    fn read_line(&self) -> io::Result<Option<String>>;
}

/// The process's standard streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdIo;

impl IoChannel for StdIo {
    fn write_out(&self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn write_err(&self, text: &str) -> io::Result<()> {
        let mut err = io::stderr().lock();
        err.write_all(text.as_bytes())?;
        err.flush()
    }

    fn read_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(trim_newline(line)))
    }
}

/// In-memory channel: captures output and serves scripted input lines.
#[derive(Debug, Default)]
pub struct BufferedIo {
    out: Mutex<String>,
    err: Mutex<String>,
    input: Mutex<VecDeque<String>>,
}

impl BufferedIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose `read_line` yields `lines` in order, then `None`.
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: Mutex::new(lines.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn stdout(&self) -> String {
        self.out.lock().clone()
    }

    pub fn stderr(&self) -> String {
        self.err.lock().clone()
    }
}

impl IoChannel for BufferedIo {
    fn write_out(&self, text: &str) -> io::Result<()> {
        self.out.lock().push_str(text);
        Ok(())
    }

    fn write_err(&self, text: &str) -> io::Result<()> {
        self.err.lock().push_str(text);
        Ok(())
    }

    fn read_line(&self) -> io::Result<Option<String>> {
        Ok(self.input.lock().pop_front())
    }
}

fn trim_newline(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}
