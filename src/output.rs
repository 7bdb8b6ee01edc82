//! User-facing output sink.
//!
//! The pipeline reports progress through [`Output`] rather than printing
//! directly, so tests can record events and push-only runs can suppress the
//! build banners. Most methods take a `suppress` flag; a suppressed event is
//! dropped by the sink.

/// Receiver of pipeline progress events.
pub trait Output: Send + Sync {
    /// Section start banner.
    fn header(&self, text: &str, suppress: bool);
    /// Progress line.
    fn info(&self, text: &str, suppress: bool);
    /// Failure line. Never suppressed.
    fn error(&self, text: &str);
    /// Section end banner.
    fn footer(&self, text: &str, suppress: bool);
    /// A line of output forwarded from an external process.
    fn procout(&self, line: &str);
}

/// Prints events to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleOutput;

impl Output for ConsoleOutput {
    fn header(&self, text: &str, suppress: bool) {
        if !suppress {
            println!("\n=== {} ===", text);
        }
    }

    fn info(&self, text: &str, suppress: bool) {
        if !suppress {
            println!("{}", text);
        }
    }

    fn error(&self, text: &str) {
        eprintln!("[ERROR] {}", text);
    }

    fn footer(&self, text: &str, suppress: bool) {
        if !suppress {
            println!("=== {} ===\n", text);
        }
    }

    fn procout(&self, line: &str) {
        println!("  {}", line);
    }
}
