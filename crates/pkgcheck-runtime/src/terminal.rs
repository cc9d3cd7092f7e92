use console::{style, Term};
use std::sync::atomic::{AtomicBool, Ordering};

const BANNER_WIDTH: usize = 80;

static NARRATE_TO_STDERR: AtomicBool = AtomicBool::new(false);

/// Send command narration to stderr instead of stdout, leaving stdout free
/// for machine-readable output.
pub fn narrate_to_stderr(enabled: bool) {
    NARRATE_TO_STDERR.store(enabled, Ordering::Relaxed);
}

fn narration_term() -> Term {
    if NARRATE_TO_STDERR.load(Ordering::Relaxed) {
        Term::stderr()
    } else {
        Term::stdout()
    }
}

/// Print one line of operator-facing narration.
pub fn narrate(line: &str) {
    let _ = narration_term().write_line(line);
}

/// Header line announcing a command, e.g.
/// `== BUILDING THE .WHL ====...==== builder venv ==`.
pub fn banner_header(title: &str, at: &str) -> String {
    let title = title.to_uppercase();
    let fill = BANNER_WIDTH.saturating_sub(at.chars().count() + title.chars().count() + 8);
    format!("== {title} {} {at} ==", "=".repeat(fill))
}

pub fn banner_footer() -> String {
    "=".repeat(BANNER_WIDTH)
}

/// Echo a command before running it. Operators rely on this narration to see
/// which tool in which environment produced the output that follows.
pub fn print_command_banner(title: &str, at: &str, command_line: &str) {
    let term = narration_term();
    let _ = term.write_line("");
    let _ = term.write_line(&style(banner_header(title, at)).bold().to_string());
    let _ = term.write_line(command_line);
    let _ = term.write_line(&style(banner_footer()).bold().to_string());
    let _ = term.write_line("");
}

pub fn print_command_output(output: &str) {
    let trimmed = output.trim_end();
    if !trimmed.is_empty() {
        narrate(trimmed);
    }
}
