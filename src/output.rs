use colored::Colorize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg.green());
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg.red());
}

/// Print an informational message.
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg.blue());
}

/// Print the run summary: a check mark on stdout, green when everything
/// succeeded and red otherwise.
pub fn tally(msg: &str, all_ok: bool) {
    println!("{}", tally_line(msg, all_ok));
}

fn tally_line(msg: &str, all_ok: bool) -> String {
    if all_ok {
        format!("{} {}", "✓".green(), msg.green())
    } else {
        format!("{} {}", "✓".red(), msg.red())
    }
}
