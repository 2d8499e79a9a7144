//! Styled terminal output for cft
//!
//! Progress and results go to stdout, errors to stderr.

use owo_colors::OwoColorize;

/// Print a success message with a green checkmark
pub fn success(message: &str) {
    // Pastel mint green: RGB(152, 225, 152)
    println!(
        "{} {}",
        "✓".truecolor(152, 225, 152).bold(),
        message.bright_white()
    );
}

/// Print an error message with a red X
pub fn error(message: &str) {
    // Pastel coral/salmon: RGB(255, 160, 160)
    eprintln!(
        "{} {}",
        "✗".truecolor(255, 160, 160).bold(),
        message.bright_white()
    );
}

/// Print a warning message with a yellow warning symbol
pub fn warning(message: &str) {
    // Pastel cream/yellow: RGB(255, 230, 160)
    println!(
        "{} {}",
        "⚠".truecolor(255, 230, 160).bold(),
        message.bright_white()
    );
}

/// Print an info message with a blue info symbol
pub fn info(message: &str) {
    // Pastel sky blue: RGB(160, 200, 255)
    println!(
        "{} {}",
        "ℹ".truecolor(160, 200, 255).bold(),
        message.bright_white()
    );
}

/// Print a section header with a separator line
pub fn section(title: &str) {
    // Pastel lavender: RGB(181, 174, 254)
    println!("\n{}", title.truecolor(181, 174, 254).bold());
    println!("{}", "─".repeat(50).truecolor(160, 160, 160));
}

/// Print a step indicator, e.g. `[2/5] Creating p.network`
pub fn step(number: usize, total: usize, description: &str) {
    println!(
        "\n{} {}",
        format!("[{}/{}]", number, total)
            .truecolor(181, 174, 254)
            .bold(),
        description.bright_white()
    );
}

/// Print a list item with a bullet
pub fn list_item(text: &str) {
    println!("  {} {}", "•".truecolor(160, 160, 160), text.bright_white());
}

/// Print a dimmed/muted message
pub fn dimmed(message: &str) {
    println!("{}", message.truecolor(160, 160, 160));
}

/// Print text unstyled, for machine readable output
pub fn plain(text: &str) {
    println!("{}", text);
}

/// Print a blank line
pub fn blank() {
    println!();
}
