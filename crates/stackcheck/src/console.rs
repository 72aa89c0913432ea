//! Severity-tagged console lines

use owo_colors::OwoColorize;

pub fn info(msg: &str) {
    println!("{} {}", "[INFO]".green(), msg);
}

pub fn warn(msg: &str) {
    println!("{} {}", "[WARN]".yellow(), msg);
}

pub fn error(msg: &str) {
    println!("{} {}", "[ERROR]".red(), msg);
}

pub fn banner(title: &str) {
    let rule = "=".repeat(50);
    println!();
    println!("{}", rule);
    println!(" {}", title.bold());
    println!("{}", rule);
    println!();
}

pub fn rule() {
    println!();
    println!("{}", "=".repeat(50));
}
