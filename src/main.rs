use colored::Colorize;
use std::process;

fn main() {
    if let Err(e) = tidepool::run() {
        eprintln!("{} {}", "error:".red().bold(), e);
        process::exit(1);
    }
}
