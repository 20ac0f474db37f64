//! vizstep CLI
//!
//! Runs a program against caller-supplied variables and prints the recorded steps.

use vizstep_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
