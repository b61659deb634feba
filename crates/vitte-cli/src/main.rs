//! Binary entry point for the `vitte` command-line host.
//!
//! Kept minimal on purpose: environment setup only, everything else lives in
//! `lib.rs` so the CLI's behavior can be exercised from integration tests.

fn main() {
    if let Err(report) = vitte_cli::run() {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}
