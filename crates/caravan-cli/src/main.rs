//! Thin entrypoint for the `caravan` binary.

use std::process;

fn main() {
    process::exit(caravan_cli::run());
}
