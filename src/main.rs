//
// main.rs
// medimage-utils
//
// Entry point that hands off execution to the CLI layer.
//

use medimage_utils::cli;

fn main() -> anyhow::Result<()> {
    // Delegate all argument parsing and dispatching to the CLI module.
    cli::run()
}
