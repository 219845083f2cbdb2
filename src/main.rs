use anyhow::Result;
use clap::Parser;
use multipart_print::cli::Cli;

fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();
    multipart_print::init_tracing(cli.debug);

    // Run the main application logic from the library
    if let Err(e) = multipart_print::run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
