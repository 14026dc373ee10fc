mod app;
mod settings;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = app::Cli::parse();
    app::run(cli)
}
