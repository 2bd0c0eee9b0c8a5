use anyhow::Result;

fn main() -> Result<()> {
    clubdues_cli::telemetry::init();
    clubdues_cli::app::run()
}
