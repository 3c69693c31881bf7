/* STATIC Proxy (AGPL-3.0)

Copyright (C) 2025 - 404 Contributors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.

*/

use std::path::PathBuf;

use clap::Parser;
use http::Uri;
use static_inject::{
    app::{InjectApp, ReplayJob},
    config::InjectConfig,
    utils::init_tracing,
};

/// Replays captured response bodies through the injector exactly as a proxy engine would.
///
/// All behavioral config (storage directory, sequence start, payload) lives in TOML.
#[derive(Debug, Parser)]
#[command(
    name = "static-inject",
    about = "Inject a payload into HTML responses and record before/after bodies"
)]
struct Cli {
    /// Path to the configuration file (TOML format).
    #[arg(short, long, default_value = "config/static_inject.example.toml")]
    config: PathBuf,

    /// Enable JSON-formatted logs (default: human-readable stdout).
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Request address the bodies are attributed to in logs and telemetry.
    #[arg(long, default_value = "http://localhost/")]
    url: Uri,

    /// Directory receiving the bodies as they would be delivered to the client.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Decoded response bodies to process.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.json_logs)?;

    let config = InjectConfig::load(&cli.config)?;
    let app = InjectApp::new(config).await?;

    let summary = app
        .replay(ReplayJob {
            target: cli.url,
            inputs: cli.inputs,
            output_dir: cli.output_dir,
        })
        .await?;

    if summary.failed > 0 {
        anyhow::bail!("{} of the inputs could not be processed", summary.failed);
    }
    Ok(())
}
