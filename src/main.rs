// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use reactord::config::Config;
use reactord::logging;
use reactord::reactor::Reactor;

fn main() -> ExitCode {
    let config = Config::parse();
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("reactord: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let trigger_mode = config.validate().context("invalid configuration")?;
    let _log_guard = logging::init(&config);

    let static_root = std::env::current_dir()
        .context("failed to resolve current directory")?
        .join("resources");

    let reactor = Reactor::new(&config, trigger_mode, static_root).context("failed to start server")?;

    tracing::info!(port = config.port, threads = config.thread_num, "reactord starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("failed to install SIGINT/SIGTERM handler")?;

    reactor.run(&shutdown).context("reactor exited with an error")
}
