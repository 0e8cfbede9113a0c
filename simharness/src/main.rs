/*
 * Created on Mon Aug 08 2022
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2022, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/
use {
    crate::cli::Cli,
    clap::Parser,
    env_logger::Builder,
    simcore::{ConfigError, Engine, HookCallback},
    simutil::util::terminal,
    std::{env, process},
};

#[macro_use]
extern crate log;

mod cli;
mod config;
mod error;
mod model;

fn main() {
    let cli = Cli::parse();
    let filter = cli
        .log_filter
        .clone()
        .or_else(|| env::var("SIMCORE_LOG").ok())
        .unwrap_or_else(|| "info".to_owned());
    Builder::new().parse_filters(&filter).init();

    if let Err(e) = run(cli) {
        let _ = terminal::write_error(format!("simharness exited with error: {}\n", e));
        error!("simharness exited with error: {}", e);
        process::exit(0x01);
    }
}

fn run(cli: Cli) -> error::HResult<()> {
    let doc = config::read_config_from_stdin()?;

    let engine = Engine::<model::RandomWalk, HookCallback>::from_config(&doc, cli.resume(), |v| {
        serde_json::from_value::<HookCallback>(v.clone()).map_err(|e| ConfigError::Decode {
            what: "callback",
            reason: e.to_string(),
        })
    })?;

    info!("starting run in workspace {:?}", engine.workspace());
    let summary = engine.run()?;
    info!(
        "run complete: {}/{} replicas failed",
        summary.failed, summary.total
    );

    if summary.failed == 0 {
        let _ = terminal::write_success(format!(
            "all {} replicas completed successfully\n",
            summary.total
        ));
    } else {
        // a non-zero failure count does not fail the process: the engine
        // itself ran to completion, it just reports which replicas didn't.
        let _ = terminal::write_warning(format!(
            "{} of {} replicas failed, see each replica's .err file\n",
            summary.failed, summary.total
        ));
    }
    Ok(())
}
