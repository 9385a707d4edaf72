use std::{
    env,
    io::{self, BufRead, BufWriter, Write},
};

use anyhow::{Context, bail};
use coordinator::{RunConfig, launch};
use log::{info, warn};

/// Serves a sampler over stdin and stdout.
///
/// Every input line is a whitespace separated parameter vector, answered by
/// one line with the band-integrated observables. A vector starting with
/// `inf`, or the end of the input, terminates the run.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        bail!("usage: retrieve <run-config.json>");
    };

    let config = RunConfig::from_path(&path)?;
    let mut session = launch(config).context("failed to start the pipeline")?;
    info!("serving parameter vectors from stdin");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for (n, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        let Some(params) = parse_params(&line).with_context(|| format!("line {}", n + 1))? else {
            continue;
        };

        match session.evaluate(&params)? {
            Some(observables) => {
                writeln!(out, "{}", format_observables(&observables))?;
                out.flush()?;
            }
            None => return Ok(()),
        }
    }

    warn!("input closed before the termination signal");
    session.terminate()?;
    Ok(())
}

/// Parses one parameter vector, `None` for a blank line.
fn parse_params(line: &str) -> anyhow::Result<Option<Vec<f64>>> {
    let params = line
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .with_context(|| format!("invalid parameter '{token}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok((!params.is_empty()).then_some(params))
}

fn format_observables(observables: &[f64]) -> String {
    observables
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
