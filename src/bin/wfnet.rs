use std::path::Path;

use anyhow::{Context, Result};

use wfnet::analysis::SoundnessAnalyzer;
use wfnet::analysis::state_graph::witness_snapshots;
use wfnet::config::AnalysisConfig;
use wfnet::net::io::read_description;
use wfnet::net::Net;
use wfnet::options::{Options, OptionsError};
use wfnet::utils::ordinal;

fn main() -> Result<()> {
    if std::env::var("WFNET_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("WFNET_LOG")
            .write_style("WFNET_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    // Flags from WFNET_FLAGS come first so command-line values override them.
    let mut flags = shellwords::split(&std::env::var("WFNET_FLAGS").unwrap_or_default())
        .map_err(OptionsError::from)?;
    flags.extend(std::env::args().skip(1));
    let options = match Options::parse_from_args(&flags) {
        Ok(options) => options,
        Err(OptionsError::Clap(err)) => err.exit(),
        Err(err) => return Err(err.into()),
    };
    log::debug!("options: {:?}", options);

    let config = AnalysisConfig::load_from_file(&options.config)?;
    let description = read_description(&options.net_file)
        .with_context(|| format!("Failed to read net description: {:?}", options.net_file))?;
    let net = description.build()?;

    let analysis = SoundnessAnalyzer::new(config.limits()).analyze(&net)?;
    let report = analysis.report(&net);

    if options.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }

    if let Some(output) = &options.output {
        report
            .save_to_file(output)
            .with_context(|| format!("Failed to save report to {output}"))?;
        log::info!("report saved to {}", output);
    }

    if let Some(dir) = &options.dot_dir {
        write_dot_files(&net, &analysis, dir)?;
    }
    Ok(())
}

fn write_dot_files(net: &Net, analysis: &wfnet::analysis::Analysis, dir: &Path) -> Result<()> {
    net.write_dot(dir.join("net.dot"))
        .with_context(|| format!("Failed to write DOT files to {:?}", dir))?;

    if let Some(graph) = analysis.state_graph(net) {
        graph?.write_dot(dir.join("reachability.dot"))?;
    }

    let witness = analysis
        .completion
        .as_ref()
        .and_then(|outcome| outcome.witness.as_ref());
    if let Some(witness) = witness {
        for (step, dot) in witness_snapshots(net, witness)?.iter().enumerate() {
            std::fs::write(dir.join(format!("{}.dot", ordinal(step + 1))), dot)?;
        }
    }
    log::info!("DOT files written to {:?}", dir);
    Ok(())
}
