/*!
 * Armada CLI
 *
 * Exit codes: 0 when everything succeeded, 1 when some groups, instances,
 * repairs or adds failed, 2 on fatal errors.
 */

use armada::{
    cli::Cli,
    deploy::{self, Backends, RunRequest},
    error::{ArmadaError, EXIT_FATAL, EXIT_SUCCESS},
    logging,
};
use clap::Parser;

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<ArmadaError>() {
                Some(armada_error) => armada_error.exit_code(),
                None => EXIT_FATAL,
            }
        }
    };
    std::process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    let mode = cli.run_mode()?;
    let config = cli.load_config()?;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let request = RunRequest {
        network_name: cli.network_name.clone(),
        workdir: cli.nodes_dir.clone(),
        mode,
        config: config.clone(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(deploy::run(request, |topology, directory| {
        Backends::from_config(&config, topology, directory)
    }))?;

    for line in &outcome.lines {
        println!("{}", line);
    }
    if outcome.exit_code != EXIT_SUCCESS {
        eprintln!("Finished with failures (exit code {})", outcome.exit_code);
    }
    Ok(outcome.exit_code)
}
