use clap::Parser;
use semakit::{options::Options, stress};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = Options::parse();
    let report = stress::run(&options);

    if !report.conserved() {
        log::error!(
            "token count drifted: expected {}, found {} (max holders {})",
            report.expected_tokens,
            report.final_tokens,
            report.max_holders
        );
        std::process::exit(1);
    }
}
