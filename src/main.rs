use anyhow::Result;
use clap::Parser;
use impactmap::cli::{Cli, Commands, OutputFormat};
use impactmap::config::ImpactConfig;
use impactmap::io::output;
use impactmap::analysis;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            path,
            output: output_path,
            format,
            deadline_ms,
            max_symbols,
            no_external_tools,
            changed_files,
        } => {
            let mut config = ImpactConfig::load(&path)?;
            if let Some(ms) = deadline_ms {
                config.call_graph.deadline_ms = ms;
            }
            if let Some(n) = max_symbols {
                config.call_graph.max_symbols = n;
            }
            if no_external_tools {
                config.call_graph.external_tools = false;
            }
            if !changed_files.is_empty() {
                config.changed_files = changed_files;
            }

            let report = analysis::analyze_project(&path, &config)?;

            match output_path {
                Some(path) => {
                    output::write_json_file(&report, &path)?;
                    println!("Report written to {}", path.display());
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut handle = stdout.lock();
                    match format {
                        OutputFormat::Json => output::write_json(&report, &mut handle)?,
                        OutputFormat::Summary => output::write_summary(&report, &mut handle)?,
                    }
                }
            }
        }
    }
    Ok(())
}
