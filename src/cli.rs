use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "argus")]
#[command(author = "ARGUS Contributors")]
#[command(version)]
#[command(about = "ARGUS: Advanced Security Intelligence Platform", long_about = None)]
pub struct Cli {
    #[arg(help = "Module to run (network-scan, port-scan, breach-check, ssl-monitor, geoip, threat-intel, audit-report)")]
    pub module: String,

    #[arg(short, long, help = "Target IP or hostname")]
    pub target: String,

    #[arg(short, long, help = "Ports for port scan (comma-separated, e.g. 22,80,443)")]
    pub ports: Option<String>,

    #[arg(short, long, help = "Output JSON report file")]
    pub output: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Maximum number of concurrent port probes")]
    pub workers: Option<usize>,

    #[arg(long, help = "Timeout in milliseconds for each port probe")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Report open/closed/timeout/error per port instead of a plain boolean")]
    pub detailed: bool,

    #[arg(short, long, help = "Configuration file path")]
    pub config: Option<PathBuf>,
}
