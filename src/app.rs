use std::io::{self, BufRead, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use colored::*;
use serde_json::Value;
use tracing::{error, info};

use crate::modules::{ModuleError, ModuleOptions, ModuleRegistry, SecurityModule};
use crate::output::{self, OutputWriter, Tone};
use crate::utils::{resolve_target, validate_ip};

/// Failure surfaces of a single dispatch. Each maps to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),
}

/// One module invocation as requested by the user.
#[derive(Debug, Clone)]
pub struct Request {
    pub module: String,
    pub target: String,
    pub ports: Option<String>,
    pub output: Option<PathBuf>,
}

pub struct App {
    registry: ModuleRegistry,
}

impl App {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Resolve the target, look up the module and run it.
    pub async fn dispatch(&self, request: &Request) -> Result<Value, DispatchError> {
        let (ip, module) = self.prepare(request).await?;
        let options = Self::options_for(request);

        let spinner = output::start_spinner(format!("Running {} on {}", module.name(), ip));
        let result = module.run(ip, &options).await;
        spinner.finish_and_clear();

        Ok(result?)
    }

    async fn prepare(&self, request: &Request) -> Result<(IpAddr, Arc<dyn SecurityModule>), DispatchError> {
        let ip = resolve_target(&request.target)
            .await
            .map_err(|_| DispatchError::InvalidTarget(request.target.clone()))?;

        let module = self
            .registry
            .get(&request.module)
            .ok_or_else(|| {
                error!(available = ?self.registry.names(), "No module named {}", request.module);
                DispatchError::UnknownModule(request.module.clone())
            })?;

        Ok((ip, module))
    }

    fn options_for(request: &Request) -> ModuleOptions {
        let target = request.target.trim();
        ModuleOptions {
            ports: request.ports.clone(),
            hostname: (!validate_ip(target)).then(|| target.to_string()),
        }
    }

    /// Run a request end to end with terminal reporting. Returns false when
    /// the run should count as a failure; export problems are reported but
    /// do not fail the run.
    pub async fn execute(&self, request: &Request, show_result: bool) -> bool {
        let result = match self.dispatch(request).await {
            Ok(result) => result,
            Err(e) => {
                output::print_error(&e.to_string());
                error!(module = %request.module, "{}", e);
                return false;
            }
        };

        let done = format!("{} completed successfully.", request.module);
        output::print_success(&done);
        info!(module = %request.module, "SUCCESS: {}", done);

        let writer = OutputWriter::new(request.output.clone());
        if show_result {
            if let Err(e) = writer.print_result(&result) {
                error!(error = %e, "Failed to print result");
            }
        }

        match writer.export(&result) {
            Ok(Some(path)) => {
                let msg = format!("Report exported to {}", path.display());
                output::print_success(&msg);
                info!("SUCCESS: {}", msg);
            }
            Ok(None) => {}
            Err(e) => {
                let msg = format!("Export error: {:#}", e);
                output::print_error(&msg);
                error!("{}", msg);
            }
        }

        true
    }

    /// Numbered menu lines, `0` exits.
    pub fn menu_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .registry
            .entries()
            .iter()
            .enumerate()
            .map(|(i, m)| format!("  [{}] {:<20} - {}", i + 1, m.name(), m.description()))
            .collect();
        lines.push(format!("  [0] {:<20} - {}", "exit", "Exit ARGUS"));
        lines
    }

    /// Module name for a menu choice, `None` for exit or anything unknown.
    pub fn menu_choice(&self, choice: &str) -> Option<String> {
        let index: usize = choice.trim().parse().ok()?;
        if index == 0 {
            return None;
        }
        self.registry
            .entries()
            .get(index - 1)
            .map(|m| m.name().to_string())
    }

    /// Interactive loop used when no command-line arguments are given.
    /// Ends on `0` or end of input.
    pub async fn run_interactive<R: BufRead>(&self, mut input: R) -> io::Result<()> {
        let count = self.registry.len();
        loop {
            let rule = "=".repeat(70);
            println!("\n{}", rule);
            println!("{:^70}", "AVAILABLE MODULES".bold());
            println!("{}\n", rule);
            for line in self.menu_lines() {
                println!("{}", line);
            }
            println!("\n{}", rule);

            let Some(choice) = prompt(&mut input, &format!("\nSelect module [0-{}]: ", count))? else {
                return Ok(());
            };
            if choice == "0" || choice.eq_ignore_ascii_case("exit") {
                output::print_success("Thank you for using ARGUS. Goodbye!");
                return Ok(());
            }

            let Some(module) = self.menu_choice(&choice) else {
                output::print_error("Invalid selection. Please try again.");
                continue;
            };

            println!("\nSelected: {}", module.bold());
            let Some(target) = prompt(&mut input, "Enter target IP or hostname: ")? else {
                return Ok(());
            };
            if target.is_empty() {
                output::print_error("Target cannot be empty.");
                continue;
            }

            let mut ports = None;
            if module == "port-scan" {
                let Some(list) = prompt(
                    &mut input,
                    "Enter ports (comma-separated, or leave blank for default): ",
                )?
                else {
                    return Ok(());
                };
                ports = (!list.is_empty()).then_some(list);
            }

            let Some(file) = prompt(&mut input, "Enter output file (or leave blank for console only): ")? else {
                return Ok(());
            };
            let output = (!file.is_empty()).then(|| PathBuf::from(file));

            let request = Request {
                module,
                target,
                ports,
                output,
            };
            self.execute(&request, true).await;

            output::print_boxed("Press Enter to return to menu...", Tone::Info);
            if prompt(&mut input, "")?.is_none() {
                return Ok(());
            }
        }
    }
}

/// Print `message` and read one trimmed line. `None` on end of input.
fn prompt<R: BufRead>(input: &mut R, message: &str) -> io::Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
