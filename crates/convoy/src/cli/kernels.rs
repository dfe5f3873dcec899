//! The `convoy kernels` command: list the built-in operations.

use clap::Args;
use convoy_core::kernel::{lookup, Operation};

/// Arguments for the `kernels` command.
#[derive(Args, Debug)]
pub struct KernelsArgs {
    /// Also print each kernel's weight matrix
    #[arg(short, long)]
    pub matrix: bool,
}

/// Execute the kernels command.
pub fn execute(args: KernelsArgs) -> anyhow::Result<()> {
    for (name, description) in Operation::catalog() {
        println!("{name:<10} {description}");
        if args.matrix {
            if let Operation::Convolve(kernel) = lookup(name)? {
                for row in kernel.rows() {
                    println!("           {}", format_row(row));
                }
            }
        }
    }
    println!();
    println!("Custom 3x3 kernels: convoy apply -c \"0 -1 0 -1 5 -1 0 -1 0\"");
    Ok(())
}

fn format_row(row: &[f64]) -> String {
    row.iter()
        .map(|w| format!("{w:>9.5}"))
        .collect::<Vec<_>>()
        .join(" ")
}
