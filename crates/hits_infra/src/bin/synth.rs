use std::fs;
use std::path::PathBuf;

use hits_infra::stack::{resolve_stack_params, synthesize_stack};

/// Resolve inputs from the environment, synthesize the stack template, and
/// write it to the path given as the first argument (stdout if omitted).
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let params = resolve_stack_params(
        std::env::var("LAMBDA_ARTIFACT_BUCKET").ok(),
        std::env::var("LAMBDA_ARTIFACT_KEY").ok(),
        std::env::var("AWS_DOMAIN_NAME").ok(),
        std::env::var("AWS_CERTIFICATE_ARN").ok(),
    )?;

    let rendered = synthesize_stack(&params).to_json_string();

    match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, rendered)?;
            eprintln!("wrote template to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
