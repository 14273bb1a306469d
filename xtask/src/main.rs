use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the hit-counter webservice workspace",
    long_about = "A unified CLI for CI checks, Lambda packaging, template\n\
                  synthesis, and stack deployment in the hit-counter workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci,
    /// Build and package the Lambda binary as a deployable zip
    LambdaPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "aarch64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Synthesize the CloudFormation template
    Synth {
        /// Output file path
        #[arg(long, default_value = "target/cloudformation/template.json")]
        output: String,
    },
    /// Package, synthesize, and deploy the stack via the AWS CLI
    Deploy {
        /// CloudFormation stack name
        #[arg(long, default_value = "hit-counter-stack")]
        stack_name: String,
        /// Bucket receiving the Lambda zip artifact
        #[arg(long, env = "LAMBDA_ARTIFACT_BUCKET")]
        artifact_bucket: String,
        /// Object key for the Lambda zip artifact
        #[arg(long, env = "LAMBDA_ARTIFACT_KEY", default_value = "dist/hit_counter_lambda.zip")]
        artifact_key: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_aws(args: &[&str]) {
    eprintln!("+ aws {}", args.join(" "));
    let status = Command::new("aws")
        .args(args)
        .status()
        .expect("failed to execute the aws cli");
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn aws_capture(args: &[&str]) -> String {
    eprintln!("+ aws {}", args.join(" "));
    let output = Command::new("aws")
        .args(args)
        .output()
        .expect("failed to execute the aws cli");
    if !output.status.success() {
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        exit(output.status.code().unwrap_or(1));
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ── Lambda packaging ───────────────────────────────────────────────

fn package_lambda(target: &str, profile: BuildProfile) -> std::path::PathBuf {
    ensure_rust_target_installed(target);
    ensure_c_linker_available(target);

    step("Build the hit counter Lambda binary");

    let mut cargo_args = vec![
        "build",
        "-p",
        "hits_lambda",
        "--target",
        target,
        "--bin",
        "hit_counter_lambda",
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package the Lambda zip artifact");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    let dist_dir = Path::new("dist");
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    let zip_path = dist_dir.join("hit_counter_lambda.zip");
    package_lambda_zip(
        &target_dir.join(binary_name("hit_counter_lambda", target)),
        &zip_path,
    );

    eprintln!("\nPackaged artifact:\n- {}", zip_path.display());
    zip_path
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "failed to list installed rust targets; run `rustup target list --installed` manually. details: {}",
            stderr.trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- lambda-package`"
        );
    }
}

fn ensure_c_linker_available(target: &str) {
    if !cfg!(windows) || !target.ends_with("unknown-linux-gnu") {
        return;
    }

    let env_override_keys = [
        format!("CC_{}", target.replace('-', "_")),
        format!("CC_{target}"),
        "TARGET_CC".to_string(),
        "CC".to_string(),
    ];

    for key in env_override_keys {
        if let Ok(value) = std::env::var(&key) {
            let candidate = value.trim();
            if candidate.is_empty() {
                continue;
            }
            if tool_works(candidate) {
                return;
            }
        }
    }

    let canonical = if target.starts_with("aarch64") {
        "aarch64-linux-gnu-gcc"
    } else {
        "x86_64-linux-gnu-gcc"
    };
    if tool_works(canonical) {
        return;
    }

    panic!(
        "missing C cross-linker for target `{target}`. install `{canonical}` (or set TARGET_CC) before running `cargo run -p xtask -- lambda-package`."
    );
}

fn tool_works(program: &str) -> bool {
    let mut parts = program.split_whitespace();
    let Some(bin) = parts.next() else {
        return false;
    };
    let args: Vec<&str> = parts.collect();

    Command::new(bin)
        .args(&args)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    if !binary_path.exists() {
        panic!("expected lambda binary at '{}'", binary_path.display());
    }

    let binary = fs::read(binary_path).expect("failed to read lambda binary");
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in lambda zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

// ── template synthesis ─────────────────────────────────────────────

fn synthesize_template(output: &str) {
    step("Synthesize the CloudFormation template");
    run_cargo(&["run", "-p", "hits_infra", "--bin", "synth", "--", output]);
}

// ── CI ─────────────────────────────────────────────────────────────

fn ci() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test hits_core");
    run_cargo(&["test", "-p", "hits_core"]);

    step("Test hits_lambda");
    run_cargo(&["test", "-p", "hits_lambda"]);

    step("Test hits_infra");
    run_cargo(&["test", "-p", "hits_infra"]);
}

// ── deployment ─────────────────────────────────────────────────────

fn deploy(stack_name: &str, artifact_bucket: &str, artifact_key: &str) {
    let zip_path = package_lambda("aarch64-unknown-linux-gnu", BuildProfile::Release);

    // The synth binary resolves these from its environment.
    std::env::set_var("LAMBDA_ARTIFACT_BUCKET", artifact_bucket);
    std::env::set_var("LAMBDA_ARTIFACT_KEY", artifact_key);
    let template_path = "target/cloudformation/template.json";
    synthesize_template(template_path);

    step("Upload the Lambda artifact");
    let artifact_url = format!("s3://{artifact_bucket}/{artifact_key}");
    run_aws(&[
        "s3",
        "cp",
        &zip_path.display().to_string(),
        &artifact_url,
    ]);

    step("Deploy the CloudFormation stack");
    run_aws(&[
        "cloudformation",
        "deploy",
        "--template-file",
        template_path,
        "--stack-name",
        stack_name,
        "--capabilities",
        "CAPABILITY_IAM",
    ]);

    step("Sync the static site content");
    let site_bucket = aws_capture(&[
        "cloudformation",
        "describe-stacks",
        "--stack-name",
        stack_name,
        "--query",
        "Stacks[0].Outputs[?OutputKey=='SiteBucketName'].OutputValue",
        "--output",
        "text",
    ]);
    if site_bucket.is_empty() {
        panic!("stack `{stack_name}` has no SiteBucketName output");
    }
    run_aws(&[
        "s3",
        "sync",
        "webpage/",
        &format!("s3://{site_bucket}/"),
    ]);

    eprintln!("\nDeployed stack `{stack_name}`.");
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci => {
            ci();
            eprintln!("\nCI job passed.");
        }
        Commands::LambdaPackage { target, profile } => {
            package_lambda(&target, profile);
        }
        Commands::Synth { output } => {
            synthesize_template(&output);
        }
        Commands::Deploy {
            stack_name,
            artifact_bucket,
            artifact_key,
        } => {
            deploy(&stack_name, &artifact_bucket, &artifact_key);
        }
    }
}
