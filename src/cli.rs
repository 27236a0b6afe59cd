//! CLI: expand | resolve | check | intrinsic
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

use cfn_shapes::intrinsics::{self, token, ResolveOptions};
use cfn_shapes::{path_de, Template};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// inspect, expand and evaluate CloudFormation/SAM JSON templates
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// tracing filter directive (e.g. `debug`, `cfn_shapes=trace`)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// replace intrinsic tokens with the literal `Ref`/`Fn::*` objects
    Expand(ExpandOut),
    /// evaluate intrinsic functions where their inputs are known
    Resolve(ResolveOut),
    /// strictly check the shape of polymorphic serverless properties
    Check(CheckArgs),
    /// build one intrinsic call and print its token and JSON form
    Intrinsic(IntrinsicArgs),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select the template inside each document (e.g. /TemplateBody)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct OutputSettings {
    /// output .json file (stdout if omitted); single input only
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// single-line JSON
    #[arg(long, default_value_t = false)]
    compact: bool,
}

#[derive(clap::Parser, Debug)]
struct ExpandOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    output_settings: OutputSettings,
}

#[derive(clap::Parser, Debug)]
struct ResolveOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    output_settings: OutputSettings,

    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    #[arg(long, env = "CFN_SHAPES_ACCOUNT_ID", default_value = "123456789012")]
    account_id: String,

    #[arg(long, default_value = "cfn-shapes-stack")]
    stack_name: String,

    #[arg(long, default_value = "aws")]
    partition: String,

    /// parameter override `Name=Value`; the value is read as JSON when it parses, else as a string
    #[arg(long = "parameter", short = 'p', value_parser = parse_parameter)]
    parameters: Vec<(String, Value)>,

    /// evaluate `Fn::If` and drop resources/outputs whose condition is false
    #[arg(long, default_value_t = false)]
    evaluate_conditions: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckArgs {
    #[command(flatten)]
    input_settings: InputSettings,

    /// exit non-zero when any property fails
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(clap::Parser, Debug)]
struct IntrinsicArgs {
    /// function name, with or without the `Fn::` prefix (`Ref`, `Join`, `Fn::GetAtt`, ...)
    function: String,

    /// positional arguments; tokens from earlier calls nest
    args: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_process(&self, mut apply: impl FnMut(&Path, Value) -> anyhow::Result<()>) -> anyhow::Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        for source_path in source_paths {
            debug!(path = %source_path.display(), "loading template");
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file: {}", source_path.display()))?;
            let json_value = path_de::from_str_with_path::<Value>(&source)
                .with_context(|| format!("failed to parse JSON source file ({})", source_path.display()))?;
            let json_value = match self.json_pointer.as_deref() {
                None => json_value,
                Some(pointer) => match json_value.pointer(pointer) {
                    Some(selected) => selected.clone(),
                    None => bail!("JSON pointer {pointer} selects nothing in {}", source_path.display()),
                },
            };
            apply(&source_path, json_value)?;
        }
        Ok(())
    }

    fn single_input(&self) -> bool {
        self.input.len() == 1 && !has_glob_chars(&self.input[0])
    }
}

impl OutputSettings {
    fn render(&self, value: &Value) -> anyhow::Result<String> {
        let rendered = if self.compact { serde_json::to_string(value)? } else { serde_json::to_string_pretty(value)? };
        Ok(rendered)
    }

    fn write(&self, rendered: &str) -> anyhow::Result<()> {
        match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(out, rendered).with_context(|| format!("failed to write {}", out.display()))?;
                info!(path = %out.display(), "wrote output");
            }
            None => println!("{rendered}"),
        }
        Ok(())
    }

    fn check_inputs(&self, input_settings: &InputSettings) -> anyhow::Result<()> {
        if self.out.is_some() && !input_settings.single_input() {
            bail!("--out takes a single literal input");
        }
        Ok(())
    }
}

impl ResolveOut {
    fn options(&self) -> ResolveOptions {
        ResolveOptions {
            region: self.region.clone(),
            account_id: self.account_id.clone(),
            stack_name: self.stack_name.clone(),
            partition: self.partition.clone(),
            parameter_overrides: self.parameters.iter().cloned().collect::<IndexMap<_, _>>(),
            evaluate_conditions: self.evaluate_conditions,
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<ExitCode> {
        init_tracing(&self.log_level, self.log_format);
        match &self.cmd {
            Command::Expand(target) => {
                target.output_settings.check_inputs(&target.input_settings)?;
                target.input_settings.load_process(|_, value| {
                    let rendered = target.output_settings.render(&token::expand(value))?;
                    target.output_settings.write(&rendered)
                })?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Resolve(target) => {
                target.output_settings.check_inputs(&target.input_settings)?;
                let options = target.options();
                target.input_settings.load_process(|path, value| {
                    let resolved = intrinsics::resolve(value, &options)
                        .with_context(|| format!("failed to resolve {}", path.display()))?;
                    let rendered = target.output_settings.render(&resolved)?;
                    target.output_settings.write(&rendered)
                })?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Check(target) => {
                let mut failures = 0usize;
                target.input_settings.load_process(|path, value| {
                    let template = Template::from_value(value)
                        .with_context(|| format!("failed to decode template {}", path.display()))?;
                    let mismatches = template.audit();
                    if mismatches.is_empty() {
                        println!("{} {}", "ok".green().bold(), path.display());
                    } else {
                        println!("{} {}", "fail".red().bold(), path.display());
                        for mismatch in &mismatches {
                            println!("  {} {}", mismatch.path.yellow(), mismatch.error);
                        }
                    }
                    failures += mismatches.len();
                    Ok(())
                })?;
                if failures > 0 && target.strict {
                    eprintln!("{}", format!("{failures} property value(s) match no declared shape").red());
                    return Ok(ExitCode::FAILURE);
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Intrinsic(target) => {
                let call = intrinsics::build(&target.function, &target.args)?;
                let fragment = token::expand(Value::String(call.clone()));
                println!("{call}");
                println!("{}", serde_json::to_string_pretty(&fragment)?);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn init_tracing(log_level: &str, log_format: LogFormat) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(env_filter);
    match log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}

fn parse_parameter(raw: &str) -> Result<(String, Value), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("expected Name=Value, got `{raw}`"));
    };
    if name.is_empty() {
        return Err(format!("missing parameter name in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn has_glob_chars(s: &str) -> bool {
    // Minimal glob detection for the `glob` crate syntax.
    s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
