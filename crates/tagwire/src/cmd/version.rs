use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    os: &'static str,
    arch: &'static str,
    rustc: &'static str,
    git_hash: &'static str,
    wire_magic: &'static str,
    record_encoding: &'static str,
}

impl VersionOutput {
    fn collect() -> Self {
        Self {
            name: "tagwire",
            version: env!("CARGO_PKG_VERSION"),
            target: option_env!("TAGWIRE_BUILD_TARGET").unwrap_or("unknown"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            rustc: option_env!("RUSTC_VERSION").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
            wire_magic: "TW",
            record_encoding: "msgpack-named",
        }
    }
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("tagwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let info = VersionOutput::collect();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("name: {}", info.name);
            println!("version: {}", info.version);
            println!("target: {}", info.target);
            println!("target_os: {}", info.os);
            println!("target_arch: {}", info.arch);
            println!("rustc: {}", info.rustc);
            println!("git_hash: {}", info.git_hash);
            println!("wire: magic={} records={}", info.wire_magic, info.record_encoding);
        }
    }

    Ok(SUCCESS)
}
