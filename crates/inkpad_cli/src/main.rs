//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `inkpad_core` linkage without an HTTP host.
//! - Expose the pure decoding and truncation steps for quick local checks.

use std::env;
use std::process::ExitCode;

const USAGE: &str = "usage: inkpad_cli [version | decode <text> | truncate <max_chars> <text>]";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("version") => {
            println!("inkpad_core version={}", inkpad_core::core_version());
            ExitCode::SUCCESS
        }
        Some("decode") => {
            let raw = args[1..].join(" ");
            for label in inkpad_core::decode(&raw) {
                println!("{label}");
            }
            ExitCode::SUCCESS
        }
        Some("truncate") => {
            let Some(max_chars) = args.get(1).and_then(|value| value.parse::<usize>().ok()) else {
                eprintln!("{USAGE}");
                return ExitCode::FAILURE;
            };
            let text = args[2..].join(" ");
            let result = inkpad_core::truncate(&text, max_chars);
            println!(
                "truncated={} original_length={} processed_length={}",
                result.was_truncated, result.original_length, result.processed_length
            );
            println!("{}", result.body);
            ExitCode::SUCCESS
        }
        Some(_) => {
            eprintln!("{USAGE}");
            ExitCode::FAILURE
        }
    }
}
