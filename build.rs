use std::env;
use std::path::PathBuf;
use std::process::Command;

use chrono::Utc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_dir = PathBuf::from("proto");
    let mut proto_files: Vec<PathBuf> = Vec::new();

    for entry in std::fs::read_dir(&proto_dir)? {
        let path = entry?.path();
        if path.extension().map(|ext| ext == "proto").unwrap_or(false) {
            proto_files.push(path);
        }
    }

    if proto_files.is_empty() {
        println!(
            "cargo:warning=No .proto files found in {}",
            proto_dir.display()
        );
    } else {
        tonic_build::configure()
            .build_client(true)
            .build_server(true)
            .compile_protos(&proto_files, &["proto"])?;
    }

    println!("cargo:rerun-if-changed=proto");

    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash.trim());
    println!("cargo:rustc-env=BUILD_TIME={}", Utc::now().to_rfc3339());
    println!(
        "cargo:rustc-env=BUILD_PROFILE={}",
        env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");

    Ok(())
}
