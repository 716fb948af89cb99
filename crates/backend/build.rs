use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// target/debug or target/release, derived from OUT_DIR (target/<profile>/build/<pkg>/out)
fn profile_dir() -> PathBuf {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let profile = env::var("PROFILE").expect("PROFILE is set by cargo");
    Path::new(&out_dir)
        .ancestors()
        .find(|p| p.ends_with(&profile))
        .expect("Could not find target profile directory")
        .to_path_buf()
}

fn main() {
    println!("cargo:rerun-if-changed=../../config.toml");
    println!("cargo:rerun-if-changed=../../migrations");

    let workspace_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("Could not find workspace root");
    let target_dir = profile_dir();

    // config.toml рядом с бинарником
    let source_config = workspace_root.join("config.toml");
    if source_config.exists() {
        let dest = target_dir.join("config.toml");
        fs::copy(&source_config, &dest)
            .unwrap_or_else(|e| panic!("Failed to copy config.toml: {}", e));
    } else {
        println!(
            "cargo:warning=config.toml not found at {:?}, using default config",
            source_config
        );
    }

    // SQL-миграции рядом с бинарником, чтобы сервер стартовал из любого каталога
    let source_migrations = workspace_root.join("migrations");
    let dest_migrations = target_dir.join("migrations");
    if let Ok(entries) = fs::read_dir(&source_migrations) {
        fs::create_dir_all(&dest_migrations)
            .unwrap_or_else(|e| panic!("Failed to create migrations dir: {}", e));
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sql") {
                fs::copy(&path, dest_migrations.join(entry.file_name()))
                    .unwrap_or_else(|e| panic!("Failed to copy {:?}: {}", path, e));
            }
        }
    }
}
