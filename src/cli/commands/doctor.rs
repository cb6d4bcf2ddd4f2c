//! Doctor command - verify configuration, API access and local data.

use crate::cli::Output;
use crate::config::{EmbeddingProvider, Settings, VectorStoreProvider};
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Pensum Doctor");
    println!();
    println!("Checking configuration and local data...\n");

    let mut checks = Vec::new();

    let api = vec![check_openai_api_key(
        std::env::var("OPENAI_API_KEY").ok().as_deref(),
        settings.embedding.provider,
    )];
    print_section("API Configuration", &api);
    checks.extend(api);

    let dirs = check_directories(settings);
    print_section("Directories", &dirs);
    checks.extend(dirs);

    let config = vec![check_config_file(config_path), check_settings(settings)];
    print_section("Configuration", &config);
    checks.extend(config);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Pensum.",
            errors
        ));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Pensum is ready to use.");
    }

    Ok(())
}

/// Check the OpenAI API key. Chat always needs it; embeddings only with the OpenAI provider.
fn check_openai_api_key(key: Option<&str>, provider: EmbeddingProvider) -> CheckResult {
    match key {
        Some(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Some("") | None => {
            let hint = match provider {
                EmbeddingProvider::OpenAI => "Set with: export OPENAI_API_KEY='sk-...'",
                EmbeddingProvider::Hashing => {
                    "Needed for questions; search works with hashing embeddings"
                }
            };
            CheckResult::error("OPENAI_API_KEY", "not set", hint)
        }
        Some(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
    }
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &data_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let docs_dir = settings.docs_dir();
    if docs_dir.is_dir() {
        let count = crate::ingest::course_files(&docs_dir)
            .map(|files| files.len())
            .unwrap_or(0);
        results.push(CheckResult::ok(
            "Docs directory",
            &format!("{} ({} course documents)", docs_dir.display(), count),
        ));
    } else {
        results.push(CheckResult::warning(
            "Docs directory",
            &format!("{} (not found)", docs_dir.display()),
            "Set general.docs_dir or pass a folder to 'pensum ingest'",
        ));
    }

    if settings.vector_store.provider == VectorStoreProvider::Sqlite {
        let db_path = settings.sqlite_path();
        if db_path.exists() {
            let size = std::fs::metadata(&db_path)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            results.push(CheckResult::ok(
                "Database",
                &format!("{} ({})", db_path.display(), size),
            ));
        } else {
            results.push(CheckResult::warning(
                "Database",
                &format!("{} (not created yet)", db_path.display()),
                "Database will be created on first ingest",
            ));
        }
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: pensum config init",
        )
    }
}

fn check_settings(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::ok(
            "Settings",
            &format!(
                "model {}, {} tool rounds, {} results per search",
                settings.assistant.model,
                settings.assistant.max_rounds,
                settings.vector_store.max_results
            ),
        ),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix with: pensum config set"),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
