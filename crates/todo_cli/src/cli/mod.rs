use clap::{Parser, Subcommand};
use todo_sync::config::ConfigOverrides;
use todo_sync::controller::StartupPrecedence;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new timed task
    ///
    /// Example: todo_timer add "Buy milk" 300
    Add { title: String, seconds: String },
    /// Toggle a task between pending and done
    ///
    /// Example: todo_timer done 3f2a
    Done { id: String },
    /// Delete a task
    ///
    /// Example: todo_timer delete 3f2a
    Delete { id: String },
    /// List tasks with their remaining time
    ///
    /// Example: todo_timer list
    List,
    /// Keep the countdown running and read commands from stdin
    ///
    /// Example: todo_timer run
    Run,
}

/// Commands accepted on stdin while `run` is active.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct LiveCli {
    #[command(subcommand)]
    pub command: LiveCommand,
}

#[derive(Subcommand, Debug)]
pub enum LiveCommand {
    /// Add a new timed task
    Add { title: String, seconds: String },
    /// Toggle a task between pending and done
    Done { id: String },
    /// Delete a task
    Delete { id: String },
    /// Print the current tasks
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    ApiUrl,
    SnapshotPath,
    TimeoutSecs(u64),
    Startup(StartupPrecedence),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "api_url" | "api" => ConfigOverrideTarget::ApiUrl,
        "snapshot_path" | "snapshot" => ConfigOverrideTarget::SnapshotPath,
        "timeout_secs" | "timeout" => {
            let secs = value
                .parse::<u64>()
                .map_err(|_| format!("timeout must be a whole number of seconds, got '{value}'"))?;
            ConfigOverrideTarget::TimeoutSecs(secs)
        }
        "startup" => {
            let startup = StartupPrecedence::parse(&value)
                .ok_or_else(|| format!("startup must be local, remote or merge, got '{value}'"))?;
            ConfigOverrideTarget::Startup(startup)
        }
        other => return Err(format!("unknown config field '{other}'")),
    };

    if value.is_empty() {
        return Err(format!("override '{field}' needs a value"));
    }

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` argument into one set of overrides.
/// Later arguments win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::ApiUrl => overrides.api_url = Some(parsed.value),
            ConfigOverrideTarget::SnapshotPath => overrides.snapshot_path = Some(parsed.value),
            ConfigOverrideTarget::TimeoutSecs(secs) => overrides.timeout_secs = Some(secs),
            ConfigOverrideTarget::Startup(startup) => overrides.startup = Some(startup),
        }
    }
    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits a line typed in live mode into arguments, honouring double quotes.
pub fn split_command_line(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err("unterminated quote in command".to_string());
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}
