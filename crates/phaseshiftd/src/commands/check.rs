use std::path::Path;

use tracing::info;

use phaseshift_core::MoverConfig;

use super::load_config;

pub fn init(path: &Path, tokens: &[String], force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let config = MoverConfig::scaffold(&tokens);
    config.validate()?;

    std::fs::write(path, config.to_toml_string()?)?;
    info!(path = %path.display(), sessions = tokens.len(), "configuration written");
    println!("✓ Generated {}", path.display());
    Ok(())
}

pub fn check(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;
    println!("{}", summary(&config));
    Ok(())
}

/// Human-readable overview. Never includes credential values.
fn summary(config: &MoverConfig) -> String {
    let exec = &config.execution;
    let req = &config.requests;
    format!(
        "✓ configuration valid\n\
         sessions:        {sessions}\n\
         day category:    {day:?}\n\
         night category:  {night:?}\n\
         shared room:     {shared:?}\n\
         facilitator:     {role:?}\n\
         deadline:        {deadline}s\n\
         workers:         {workers}\n\
         max attempts:    {attempts}\n\
         retry backoff:   {backoff}ms\n\
         jitter window:   {jitter}ms\n\
         request timeout: {timeout}s\n\
         roster:          page {page}, limit {limit}",
        sessions = config.credentials.tokens.len(),
        day = config.rooms.day_category,
        night = config.rooms.night_category,
        shared = config.rooms.shared_room,
        role = config.roles.facilitator,
        deadline = exec.deadline_seconds,
        workers = exec.workers,
        attempts = exec.max_attempts,
        backoff = exec.retry_backoff_ms,
        jitter = exec.jitter_window_ms,
        timeout = req.per_request_seconds,
        page = req.member_page_size,
        limit = req.roster_limit,
    )
}
