use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.price.as_deref() {
        crate::utils::parse_range(raw).map_err(|e| format!("invalid --price '{raw}': {e}"))?;
    }
    if let Some(raw) = args.size.as_deref() {
        crate::utils::parse_range(raw).map_err(|e| format!("invalid --size '{raw}': {e}"))?;
    }
    if let Some(raw) = args.policy.as_deref() {
        if crate::controller::ResponsePolicy::parse(raw).is_none() {
            return Err(format!(
                "invalid --policy '{raw}', expected latest-issued or last-resolved"
            ));
        }
    }
    if let Some(raw) = args.format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --format '{raw}', expected text, json or html"));
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if args.genre.iter().any(|g| g.trim().is_empty()) {
        return Err("invalid --genre, expected a non-empty name".to_string());
    }
    Ok(())
}
