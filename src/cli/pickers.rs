use inquire::{InquireError, Select};

/// Request confirmation for a destructive operation
pub fn confirm_action(message: &str, yes: bool) -> anyhow::Result<bool> {
    if yes {
        return Ok(true);
    }
    match inquire::Confirm::new(message).with_default(false).prompt() {
        Ok(confirmed) => Ok(confirmed),
        Err(InquireError::NotTTY) => {
            anyhow::bail!("--yes is required for destructive operations in non-interactive mode")
        }
        Err(e) => Err(e.into()),
    }
}

/// Ask the operator to pick one of `choices`; `None` when they back out.
pub fn pick_one(message: &str, choices: Vec<String>) -> anyhow::Result<Option<String>> {
    if choices.is_empty() {
        return Ok(None);
    }
    match Select::new(message, choices).prompt() {
        Ok(choice) => Ok(Some(choice)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
