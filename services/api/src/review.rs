//! Command-line counterpart of the `/admin` routes for operators working on the server itself.

use std::sync::Arc;

use crate::infra::StoreHandle;
use hospital_directory::config::AppConfig;
use hospital_directory::directory::{
    DirectoryPolicy, DirectoryService, DirectoryStore, ModerationOutcome, Professional,
    ProfessionalId,
};
use hospital_directory::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdminTask {
    Seed,
    Pending,
    Approve(ProfessionalId),
    Reject(ProfessionalId),
}

pub(crate) fn run(task: AdminTask) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let policy = config.directory.policy();
    let store = StoreHandle::open(&config.store)?;

    let result = match &store {
        StoreHandle::Sqlite(store) => execute(store.clone(), policy, task),
        StoreHandle::Memory(store) => execute(store.clone(), policy, task),
    };
    store.close()?;

    println!("{}", result?);
    Ok(())
}

/// Runs one task and returns the text to print.
fn execute<S>(store: Arc<S>, policy: DirectoryPolicy, task: AdminTask) -> Result<String, AppError>
where
    S: DirectoryStore + 'static,
{
    let service = DirectoryService::new(store, policy);

    let output = match task {
        AdminTask::Seed => match service.seed_sample_hospitals()? {
            0 => "Hospitals already present; sample data not loaded".to_string(),
            inserted => format!("Loaded {inserted} sample hospitals"),
        },
        AdminTask::Pending => render_pending(&service.list_pending()?),
        AdminTask::Approve(id) => render_outcome("approve", &service.approve(id)?),
        AdminTask::Reject(id) => render_outcome("reject", &service.reject(id)?),
    };
    Ok(output)
}

fn render_pending(pending: &[Professional]) -> String {
    if pending.is_empty() {
        return "No registrations awaiting review".to_string();
    }

    let mut lines = vec![format!("{} registration(s) awaiting review", pending.len())];
    for professional in pending {
        let details = &professional.details;
        lines.push(format!(
            "- #{} {} ({}) at hospital {} | {} | submitted {}",
            professional.id,
            details.name,
            details.role,
            details.hospital_id,
            details.email.as_deref().unwrap_or("no email"),
            professional.created_at.format("%Y-%m-%d %H:%M UTC"),
        ));
    }
    lines.join("\n")
}

fn render_outcome(action: &str, outcome: &ModerationOutcome) -> String {
    let professional = outcome.professional();
    match outcome {
        ModerationOutcome::Applied(_) => format!(
            "#{} {} is now {}",
            professional.id, professional.details.name, professional.status
        ),
        ModerationOutcome::Unchanged(_) => format!(
            "#{} {} was already {}; nothing to {action}",
            professional.id, professional.details.name, professional.status
        ),
        ModerationOutcome::Removed(_) => format!(
            "#{} {} was removed from the directory",
            professional.id, professional.details.name
        ),
    }
}
