use chroma_migrate::Migration;

mod m_0_init;

/// Schema migrations for the job queue, oldest first
pub(super) const MIGRATE_STEPS: &[&dyn Migration] = &[&m_0_init::MigrationStep {}];
