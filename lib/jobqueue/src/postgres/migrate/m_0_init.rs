use chroma_migrate::Migration;

pub(super) struct MigrationStep {}

#[async_trait::async_trait]
impl Migration for MigrationStep {
	fn name(&self) -> &str {
		"m_0_init"
	}

	async fn up(&self, conn: &mut sqlx::PgConnection) -> Result<(), sqlx::Error> {
		sqlx::query(
			"
			CREATE TABLE jobs (
				id TEXT PRIMARY KEY,

				created_at TIMESTAMPTZ NOT NULL,
				started_at TIMESTAMPTZ,
				finished_at TIMESTAMPTZ,
				lease_expires_at TIMESTAMPTZ,

				status TEXT NOT NULL,
				attempt BIGINT NOT NULL DEFAULT 0,

				operations JSONB NOT NULL,
				input BYTEA NOT NULL,
				input_mime TEXT NOT NULL,

				current_step BIGINT,
				total_steps BIGINT,
				current_operation_type TEXT,

				error JSONB,
				result BYTEA,
				result_mime TEXT
			);
			",
		)
		.execute(&mut *conn)
		.await?;

		sqlx::query("CREATE INDEX idx_jobs_created_at on jobs(created_at);")
			.execute(&mut *conn)
			.await?;

		sqlx::query("CREATE INDEX idx_jobs_status on jobs(status);")
			.execute(&mut *conn)
			.await?;

		return Ok(());
	}
}
