use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::AuditLog;
use crate::store::Repository;

pub async fn log_audit(
    audit_logs: &Repository<AuditLog>,
    actor: Option<&str>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let entry = AuditLog {
        audit_id: Uuid::new_v4(),
        actor: actor.map(str::to_string),
        action: action.to_string(),
        resource: resource.map(str::to_string),
        metadata,
        created_at: Utc::now(),
    };
    audit_logs.create(entry, None).await?;
    Ok(())
}
