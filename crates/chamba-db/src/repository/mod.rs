//! SurrealDB repository implementations.

mod account;
mod group;
mod profile;
mod user_type;

use chamba_core::error::ChambaError;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

pub use account::SurrealAccountRepository;
pub use group::SurrealPermissionGroupRepository;
pub use profile::SurrealProfileRepository;
pub use user_type::SurrealUserTypeRepository;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value)
        .map_err(|e| DbError::InvalidData(format!("invalid UUID {value}: {e}")))
}

fn parse_optional_uuid(value: Option<&str>) -> Result<Option<Uuid>, DbError> {
    value.map(parse_uuid).transpose()
}

/// Classify the statement errors of a failed write.
///
/// Inside a transaction every statement reports an error, but only the one
/// that failed carries the cause, so all of them are inspected. Unique-index
/// and duplicate-id violations become `AlreadyExists`; anything else is a
/// database error.
fn write_error(entity: &str, errors: impl IntoIterator<Item = surrealdb::Error>) -> ChambaError {
    let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();

    if let Some(conflict) = messages.iter().find(|m| is_conflict(m)) {
        return ChambaError::AlreadyExists {
            entity: format!("{entity} ({conflict})"),
        };
    }

    let cause = messages
        .iter()
        .find(|m| !m.contains("not executed due to a failed transaction"))
        .or(messages.first())
        .cloned()
        .unwrap_or_else(|| format!("write to {entity} failed"));
    ChambaError::Database(cause)
}

fn is_conflict(message: &str) -> bool {
    message.contains("already contains") || message.contains("already exists")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_detection_matches_index_and_id_violations() {
        assert!(is_conflict(
            "Database index `idx_user_type_name` already contains 'Beta', with record `user_type:x`"
        ));
        assert!(is_conflict("Database record `perm_group:abc` already exists"));
        assert!(!is_conflict(
            "Found 'x' for field `created_at`, but expected a datetime"
        ));
        assert!(!is_conflict(
            "The query was not executed due to a failed transaction"
        ));
    }

    #[test]
    fn no_errors_still_reports_the_entity() {
        let err = write_error("user_type", std::iter::empty());
        assert!(matches!(err, ChambaError::Database(msg) if msg.contains("user_type")));
    }
}
