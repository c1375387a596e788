//! # Cashier Session Repository
//!
//! One row per shift. A partial unique index allows a single `active` row
//! per cashier, so two tills racing to open a shift for the same cashier
//! cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kedai_core::{CashierSession, SessionStatus};

const SESSION_COLUMNS: &str = r#"
    id, cashier_id, cashier_name, outlet_id, outlet_name, started_at,
    initial_cash, status, ended_at, counted_cash, expected_cash, variance
"#;

#[derive(Debug, Clone)]
pub struct CashierSessionRepository {
    pool: SqlitePool,
}

impl CashierSessionRepository {
    /// Creates a new CashierSessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashierSessionRepository { pool }
    }

    /// Stores a freshly opened session.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` on `cashier_sessions.cashier_id` -
    ///   the cashier already has an active session
    pub async fn open(&self, session: &CashierSession) -> DbResult<()> {
        debug!(
            id = %session.id,
            cashier_id = %session.cashier_id,
            outlet_id = %session.outlet_id,
            "Opening cashier session"
        );

        sqlx::query(
            r#"
            INSERT INTO cashier_sessions (
                id, cashier_id, cashier_name, outlet_id, outlet_name,
                started_at, initial_cash, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&session.id)
        .bind(&session.cashier_id)
        .bind(&session.cashier_name)
        .bind(&session.outlet_id)
        .bind(&session.outlet_name)
        .bind(session.started_at)
        .bind(session.initial_cash)
        .bind(session.status)
        .execute(&self.pool)
        .await?;

        info!(id = %session.id, cashier_id = %session.cashier_id, "Cashier session opened");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashierSession>> {
        let session = sqlx::query_as::<_, CashierSession>(&format!(
            "SELECT {} FROM cashier_sessions WHERE id = ?1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// The cashier's active session, if any.
    pub async fn find_active(&self, cashier_id: &str) -> DbResult<Option<CashierSession>> {
        let session = sqlx::query_as::<_, CashierSession>(&format!(
            "SELECT {} FROM cashier_sessions WHERE cashier_id = ?1 AND status = ?2",
            SESSION_COLUMNS
        ))
        .bind(cashier_id)
        .bind(SessionStatus::Active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Records the closing figures.
    ///
    /// The update only applies while the row is still active.
    ///
    /// ## Returns
    /// * `Ok(true)` - the session was closed by this call
    /// * `Ok(false)` - it was already closed (a concurrent close won)
    /// * `Err(DbError::NotFound)` - no such session
    pub async fn close(&self, session: &CashierSession) -> DbResult<bool> {
        debug!(id = %session.id, variance = ?session.variance, "Closing cashier session");

        let result = sqlx::query(
            r#"
            UPDATE cashier_sessions SET
                status = ?2,
                ended_at = ?3,
                counted_cash = ?4,
                expected_cash = ?5,
                variance = ?6
            WHERE id = ?1 AND status = ?7
            "#,
        )
        .bind(&session.id)
        .bind(session.status)
        .bind(session.ended_at)
        .bind(session.counted_cash)
        .bind(session.expected_cash)
        .bind(session.variance)
        .bind(SessionStatus::Active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(&session.id).await? {
                Some(_) => Ok(false),
                None => Err(DbError::not_found("CashierSession", &session.id)),
            };
        }

        info!(
            id = %session.id,
            variance = ?session.variance,
            "Cashier session closed"
        );
        Ok(true)
    }

    /// Sessions at an outlet started from `since` onwards, newest first.
    pub async fn list_for_outlet(
        &self,
        outlet_id: &str,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<CashierSession>> {
        let sessions = sqlx::query_as::<_, CashierSession>(&format!(
            "SELECT {} FROM cashier_sessions WHERE outlet_id = ?1 AND started_at >= ?2 ORDER BY started_at DESC",
            SESSION_COLUMNS
        ))
        .bind(outlet_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, noon, outlet};
    use chrono::Duration;
    use kedai_core::{close_session, open_session, CashierRef, Money};

    fn cashier(id: &str) -> CashierRef {
        CashierRef {
            id: id.to_string(),
            name: format!("Kasir {}", id),
        }
    }

    #[tokio::test]
    async fn test_open_and_find_active() {
        let db = memory_db().await;
        let session =
            open_session(&cashier("c1"), &outlet(), Money::from_units(500_000), noon()).unwrap();
        db.sessions().open(&session).await.unwrap();

        let active = db.sessions().find_active("c1").await.unwrap().unwrap();
        assert_eq!(active, session);
        assert!(db.sessions().find_active("c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_active_session_rejected() {
        let db = memory_db().await;
        let first =
            open_session(&cashier("c1"), &outlet(), Money::from_units(100_000), noon()).unwrap();
        let second =
            open_session(&cashier("c1"), &outlet(), Money::from_units(200_000), noon()).unwrap();

        db.sessions().open(&first).await.unwrap();
        let err = db.sessions().open(&second).await.unwrap_err();
        assert!(err.is_unique_violation_on("cashier_id"));
    }

    #[tokio::test]
    async fn test_close_then_reopen() {
        let db = memory_db().await;
        let session =
            open_session(&cashier("c1"), &outlet(), Money::from_units(500_000), noon()).unwrap();
        db.sessions().open(&session).await.unwrap();

        let later = noon() + Duration::hours(8);
        let (closed, _) =
            close_session(&session, &[], &[], Money::from_units(480_000), later).unwrap();
        assert!(db.sessions().close(&closed).await.unwrap());
        // second close is a no-op
        assert!(!db.sessions().close(&closed).await.unwrap());

        let stored = db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Closed);
        assert_eq!(stored.variance, Some(Money::from_units(-20_000)));
        assert_eq!(stored.ended_at, Some(later));
        assert!(db.sessions().find_active("c1").await.unwrap().is_none());

        let next = open_session(&cashier("c1"), &outlet(), Money::zero(), later).unwrap();
        db.sessions().open(&next).await.unwrap();

        let listed = db
            .sessions()
            .list_for_outlet("outlet-1", noon() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, next.id);
    }

    #[tokio::test]
    async fn test_close_unknown_session() {
        let db = memory_db().await;
        let session = open_session(&cashier("c1"), &outlet(), Money::zero(), noon()).unwrap();
        let (closed, _) = close_session(&session, &[], &[], Money::zero(), noon()).unwrap();

        let err = db.sessions().close(&closed).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
