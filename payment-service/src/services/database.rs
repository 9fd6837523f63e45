//! Database service for payment-service.

use crate::models::{
    CreatePayment, CreateSubscription, Payment, PaymentMethod, PaymentStatus, PendingPayment,
    Profile, RecordVerification, ReviewOutcome, Subscription, SubscriptionStatus,
    VerificationAttempt,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{DateTime, Duration, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};
use uuid::Uuid;

/// Review-queue reason recorded for manual receipt uploads.
pub const MANUAL_RECEIPT_REASON: &str = "Manual Receipt Upload";

/// Outcome of a reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationResult {
    /// The payment was settled and, for approvals, the subscription
    /// activated with the given expiry.
    Applied { expiry: Option<DateTime<Utc>> },
    /// The payment was already terminal; nothing was changed.
    AlreadyFinal,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "payment-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .idle_timeout(std::time::Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Create a pending subscription and its paired payment atomically.
    ///
    /// Both rows commit together or neither does. Receipt uploads additionally
    /// enqueue a review entry inside the same transaction.
    #[instrument(skip(self, subscription, payment), fields(user_id = %subscription.user_id))]
    pub async fn create_submission(
        &self,
        subscription: &CreateSubscription,
        payment: &CreatePayment,
    ) -> Result<(Subscription, Payment), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_submission"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let subscription_id = Uuid::new_v4();
        let created_subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (subscription_id, user_id, plan, duration_months, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING subscription_id, user_id, plan, duration_months, status, expiry_date, created_utc, updated_utc
            "#,
        )
        .bind(subscription_id)
        .bind(subscription.user_id)
        .bind(&subscription.plan)
        .bind(subscription.duration_months)
        .bind(SubscriptionStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create subscription: {}", e))
        })?;

        let payment_id = Uuid::new_v4();
        let created_payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (payment_id, user_id, subscription_id, amount_usd, method, tx_id, receipt_url, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING payment_id, user_id, subscription_id, amount_usd, method, tx_id, receipt_url, status, created_utc, updated_utc
            "#,
        )
        .bind(payment_id)
        .bind(subscription.user_id)
        .bind(subscription_id)
        .bind(payment.amount_usd)
        .bind(payment.method.as_str())
        .bind(&payment.tx_id)
        .bind(&payment.receipt_url)
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create payment: {}", e)))?;

        if payment.method == PaymentMethod::Receipt {
            sqlx::query(
                r#"
                INSERT INTO pending_payments (pending_id, payment_id, user_id, reason)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(payment_id)
            .bind(subscription.user_id)
            .bind(MANUAL_RECEIPT_REASON)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to enqueue review entry: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit submission: {}", e))
        })?;

        timer.observe_duration();
        info!(
            subscription_id = %created_subscription.subscription_id,
            payment_id = %created_payment.payment_id,
            method = %created_payment.method,
            "Submission created"
        );

        Ok((created_subscription, created_payment))
    }

    /// Flag a payment for operator review, recording the reason.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn flag_for_review(
        &self,
        payment_id: Uuid,
        user_id: Uuid,
        reason: &str,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["flag_for_review"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query(
            "UPDATE payments SET status = $1, updated_utc = now() WHERE payment_id = $2",
        )
        .bind(PaymentStatus::NeedsReview.as_str())
        .bind(payment_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to flag payment: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO pending_payments (pending_id, payment_id, user_id, reason)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment_id)
        .bind(user_id)
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to enqueue review entry: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit review flag: {}", e))
        })?;

        timer.observe_duration();
        Ok(())
    }

    // =========================================================================
    // Verification audit trail
    // =========================================================================

    /// Append one verification attempt to the audit trail.
    #[instrument(skip(self, record), fields(txid = %record.txid, verified = record.verified))]
    pub async fn record_verification_attempt(
        &self,
        record: &RecordVerification,
    ) -> Result<VerificationAttempt, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_verification_attempt"])
            .start_timer();

        let attempt = sqlx::query_as::<_, VerificationAttempt>(
            r#"
            INSERT INTO tx_verifications (attempt_id, txid, platform_address, amount_usdt, verified, raw_response)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING attempt_id, txid, platform_address, amount_usdt, verified, raw_response, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.txid)
        .bind(&record.platform_address)
        .bind(record.amount_usdt)
        .bind(record.verified)
        .bind(&record.raw_response)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to record verification attempt: {}",
                e
            ))
        })?;

        timer.observe_duration();
        Ok(attempt)
    }

    /// List verification attempts for a transaction id, newest first.
    #[instrument(skip(self))]
    pub async fn list_verification_attempts(
        &self,
        txid: &str,
    ) -> Result<Vec<VerificationAttempt>, AppError> {
        let attempts = sqlx::query_as::<_, VerificationAttempt>(
            r#"
            SELECT attempt_id, txid, platform_address, amount_usdt, verified, raw_response, created_utc
            FROM tx_verifications
            WHERE txid = $1
            ORDER BY created_utc DESC
            "#,
        )
        .bind(txid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list attempts: {}", e))
        })?;

        Ok(attempts)
    }

    // =========================================================================
    // Payments and review queue
    // =========================================================================

    /// Get a payment by ID.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, user_id, subscription_id, amount_usd, method, tx_id, receipt_url, status, created_utc, updated_utc
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        timer.observe_duration();
        Ok(payment)
    }

    /// List payments awaiting a decision, oldest first.
    #[instrument(skip(self))]
    pub async fn list_review_queue(&self) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_review_queue"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, user_id, subscription_id, amount_usd, method, tx_id, receipt_url, status, created_utc, updated_utc
            FROM payments
            WHERE status IN ('pending', 'waiting', 'needs_review')
            ORDER BY created_utc ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list review queue: {}", e))
        })?;

        timer.observe_duration();
        Ok(payments)
    }

    /// List review-queue entries for a payment.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn list_pending_entries(
        &self,
        payment_id: Uuid,
    ) -> Result<Vec<PendingPayment>, AppError> {
        let entries = sqlx::query_as::<_, PendingPayment>(
            r#"
            SELECT pending_id, payment_id, user_id, reason, created_utc
            FROM pending_payments
            WHERE payment_id = $1
            ORDER BY created_utc ASC
            "#,
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list pending entries: {}", e))
        })?;

        Ok(entries)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Settle a payment and, on approval, activate the user's subscription.
    ///
    /// Expiry uses fixed 30-day months, not calendar months. The payment row
    /// is locked for the duration of the transaction and terminal payments
    /// make the call a no-op, so a double approval cannot extend the expiry
    /// twice.
    #[instrument(skip(self), fields(payment_id = %payment_id, outcome = outcome.as_str()))]
    pub async fn apply_reconciliation(
        &self,
        payment_id: Uuid,
        months: i32,
        outcome: ReviewOutcome,
    ) -> Result<ReconciliationResult, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_reconciliation"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, user_id, subscription_id, amount_usd, method, tx_id, receipt_url, status, created_utc, updated_utc
            FROM payments
            WHERE payment_id = $1
            FOR UPDATE
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock payment: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;

        if PaymentStatus::from_string(&payment.status).is_terminal() {
            tx.rollback().await.ok();
            timer.observe_duration();
            info!(
                payment_id = %payment_id,
                status = %payment.status,
                "Payment already settled, skipping reconciliation"
            );
            return Ok(ReconciliationResult::AlreadyFinal);
        }

        let expiry = match outcome {
            ReviewOutcome::Approved => {
                // Fixed 30-day month approximation, matching the published
                // subscription terms.
                let expiry = Utc::now() + Duration::days(30 * i64::from(months));

                sqlx::query(
                    r#"
                    INSERT INTO profiles (user_id, subscription_tier, subscription_status, subscription_expiry_date, updated_utc)
                    VALUES ($1, 'Premium', 'Active', $2, now())
                    ON CONFLICT (user_id) DO UPDATE
                    SET subscription_tier = 'Premium',
                        subscription_status = 'Active',
                        subscription_expiry_date = $2,
                        updated_utc = now()
                    "#,
                )
                .bind(payment.user_id)
                .bind(expiry)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to update profile: {}", e))
                })?;

                sqlx::query(
                    r#"
                    UPDATE subscriptions
                    SET status = $1, expiry_date = $2, updated_utc = now()
                    WHERE subscription_id = $3
                    "#,
                )
                .bind(SubscriptionStatus::Active.as_str())
                .bind(expiry)
                .bind(payment.subscription_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to activate subscription: {}",
                        e
                    ))
                })?;

                sqlx::query(
                    "UPDATE payments SET status = $1, updated_utc = now() WHERE payment_id = $2",
                )
                .bind(PaymentStatus::Succeeded.as_str())
                .bind(payment_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to settle payment: {}", e))
                })?;

                Some(expiry)
            }
            ReviewOutcome::Rejected => {
                // Profile and subscription are left untouched on rejection.
                sqlx::query(
                    "UPDATE payments SET status = $1, updated_utc = now() WHERE payment_id = $2",
                )
                .bind(PaymentStatus::Failed.as_str())
                .bind(payment_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to settle payment: {}", e))
                })?;

                None
            }
        };

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit reconciliation: {}", e))
        })?;

        timer.observe_duration();
        info!(
            payment_id = %payment_id,
            user_id = %payment.user_id,
            outcome = outcome.as_str(),
            "Reconciliation applied"
        );

        Ok(ReconciliationResult::Applied { expiry })
    }

    // =========================================================================
    // Subscriptions and profiles
    // =========================================================================

    /// Get the user's currently active subscription, if any. Expiry is
    /// evaluated at read time.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_active_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_active_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, user_id, plan, duration_months, status, expiry_date, created_utc, updated_utc
            FROM subscriptions
            WHERE user_id = $1 AND status = 'active' AND expiry_date > now()
            ORDER BY expiry_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e))
        })?;

        timer.observe_duration();
        Ok(subscription)
    }

    /// Get a subscription by ID.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn get_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, user_id, plan, duration_months, status, expiry_date, created_utc, updated_utc
            FROM subscriptions
            WHERE subscription_id = $1
            "#,
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e))
        })?;

        Ok(subscription)
    }

    /// Get a user's profile.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT user_id, subscription_tier, subscription_status, subscription_expiry_date, updated_utc
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get profile: {}", e)))?;

        Ok(profile)
    }
}
