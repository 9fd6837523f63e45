pub mod payment;
pub mod pending;
pub mod profile;
pub mod subscription;
pub mod verification;

pub use payment::{CreatePayment, Payment, PaymentMethod, PaymentStatus, ReviewOutcome};
pub use pending::PendingPayment;
pub use profile::Profile;
pub use subscription::{CreateSubscription, Subscription, SubscriptionStatus};
pub use verification::{RecordVerification, VerificationAttempt};
