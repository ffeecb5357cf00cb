//! TypedJob trait - ties a job type string to a payload type.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A payload type bound to one job type.
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct WelcomeEmail {
///     user_id: i64,
/// }
///
/// impl TypedJob for WelcomeEmail {
///     const TYPE: &'static str = "notifications.welcome_email";
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: encoded into the job payload on enqueue
/// - `DeserializeOwned`: decoded from the payload before the handler runs
/// - `Send + Sync + 'static`: handlers live behind `Arc`
pub trait TypedJob: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;
}
