//! Domain services. Each service owns the SQL for its entity and takes the
//! authenticated principal explicitly on every scoped operation.

pub mod achievement_service;
pub mod analytics_service;
pub mod export_service;
pub mod goal_service;
pub mod records_service;
pub mod user_service;

pub use achievement_service::AchievementService;
pub use analytics_service::AnalyticsService;
pub use export_service::{ExportService, MediaPathGenerator};
pub use goal_service::GoalService;
pub use records_service::{DateWindow, RecordsService};
pub use user_service::UserService;
