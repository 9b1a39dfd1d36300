pub mod context;
pub mod loader;
pub mod logging;
pub mod rules;
pub mod settings;

pub use context::{AnalysisContext, ContextError};
pub use loader::{TransactionLoader, TransactionLoaderError, TransactionRecord};
pub use logging::{LoggingError, init_logging};
pub use rules::{JsonRuleRepository, RuleBook, RuleBookError};
pub use settings::{SettingsError, load_settings, parse_settings};
