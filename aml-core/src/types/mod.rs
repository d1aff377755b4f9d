//! Shared value types used across the crate.

pub mod config;
pub mod entities;
pub mod ids;
pub mod value;

pub use config::{AgentOverride, AmlConfig, ConfigError};
pub use entities::{
    AgentProfile, Approach, BackupDescriptor, BackupFileEntry, BackupType, ComplexityLevel,
    Conditions, Decision, Evolution, Fix, Metrics, Pattern, PatternBody, Problem, QTableEntry,
    Solution, TimeSeriesPoint,
};
pub use ids::{AgentName, ProjectId};
pub use value::{Value, ValueMap};
