//! 工具模块：通用辅助能力
pub mod version_extractor;
pub mod header_converter;
pub mod detection_updater;

pub use self::version_extractor::VersionExtractor;
pub use self::header_converter::HeaderConverter;
pub use self::detection_updater::{DetectionUpdater, TechHits};
