/// Sakamichi Sync - YouTube metadata pipeline for a fan viewer
///
/// Pulls channel and video metadata from the YouTube Data API, keeps the videos
/// that concern the idol group, reconciles them with hand-curated member tags and
/// writes the static JSON dictionaries the viewer reads.

pub mod cache;
pub mod config;
pub mod dataset;
pub mod dict;
pub mod error;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod tags;
pub mod youtube;

// Re-export main types for easy access
pub use crate::cache::LocalStore;
pub use crate::config::{Config, ConfigBuilder};
pub use crate::dataset::{ChannelDefinition, Dataset, Member, Roster, VideoTags};
pub use crate::dict::Dict;
pub use crate::error::SyncError;
pub use crate::filter::RelevanceFilter;
pub use crate::output::OutputSet;
pub use crate::pipeline::{Pipeline, PipelineStage, RunSummary, Source};
pub use crate::youtube::{Channel, MetadataClient, Video, YoutubeApi};

pub type Result<T> = std::result::Result<T, SyncError>;
