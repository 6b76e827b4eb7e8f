/// Viewer-facing projections and the final output set
use crate::config::PathsConfig;
use crate::dataset::{Member, VideoTags};
use crate::dict::{stage_json, Dict};
use crate::tags::{suggestion_path, ChannelSuggestions};
use crate::youtube::{Channel, ChannelSnippet, Thumbnails, Video, VideoSnippet};
use crate::Result;
use tracing::info;

pub const MEMBERS_DICT_JSON: &str = "membersDict.json";
pub const CHANNELS_DICT_JSON: &str = "channelsDict.json";
pub const VIDEOS_DICT_JSON: &str = "videosDict.json";
pub const TAGS_DICT_JSON: &str = "tagsDict.json";

// The projections below list the fields the viewer reads. Keep them in step
// with the wire types in `youtube` when those change.

/// Channel with only the default thumbnail
pub fn channel_for_save(channel: &Channel) -> Channel {
    Channel {
        id: channel.id.clone(),
        snippet: ChannelSnippet {
            title: channel.snippet.title.clone(),
            description: channel.snippet.description.clone(),
            thumbnails: Thumbnails {
                default: channel.snippet.thumbnails.default.clone(),
                ..Thumbnails::default()
            },
        },
        content_details: channel.content_details.clone(),
    }
}

/// Video with only the medium thumbnail
pub fn video_for_save(video: &Video) -> Video {
    Video {
        id: video.id.clone(),
        snippet: VideoSnippet {
            published_at: video.snippet.published_at.clone(),
            channel_id: video.snippet.channel_id.clone(),
            title: video.snippet.title.clone(),
            description: video.snippet.description.clone(),
            thumbnails: Thumbnails {
                medium: video.snippet.thumbnails.medium.clone(),
                ..Thumbnails::default()
            },
        },
        content_details: video.content_details.clone(),
    }
}

/// Tag entry without the curator-facing title
pub fn video_tags_for_save(tags: &VideoTags) -> VideoTags {
    VideoTags {
        title: None,
        video_id: tags.video_id.clone(),
        tags: tags.tags.clone(),
    }
}

/// Every file a successful run writes
#[derive(Debug, Default)]
pub struct OutputSet {
    pub members: Dict<Member>,
    pub channels: Dict<Channel>,
    pub videos: Dict<Video>,
    pub tags: Dict<VideoTags>,
    pub suggestions: Vec<ChannelSuggestions>,
}

impl OutputSet {
    pub fn untagged_count(&self) -> usize {
        self.suggestions.iter().map(|s| s.suggestions.len()).sum()
    }

    /// Write the viewer dictionaries and one suggestion file per channel.
    ///
    /// Every file is staged before the first one is replaced, so a failed
    /// serialization or write leaves all previous outputs in place.
    pub fn write(&self, paths: &PathsConfig) -> Result<()> {
        let public = &paths.public_dir;
        let mut staged = vec![
            stage_json(&public.join(MEMBERS_DICT_JSON), &self.members)?,
            stage_json(&public.join(CHANNELS_DICT_JSON), &self.channels)?,
            stage_json(&public.join(VIDEOS_DICT_JSON), &self.videos)?,
            stage_json(&public.join(TAGS_DICT_JSON), &self.tags)?,
        ];
        for group in &self.suggestions {
            staged.push(stage_json(
                &suggestion_path(&paths.tags_dir, &group.channel_id),
                &group.suggestions,
            )?);
        }

        for file in staged {
            file.commit()?;
        }

        info!(
            "💾 Wrote {} members, {} channels, {} videos, {} tags to {}",
            self.members.len(),
            self.channels.len(),
            self.videos.len(),
            self.tags.len(),
            public.display()
        );

        if !self.suggestions.is_empty() {
            info!(
                "📝 Wrote {} untagged suggestions across {} channels",
                self.untagged_count(),
                self.suggestions.len()
            );
        }
        Ok(())
    }
}
