/// Relevance filtering of fetched videos
use crate::dataset::{ChannelDefinition, Member, Roster};
use crate::error::SyncError;
use crate::youtube::Video;
use crate::Result;
use std::collections::HashMap;
use tracing::debug;

/// Strip every whitespace character, counting a stray BOM as whitespace
pub fn remove_whitespace(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{feff}')
        .collect()
}

/// Whether the whitespace-stripped title or description contains `keyword`.
///
/// Title and description are checked separately so a match never spans the
/// boundary between them.
pub fn contains_keyword(video: &Video, keyword: &str) -> bool {
    let keyword = remove_whitespace(keyword);
    if keyword.is_empty() {
        return false;
    }
    remove_whitespace(video.title()).contains(&keyword)
        || remove_whitespace(video.description()).contains(&keyword)
}

/// Roster members whose name appears in the video text, in roster order
pub fn mentioned_members<'r>(video: &Video, roster: &'r Roster) -> Vec<&'r Member> {
    roster
        .members()
        .filter(|member| contains_keyword(video, &member.name))
        .collect()
}

/// Relevance policy for a single video whose channel definition is known
pub fn is_relevant(
    video: &Video,
    definition: &ChannelDefinition,
    roster: &Roster,
    group_name: &str,
) -> bool {
    if definition.is_official {
        return true;
    }
    if contains_keyword(video, group_name) {
        return true;
    }
    roster
        .members()
        .any(|member| contains_keyword(video, &member.name))
}

/// Applies `is_relevant` using the channel definitions to resolve each video's channel
pub struct RelevanceFilter<'a> {
    group_name: &'a str,
    definitions: HashMap<&'a str, &'a ChannelDefinition>,
    roster: &'a Roster,
}

impl<'a> RelevanceFilter<'a> {
    pub fn new(group_name: &'a str, definitions: &'a [ChannelDefinition], roster: &'a Roster) -> Self {
        Self {
            group_name,
            definitions: definitions
                .iter()
                .map(|d| (d.channel_id.as_str(), d))
                .collect(),
            roster,
        }
    }

    /// Fails with `UnknownChannelId` when the video's channel has no definition
    pub fn is_relevant(&self, video: &Video) -> Result<bool> {
        let definition = self.definitions.get(video.channel_id()).ok_or_else(|| {
            SyncError::UnknownChannelId {
                video_id: video.id.clone(),
                channel_id: video.channel_id().to_string(),
            }
        })?;
        Ok(is_relevant(video, definition, self.roster, self.group_name))
    }

    /// Keep the relevant videos, preserving input order
    pub fn filter(&self, videos: Vec<Video>) -> Result<Vec<Video>> {
        let total = videos.len();
        let mut relevant = Vec::with_capacity(total);
        for video in videos {
            if self.is_relevant(&video)? {
                relevant.push(video);
            }
        }
        debug!("{} of {} videos are relevant", relevant.len(), total);
        Ok(relevant)
    }
}
