/// Tag reconciliation: curated tag files, untagged suggestions and tag ordering
use crate::dataset::{Roster, VideoTags};
use crate::dict::{load_json, Dict};
use crate::error::SyncError;
use crate::filter::mentioned_members;
use crate::youtube::Video;
use crate::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Curated per-channel tag dictionaries
pub const TAGS_DICT_SUFFIX: &str = "_tagsDict.json";

/// Generated per-channel suggestion dictionaries
pub const UNTAGS_DICT_SUFFIX: &str = "_untagsDict.json";

/// Files directly inside `dir` whose name ends with `suffix`, sorted by name
pub fn list_files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            SyncError::io(path, e.into())
        })?;
        let matches = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.ends_with(suffix));
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Union of every curated tag file.
///
/// Entries must be keyed by their own `videoId`, and a video tagged in two
/// files is an error.
pub async fn load_curated_tags(tags_dir: &Path) -> Result<Dict<VideoTags>> {
    let mut tags = Dict::new();
    for path in list_files_with_suffix(tags_dir, TAGS_DICT_SUFFIX)? {
        let file_tags: Dict<VideoTags> = load_json(&path).await?;
        debug!("{} tagged videos in {}", file_tags.len(), path.display());
        if let Some((key, value)) = file_tags.iter().find(|(key, value)| *key != value.video_id) {
            return Err(SyncError::TagKeyMismatch {
                path: path.clone(),
                key: key.to_string(),
                video_id: value.video_id.clone(),
            });
        }
        tags.extend_unique(file_tags)?;
    }
    Ok(tags)
}

/// Remove every generated suggestion file, returning how many were deleted
pub fn delete_suggestions(tags_dir: &Path) -> Result<usize> {
    let files = list_files_with_suffix(tags_dir, UNTAGS_DICT_SUFFIX)?;
    for path in &files {
        std::fs::remove_file(path).map_err(|e| SyncError::io(path, e))?;
        debug!("🗑️ Removed {}", path.display());
    }
    if !files.is_empty() {
        info!("🧹 Deleted {} stale *{} files", files.len(), UNTAGS_DICT_SUFFIX);
    }
    Ok(files.len())
}

pub fn suggestion_path(tags_dir: &Path, channel_id: &str) -> PathBuf {
    tags_dir.join(format!("{}{}", channel_id, UNTAGS_DICT_SUFFIX))
}

/// Videos that have no entry in the tag dictionary, in input order
pub fn untagged_videos<'v, I>(videos: I, tags: &Dict<VideoTags>) -> Vec<&'v Video>
where
    I: IntoIterator<Item = &'v Video>,
{
    videos
        .into_iter()
        .filter(|v| !tags.contains_key(&v.id))
        .collect()
}

/// Default tags for an untagged video: every roster member its text mentions
pub fn suggest_tags(video: &Video, roster: &Roster) -> VideoTags {
    VideoTags {
        title: Some(video.title().to_string()),
        video_id: video.id.clone(),
        tags: mentioned_members(video, roster)
            .into_iter()
            .map(|m| m.name.clone())
            .collect(),
    }
}

/// Suggestions for every video absent from `tags`
pub fn compute_untagged<'v, I>(videos: I, tags: &Dict<VideoTags>, roster: &Roster) -> Vec<VideoTags>
where
    I: IntoIterator<Item = &'v Video>,
{
    untagged_videos(videos, tags)
        .into_iter()
        .map(|video| suggest_tags(video, roster))
        .collect()
}

/// Suggestions of one channel, written to one file
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSuggestions {
    pub channel_id: String,
    pub suggestions: Dict<VideoTags>,
}

/// Run `compute_untagged` per channel, ordered by channel id.
///
/// Channels whose videos are all tagged get no entry.
pub fn build_channel_suggestions(
    videos: &[Video],
    tags: &Dict<VideoTags>,
    roster: &Roster,
) -> Result<Vec<ChannelSuggestions>> {
    let mut by_channel: BTreeMap<&str, Vec<&Video>> = BTreeMap::new();
    for video in videos {
        by_channel.entry(video.channel_id()).or_default().push(video);
    }

    let mut grouped = Vec::new();
    for (channel_id, channel_videos) in by_channel {
        let untagged = compute_untagged(channel_videos, tags, roster);
        if untagged.is_empty() {
            continue;
        }
        grouped.push(ChannelSuggestions {
            channel_id: channel_id.to_string(),
            suggestions: Dict::from_items(untagged, |t| &t.video_id)?,
        });
    }
    Ok(grouped)
}

/// Order tag names by member batch then order.
///
/// A name missing from the roster is a curation error and is reported with
/// the video id and the full tag list.
pub fn sort_tags(video_id: &str, tags: &[String], roster: &Roster) -> Result<Vec<String>> {
    let mut keyed = Vec::with_capacity(tags.len());
    for tag in tags {
        let member = roster
            .get(tag)
            .ok_or_else(|| SyncError::MissingRosterMember {
                video_id: video_id.to_string(),
                tags: tags.to_vec(),
                unknown: tag.clone(),
            })?;
        keyed.push(((member.batch, member.order), tag.clone()));
    }
    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, tag)| tag).collect())
}

/// Apply `sort_tags` to every entry of a tag dictionary
pub fn sort_tag_dict(tags: Dict<VideoTags>, roster: &Roster) -> Result<Dict<VideoTags>> {
    tags.try_map_values(|_, mut entry| {
        entry.tags = sort_tags(&entry.video_id, &entry.tags, roster)?;
        Ok(entry)
    })
}
