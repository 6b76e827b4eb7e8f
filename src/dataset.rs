/// Hand-curated inputs: channel definitions, member roster, exclude lists, tags
use crate::config::PathsConfig;
use crate::dict::{load_json, load_json_or_default, Dict};
use crate::tags::load_curated_tags;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// A channel the sync should look at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDefinition {
    pub name: String,
    pub channel_id: String,
    /// Every video of an official channel is relevant
    pub is_official: bool,
    /// Invalid channels are skipped entirely
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub batch: u32,
    pub order: u32,
    pub graduated: bool,
}

/// Curated member tags of a single video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub video_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Member roster keyed by name, in file order
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: Dict<Member>,
}

impl Roster {
    pub fn new(members: Vec<Member>) -> Result<Self> {
        Ok(Self {
            members: Dict::from_items(members, |m| &m.name)?,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn as_dict(&self) -> &Dict<Member> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Video ids manually blacklisted for one channel
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ExcludeList {
    ids: HashSet<String>,
}

impl ExcludeList {
    pub fn contains(&self, video_id: &str) -> bool {
        self.ids.contains(video_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<String> for ExcludeList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Everything a run reads but never writes
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub channel_definitions: Vec<ChannelDefinition>,
    pub roster: Roster,
    pub tags: Dict<VideoTags>,
    pub excludes: HashMap<String, ExcludeList>,
}

impl Dataset {
    /// Load all curated inputs
    pub async fn load(paths: &PathsConfig) -> Result<Self> {
        let channel_definitions: Vec<ChannelDefinition> =
            load_json(&paths.channel_definitions_file()).await?;
        let members: Vec<Member> = load_json(&paths.members_file()).await?;
        let roster = Roster::new(members)?;
        let tags = load_curated_tags(&paths.tags_dir).await?;

        let mut excludes = HashMap::new();
        for definition in channel_definitions.iter().filter(|d| d.is_valid) {
            let list = load_exclude_list(&paths.exclude_dir, &definition.channel_id).await?;
            if !list.is_empty() {
                debug!("{} excluded ids for {}", list.len(), definition.channel_id);
            }
            excludes.insert(definition.channel_id.clone(), list);
        }

        info!(
            "📚 Loaded {} channel definitions, {} members, {} tagged videos",
            channel_definitions.len(),
            roster.len(),
            tags.len()
        );

        Ok(Self {
            channel_definitions,
            roster,
            tags,
            excludes,
        })
    }

    /// Ids of the channels marked valid, in definition order
    pub fn valid_channel_ids(&self) -> Vec<String> {
        self.channel_definitions
            .iter()
            .filter(|d| d.is_valid)
            .map(|d| d.channel_id.clone())
            .collect()
    }

    pub fn definition(&self, channel_id: &str) -> Option<&ChannelDefinition> {
        self.channel_definitions
            .iter()
            .find(|d| d.channel_id == channel_id)
    }

    pub fn is_excluded(&self, channel_id: &str, video_id: &str) -> bool {
        self.excludes
            .get(channel_id)
            .map_or(false, |list| list.contains(video_id))
    }

    /// Excluded on any channel; used where the owning channel is unknown
    pub fn is_excluded_anywhere(&self, video_id: &str) -> bool {
        self.excludes.values().any(|list| list.contains(video_id))
    }
}

/// `<exclude_dir>/<channelId>_exclude.json`, a JSON array of video ids
pub async fn load_exclude_list(exclude_dir: &Path, channel_id: &str) -> Result<ExcludeList> {
    let path = exclude_dir.join(format!("{}_exclude.json", channel_id));
    load_json_or_default(&path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn member(name: &str, batch: u32, order: u32) -> Member {
        Member {
            name: name.to_string(),
            batch,
            order,
            graduated: false,
        }
    }

    #[test]
    fn test_roster_rejects_duplicate_names() {
        let result = Roster::new(vec![member("Yui", 1, 1), member("Yui", 2, 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_channel_definition_wire_format() {
        let json = r#"{"name": "Official", "channelId": "C1", "isOfficial": true, "isValid": false}"#;
        let definition: ChannelDefinition = serde_json::from_str(json).unwrap();

        assert_eq!(definition.channel_id, "C1");
        assert!(definition.is_official);
        assert!(!definition.is_valid);
    }

    #[test]
    fn test_video_tags_without_title_omits_field() {
        let tags = VideoTags {
            title: None,
            video_id: "v1".to_string(),
            tags: vec!["Yui".to_string()],
        };
        let json = serde_json::to_string(&tags).unwrap();

        assert_eq!(json, r#"{"videoId":"v1","tags":["Yui"]}"#);
    }

    #[tokio::test]
    async fn test_load_exclude_list() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("C1_exclude.json"), r#"["v1", "v2"]"#).unwrap();

        let list = load_exclude_list(temp_dir.path(), "C1").await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains("v2"));

        let missing = load_exclude_list(temp_dir.path(), "C2").await.unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_exclusion_is_per_channel() {
        let mut dataset = Dataset::default();
        dataset
            .excludes
            .insert("C1".to_string(), vec!["v1".to_string()].into_iter().collect());

        assert!(dataset.is_excluded("C1", "v1"));
        assert!(!dataset.is_excluded("C2", "v1"));
        assert!(dataset.is_excluded_anywhere("v1"));
    }
}
