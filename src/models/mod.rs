use serde::{Deserialize, Deserializer, Serialize};

/// One entry of the project navigation bar (`_nav.json`).
///
/// The server groups tools of the same type once their count exceeds the
/// grouping threshold; such a group comes back as an entry with `children`
/// and, usually, no mount point of its own.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct NavEntry {
    pub name: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub mount_point: Option<String>,

    #[serde(default)]
    pub ordinal: i64,

    #[serde(default)]
    pub is_anchored: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_name: String,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NavEntry>>,
}

impl NavEntry {
    /// Lookup key within a sibling list: the mount point, or the name for groups.
    pub fn key(&self) -> &str {
        self.mount_point.as_deref().unwrap_or(&self.name)
    }

    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }
}

pub(crate) const DEFAULT_GROUPING_THRESHOLD: i64 = 1;

fn default_grouping_threshold() -> i64 {
    DEFAULT_GROUPING_THRESHOLD
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct NavTree {
    #[serde(default, alias = "menu")]
    pub children: Vec<NavEntry>,

    #[serde(default = "default_grouping_threshold")]
    pub grouping_threshold: i64,
}

impl Default for NavTree {
    fn default() -> Self {
        Self {
            children: vec![],
            grouping_threshold: DEFAULT_GROUPING_THRESHOLD,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ToolDefaults {
    #[serde(default, deserialize_with = "null_as_default")]
    pub default_mount_point: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub default_mount_label: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct InstallableTool {
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default)]
    pub defaults: ToolDefaults,
}

pub(crate) const PLACEHOLDER_TOOL_NAME: &str = "Add a tool";

impl InstallableTool {
    /// Shown before the catalog loads and before anything is picked.
    pub fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_TOOL_NAME.to_string(),
            description: "click on one of the tools shown above to add it to your project."
                .to_string(),
            defaults: ToolDefaults::default(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == PLACEHOLDER_TOOL_NAME
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct InstallableToolsResponse {
    #[serde(default)]
    pub tools: Vec<InstallableTool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MountPointCheck {
    #[serde(default)]
    pub exists: bool,
}

/// Form state for a tool that has not been installed yet.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NewToolDraft {
    pub mount_point: String,
    pub mount_label: String,
}

impl NewToolDraft {
    pub fn from_tool(tool: &InstallableTool) -> Self {
        Self {
            mount_point: tool.defaults.default_mount_point.clone(),
            mount_label: tool.defaults.default_mount_label.clone(),
        }
    }
}

/// Identifies the project a page belongs to, as found in the URL.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ProjectContext {
    pub neighborhood: String,
    pub project: String,
}
