use anyhow::Context;
use serde::{Deserialize, Serialize};

const BUNDLED: &str = include_str!("../../profile.json");

/// Static portfolio content shown to signed-in users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub role: String,
    pub tagline: String,
    #[serde(default)]
    pub sub_tagline: Option<String>,
    pub about: String,
    pub skills: Vec<SkillCategory>,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillCategory {
    pub category: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    pub tech_stack: String,
    pub description: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

impl Profile {
    pub fn bundled() -> anyhow::Result<Self> {
        serde_json::from_str(BUNDLED).context("parse bundled profile.json")
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("read profile {path}"))?;
        serde_json::from_str(&raw).with_context(|| format!("parse profile {path}"))
    }

    /// Loads `path` when given, otherwise the bundled content.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::bundled(),
        }
    }
}
