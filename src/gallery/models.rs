use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vizzy_common::ordering::Ordered;
use vizzy_common::view::Named;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: i64,
    /// Full encoded identity string.
    pub name: String,
    /// `name` without its structural prefix.
    pub display_name: String,
    pub display_order: i64,
    pub image_count: i64,
    pub total_size: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Ordered for Project {
    fn item_id(&self) -> i64 {
        self.id
    }
}

impl Named for Project {
    fn full_name(&self) -> &str {
        &self.name
    }
}

/// Design phase an image belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ImagePhase {
    #[serde(rename = "SD")]
    SchematicDesign,
    #[serde(rename = "DD")]
    DesignDevelopment,
    Final,
    Approved,
}

impl ImagePhase {
    pub const ALL: [ImagePhase; 4] = [
        ImagePhase::SchematicDesign,
        ImagePhase::DesignDevelopment,
        ImagePhase::Final,
        ImagePhase::Approved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchematicDesign => "SD",
            Self::DesignDevelopment => "DD",
            Self::Final => "Final",
            Self::Approved => "Approved",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SchematicDesign => "Schematic Design",
            Self::DesignDevelopment => "Design Development",
            Self::Final => "Final",
            Self::Approved => "Approved",
        }
    }

    /// Parse a comma-separated phase filter such as `SD,DD`. Blank entries
    /// are skipped; `None` means no filter.
    pub fn parse_list(raw: Option<&str>) -> Result<Vec<ImagePhase>, String> {
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ImagePhase::from_str)
            .collect()
    }
}

impl FromStr for ImagePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SD" => Ok(Self::SchematicDesign),
            "DD" => Ok(Self::DesignDevelopment),
            "Final" => Ok(Self::Final),
            "Approved" => Ok(Self::Approved),
            _ => Err(format!("Invalid phase: {}", s)),
        }
    }
}

impl fmt::Display for ImagePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub id: i64,
    pub project_id: i64,
    pub filename: String,
    pub size_bytes: i64,
    pub phase: Option<ImagePhase>,
    pub display_order: i64,
    pub created_at: String,
}

impl Ordered for Image {
    fn item_id(&self) -> i64 {
        self.id
    }
}

/// The sibling set a display order ranks within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderScope {
    Projects,
    Images { project_id: i64 },
}

impl OrderScope {
    /// Key under which the scope's order version is stored.
    pub fn key(&self) -> String {
        match self {
            Self::Projects => "projects".to_string(),
            Self::Images { project_id } => format!("project:{}:images", project_id),
        }
    }
}

impl fmt::Display for OrderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub updated: usize,
    pub total: usize,
    pub version: i64,
}

// API view types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageList {
    pub project_id: i64,
    pub images: Vec<Image>,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: ReorderOutcome,
}
