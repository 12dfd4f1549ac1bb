//! Scene manifest (the top-level JSON document describing a scene)

use serde::Deserialize;

use crate::core::{Error, Result};

/// One layer of the scene; only `meshPyramid` layers carry streamable trees
#[derive(Clone, Debug, Deserialize)]
pub struct Layer {
    #[serde(rename = "type")]
    pub layer_type: Option<String>,
    pub root: Option<String>,
    #[serde(rename = "SRS")]
    pub srs: Option<String>,
    #[serde(rename = "SRSOrigin")]
    pub srs_origin: Option<Vec<f64>>,
}

impl Layer {
    pub fn is_mesh_pyramid(&self) -> bool {
        self.layer_type.as_deref() == Some("meshPyramid")
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneOptions {
    #[serde(rename = "navigationMode")]
    pub navigation_mode: Option<String>,
}

/// Parsed scene manifest
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneManifest {
    #[serde(default)]
    pub layers: Vec<Layer>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, rename = "sceneOptions")]
    pub scene_options: Vec<SceneOptions>,
    pub logo: Option<String>,
}

impl SceneManifest {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::Format(format!("scene manifest: {e}")))
    }
}
