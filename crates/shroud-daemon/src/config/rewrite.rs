use serde::{Deserialize, Serialize};
use shroud_rewrite::SanitizeOptions;
use shroud_types::{Endpoints, DEFAULT_IMAGE_PATH, DEFAULT_PROXY_PATH, DEFAULT_REMOVED_ELEMENTS};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub proxy_path: String,
    pub image_path: String,
    pub removed_elements: Vec<String>,
    pub strip_event_handlers: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            proxy_path: DEFAULT_PROXY_PATH.to_string(),
            image_path: DEFAULT_IMAGE_PATH.to_string(),
            removed_elements: DEFAULT_REMOVED_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            strip_event_handlers: true,
        }
    }
}

impl RewriteConfig {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.proxy_path.clone(), self.image_path.clone())
    }

    pub fn sanitize_options(&self) -> SanitizeOptions {
        SanitizeOptions {
            removed_elements: self.removed_elements.clone(),
            strip_event_handlers: self.strip_event_handlers,
        }
    }
}
