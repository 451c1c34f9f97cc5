use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;
use url::Url;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RelaySettings {
    pub enabled: bool,
    pub url: Option<Url>,
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            project_id: None,
            api_key: None,
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}
