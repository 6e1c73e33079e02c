//! API models for per-user section visibility.

use crate::auth::sections::EffectiveSection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SectionResponse {
    pub section_key: String,
    pub label: String,
    pub can_view: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SectionUpdate {
    pub section_key: String,
    pub can_view: bool,
}

impl From<EffectiveSection> for SectionResponse {
    fn from(section: EffectiveSection) -> Self {
        Self {
            section_key: section.key.to_string(),
            label: section.label.to_string(),
            can_view: section.can_view,
        }
    }
}
