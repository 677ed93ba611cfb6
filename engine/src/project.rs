use chrono::Utc;
use kiln_types::{ProjectId, ProjectIdError};
use uuid::Uuid;

const SUFFIX_LEN: usize = 12;

/// Fresh project id: UTC timestamp to the millisecond, then 12 random
/// alphanumerics.
pub fn generate_project_id() -> Result<ProjectId, ProjectIdError> {
    let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let random = Uuid::new_v4().simple().to_string();
    ProjectId::new(format!("{stamp}{}", &random[..SUFFIX_LEN]))
}
