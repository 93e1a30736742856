//! Identity tagger: the seven descriptive labels of the deployment unit.

use chrono::NaiveDate;
use stackpipe_config::Settings;
use stackpipe_core::identity::IdentityProvider;
use stackpipe_core::tags::TagSet;
use stackpipe_core::{DeploymentConfig, Result};
use tracing::info;

/// Build the tag set. The identity lookup is blocking and its failure aborts
/// tagging; no fallback identity is substituted.
pub fn collect_tags(
    config: &DeploymentConfig,
    settings: &Settings,
    identity: &dyn IdentityProvider,
    today: NaiveDate,
) -> Result<TagSet> {
    let caller = identity.caller_identity()?;
    info!(created_by = %caller.arn, "Resolved caller identity");

    let name = config.resource_name();
    let environment = config.environment();

    let mut tags = TagSet::new();
    tags.add("Application", name.as_str());
    tags.add("Environment", environment.as_str());
    tags.add("Owner", settings.owner());
    tags.add(
        "Usage",
        format!(
            "Custom CodePipeline for deploying {} in {} environment",
            name, environment
        ),
    );
    tags.add("CreationDate", today.format("%Y-%m-%d").to_string());
    tags.add("CreatedBy", caller.arn);
    tags.add("GitHubRepo", settings.repository_url());
    Ok(tags)
}
