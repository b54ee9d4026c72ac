use semver::Version;
use serde::Serialize;
use thiserror::Error;

pub const APP_NAME: &str = "Flip Lead Desk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

#[derive(Error, Debug)]
#[error("invalid version format: {0}")]
pub struct InvalidVersion(String);

/// What `/health` reports about the running build.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: String,
    pub label: String,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: APP_NAME,
            version: current_version()
                .map(|version| version.to_string())
                .unwrap_or_else(|_| APP_VERSION.to_string()),
            label: version_label(),
        }
    }
}

fn parse_version_str(input: &str) -> Result<Version, InvalidVersion> {
    let trimmed = input.trim_start_matches(|ch| ch == 'v' || ch == 'V');
    Version::parse(trimmed).map_err(|err| InvalidVersion(err.to_string()))
}

pub fn current_version() -> Result<Version, InvalidVersion> {
    if let Some(tag) = GIT_TAG {
        if let Ok(version) = parse_version_str(tag) {
            return Ok(version);
        }
    }

    parse_version_str(APP_VERSION)
}

pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// User agent sent on outbound requests.
pub fn user_agent() -> String {
    format!("{}/{}", APP_NAME.replace(' ', "-"), version_label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_with_prefix() {
        assert_eq!(parse_version_str("v1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(parse_version_str("1.0.0").unwrap(), Version::new(1, 0, 0));
        assert!(parse_version_str("release-7").is_err());
    }

    #[test]
    fn user_agent_names_the_app() {
        assert!(user_agent().starts_with("Flip-Lead-Desk/"));
    }

    #[test]
    fn build_info_has_a_semver_version() {
        let info = BuildInfo::current();
        assert!(Version::parse(&info.version).is_ok());
    }
}
