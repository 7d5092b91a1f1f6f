use serde::Deserialize;
use thiserror::Error;
use url::{
    Url,
    form_urlencoded,
};

use crate::api::UserId;

pub const DEFAULT_BOT_USERNAME: &str = "ZebiBingoBot";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no user id: host init data has none and the launch URL has no user_id")]
    Missing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    Host,
    LaunchUrl,
}

/// What the host container tells us about the player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostData {
    pub user_id: Option<UserId>,
    pub bot_username: Option<String>,
    pub can_access_contacts: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct HostDataDto {
    user: Option<HostUserDto>,
    #[serde(rename = "botUsername", alias = "bot_username")]
    bot_username: Option<String>,
    can_access_contacts: Option<bool>,
}

#[derive(Deserialize)]
struct HostUserDto {
    id: Option<UserId>,
}

impl HostData {
    /// Accepts either the signed init data query string (with a JSON `user`
    /// field) or the already decoded init data object.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with('{') {
            return serde_json::from_str::<HostDataDto>(raw)
                .map(Into::into)
                .unwrap_or_default();
        }
        let mut data = HostData::default();
        for (key, value) in form_urlencoded::parse(raw.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "user" => {
                    data.user_id = serde_json::from_str::<HostUserDto>(&value)
                        .ok()
                        .and_then(|user| user.id)
                }
                "botUsername" | "bot_username" => data.bot_username = Some(value.into_owned()),
                "can_access_contacts" => {
                    data.can_access_contacts = matches!(value.as_ref(), "true" | "1")
                }
                _ => {}
            }
        }
        data.normalised()
    }

    fn normalised(mut self) -> Self {
        self.user_id = self.user_id.filter(|id| !id.as_str().is_empty());
        self.bot_username = self.bot_username.filter(|name| !name.is_empty());
        self
    }
}

impl From<HostDataDto> for HostData {
    fn from(dto: HostDataDto) -> Self {
        HostData {
            user_id: dto.user.and_then(|user| user.id),
            bot_username: dto.bot_username,
            can_access_contacts: dto.can_access_contacts.unwrap_or(false),
        }
        .normalised()
    }
}

/// `user_id` query parameter of the launch URL. Accepts a full URL or a bare
/// query string.
pub fn launch_user_id(launch_url: &str) -> Option<UserId> {
    let launch_url = launch_url.trim();
    let query = match Url::parse(launch_url) {
        Ok(url) => url.query().unwrap_or_default().to_string(),
        Err(_) => launch_url.trim_start_matches('?').to_string(),
    };
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "user_id")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(UserId::new)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub source: IdentitySource,
    pub bot_username: String,
    pub can_access_contacts: bool,
}

impl Identity {
    pub fn referral_link(&self) -> String {
        format!(
            "https://t.me/{}?start=ref_{}",
            self.bot_username, self.user_id
        )
    }
}

/// The host's user id wins; the launch URL is only a fallback.
pub fn resolve(
    init_data: Option<&str>,
    launch_url: Option<&str>,
) -> Result<Identity, IdentityError> {
    let host = init_data.map(HostData::parse).unwrap_or_default();
    let (user_id, source) = match host.user_id {
        Some(user_id) => (user_id, IdentitySource::Host),
        None => {
            let user_id = launch_url
                .and_then(launch_user_id)
                .ok_or(IdentityError::Missing)?;
            (user_id, IdentitySource::LaunchUrl)
        }
    };
    Ok(Identity {
        user_id,
        source,
        bot_username: host
            .bot_username
            .unwrap_or_else(|| DEFAULT_BOT_USERNAME.to_string()),
        can_access_contacts: host.can_access_contacts,
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    const SIGNED: &str = "query_id=AAH&user=%7B%22id%22%3A5380773431%2C%22first_name%22%3A%22Abebe%22%7D&auth_date=1700000000&hash=abc";

    #[test]
    fn resolve__host_id_wins_over_launch_url() {
        // when
        let identity = resolve(Some(SIGNED), Some("https://app.example/?user_id=99")).unwrap();

        // then
        assert_eq!(identity.user_id, UserId::new("5380773431"));
        assert_eq!(identity.source, IdentitySource::Host);
    }

    #[test]
    fn resolve__falls_back_to_launch_url() {
        // when
        let identity = resolve(Some("query_id=AAH&auth_date=1"), Some("?user_id=99")).unwrap();

        // then
        assert_eq!(identity.user_id, UserId::new("99"));
        assert_eq!(identity.source, IdentitySource::LaunchUrl);
        assert_eq!(identity.bot_username, DEFAULT_BOT_USERNAME);
        assert!(!identity.can_access_contacts);
    }

    #[test]
    fn resolve__fails_without_any_source() {
        assert_eq!(
            resolve(None, Some("https://app.example/")),
            Err(IdentityError::Missing)
        );
        assert_eq!(resolve(None, None), Err(IdentityError::Missing));
    }

    #[test]
    fn parse__reads_decoded_init_data_object() {
        // given
        let raw = r#"{"user": {"id": 77, "first_name": "Sara"}, "botUsername": "OtherBot", "can_access_contacts": true}"#;

        // when
        let host = HostData::parse(raw);

        // then
        assert_eq!(host.user_id, Some(UserId::new("77")));
        assert_eq!(host.bot_username.as_deref(), Some("OtherBot"));
        assert!(host.can_access_contacts);
    }

    #[test]
    fn parse__garbage_yields_no_identity() {
        assert_eq!(HostData::parse("{not json"), HostData::default());
        assert_eq!(HostData::parse("user=notjson"), HostData::default());
    }

    #[test]
    fn referral_link__embeds_bot_and_user() {
        let identity = resolve(None, Some("?user_id=12")).unwrap();
        assert_eq!(
            identity.referral_link(),
            "https://t.me/ZebiBingoBot?start=ref_12"
        );
    }
}
