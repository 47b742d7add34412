use fest_api::ranking::TieBreakMode;
use log::LevelFilter;
use std::path::PathBuf;

pub const DEFAULT_CHAT_NAME: &str = "Anonymous";

/// Where festival data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Hosted { url: String, anon_key: String },
    /// Offline on a snapshot file, or on the bundled demo when `None`.
    Snapshot(Option<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
    pub source: DataSource,
    pub tie_break: TieBreakMode,
    pub credentials: Option<Credentials>,
    pub chat_name: String,
    pub export_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: None,
            source: DataSource::Snapshot(None),
            tie_break: TieBreakMode::default(),
            credentials: None,
            chat_name: DEFAULT_CHAT_NAME.to_string(),
            export_dir: PathBuf::from("."),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let source = match (get("FESTUI_STORE_URL"), get("FESTUI_STORE_KEY")) {
            (Some(url), Some(anon_key)) => DataSource::Hosted { url, anon_key },
            _ => DataSource::Snapshot(get("FESTUI_FEST_JSON").map(PathBuf::from)),
        };

        let tie_break = match get("FESTUI_TIEBREAK") {
            Some(value) => TieBreakMode::parse(&value).unwrap_or_else(|| {
                log::warn!("unknown FESTUI_TIEBREAK {value:?}, using default");
                defaults.tie_break
            }),
            None => defaults.tie_break,
        };

        let credentials = match (get("FESTUI_EMAIL"), lookup("FESTUI_PASSWORD")) {
            (Some(email), Some(password)) if !password.is_empty() => {
                Some(Credentials { email, password })
            }
            _ => None,
        };

        Self {
            full_screen: false,
            log_level: get("FESTUI_LOG").and_then(|v| v.parse::<LevelFilter>().ok()),
            source,
            tie_break,
            credentials,
            chat_name: get("FESTUI_CHAT_NAME").unwrap_or(defaults.chat_name),
            export_dir: get("FESTUI_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.source, DataSource::Snapshot(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> AppSettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_runs_offline_on_demo() {
        let settings = settings_from(&[]);
        assert_eq!(settings.source, DataSource::Snapshot(None));
        assert_eq!(settings.tie_break, TieBreakMode::FlagGated);
        assert_eq!(settings.chat_name, DEFAULT_CHAT_NAME);
        assert_eq!(settings.export_dir, PathBuf::from("."));
        assert!(settings.credentials.is_none());
        assert!(settings.log_level.is_none());
    }

    #[test]
    fn hosted_store_needs_url_and_key() {
        let settings = settings_from(&[
            ("FESTUI_STORE_URL", "https://fest.example.co"),
            ("FESTUI_STORE_KEY", "anon"),
        ]);
        assert_eq!(
            settings.source,
            DataSource::Hosted {
                url: "https://fest.example.co".into(),
                anon_key: "anon".into()
            }
        );

        let half = settings_from(&[("FESTUI_STORE_URL", "https://fest.example.co")]);
        assert!(half.is_offline());
    }

    #[test]
    fn overrides_are_read() {
        let settings = settings_from(&[
            ("FESTUI_TIEBREAK", "literal"),
            ("FESTUI_LOG", "debug"),
            ("FESTUI_CHAT_NAME", "  Riya "),
            ("FESTUI_EMAIL", "admin@fest.edu"),
            ("FESTUI_PASSWORD", "secret1"),
            ("FESTUI_FEST_JSON", "/tmp/fest.json"),
        ]);
        assert_eq!(settings.tie_break, TieBreakMode::Literal);
        assert_eq!(settings.log_level, Some(LevelFilter::Debug));
        assert_eq!(settings.chat_name, "Riya");
        assert_eq!(settings.source, DataSource::Snapshot(Some("/tmp/fest.json".into())));
        assert_eq!(
            settings.credentials,
            Some(Credentials {
                email: "admin@fest.edu".into(),
                password: "secret1".into()
            })
        );
    }

    #[test]
    fn unknown_tie_break_falls_back() {
        let settings = settings_from(&[("FESTUI_TIEBREAK", "coin-toss")]);
        assert_eq!(settings.tie_break, TieBreakMode::default());
    }
}
