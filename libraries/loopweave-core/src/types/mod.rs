mod audio;
mod clip;
mod section;
mod track;

pub use audio::{AudioBuffer, AudioFormat, SampleRate};
pub use clip::{Clip, ClipSource, ClipTiming, BASE_SOURCE_MODE};
pub use section::{Section, SectionKind};
pub use track::Track;

/// Authoring JSON lists names either as one string or as an array
pub(crate) mod one_or_many {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<OneOrMany>::deserialize(deserializer)?;
        Ok(match value {
            None => Vec::new(),
            Some(OneOrMany::One(name)) if name.is_empty() => Vec::new(),
            Some(OneOrMany::One(name)) => vec![name],
            Some(OneOrMany::Many(names)) => names.into_iter().filter(|n| !n.is_empty()).collect(),
        })
    }
}
