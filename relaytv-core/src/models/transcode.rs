use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Container/protocol the transcoder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Hls,
    Dash,
    Rtmp,
}

impl OutputFormat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hls => "hls",
            Self::Dash => "dash",
            Self::Rtmp => "rtmp",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hls" => Ok(Self::Hls),
            "dash" => Ok(Self::Dash),
            "rtmp" => Ok(Self::Rtmp),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSettings {
    pub codec: String,
    /// e.g. "2500k"
    pub bitrate: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSettings {
    pub codec: String,
    /// e.g. "128k"
    pub bitrate: String,
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

/// Immutable transcoding profile, selected by operator configuration.
/// Never derived from user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeProfile {
    pub name: String,
    pub video: VideoSettings,
    pub audio: AudioSettings,
    pub output: OutputFormat,
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Profile-specific extra ffmpeg flags, appended verbatim.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_preset() -> String {
    "veryfast".to_string()
}

impl TranscodeProfile {
    /// Baseline 720p HLS profile used when no profile is configured for a
    /// requested quality.
    #[must_use]
    pub fn default_hls() -> Self {
        Self {
            name: "720p".to_string(),
            video: VideoSettings {
                codec: "libx264".to_string(),
                bitrate: "2500k".to_string(),
                resolution: Some("1280x720".to_string()),
                fps: Some(25),
            },
            audio: AudioSettings {
                codec: "aac".to_string(),
                bitrate: "128k".to_string(),
                sample_rate: Some(48000),
            },
            output: OutputFormat::Hls,
            preset: default_preset(),
            extra_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_yaml_deserialization() {
        let yaml = r"
name: 1080p
video:
  codec: libx264
  bitrate: 5000k
  resolution: 1920x1080
  fps: 30
audio:
  codec: aac
  bitrate: 192k
  sample_rate: 48000
output: hls
preset: fast
extra_args: ['-g', '50']
";
        let profile: TranscodeProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.name, "1080p");
        assert_eq!(profile.output, OutputFormat::Hls);
        assert_eq!(profile.extra_args, vec!["-g", "50"]);
    }

    #[test]
    fn test_preset_defaults_when_omitted() {
        let yaml = r"
name: low
video: { codec: libx264, bitrate: 800k }
audio: { codec: aac, bitrate: 96k }
output: rtmp
";
        let profile: TranscodeProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.preset, "veryfast");
        assert!(profile.video.resolution.is_none());
    }
}
