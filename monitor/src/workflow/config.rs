use anyhow::{bail, Context};
use motioncore::output::NotificationMessage;
use motioncore::prelude::{PipelineConfig, Rotation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Recipients may be written as one address or a list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn addresses(&self) -> Vec<String> {
        match self {
            Recipients::One(address) => vec![address.clone()],
            Recipients::Many(addresses) => addresses.clone(),
        }
    }
}

impl Default for Recipients {
    fn default() -> Self {
        Recipients::Many(Vec::new())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub resolution: (u32, u32),
    pub fps: u32,
    /// Seconds to wait before the first frame is requested.
    pub camera_warmup_time: f64,
    pub hd: bool,
    pub delta_thresh: u8,
    pub min_area: f64,
    pub min_upload_seconds: f64,
    pub min_motion_frames: u32,
    pub show_video: bool,
    pub use_email: bool,
    pub email_account: String,
    pub email_pwd: String,
    pub dest_email_account: Recipients,

    pub rotation: Rotation,
    pub resize_width: u32,
    pub blur_kernel: u32,
    pub alpha: f32,
    pub dilate_iterations: u8,
    pub output_dir: PathBuf,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub email_subject: String,
    pub email_body: String,
    pub font_path: Option<PathBuf>,
    pub offload_events: bool,
    /// Where `show_video` keeps the latest annotated frame.
    pub preview_path: PathBuf,
    /// Opt-in HTTP preview on `preview_addr`, independent of `show_video`.
    pub preview_http: bool,
    pub preview_addr: SocketAddr,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        let message = NotificationMessage::default();
        Self {
            resolution: pipeline.resolution,
            fps: 16,
            camera_warmup_time: 2.5,
            hd: pipeline.hd,
            delta_thresh: pipeline.delta_thresh,
            min_area: pipeline.min_area,
            min_upload_seconds: pipeline.min_upload_seconds,
            min_motion_frames: pipeline.min_motion_frames,
            show_video: false,
            use_email: false,
            email_account: String::new(),
            email_pwd: String::new(),
            dest_email_account: Recipients::default(),
            rotation: pipeline.rotation,
            resize_width: pipeline.resize_width,
            blur_kernel: pipeline.blur_kernel,
            alpha: pipeline.alpha,
            dilate_iterations: pipeline.dilate_iterations,
            output_dir: PathBuf::from("."),
            smtp_server: "smtp.gmail.com".into(),
            smtp_port: 587,
            email_subject: message.subject,
            email_body: message.body,
            font_path: None,
            offload_events: false,
            preview_path: PathBuf::from("preview.jpg"),
            preview_http: false,
            preview_addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

impl MonitorConfig {
    /// Reads a YAML document, or JSON when the file ends in `.json`.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading monitor config {}", path_ref.display()))?;
        let is_json = path_ref
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let config: MonitorConfig = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing monitor config {}", path_ref.display()))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("parsing monitor config {}", path_ref.display()))?
        };
        config
            .validate()
            .with_context(|| format!("validating monitor config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.to_pipeline_config().validate()?;
        if self.fps == 0 {
            bail!("fps must be at least 1");
        }
        if !self.camera_warmup_time.is_finite() || self.camera_warmup_time < 0.0 {
            bail!("camera_warmup_time must be a non-negative number of seconds");
        }
        if self.use_email {
            if self.email_account.is_empty() {
                bail!("use_email is set but email_account is empty");
            }
            if self.dest_email_account.addresses().is_empty() {
                bail!("use_email is set but dest_email_account is empty");
            }
        }
        Ok(())
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            resolution: self.resolution,
            rotation: self.rotation,
            hd: self.hd,
            resize_width: self.resize_width,
            blur_kernel: self.blur_kernel,
            alpha: self.alpha,
            delta_thresh: self.delta_thresh,
            dilate_iterations: self.dilate_iterations,
            min_area: self.min_area,
            min_upload_seconds: self.min_upload_seconds,
            min_motion_frames: self.min_motion_frames,
        }
    }

    pub fn notification_message(&self) -> NotificationMessage {
        NotificationMessage::new(self.email_subject.clone(), self.email_body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::TempPath {
        let mut temp = Builder::new().suffix(suffix).tempfile().unwrap();
        temp.write_all(contents.as_bytes()).unwrap();
        temp.into_temp_path()
    }

    #[test]
    fn defaults_map_to_valid_pipeline_config() {
        let cfg = MonitorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.to_pipeline_config().rotation, Rotation::Ccw270);
    }

    #[test]
    fn config_load_reads_json_document() {
        let path = write_temp(
            ".json",
            r#"{
                "show_video": false,
                "use_email": true,
                "email_account": "pi@example.com",
                "email_pwd": "secret",
                "dest_email_account": ["me@example.com", "you@example.com"],
                "min_upload_seconds": 3.0,
                "min_motion_frames": 8,
                "camera_warmup_time": 2.5,
                "delta_thresh": 5,
                "hd": false,
                "resolution": [640, 480],
                "fps": 16,
                "min_area": 5000
            }"#,
        );
        let cfg = MonitorConfig::load(&path).unwrap();
        assert_eq!(cfg.resolution, (640, 480));
        assert_eq!(cfg.min_area, 5000.0);
        assert_eq!(cfg.min_upload_seconds, 3.0);
        assert!(cfg.use_email);
        assert_eq!(
            cfg.dest_email_account.addresses(),
            vec!["me@example.com", "you@example.com"]
        );
    }

    #[test]
    fn show_video_does_not_open_a_listener() {
        let path = write_temp(".yaml", "show_video: true\n");
        let cfg = MonitorConfig::load(&path).unwrap();
        assert!(cfg.show_video);
        assert!(!cfg.preview_http);
        assert_eq!(cfg.preview_path, PathBuf::from("preview.jpg"));
    }

    #[test]
    fn config_load_reads_yaml() {
        let path = write_temp(
            ".yaml",
            "resolution: [320, 240]\nhd: true\nrotation: 180\ndest_email_account: me@example.com\n",
        );
        let cfg = MonitorConfig::load(&path).unwrap();
        assert_eq!(cfg.resolution, (320, 240));
        assert!(cfg.hd);
        assert_eq!(cfg.rotation, Rotation::Ccw180);
        assert_eq!(cfg.dest_email_account.addresses(), vec!["me@example.com"]);
        assert_eq!(cfg.min_motion_frames, 8);
    }

    #[test]
    fn unsupported_rotation_is_rejected() {
        let path = write_temp(".yaml", "rotation: 45\n");
        assert!(MonitorConfig::load(&path).is_err());
    }

    #[test]
    fn email_without_recipients_is_rejected() {
        let cfg = MonitorConfig {
            use_email: true,
            email_account: "pi@example.com".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
