//! Run configuration for SAC assembly.
//!
//! `RunConfig` carries every option the assembler consumes. It can be built
//! in code with the `with_*` setters or loaded from a TOML file; either way
//! it must pass [`RunConfig::validate`] before units are constructed.
//!
//! ```ignore
//! use sac_assembly::RunConfig;
//!
//! let config = RunConfig::default()
//!     .with_seed(Some(42))
//!     .with_min_explore_steps(10_000)
//!     .with_polyak(0.995);
//! config.validate()?;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Configuration validation error.
///
/// Returned when configuration parameters are invalid or inconsistent.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter (nsteps, mb_size, etc.) must be positive.
    InvalidCount {
        field: &'static str,
        value: u64,
    },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// A convolution descriptor is neither `[0]` nor `[channels, kernel, stride]`.
    InvalidConvLayer {
        field: &'static str,
        descriptor: Vec<usize>,
    },
    /// The configuration source could not be read.
    Io { path: String, message: String },
    /// The configuration source is not valid TOML for `RunConfig`.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange { field, value, min, max } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            ConfigError::InvalidConvLayer { field, descriptor } => {
                write!(
                    f,
                    "{} must be [0] or [channels, kernel, stride] with positive entries, got {:?}",
                    field, descriptor
                )
            }
            ConfigError::Io { path, message } => {
                write!(f, "failed to read config {}: {}", path, message)
            }
            ConfigError::Parse(message) => write!(f, "invalid config: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Network shape
// ============================================================================

/// One convolution layer: `[channels, kernel, stride]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvSpec {
    pub channels: usize,
    pub kernel: usize,
    pub stride: usize,
}

impl ConvSpec {
    /// The layer in descriptor form.
    pub fn descriptor(&self) -> [usize; 3] {
        [self.channels, self.kernel, self.stride]
    }
}

/// Network-size hyperparameters after unused layers were dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkShape {
    pub convs: Vec<ConvSpec>,
    pub hiddens: Vec<usize>,
}

/// Drop unused `[0]` descriptors and parse the rest into [`ConvSpec`]s.
///
/// Order of the surviving layers is preserved.
pub fn filter_conv_layers(
    layers: &[(&'static str, &[usize])],
) -> Result<Vec<ConvSpec>, ConfigError> {
    let mut convs = Vec::new();
    for (field, descriptor) in layers {
        match descriptor {
            [0] => continue,
            [channels, kernel, stride] if *channels > 0 && *kernel > 0 && *stride > 0 => {
                convs.push(ConvSpec {
                    channels: *channels,
                    kernel: *kernel,
                    stride: *stride,
                });
            }
            _ => {
                return Err(ConfigError::InvalidConvLayer {
                    field,
                    descriptor: descriptor.to_vec(),
                })
            }
        }
    }
    Ok(convs)
}

// ============================================================================
// RunConfig
// ============================================================================

/// Every option consumed by the assembler.
///
/// Field names follow the command-line flags of the training scripts so
/// existing TOML run files load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    // Seeding and scaling
    /// Deterministic seed for all randomness sources. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Multiplier applied to rewards before any unit stores or averages them.
    pub reward_scaling: f32,
    /// Multiplier applied to costs before any unit stores or averages them.
    pub cost_scaling: f32,

    // Phase schedule
    /// Evaluation run: no exploration, no learning units.
    pub eval_mode: bool,
    /// Steps before exploitation, training and target sync become eligible.
    pub min_explore_steps: u64,
    /// Every Nth episode is an exploit episode. `None` never exploits during training.
    pub exploit_freq: Option<u64>,

    // Experience
    /// n-step return horizon.
    pub nsteps: usize,
    /// Reward discount factor.
    pub gamma: f32,
    /// Cost discount factor.
    pub cost_gamma: f32,
    /// Replay capacity in transitions.
    pub exp_buff_len: usize,
    /// Bootstrap through time-limit truncations unless this is set.
    pub no_ignore_done_on_timelimit: bool,

    // Network shape
    pub conv1: Vec<usize>,
    pub conv2: Vec<usize>,
    pub conv3: Vec<usize>,
    pub hiddens: Vec<usize>,

    // Training
    /// Train every `train_freq` steps.
    pub train_freq: u64,
    /// Minibatch size.
    pub mb_size: usize,
    /// TD error clipping bound.
    pub td_clip: Option<f32>,
    /// Gradient norm clipping bound.
    pub grad_clip: Option<f32>,
    /// Critic learning rate.
    pub lr: f64,
    /// Actor (and temperature) learning rate.
    pub a_lr: f64,

    // Entropy temperature
    /// Initial entropy temperature.
    pub sac_alpha: f32,
    /// Keep alpha fixed at `sac_alpha` instead of adapting it.
    pub fix_alpha: bool,

    // Target networks
    /// Target blending coefficient: `target = polyak * target + (1 - polyak) * source`.
    pub polyak: f32,

    // Presentation
    pub no_render: bool,
    pub record_unscaled: bool,
    pub record_discounted: bool,

    /// Environment frames per agent step, fixed for the run.
    pub frameskip: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            reward_scaling: 1.0,
            cost_scaling: 1.0,

            eval_mode: false,
            min_explore_steps: 10_000,
            exploit_freq: None,

            nsteps: 1,
            gamma: 0.99,
            cost_gamma: 1.0,
            exp_buff_len: 1_000_000,
            no_ignore_done_on_timelimit: false,

            conv1: vec![0],
            conv2: vec![0],
            conv3: vec![0],
            hiddens: vec![256, 256],

            train_freq: 1,
            mb_size: 100,
            td_clip: None,
            grad_clip: None,
            lr: 1e-3,
            a_lr: 1e-3,

            sac_alpha: 0.2,
            fix_alpha: false,

            polyak: 0.995,

            no_render: false,
            record_unscaled: false,
            record_discounted: false,

            frameskip: 1,
        }
    }
}

impl RunConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_reward_scaling(mut self, scaling: f32) -> Self {
        self.reward_scaling = scaling;
        self
    }

    pub fn with_cost_scaling(mut self, scaling: f32) -> Self {
        self.cost_scaling = scaling;
        self
    }

    pub fn with_eval_mode(mut self, eval_mode: bool) -> Self {
        self.eval_mode = eval_mode;
        self
    }

    pub fn with_min_explore_steps(mut self, steps: u64) -> Self {
        self.min_explore_steps = steps;
        self
    }

    pub fn with_exploit_freq(mut self, freq: Option<u64>) -> Self {
        self.exploit_freq = freq;
        self
    }

    pub fn with_nsteps(mut self, nsteps: usize) -> Self {
        self.nsteps = nsteps;
        self
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_cost_gamma(mut self, cost_gamma: f32) -> Self {
        self.cost_gamma = cost_gamma;
        self
    }

    pub fn with_exp_buff_len(mut self, len: usize) -> Self {
        self.exp_buff_len = len;
        self
    }

    pub fn with_no_ignore_done_on_timelimit(mut self, flag: bool) -> Self {
        self.no_ignore_done_on_timelimit = flag;
        self
    }

    pub fn with_convs(mut self, conv1: Vec<usize>, conv2: Vec<usize>, conv3: Vec<usize>) -> Self {
        self.conv1 = conv1;
        self.conv2 = conv2;
        self.conv3 = conv3;
        self
    }

    pub fn with_hiddens(mut self, hiddens: Vec<usize>) -> Self {
        self.hiddens = hiddens;
        self
    }

    pub fn with_train_freq(mut self, freq: u64) -> Self {
        self.train_freq = freq;
        self
    }

    pub fn with_mb_size(mut self, mb_size: usize) -> Self {
        self.mb_size = mb_size;
        self
    }

    pub fn with_sac_alpha(mut self, alpha: f32) -> Self {
        self.sac_alpha = alpha;
        self
    }

    pub fn with_fix_alpha(mut self, fix_alpha: bool) -> Self {
        self.fix_alpha = fix_alpha;
        self
    }

    pub fn with_polyak(mut self, polyak: f32) -> Self {
        self.polyak = polyak;
        self
    }

    pub fn with_no_render(mut self, no_render: bool) -> Self {
        self.no_render = no_render;
        self
    }

    pub fn with_frameskip(mut self, frameskip: u64) -> Self {
        self.frameskip = frameskip;
        self
    }

    // ------------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------------

    /// Whether a time-limit truncation is excluded from bootstrap targets.
    pub fn ignore_done_on_timelimit(&self) -> bool {
        !self.no_ignore_done_on_timelimit
    }

    /// Network shape with unused convolution and zero-width hidden layers dropped.
    pub fn network_shape(&self) -> Result<NetworkShape, ConfigError> {
        let convs = filter_conv_layers(&[
            ("conv1", self.conv1.as_slice()),
            ("conv2", self.conv2.as_slice()),
            ("conv3", self.conv3.as_slice()),
        ])?;
        let hiddens = self.hiddens.iter().copied().filter(|&h| h > 0).collect();
        Ok(NetworkShape { convs, hiddens })
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Count validations - must be positive
        let counts: [(&'static str, u64); 5] = [
            ("nsteps", self.nsteps as u64),
            ("exp_buff_len", self.exp_buff_len as u64),
            ("train_freq", self.train_freq),
            ("mb_size", self.mb_size as u64),
            ("frameskip", self.frameskip),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::InvalidCount { field, value });
            }
        }
        if self.exploit_freq == Some(0) {
            return Err(ConfigError::InvalidCount {
                field: "exploit_freq",
                value: 0,
            });
        }

        // Range validations
        let unit_interval: [(&'static str, f32); 3] = [
            ("gamma", self.gamma),
            ("cost_gamma", self.cost_gamma),
            ("polyak", self.polyak),
        ];
        for (field, value) in unit_interval {
            check_range(field, value as f64, 0.0, 1.0)?;
        }
        check_range("reward_scaling", self.reward_scaling as f64, f64::MIN_POSITIVE, f64::MAX)?;
        check_range("cost_scaling", self.cost_scaling as f64, f64::MIN_POSITIVE, f64::MAX)?;
        check_range("sac_alpha", self.sac_alpha as f64, f64::MIN_POSITIVE, f64::MAX)?;
        check_range("lr", self.lr, 0.0, f64::MAX)?;
        check_range("a_lr", self.a_lr, 0.0, f64::MAX)?;
        if let Some(td_clip) = self.td_clip {
            check_range("td_clip", td_clip as f64, f64::MIN_POSITIVE, f64::MAX)?;
        }
        if let Some(grad_clip) = self.grad_clip {
            check_range("grad_clip", grad_clip as f64, f64::MIN_POSITIVE, f64::MAX)?;
        }

        self.network_shape()?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    // NaN fails both comparisons, so test for containment
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(RunConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_filter_zero_sized_conv_layers() {
        let config = RunConfig::default().with_convs(vec![0], vec![32, 3, 1], vec![0]);
        let shape = config.network_shape().unwrap();

        let descriptors: Vec<[usize; 3]> = shape.convs.iter().map(ConvSpec::descriptor).collect();
        assert_eq!(descriptors, vec![[32, 3, 1]]);
    }

    #[test]
    fn test_conv_order_preserved() {
        let config = RunConfig::default().with_convs(vec![32, 8, 4], vec![0], vec![64, 3, 1]);
        let shape = config.network_shape().unwrap();
        assert_eq!(shape.convs.len(), 2);
        assert_eq!(shape.convs[0].channels, 32);
        assert_eq!(shape.convs[1].channels, 64);
    }

    #[test]
    fn test_malformed_conv_rejected() {
        let config = RunConfig::default().with_convs(vec![32, 3], vec![0], vec![0]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidConvLayer {
                field: "conv1",
                descriptor: vec![32, 3],
            })
        );
    }

    #[test]
    fn test_zero_hidden_layers_dropped() {
        let config = RunConfig::default().with_hiddens(vec![64, 0, 32]);
        assert_eq!(config.network_shape().unwrap().hiddens, vec![64, 32]);
    }

    #[test]
    fn test_zero_counts_rejected() {
        let err = RunConfig::default().with_nsteps(0).validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidCount {
                field: "nsteps",
                value: 0
            }
        );

        let err = RunConfig::default().with_exploit_freq(Some(0)).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCount { field: "exploit_freq", .. }));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = RunConfig::default().with_polyak(1.5).validate().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "polyak", .. }));

        let err = RunConfig::default().with_gamma(f32::NAN).validate().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "gamma", .. }));

        let err = RunConfig::default().with_reward_scaling(0.0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "reward_scaling", .. }));
    }

    #[test]
    fn test_ignore_done_on_timelimit_inverts_flag() {
        assert!(RunConfig::default().ignore_done_on_timelimit());
        assert!(!RunConfig::default()
            .with_no_ignore_done_on_timelimit(true)
            .ignore_done_on_timelimit());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = RunConfig::from_toml_str(
            r#"
            seed = 7
            eval_mode = true
            conv2 = [32, 3, 1]
            polyak = 0.99
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(7));
        assert!(config.eval_mode);
        assert_eq!(config.polyak, 0.99);
        // Unspecified fields fall back to defaults
        assert_eq!(config.nsteps, 1);
        assert_eq!(config.network_shape().unwrap().convs.len(), 1);
    }

    #[test]
    fn test_from_toml_rejects_unknown_and_invalid() {
        assert!(matches!(
            RunConfig::from_toml_str("not_an_option = 3"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RunConfig::from_toml_str("mb_size = 0"),
            Err(ConfigError::InvalidCount { field: "mb_size", .. })
        ));
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let config = RunConfig::default()
            .with_seed(Some(3))
            .with_exploit_freq(Some(5))
            .with_hiddens(vec![64, 64]);
        let text = config.to_toml_string().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, text).unwrap();

        assert_eq!(RunConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = RunConfig::from_file("/nonexistent/run.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.toml"));
    }
}
