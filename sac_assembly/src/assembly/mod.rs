//! Run assembly: which units exist, in which order, wired to what.
//!
//! [`assemble`] builds the SAC unit list in a fixed order:
//!
//! | # | unit | kind | present |
//! |---|------|------|---------|
//! | 1 | `SeedingAgent` | Seeding | always |
//! | 2 | `RewardScaler` | RewardScaling | always |
//! | 3 | `EpisodeTypeController` | EpisodeTypeControl | always |
//! | 4 | `ExpBuffAgent` | ExperienceBuffer | training |
//! | 5 | `SACAgent` / `SACDiscreteAgent` | PolicyUpdate | always |
//! | 6 | `TargetNetCopier1`, `TargetNetCopier2` | TargetSync | training |
//! | 7 | `StatsRecorder` | StatsRecording | always |
//! | 8 | `ConsolePrinter` | ConsoleSummary | always |
//! | 9 | `SimpleRenderAgent` | Render | unless `no_render` or no renderer |
//!
//! Order is not trusted to the call sequence. Every registration goes through
//! [`Assembler::register`], which rejects duplicate names, named dependencies
//! that are not registered yet, and missing predecessor kinds
//! ([`UnitKind::required_predecessors`]).

use burn::tensor::backend::Backend;
use std::io::Write;

use crate::buffers::ReplayReader;
use crate::config::{NetworkShape, RunConfig};
use crate::core::action_space::{resolve, PolicyKind};
use crate::core::target_network::TargetSyncSchedule;
use crate::environment::EnvSpec;
use crate::error::AssemblyError;
use crate::metrics::{MetricsReader, MetricsSink, MetricsStore};
use crate::units::experience_buffer::ExperienceBufferConfig;
use crate::units::sac::{CriticRefs, LearnerProvider, PolicyWiring, SacHyperParams};
use crate::units::{
    ConsoleSummaryUnit, EpisodeTypeUnit, ExperienceBufferUnit, GradientSteps, RenderUnit, Renderer,
    RewardScalingUnit, SacUnit, SacUnitConfig, SeedingUnit, StatsConfig, StatsRecordingUnit,
    TargetSyncUnit, Unit, UnitKind,
};

/// Unit names.
pub mod names {
    pub const SEEDING: &str = "SeedingAgent";
    pub const REWARD_SCALING: &str = "RewardScaler";
    pub const EPISODE_TYPE: &str = "EpisodeTypeController";
    pub const EXPERIENCE_BUFFER: &str = "ExpBuffAgent";
    pub const SAC_CONTINUOUS: &str = "SACAgent";
    pub const SAC_DISCRETE: &str = "SACDiscreteAgent";
    pub const TARGET_SYNC: [&str; 2] = ["TargetNetCopier1", "TargetNetCopier2"];
    pub const STATS: &str = "StatsRecorder";
    pub const CONSOLE: &str = "ConsolePrinter";
    pub const RENDER: &str = "SimpleRenderAgent";
}

// ============================================================================
// Registration
// ============================================================================

/// Registration record of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecord {
    pub name: String,
    pub kind: UnitKind,
    /// Units whose outputs this unit references. All registered before it.
    pub dependencies: Vec<String>,
    /// False for units suppressed by the configuration.
    pub active: bool,
}

/// Ordered, checked unit registry.
pub struct Assembler {
    eval_mode: bool,
    units: Vec<Box<dyn Unit>>,
    records: Vec<UnitRecord>,
    suppressed: Vec<UnitRecord>,
}

impl Assembler {
    /// In `eval_mode`, requirements on training-only kinds are waived.
    pub fn new(eval_mode: bool) -> Self {
        Self {
            eval_mode,
            units: Vec::new(),
            records: Vec::new(),
            suppressed: Vec::new(),
        }
    }

    /// Append a unit after checking its name and everything it depends on.
    pub fn register(
        &mut self,
        unit: Box<dyn Unit>,
        dependencies: &[&str],
    ) -> Result<(), AssemblyError> {
        let name = unit.name().to_string();
        let kind = unit.kind();

        if self.records.iter().any(|r| r.name == name) {
            return Err(AssemblyError::DuplicateUnitName(name));
        }
        for dep in dependencies {
            if !self.records.iter().any(|r| r.name == *dep) {
                return Err(AssemblyError::OrderingViolation {
                    unit: name,
                    missing: dep.to_string(),
                });
            }
        }
        for required in kind.required_predecessors() {
            let waived = self.eval_mode && required.is_train_only();
            if !waived && !self.records.iter().any(|r| r.kind == *required) {
                return Err(AssemblyError::MissingPredecessor {
                    unit: name,
                    required: *required,
                });
            }
        }

        log::debug!("registered {} ({:?}) at position {}", name, kind, self.records.len());
        self.records.push(UnitRecord {
            name,
            kind,
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            active: true,
        });
        self.units.push(unit);
        Ok(())
    }

    /// Record a unit the configuration leaves out.
    pub fn suppress(&mut self, name: &str, kind: UnitKind, reason: &str) {
        log::debug!("suppressed {} ({:?}): {}", name, kind, reason);
        self.suppressed.push(UnitRecord {
            name: name.to_string(),
            kind,
            dependencies: Vec::new(),
            active: false,
        });
    }

    /// Records of registered units, in order.
    pub fn records(&self) -> &[UnitRecord] {
        &self.records
    }

    pub fn suppressed(&self) -> &[UnitRecord] {
        &self.suppressed
    }

    fn into_parts(self) -> (Vec<Box<dyn Unit>>, Vec<UnitRecord>, Vec<UnitRecord>) {
        (self.units, self.records, self.suppressed)
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// External collaborators the assembled units need.
pub struct Collaborators<B: Backend> {
    /// Builds the variant-specific learner.
    pub learners: Box<dyn LearnerProvider<B>>,
    pub renderer: Option<Box<dyn Renderer>>,
    /// Console unit output.
    pub console: Box<dyn Write>,
    /// Per-episode metrics output of the statistics unit.
    pub metrics_sink: Option<Box<dyn MetricsSink>>,
}

impl<B: Backend> Collaborators<B> {
    /// Console on stdout, no renderer, no metrics sink.
    pub fn new(learners: Box<dyn LearnerProvider<B>>) -> Self {
        Self {
            learners,
            renderer: None,
            console: Box::new(std::io::stdout()),
            metrics_sink: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_console(mut self, console: Box<dyn Write>) -> Self {
        self.console = console;
        self
    }

    pub fn with_metrics_sink(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.metrics_sink = Some(sink);
        self
    }
}

/// The ordered unit list of a run plus the handles worth inspecting.
pub struct Assembly<B: Backend> {
    units: Vec<Box<dyn Unit>>,
    records: Vec<UnitRecord>,
    suppressed: Vec<UnitRecord>,
    policy: PolicyWiring,
    critics: CriticRefs<B>,
    gradient_steps: GradientSteps,
    replay: Option<ReplayReader>,
    metrics: MetricsStore,
    network: NetworkShape,
    frameskip: u64,
}

impl<B: Backend> Assembly<B> {
    /// Active units, in registration order.
    pub fn records(&self) -> &[UnitRecord] {
        &self.records
    }

    /// Units the configuration left out.
    pub fn suppressed(&self) -> &[UnitRecord] {
        &self.suppressed
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn contains(&self, kind: UnitKind) -> bool {
        self.records.iter().any(|r| r.kind == kind)
    }

    pub fn policy_wiring(&self) -> PolicyWiring {
        self.policy
    }

    /// Non-owning references to the policy unit's critic pairs.
    pub fn critic_refs(&self) -> CriticRefs<B> {
        self.critics.clone()
    }

    pub fn gradient_steps(&self) -> GradientSteps {
        self.gradient_steps.clone()
    }

    /// Read-only view of the replay buffer, absent in evaluation runs.
    pub fn replay(&self) -> Option<&ReplayReader> {
        self.replay.as_ref()
    }

    pub fn metrics(&self) -> MetricsReader {
        self.metrics.reader()
    }

    /// Network shape after dropping unused layers.
    pub fn network_shape(&self) -> &NetworkShape {
        &self.network
    }

    pub fn frameskip(&self) -> u64 {
        self.frameskip
    }

    /// Units in registration order, for the driver.
    pub fn units_mut(&mut self) -> &mut [Box<dyn Unit>] {
        &mut self.units
    }
}

/// Build the ordered unit list for a run.
///
/// Fails before constructing anything when the configuration is invalid or
/// the action space has no policy-update variant.
pub fn assemble<B: Backend>(
    config: &RunConfig,
    env: &EnvSpec,
    collaborators: Collaborators<B>,
    device: &B::Device,
) -> Result<Assembly<B>, AssemblyError> {
    config.validate()?;
    let network = config.network_shape()?;
    let kind = resolve(&env.action_space)?;
    let eval = config.eval_mode;

    let Collaborators {
        mut learners,
        renderer,
        console,
        metrics_sink,
    } = collaborators;
    let metrics = MetricsStore::new();
    let mut asm = Assembler::new(eval);

    // 1. Seeding, first so every RNG below derives from it
    let mut seeding = SeedingUnit::new(names::SEEDING, config.seed);
    let policy_rng = seeding.derive_rng();
    seeding.seed_backend::<B>(device);
    asm.register(Box::new(seeding), &[])?;

    // 2. Scaling, ahead of every unit that stores or aggregates rewards
    asm.register(
        Box::new(RewardScalingUnit::new(
            names::REWARD_SCALING,
            config.reward_scaling,
            config.cost_scaling,
        )),
        &[],
    )?;

    // 3. Phase, ahead of buffering
    asm.register(
        Box::new(EpisodeTypeUnit::new(
            names::EPISODE_TYPE,
            eval,
            config.min_explore_steps,
            config.exploit_freq,
        )),
        &[],
    )?;

    // 4. Experience buffer
    let replay = if eval {
        asm.suppress(names::EXPERIENCE_BUFFER, UnitKind::ExperienceBuffer, "eval mode");
        None
    } else {
        let buffer = ExperienceBufferUnit::new(
            names::EXPERIENCE_BUFFER,
            &ExperienceBufferConfig {
                nsteps: config.nsteps,
                gamma: config.gamma,
                cost_gamma: config.cost_gamma,
                capacity: config.exp_buff_len,
                ignore_done_on_timelimit: config.ignore_done_on_timelimit(),
            },
            metrics.clone(),
        );
        let reader = buffer.reader();
        asm.register(Box::new(buffer), &[])?;
        Some(reader)
    };

    // 5. Policy update
    let policy_name = match kind {
        PolicyKind::Continuous { .. } => names::SAC_CONTINUOUS,
        PolicyKind::Discrete { .. } => names::SAC_DISCRETE,
    };
    let hyper = SacHyperParams::from_config(config, network.clone());
    let learner = learners
        .build(&kind, &hyper, device)
        .map_err(|source| AssemblyError::Collaborator {
            unit: policy_name.to_string(),
            source,
        })?;
    let policy = SacUnit::<B>::new(
        policy_name,
        SacUnitConfig {
            kind,
            obs_dim: env.obs_size,
            hyper,
            train_freq: config.train_freq,
            min_explore_steps: config.min_explore_steps,
            sac_alpha: config.sac_alpha,
            fix_alpha: config.fix_alpha,
        },
        replay.clone(),
        learner,
        policy_rng,
        metrics.clone(),
        device,
    );
    let critics = policy.critic_refs();
    let gradient_steps = policy.gradient_steps();
    let wiring = policy.wiring();
    let policy_deps: &[&str] = if replay.is_some() {
        &[names::EXPERIENCE_BUFFER]
    } else {
        &[]
    };
    asm.register(Box::new(policy), policy_deps)?;

    // 6. One target copier per critic pair
    for (name, pair) in names::TARGET_SYNC.iter().zip(critics.pairs()) {
        if eval {
            asm.suppress(name, UnitKind::TargetSync, "eval mode");
            continue;
        }
        let schedule = TargetSyncSchedule::every_step(config.polyak, config.min_explore_steps);
        asm.register(
            Box::new(TargetSyncUnit::new(
                *name,
                pair.clone(),
                schedule,
                gradient_steps.clone(),
            )),
            &[policy_name],
        )?;
    }

    // 7. Statistics
    let mut stats = StatsRecordingUnit::new(
        names::STATS,
        StatsConfig::from_config(config),
        metrics.clone(),
    );
    if let Some(sink) = metrics_sink {
        stats = stats.with_sink(sink);
    }
    asm.register(Box::new(stats), &[])?;

    // 8. Console, reading the row the statistics unit writes
    asm.register(
        Box::new(ConsoleSummaryUnit::new(names::CONSOLE, metrics.reader(), console)),
        &[names::STATS],
    )?;

    // 9. Rendering
    match renderer {
        _ if config.no_render => asm.suppress(names::RENDER, UnitKind::Render, "no_render"),
        None => asm.suppress(names::RENDER, UnitKind::Render, "no renderer supplied"),
        Some(renderer) => {
            asm.register(Box::new(RenderUnit::new(names::RENDER, renderer)), &[])?
        }
    }

    let (units, records, suppressed) = asm.into_parts();
    log::info!(
        "assembled {} units: {}",
        records.len(),
        records
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    Ok(Assembly {
        units,
        records,
        suppressed,
        policy: wiring,
        critics,
        gradient_steps,
        replay,
        metrics,
        network,
        frameskip: config.frameskip,
    })
}
