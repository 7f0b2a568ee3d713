//! Danmaku headless runner
//!
//! Plays a stage with the autopilot and reports how it went. With no
//! arguments the bundled demo stage is used.
//!
//! Usage: danmaku [STAGE_JSON] [MAX_FRAMES] [SEED]

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;

    use danmaku::autopilot::Autopilot;
    use danmaku::consts::NOMINAL_DT;
    use danmaku::sim::{GameStatus, PatternLibrary, Simulation};
    use danmaku::{ConfigError, ImageRegistry, Settings, StageConfig};

    const DEMO_STAGE: &str = include_str!("../demos/stage1.json");
    const DEMO_PATTERNS: [(&str, &str); 3] = [
        ("aimed.txt", include_str!("../demos/patterns/aimed.txt")),
        ("spiral.txt", include_str!("../demos/patterns/spiral.txt")),
        ("ring.txt", include_str!("../demos/patterns/ring.txt")),
    ];

    const SETTINGS_FILE: &str = "danmaku.json";

    /// Ten minutes at the nominal rate
    const DEFAULT_MAX_FRAMES: u64 = 36_000;

    fn load_stage(path: Option<&str>) -> Result<(StageConfig, PatternLibrary), ConfigError> {
        match path {
            Some(path) => {
                let stage = StageConfig::load(path)?;
                // Pattern files live in `patterns/` beside the stage file
                let dir = Path::new(path)
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join("patterns");
                let patterns = PatternLibrary::load_index(dir, &stage.pattern_index);
                Ok((stage, patterns))
            }
            None => {
                let stage = StageConfig::from_json(DEMO_STAGE)?;
                let mut patterns = PatternLibrary::new();
                for (name, text) in DEMO_PATTERNS {
                    patterns.load_file(name, text);
                }
                log::info!("Loaded bundled demo stage");
                Ok((stage, patterns))
            }
        }
    }

    pub fn run() -> Result<(), ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let max_frames = args
            .get(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FRAMES);
        let seed = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0x5eed);

        let (stage, patterns) = load_stage(args.first().map(String::as_str))?;
        let settings = if Path::new(SETTINGS_FILE).exists() {
            Settings::load(SETTINGS_FILE)
        } else {
            Settings::default()
        };

        // No renderer here; hand out stable handles so sprite lookups succeed
        let mut images = ImageRegistry::new();
        for sprite in stage.sprites() {
            images.register(sprite);
        }
        for sprite in patterns.sprites() {
            images.register(sprite);
        }

        let mut sim = Simulation::new(stage, patterns, settings, &images);
        let ended = Rc::new(Cell::new(false));
        let flag = ended.clone();
        sim.on_game_over(move |state| {
            flag.set(true);
            log::info!("GAME OVER (score {}, deaths {})", state.score, state.deaths);
        });
        let flag = ended.clone();
        sim.on_victory(move |state| {
            flag.set(true);
            log::info!("VICTORY (score {}, lives {})", state.score, state.lives);
        });

        let mut pilot = Autopilot::new(seed);
        let mut last_phase = sim.state.phase;
        while sim.state.frame < max_frames && !ended.get() {
            let input = pilot.next_input(&sim.state);
            for event in sim.tick(&input, NOMINAL_DT, &images) {
                log::debug!("{event:?}");
            }
            if sim.state.phase != last_phase {
                last_phase = sim.state.phase;
                log::info!("Frame {}: {}", sim.state.frame, last_phase.label());
            }
        }

        let state = &sim.state;
        if !ended.get() {
            log::warn!("Stopped after {} frames without a result", state.frame);
        }
        println!(
            "status={:?} phase={} frames={} score={} lives={} bombs={} deaths={}",
            state.status,
            state.phase.label(),
            state.frame,
            state.score,
            state.lives,
            state.bombs,
            state.deaths
        );
        if state.status == GameStatus::GameOver {
            std::process::exit(1);
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(e) = native::run() {
        log::error!("{e}");
        std::process::exit(2);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation is used as a library on the web
}
