/// Entry point and game loop.

mod config;
mod domain;
mod engine;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use config::GameConfig;
use domain::catalog::LevelCatalog;
use domain::layout::{RandomSource, RngSource};
use engine::scene::ArcadeScene;
use sim::event::{Command, GameEvent};
use sim::progression::ProgressionController;
use ui::gamepad::GamepadState;
use ui::input::{InputState, JumpLatch};
use ui::renderer::{viewport_for, Renderer};
use ui::sound::{Cue, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_logging(&config);

    let catalog = load_catalog(&config);
    let mut controller = ProgressionController::new(
        catalog,
        config.layout.clone(),
        config.progression.clone(),
    );

    let mut renderer = Renderer::new();
    let (cols, rows) = match renderer.init() {
        Ok(size) => size,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let viewport = viewport_for(cols, rows, &config.viewport);
    info!(
        "terminal {cols}x{rows}, viewport {}x{} world units",
        viewport.width, viewport.height
    );
    let mut scene = ArcadeScene::new(viewport, config.physics.clone());
    let mut rng = make_rng(config.seed);
    let sound = SoundEngine::new();

    let result = game_loop(
        &mut controller,
        &mut scene,
        rng.as_mut(),
        &mut renderer,
        sound.as_ref(),
        &config,
    );

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    let state = controller.state();
    info!("exit at level {} with score {}", state.current_level_index, state.score);
    println!();
    println!("Thanks for reading!");
    println!("Final Score: {}", state.score);
}

/// Log to a file; the terminal belongs to the game.
/// `RUST_LOG` overrides `general.log_level`.
fn init_logging(config: &GameConfig) {
    let file = match OpenOptions::new().create(true).append(true).open(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", config.log_file.display());
            return;
        }
    };
    let env = env_logger::Env::default().default_filter_or(config.log_level.as_str());
    let result = env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();
    if let Err(e) = result {
        eprintln!("Warning: logging disabled: {e}");
    }
}

fn load_catalog(config: &GameConfig) -> LevelCatalog {
    let path = match &config.levels_file {
        Some(p) => p,
        None => return LevelCatalog::builtin(),
    };
    match LevelCatalog::load(path) {
        Ok(catalog) => {
            info!("loaded {} levels from {}", catalog.len(), path.display());
            catalog
        }
        Err(e) => {
            warn!("{e}; using built-in levels");
            LevelCatalog::builtin()
        }
    }
}

/// Seeded runs reproduce the same platform layouts.
fn make_rng(seed: Option<u64>) -> Box<dyn RandomSource> {
    match seed {
        Some(seed) => {
            info!("layout seed {seed}");
            Box::new(RngSource(StdRng::seed_from_u64(seed)))
        }
        None => Box::new(RngSource(rand::rng())),
    }
}

fn game_loop(
    controller: &mut ProgressionController,
    scene: &mut ArcadeScene,
    rng: &mut dyn RandomSource,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let dt = tick_rate.as_secs_f64();
    let mut last_tick = Instant::now();

    // Dismiss presses between ticks are held until the next tick.
    let mut pending_dismiss = false;
    let mut jump_latch = JumpLatch::default();

    let opening = controller.start(scene, rng);
    play_cues(sound, &opening);

    loop {
        kb.drain_events();
        gp.update();
        let controls = jump_latch.filter(kb.controls().merge(gp.controls()));

        if controls.quit {
            break;
        }
        pending_dismiss |= controls.dismiss;

        if last_tick.elapsed() >= tick_rate {
            let mut frame = controls.frame;

            if pending_dismiss && controller.state().modal_open() {
                let commands = controller.dispatch(GameEvent::ModalDismissed, scene, rng);
                play_cues(sound, &commands);
                // The key that closed the section must not also jump.
                frame.jump = false;
                jump_latch.arm();
            }
            pending_dismiss = false;

            let report = scene.step(frame, dt);
            if report.jumped {
                if let Some(sfx) = sound { sfx.play(Cue::Jump); }
            }
            for event in report.events {
                let commands = controller.dispatch(event, scene, rng);
                play_cues(sound, &commands);
            }

            last_tick = Instant::now();
        }

        renderer.render(scene)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn play_cues(sound: Option<&SoundEngine>, commands: &[Command]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for cue in commands.iter().filter_map(Cue::for_command) {
        sfx.play(cue);
    }
}
