//! Runs the side-scroller without a window: loads a level (or builds the
//! bundled demo), replays a scripted input track and prints what happened.

use clap::Parser;
use sim_core::{ActionEnvelope, Micros, PlayerId, Tick};
use sim_host::MatchHost;
use sim_sidescroller::{
    EntityId, GameSetup, Level, LevelBuilder, LoadError, ResourceTable, ScrollerAction,
    ScrollerEvent, ScrollerGame, WorldConfig,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "headless-runner")]
#[command(about = "Run the side-scroller simulation headless")]
struct Args {
    /// Level document (JSON). Without it the demo level is used.
    #[arg(long, requires = "resources")]
    level: Option<PathBuf>,

    /// Directory of resource folders with their info.txt properties
    #[arg(long)]
    resources: Option<PathBuf>,

    /// JSON file overriding WorldConfig fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticks to simulate
    #[arg(long, default_value = "3600")]
    ticks: u64,

    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Pace ticks at the configured rate and print events as they happen
    #[arg(long, short)]
    realtime: bool,

    /// Print the final observation as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => WorldConfig::default(),
    };
    let setup = match (&args.level, &args.resources) {
        (Some(level), Some(resources)) => GameSetup::load(config, level, resources)?,
        _ => {
            tracing::info!("no level given, using the demo level");
            let (level, resources) = demo_level()?;
            GameSetup::new(config, &level, resources)?
        }
    };
    let tick_hz = setup.config.tick_hz;

    let mut host = MatchHost::<ScrollerGame>::new(setup, args.seed, tick_hz);
    let player = host.join_player();
    let scheduled = schedule_script(&mut host, player, args.ticks);
    println!("Scheduled {} scripted inputs", scheduled);

    let events = if args.realtime {
        run_realtime(&mut host, args.ticks)
    } else {
        run_fast(&mut host, args.ticks)
    };

    println!("\n=== Side-scroller Simulation Complete ===");
    println!("Outcome: {:?}", host.is_terminal());
    println!("Final tick: {}", host.current_tick());
    print_status(&host);
    print_event_summary(&events);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&host.observe(player))?);
    }
    Ok(())
}

/// A flat valley walled at both ends, every ally and enemy once, and a few
/// coins along the way.
fn demo_level() -> Result<(Level, ResourceTable), LoadError> {
    let mut resources = ResourceTable::new();
    resources.register_with_info("ground", 3, "solid")?;
    resources.register("grass", 2);
    resources.register("npc", 3);
    resources.register("entities", 6);
    resources.register("coins", 2);

    let ground_row = 12;
    let mut level = LevelBuilder::new(48.0)
        .base_tile_size(16.0)
        .camera(2.0 * 48.0, ground_row as f32 * 48.0 - 80.0)
        .row(ground_row, -4..=120, "ground", 0)
        .row(ground_row + 1, -4..=120, "ground", 1)
        .column(-4, 4..=ground_row - 1, "ground", 2)
        .column(120, 4..=ground_row - 1, "ground", 2)
        .row(ground_row - 4, 30..=36, "ground", 0)
        .row(ground_row - 1, 10..=14, "grass", 0);
    for variant in 0..3 {
        level = level.tile(4 + variant as i32, ground_row - 1, "npc", variant);
    }
    for variant in 0..6 {
        level = level.tile(24 + 14 * variant as i32, ground_row - 1, "entities", variant);
    }
    for x in [9, 17, 33, 58, 77] {
        level = level.tile(x, ground_row - 1, "coins", (x % 2) as usize);
    }
    let level = level
        .offgrid(33.0 * 16.0, (ground_row - 5) as f32 * 16.0, "coins", 0)
        .build();
    Ok((level, resources))
}

/// Walk right through the level, attacking regularly, with a portal round
/// trip and a rally in between.
fn schedule_script(host: &mut MatchHost<ScrollerGame>, player: PlayerId, ticks: Tick) -> usize {
    let mut script: Vec<(Tick, ScrollerAction)> = vec![
        (1, ScrollerAction::OpenPortal),
        (2, ScrollerAction::Right { held: true }),
        (600, ScrollerAction::ToggleRally),
        (900, ScrollerAction::ToggleRally),
        (905, ScrollerAction::ToggleMarkHostile),
        (1200, ScrollerAction::Teleport),
        (1500, ScrollerAction::ToggleLight),
    ];
    for tick in (30..ticks).step_by(45) {
        let modifier = match (tick / 45) % 6 {
            4 => Some(ScrollerAction::Power { held: true }),
            5 => Some(ScrollerAction::Run { held: true }),
            _ => None,
        };
        if let Some(m) = modifier {
            script.push((tick, m));
        }
        script.push((tick, ScrollerAction::Attack));
        if modifier.is_some() {
            script.push((tick + 1, ScrollerAction::Power { held: false }));
            script.push((tick + 1, ScrollerAction::Run { held: false }));
        }
        if tick % 180 == 30 {
            script.push((tick + 2, ScrollerAction::Jump));
        }
    }
    script.retain(|(tick, _)| *tick <= ticks);

    for (action_id, (tick, payload)) in script.iter().enumerate() {
        host.submit(ActionEnvelope::new(player, action_id as u64, *tick, *payload));
    }
    script.len()
}

fn run_fast(host: &mut MatchHost<ScrollerGame>, ticks: Tick) -> Vec<ScrollerEvent> {
    let result = host.run_for_ticks(ticks);
    result.events.into_iter().map(|(_, e)| e).collect()
}

fn run_realtime(host: &mut MatchHost<ScrollerGame>, ticks: Tick) -> Vec<ScrollerEvent> {
    let tick_duration = Duration::from_micros(Micros::per_tick(host.tick_hz()).as_micros());
    let mut last_status = Instant::now();
    let mut all_events = Vec::new();

    println!("=== Running in Real-Time Mode ({}Hz) ===", host.tick_hz());
    println!("Press Ctrl+C to stop\n");

    for _ in 0..ticks {
        let tick_start = Instant::now();

        let Some(events) = host.step_one_tick() else {
            break;
        };
        for event in &events {
            print_event(host.current_tick(), event);
        }
        all_events.extend(events);

        if last_status.elapsed() >= Duration::from_secs(1) {
            print_status(host);
            last_status = Instant::now();
        }

        let elapsed = tick_start.elapsed();
        if elapsed < tick_duration {
            std::thread::sleep(tick_duration - elapsed);
        }
    }
    all_events
}

fn print_event(tick: Tick, event: &ScrollerEvent) {
    match event {
        ScrollerEvent::AttackStarted { tier, .. } => {
            println!("[{:>6}] Attack tier {} started", tick, tier)
        }
        ScrollerEvent::Hurt { damage, hp, .. } => {
            println!("[{:>6}] Hit for {} (hp {})", tick, damage, hp)
        }
        ScrollerEvent::Died { .. } => println!("[{:>6}] Died", tick),
        ScrollerEvent::Petrified { .. } => println!("[{:>6}] Player turned to stone", tick),
        ScrollerEvent::Removed { .. } => println!("[{:>6}] Corpse removed", tick),
        ScrollerEvent::EffectSpawned { name, kind, .. } => {
            println!("[{:>6}] Effect {:?} spawned ({:?})", tick, name, kind)
        }
        ScrollerEvent::EffectExpired { name, .. } => {
            println!("[{:>6}] Effect {:?} expired", tick, name)
        }
        ScrollerEvent::PickupCollected { kind, .. } => {
            println!("[{:>6}] Picked up {:?}", tick, kind)
        }
        ScrollerEvent::PortalOpened { center } => {
            println!("[{:>6}] Portal opened at ({:.0}, {:.0})", tick, center.x, center.y)
        }
        ScrollerEvent::Teleported { to } => {
            println!("[{:>6}] Teleported to ({:.0}, {:.0})", tick, to.x, to.y)
        }
        ScrollerEvent::RallyToggled { on } => println!("[{:>6}] Rally {}", tick, on),
        ScrollerEvent::MarkHostileToggled { on } => println!("[{:>6}] Mark hostile {}", tick, on),
        ScrollerEvent::LightToggled { on } => println!("[{:>6}] Light {}", tick, on),
        ScrollerEvent::ScreenShake { delay, intensity } => {
            println!("[{:>6}] Screen shake {} for {} ticks", tick, intensity, delay)
        }
        ScrollerEvent::Restarted => println!("[{:>6}] === World restarted ===", tick),
    }
}

fn print_status(host: &MatchHost<ScrollerGame>) {
    let state = host.game().state();
    let world = &state.world;
    let time_secs = host.current_tick() as f64 / host.tick_hz() as f64;
    let living = |ids: &[EntityId]| {
        ids.iter()
            .filter(|id| world.entities.get(**id).is_some_and(|e| !e.dead))
            .count()
    };
    match world.player() {
        Some(p) => println!(
            "  [{:>5.1}s] Player {:?} at ({:.0}, {:.0}) hp {}/{} energy {}/{}, allies {}, enemies {}, effects {}, coins {}",
            time_secs,
            p.state,
            p.pos().x,
            p.pos().y,
            p.hp,
            p.max_hp,
            p.energy,
            p.max_energy,
            living(&world.allies),
            living(&world.enemies),
            world.effects.len(),
            world.pickups.len(),
        ),
        None => println!("  [{:>5.1}s] No player", time_secs),
    }
}

fn print_event_summary(events: &[ScrollerEvent]) {
    let mut attacks = 0;
    let mut hits = 0;
    let mut deaths = 0;
    let mut removed = 0;
    let mut effects = 0;
    let mut pickups = 0;
    let mut teleports = 0;
    let mut shakes = 0;
    let mut restarts = 0;

    for event in events {
        match event {
            ScrollerEvent::AttackStarted { .. } => attacks += 1,
            ScrollerEvent::Hurt { .. } => hits += 1,
            ScrollerEvent::Died { .. } => deaths += 1,
            ScrollerEvent::Removed { .. } => removed += 1,
            ScrollerEvent::EffectSpawned { .. } => effects += 1,
            ScrollerEvent::PickupCollected { .. } => pickups += 1,
            ScrollerEvent::Teleported { .. } => teleports += 1,
            ScrollerEvent::ScreenShake { .. } => shakes += 1,
            ScrollerEvent::Restarted => restarts += 1,
            _ => {}
        }
    }

    println!("\n=== Event Summary ===");
    println!("Attacks started: {}", attacks);
    println!("Hits: {}", hits);
    println!("Deaths: {}", deaths);
    println!("Corpses removed: {}", removed);
    println!("Effects spawned: {}", effects);
    println!("Pickups collected: {}", pickups);
    println!("Teleports: {}", teleports);
    println!("Screen shakes: {}", shakes);
    println!("Restarts: {}", restarts);
}
