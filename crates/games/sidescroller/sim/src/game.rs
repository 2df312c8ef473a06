use crate::actions::ScrollerAction;
use crate::catalog::Catalog;
use crate::config::WorldConfig;
use crate::error::LoadError;
use crate::events::ScrollerEvent;
use crate::level::Level;
use crate::observe::{build_observation, ScrollerObservation};
use crate::systems;
use crate::tiles::ResourceTable;
use crate::world::{ScrollerState, World};
use sim_core::{ActionEnvelope, Game, PlayerId, TerminalOutcome, Tick};
use std::path::Path;
use std::sync::Arc;

/// Everything validated up front: the config, the content catalog and the
/// level's world before any tick. `Game::new` and restarts clone from here.
#[derive(Clone, Debug)]
pub struct GameSetup {
    pub config: WorldConfig,
    pub catalog: Arc<Catalog>,
    pristine: Arc<World>,
}

impl GameSetup {
    /// Standard roster, sized to the level's tiles.
    pub fn new(config: WorldConfig, level: &Level, resources: ResourceTable) -> Result<Self, LoadError> {
        let config = WorldConfig {
            tile_size: level.tile_size,
            ..config
        };
        let catalog = Catalog::standard(&config);
        Self::with_catalog(config, level, resources, catalog)
    }

    pub fn with_catalog(
        config: WorldConfig,
        level: &Level,
        resources: ResourceTable,
        catalog: Catalog,
    ) -> Result<Self, LoadError> {
        let config = WorldConfig {
            tile_size: level.tile_size,
            ..config
        };
        level.validate(&resources)?;
        catalog.validate()?;
        let world = World::from_level(level, Arc::new(resources), &catalog, &config)?;
        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            pristine: Arc::new(world),
        })
    }

    /// Load a level document and a directory of resource folders.
    pub fn load(config: WorldConfig, level: &Path, resources: &Path) -> Result<Self, LoadError> {
        let level = Level::load(level)?;
        let resources = ResourceTable::from_dir(resources)?;
        Self::new(config, &level, resources)
    }

    pub fn world(&self) -> &World {
        &self.pristine
    }
}

pub struct ScrollerGame {
    state: ScrollerState,
    pristine: Arc<World>,
}

impl ScrollerGame {
    pub fn state(&self) -> &ScrollerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ScrollerState {
        &mut self.state
    }
}

impl Game for ScrollerGame {
    type Config = GameSetup;
    type Action = ScrollerAction;
    type Observation = ScrollerObservation;
    type Event = ScrollerEvent;

    fn new(setup: Self::Config, seed: u64) -> Self {
        let world = World::clone(&setup.pristine);
        let state = ScrollerState::new(setup.config, setup.catalog, world, seed);
        Self {
            state,
            pristine: setup.pristine,
        }
    }

    fn step(
        &mut self,
        tick: Tick,
        actions: &[ActionEnvelope<Self::Action>],
        out_events: &mut Vec<Self::Event>,
    ) {
        let state = &mut self.state;
        state.tick = tick;
        if state.outcome.is_some() {
            return;
        }

        // 1. Allies: AI, then update
        systems::update_allies(state, out_events);

        // 2. Enemies: update, then patrol AI
        systems::update_enemies(state, out_events);

        // 3. Main player and the coins it touches
        systems::update_player(state, out_events);
        systems::update_pickups(state, out_events);

        // 4. Effects, damage and finish chains
        systems::update_effects(state, out_events);

        // 5. Input
        for action in actions {
            systems::apply_action(state, action.payload, out_events);
        }

        // 6. Visual-only state
        systems::update_ambient(state);

        // 7. Death countdown
        if systems::update_restart(state) {
            let world = World::clone(&self.pristine);
            state.restart(world, out_events);
        }
    }

    fn observe(&self, tick: Tick, _player: PlayerId) -> Self::Observation {
        build_observation(&self.state, tick)
    }

    fn is_terminal(&self) -> Option<TerminalOutcome> {
        self.state.outcome
    }
}
