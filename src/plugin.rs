use bevy::prelude::*;

use crate::config::LevelConfig;
use crate::level::LevelGenerator;

/// Generates one level at startup and inserts it as a [`GeneratedLevel`](crate::level::GeneratedLevel)
/// resource. Painting the level is left to whoever reads that resource.
#[derive(Default)]
pub struct LevelGenPlugin {
    pub config: LevelConfig,
}

impl Plugin for LevelGenPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .add_systems(Startup, generate_level);
    }
}

fn generate_level(mut commands: Commands, config: Res<LevelConfig>) {
    match LevelGenerator::new(config.clone()).generate() {
        Ok(level) => {
            info!("level ready for tile set '{}'", level.tile_set);
            commands.insert_resource(level);
        }
        Err(e) => error!("level generation failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::GeneratedLevel;

    #[test]
    fn startup_inserts_the_level() {
        let mut config = LevelConfig::default();
        config.seed = 42;
        let mut app = App::new();
        app.add_plugins(LevelGenPlugin { config });
        app.update();

        let level = app.world().get_resource::<GeneratedLevel>().unwrap();
        assert_eq!(level.seed, 42);
        assert_eq!(level.rooms.len(), 2);
    }

    #[test]
    fn bad_config_leaves_no_level() {
        let mut config = LevelConfig::default();
        config.cave.fill_density = 2.0;
        let mut app = App::new();
        app.add_plugins(LevelGenPlugin { config });
        app.update();
        assert!(app.world().get_resource::<GeneratedLevel>().is_none());
    }
}
