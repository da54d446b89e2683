use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use spatium_audio::ParamNames;
use spatium_types::NodeRef;

use crate::engine::EngineSettings;
use crate::falloff::{DEFAULT_FALLOFF, MAX_FALLOFF, MIN_FALLOFF};
use crate::gain::{GainLaw, DEFAULT_GAIN_CEILING};
use crate::transform::MapGeometry;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    graph: GraphConfig,
    #[serde(default)]
    map: MapConfig,
    #[serde(default)]
    dispatch: DispatchConfig,
    #[serde(default)]
    gain: GainConfig,
    #[serde(default)]
    control: ControlConfig,
}

#[derive(Deserialize, Default)]
struct GraphConfig {
    target_node: Option<String>,
}

#[derive(Deserialize, Default)]
struct MapConfig {
    max_radius: Option<f32>,
    min_distance_m: Option<f32>,
    max_distance_m: Option<f32>,
    initial_radius: Option<f32>,
}

#[derive(Deserialize, Default)]
struct DispatchConfig {
    tick_interval_ms: Option<u64>,
    elevation_debounce_ms: Option<u64>,
    azimuth_resolution_deg: Option<f32>,
}

#[derive(Deserialize, Default)]
struct GainConfig {
    falloff_compensation: Option<f32>,
    ceiling: Option<f32>,
}

#[derive(Deserialize, Default)]
struct ControlConfig {
    azimuth_param: Option<String>,
    elevation_param: Option<String>,
    gain_params: Option<Vec<String>>,
    mirror_azimuth: Option<bool>,
}

pub struct Config {
    graph: GraphConfig,
    map: MapConfig,
    dispatch: DispatchConfig,
    gain: GainConfig,
    control: ControlConfig,
}

impl Config {
    /// Embedded defaults merged with `~/.config/spatium/config.toml`, if present.
    pub fn load() -> Self {
        Self::load_with(user_config_path().as_deref())
    }

    /// Embedded defaults merged with the file at `path`.
    pub fn load_from(path: &Path) -> Self {
        Self::load_with(Some(path))
    }

    /// Embedded defaults only.
    pub fn embedded() -> Self {
        Self::load_with(None)
    }

    fn load_with(user_path: Option<&Path>) -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });

        if let Some(path) = user_path {
            if path.exists() {
                match std::fs::read_to_string(path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_graph(&mut base.graph, user.graph);
                            merge_map(&mut base.map, user.map);
                            merge_dispatch(&mut base.dispatch, user.dispatch);
                            merge_gain(&mut base.gain, user.gain);
                            merge_control(&mut base.control, user.control);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            graph: base.graph,
            map: base.map,
            dispatch: base.dispatch,
            gain: base.gain,
            control: base.control,
        }
    }

    /// The node whose inputs become channels.
    pub fn target_node(&self) -> NodeRef {
        NodeRef::Name(
            self.graph
                .target_node
                .clone()
                .unwrap_or_else(|| "effect_input.multi_spatial".to_string()),
        )
    }

    /// Map radius and meter range. Nonsensical values fall back to defaults.
    pub fn map_geometry(&self) -> MapGeometry {
        let fallback = MapGeometry::default();
        let geometry = MapGeometry {
            max_radius: self.map.max_radius.unwrap_or(fallback.max_radius),
            min_distance_m: self.map.min_distance_m.unwrap_or(fallback.min_distance_m),
            max_distance_m: self.map.max_distance_m.unwrap_or(fallback.max_distance_m),
        };
        let valid = geometry.max_radius >= 0.0
            && geometry.min_distance_m > 0.0
            && geometry.max_distance_m >= geometry.min_distance_m;
        if !valid {
            log::warn!(target: "config", "invalid [map] settings {:?}, using defaults", geometry);
            return fallback;
        }
        geometry
    }

    /// Radius of the initial channel ring (never outside the map).
    pub fn initial_radius(&self) -> f32 {
        let max = self.map_geometry().max_radius;
        self.map.initial_radius.unwrap_or(max * 0.6).clamp(0.0, max)
    }

    /// Dispatcher tick interval (clamped to 10..=50 ms).
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch.tick_interval_ms.unwrap_or(50).clamp(10, 50))
    }

    /// Elevation debounce window (clamped to 5..=1000 ms).
    pub fn elevation_debounce(&self) -> Duration {
        Duration::from_millis(self.dispatch.elevation_debounce_ms.unwrap_or(30).clamp(5, 1000))
    }

    /// Azimuth quantisation step in degrees; 0 disables it.
    pub fn azimuth_resolution(&self) -> f32 {
        self.dispatch
            .azimuth_resolution_deg
            .unwrap_or(1.0)
            .clamp(0.0, 90.0)
    }

    /// Initial falloff compensation (clamped to 1..=10).
    pub fn falloff_compensation(&self) -> f32 {
        self.gain
            .falloff_compensation
            .unwrap_or(DEFAULT_FALLOFF)
            .clamp(MIN_FALLOFF, MAX_FALLOFF)
    }

    /// Gain law over the map's meter range. The ceiling may be lowered but
    /// never raised above 15.
    pub fn gain_law(&self) -> GainLaw {
        let fallback = GainLaw::default();
        let geometry = self.map_geometry();
        GainLaw {
            min_distance_m: geometry.min_distance_m,
            max_distance_m: geometry.max_distance_m,
            ceiling: self
                .gain
                .ceiling
                .filter(|c| *c > 0.0)
                .map(|c| c.min(DEFAULT_GAIN_CEILING))
                .unwrap_or(fallback.ceiling),
        }
    }

    pub fn param_names(&self) -> ParamNames {
        let fallback = ParamNames::default();
        ParamNames {
            azimuth: self.control.azimuth_param.clone().unwrap_or(fallback.azimuth),
            elevation: self.control.elevation_param.clone().unwrap_or(fallback.elevation),
            gain: self.control.gain_params.clone().unwrap_or(fallback.gain),
        }
    }

    pub fn mirror_azimuth(&self) -> bool {
        self.control.mirror_azimuth.unwrap_or(false)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            target: self.target_node(),
            geometry: self.map_geometry(),
            gain_law: self.gain_law(),
            falloff_compensation: self.falloff_compensation(),
            tick_interval: self.tick_interval(),
            elevation_debounce: self.elevation_debounce(),
            azimuth_resolution_deg: self.azimuth_resolution(),
            initial_radius: self.initial_radius(),
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spatium").join("config.toml"))
}

fn merge_graph(base: &mut GraphConfig, user: GraphConfig) {
    if user.target_node.is_some() {
        base.target_node = user.target_node;
    }
}

fn merge_map(base: &mut MapConfig, user: MapConfig) {
    if user.max_radius.is_some() {
        base.max_radius = user.max_radius;
    }
    if user.min_distance_m.is_some() {
        base.min_distance_m = user.min_distance_m;
    }
    if user.max_distance_m.is_some() {
        base.max_distance_m = user.max_distance_m;
    }
    if user.initial_radius.is_some() {
        base.initial_radius = user.initial_radius;
    }
}

fn merge_dispatch(base: &mut DispatchConfig, user: DispatchConfig) {
    if user.tick_interval_ms.is_some() {
        base.tick_interval_ms = user.tick_interval_ms;
    }
    if user.elevation_debounce_ms.is_some() {
        base.elevation_debounce_ms = user.elevation_debounce_ms;
    }
    if user.azimuth_resolution_deg.is_some() {
        base.azimuth_resolution_deg = user.azimuth_resolution_deg;
    }
}

fn merge_gain(base: &mut GainConfig, user: GainConfig) {
    if user.falloff_compensation.is_some() {
        base.falloff_compensation = user.falloff_compensation;
    }
    if user.ceiling.is_some() {
        base.ceiling = user.ceiling;
    }
}

fn merge_control(base: &mut ControlConfig, user: ControlConfig) {
    if user.azimuth_param.is_some() {
        base.azimuth_param = user.azimuth_param;
    }
    if user.elevation_param.is_some() {
        base.elevation_param = user.elevation_param;
    }
    if user.gain_params.is_some() {
        base.gain_params = user.gain_params;
    }
    if user.mirror_azimuth.is_some() {
        base.mirror_azimuth = user.mirror_azimuth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_embedded_config() {
        let config = Config::embedded();
        assert_eq!(
            config.target_node(),
            NodeRef::Name("effect_input.multi_spatial".to_string())
        );
        assert_eq!(config.map_geometry(), MapGeometry::default());
        assert_eq!(config.initial_radius(), 60.0);
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.elevation_debounce(), Duration::from_millis(30));
        assert_eq!(config.azimuth_resolution(), 1.0);
        assert_eq!(config.falloff_compensation(), 3.0);
        assert_eq!(config.gain_law(), GainLaw::default());
        assert_eq!(config.param_names(), ParamNames::default());
        assert!(config.mirror_azimuth());
    }

    #[test]
    fn test_user_file_overrides_some_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[graph]\ntarget_node = \"my_spatializer\"\n\n[dispatch]\ntick_interval_ms = 20\n\n[gain]\nfalloff_compensation = 5.5\n"
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.target_node(), NodeRef::Name("my_spatializer".to_string()));
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.falloff_compensation(), 5.5);
        // untouched keys keep their embedded values
        assert_eq!(config.elevation_debounce(), Duration::from_millis(30));
        assert_eq!(config.map_geometry(), MapGeometry::default());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[dispatch]\ntick_interval_ms = 1\nelevation_debounce_ms = 99999\n\n[gain]\nfalloff_compensation = 40.0\nceiling = -1.0\n",
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.tick_interval(), Duration::from_millis(10));
        assert_eq!(config.elevation_debounce(), Duration::from_millis(1000));
        assert_eq!(config.falloff_compensation(), 10.0);
        assert_eq!(config.gain_law().ceiling, 15.0);
    }

    #[test]
    fn test_ceiling_cannot_be_raised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gain]\nceiling = 100.0\nfalloff_compensation = 10.0\n").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.gain_law().ceiling, 15.0);
        assert_eq!(config.gain_law().gain(0.1, config.falloff_compensation()), 15.0);

        std::fs::write(&path, "[gain]\nceiling = 4.0\n").unwrap();
        assert_eq!(Config::load_from(&path).gain_law().ceiling, 4.0);
    }

    #[test]
    fn test_invalid_geometry_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[map]\nmin_distance_m = 0.0\n").unwrap();
        assert_eq!(Config::load_from(&path).map_geometry(), MapGeometry::default());
    }

    #[test]
    fn test_malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dispatch\ntick_interval_ms = ").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/spatium/config.toml"));
        assert_eq!(config.falloff_compensation(), 3.0);
    }
}
