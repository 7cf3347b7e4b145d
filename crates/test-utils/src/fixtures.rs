//! Common test fixtures: sensor profiles and per-cell record text.
//!
//! Every fixture profile uses the same scene record layout:
//!
//! | field | content                     |
//! |-------|-----------------------------|
//! | 0     | date YYYYMMDD               |
//! | 1, 2  | upper-left X, Y             |
//! | 3     | cloud cover (-1 = unknown)  |
//! | 4     | entity id                   |
//! | 5     | quality (-1 = unknown)      |
//! | 6-13  | corner sample/line offsets  |
//! | 14    | downloadable flag           |

use mosaic_cache::SensorProfile;
use mosaic_common::{BoundingBox, GridCoord};

/// Number of fields in a fixture scene line.
pub const SCENE_FIELD_COUNT: usize = 15;

/// Projection code written by the record builders.
pub const TEST_PROJECTION: i32 = 1;

/// A full-mosaic sensor on a bounded 100x100 one-degree grid.
///
/// Columns run east from longitude 0, rows run south from latitude 0.
/// Resolution 0 shows the whole window, resolution 1 a single cell.
pub const TEST_PROFILE_YAML: &str = r#"
name: test_sensor
sensor_id: TS
default_projection: 1
full_mosaic: true
has_quality: true
layout:
  date: 0
  ul_x: 1
  ul_y: 2
  cloud_cover: 3
  entity_id: 4
  quality: [5]
  corners: 6
  downloadable: 14
resolutions:
  - pixel_size: 1000.0
  - pixel_size: 30.0
    single_cell: true
navigation:
  origin_lon: 0.0
  origin_lat: 0.0
  dx: 1.0
  dy: -1.0
  min_col: 0
  max_col: 99
  min_row: 0
  max_row: 99
"#;

/// The full-mosaic test sensor.
pub fn test_profile() -> SensorProfile {
    SensorProfile::from_yaml_str(TEST_PROFILE_YAML).expect("fixture profile is valid")
}

/// A sensor that only composites the active cell.
pub fn single_scene_profile() -> SensorProfile {
    let mut profile = test_profile();
    profile.name = "single_sensor".to_string();
    profile.full_mosaic = false;
    profile
}

/// A full-mosaic sensor in swath mode.
pub fn swath_profile() -> SensorProfile {
    let mut profile = test_profile();
    profile.name = "swath_sensor".to_string();
    profile.swath_mode = true;
    profile
}

/// The test sensor restricted to centers inside lon 5..15, lat -15..-5.
///
/// With the test grid that admits columns and rows 5 through 15.
pub fn bumper_profile() -> SensorProfile {
    let mut profile = test_profile();
    profile.name = "bumper_sensor".to_string();
    profile.bumper = Some(BoundingBox::new(5.0, -15.0, 15.0, -5.0));
    profile
}

/// One scene line to be rendered by [`scene_line`].
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSpec {
    pub entity_id: String,
    pub date: u32,
    /// Negative for unknown
    pub cloud_cover: i32,
    /// Negative for unknown
    pub quality: i32,
    pub ul_x: f64,
    pub ul_y: f64,
    pub downloadable: bool,
}

impl SceneSpec {
    /// A clear, top-quality, downloadable scene.
    pub fn new(entity_id: impl Into<String>, date: u32) -> Self {
        Self {
            entity_id: entity_id.into(),
            date,
            cloud_cover: 0,
            quality: 9,
            ul_x: 0.0,
            ul_y: 0.0,
            downloadable: true,
        }
    }

    pub fn cloud(mut self, cloud_cover: i32) -> Self {
        self.cloud_cover = cloud_cover;
        self
    }

    pub fn quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }

    pub fn upper_left(mut self, x: f64, y: f64) -> Self {
        self.ul_x = x;
        self.ul_y = y;
        self
    }

    pub fn not_downloadable(mut self) -> Self {
        self.downloadable = false;
        self
    }
}

/// Render one scene line in the fixture layout.
pub fn scene_line(spec: &SceneSpec) -> String {
    format!(
        "{},{:.1},{:.1},{},{},{},0,0,100,0,100,100,0,100,{}",
        spec.date,
        spec.ul_x,
        spec.ul_y,
        spec.cloud_cover,
        spec.entity_id,
        spec.quality,
        if spec.downloadable { "Y" } else { "N" }
    )
}

/// Render a complete cell record with header and scene lines.
pub fn cell_record(coord: GridCoord, projection: i32, scenes: &[SceneSpec]) -> String {
    let mut text = format!(
        "{},{},{},1,1,{}\n",
        coord.col,
        coord.row,
        projection,
        scenes.len()
    );
    for spec in scenes {
        text.push_str(&scene_line(spec));
        text.push('\n');
    }
    text
}

/// Cell (10, 20) with three scenes where the June scene is the default.
///
/// Ratings are 282, 10 and 50.
pub fn default_pick_record() -> String {
    cell_record(
        GridCoord::new(10, 20),
        TEST_PROJECTION,
        &[
            SceneSpec::new("JAN", 20200101).cloud(80).quality(7),
            SceneSpec::new("JUN", 20200601).cloud(10).quality(9),
            SceneSpec::new("DEC", 20201201).cloud(50).quality(9),
        ],
    )
}
