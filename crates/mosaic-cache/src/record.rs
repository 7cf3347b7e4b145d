//! Parser for the line-oriented per-cell metadata record.
//!
//! ```text
//! gridCol,gridRow,projectionCode,hasLines,hasMetrics,numScenes
//! <scene record>          (numScenes lines, layout per sensor profile)
//! ```

use crate::cell::Cell;
use crate::profile::{RecordLayout, SensorProfile};
use crate::scene::{CornerOffsets, Scene};
use mosaic_common::{
    AcquisitionDate, GridCoord, MosaicError, MosaicResult, ProjectedPoint, ProjectionCode,
};

/// Parsed first line of a cell record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub coord: GridCoord,
    pub projection: ProjectionCode,
    pub has_lines: bool,
    pub has_metrics: bool,
    pub scene_count: usize,
}

/// Parse a complete cell record into a valid [`Cell`].
///
/// The header must name the `expected` coordinate and the number of scene
/// lines must match the header's count.
pub fn parse_cell_record(
    text: &str,
    expected: GridCoord,
    profile: &SensorProfile,
) -> MosaicResult<Cell> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let header_line = lines
        .next()
        .ok_or_else(|| MosaicError::invalid_record(expected, "empty record"))?;
    let header = parse_header(header_line, expected)?;

    let scene_lines: Vec<&str> = lines.collect();
    if scene_lines.len() != header.scene_count {
        return Err(MosaicError::invalid_record(
            expected,
            format!(
                "header declares {} scenes but record has {}",
                header.scene_count,
                scene_lines.len()
            ),
        ));
    }
    let scenes = scene_lines
        .into_iter()
        .map(|line| parse_scene_line(line, &header, profile))
        .collect::<MosaicResult<Vec<_>>>()?;

    Ok(Cell::loaded(
        header.coord,
        header.projection,
        scenes,
        header.has_lines,
        header.has_metrics,
    ))
}

/// Parse the `gridCol, gridRow, projectionCode, hasLines, hasMetrics, numScenes` line.
pub fn parse_header(line: &str, expected: GridCoord) -> MosaicResult<RecordHeader> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 6 {
        return Err(MosaicError::invalid_record(
            expected,
            format!("header has {} fields, expected 6", fields.len()),
        ));
    }

    let int = |idx: usize, name: &str| -> MosaicResult<i64> {
        fields[idx].parse::<i64>().map_err(|_| {
            MosaicError::invalid_record(expected, format!("bad {} '{}'", name, fields[idx]))
        })
    };

    let narrow = |idx: usize, name: &str| -> MosaicResult<i32> {
        let value = int(idx, name)?;
        i32::try_from(value).map_err(|_| {
            MosaicError::invalid_record(expected, format!("{} {} out of range", name, value))
        })
    };

    let coord = GridCoord::new(narrow(0, "grid column")?, narrow(1, "grid row")?);
    if coord != expected {
        return Err(MosaicError::invalid_record(
            expected,
            format!("record is for cell {}", coord),
        ));
    }
    let scene_count = usize::try_from(int(5, "scene count")?)
        .map_err(|_| MosaicError::invalid_record(expected, "negative scene count"))?;

    Ok(RecordHeader {
        coord,
        projection: ProjectionCode(narrow(2, "projection code")?),
        has_lines: int(3, "lines flag")? != 0,
        has_metrics: int(4, "metrics flag")? != 0,
        scene_count,
    })
}

/// Parse one scene line using the profile's record layout.
pub fn parse_scene_line(
    line: &str,
    header: &RecordHeader,
    profile: &SensorProfile,
) -> MosaicResult<Scene> {
    let layout = &profile.layout;
    let coord = header.coord;
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < layout.min_fields() {
        return Err(MosaicError::invalid_record(
            coord,
            format!(
                "scene record has {} fields, layout needs {}",
                fields.len(),
                layout.min_fields()
            ),
        ));
    }

    let float = |idx: usize, name: &str| -> MosaicResult<f64> {
        fields[idx].parse::<f64>().map_err(|_| {
            MosaicError::invalid_record(coord, format!("bad {} '{}'", name, fields[idx]))
        })
    };

    let entity_id = fields[layout.entity_id];
    if entity_id.is_empty() {
        return Err(MosaicError::invalid_record(coord, "empty entity identifier"));
    }

    let (cloud_cover, quality) = if header.has_metrics {
        (
            layout.cloud_cover.and_then(|i| parse_percent(fields[i])),
            if profile.has_quality {
                parse_quality(&fields, &layout.quality)
            } else {
                None
            },
        )
    } else {
        (None, None)
    };

    let corners = match layout.corners {
        Some(start) if header.has_lines => parse_corners(&fields[start..start + 8], coord)?,
        _ => CornerOffsets::default(),
    };

    Ok(Scene {
        coord,
        sensor_id: layout
            .sensor_id
            .map(|i| fields[i])
            .filter(|s| !s.is_empty())
            .unwrap_or(profile.sensor_id.as_str())
            .to_string(),
        date: parse_date(&fields, layout, coord)?,
        cloud_cover,
        quality,
        entity_id: entity_id.to_string(),
        data_version: layout
            .data_version
            .map(|i| fields[i])
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        upper_left: ProjectedPoint::new(
            float(layout.ul_x, "upper-left X")?,
            float(layout.ul_y, "upper-left Y")?,
        ),
        corners,
        offset_resolution: layout.offset_resolution,
        downloadable: layout
            .downloadable
            .map(|i| matches!(fields[i], "Y" | "y" | "1" | "true" | "TRUE"))
            .unwrap_or(true),
        visible: true,
        loaded_resolution: None,
    })
}

fn parse_date(fields: &[&str], layout: &RecordLayout, coord: GridCoord) -> MosaicResult<AcquisitionDate> {
    let raw = fields[layout.date];
    let bad = |msg: String| MosaicError::invalid_record(coord, msg);

    match layout.julian_day {
        Some(jd_idx) => {
            let doy: u32 = fields[jd_idx]
                .parse()
                .map_err(|_| bad(format!("bad julian day '{}'", fields[jd_idx])))?;
            if raw.len() == 4 {
                let year: i32 = raw.parse().map_err(|_| bad(format!("bad year '{}'", raw)))?;
                return AcquisitionDate::from_year_doy(year, doy).map_err(|e| bad(e.to_string()));
            }
            let date = AcquisitionDate::parse(raw).map_err(|e| bad(e.to_string()))?;
            if date.day_of_year != doy {
                return Err(bad(format!(
                    "julian day {} disagrees with date {}",
                    doy, date
                )));
            }
            Ok(date)
        }
        None => AcquisitionDate::parse(raw).map_err(|e| bad(e.to_string())),
    }
}

/// Cloud cover outside 0-100 (commonly -1) means unknown.
fn parse_percent(raw: &str) -> Option<u8> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| (0.0..=100.0).contains(v))
        .map(|v| v.round() as u8)
}

/// Lowest known quality value across the quality fields.
fn parse_quality(fields: &[&str], indices: &[usize]) -> Option<u8> {
    indices
        .iter()
        .filter_map(|&i| fields[i].parse::<i32>().ok())
        .filter(|q| (0..=9).contains(q))
        .map(|q| q as u8)
        .min()
}

fn parse_corners(fields: &[&str], coord: GridCoord) -> MosaicResult<CornerOffsets> {
    let mut corners = CornerOffsets::default();
    for i in 0..4 {
        let parse = |raw: &str| {
            raw.parse::<i32>().map_err(|_| {
                MosaicError::invalid_record(coord, format!("bad corner offset '{}'", raw))
            })
        };
        corners.samples[i] = parse(fields[2 * i])?;
        corners.lines[i] = parse(fields[2 * i + 1])?;
    }
    Ok(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_common::RegularGrid;

    fn profile() -> SensorProfile {
        SensorProfile {
            name: "test".to_string(),
            sensor_id: "TM".to_string(),
            layout: RecordLayout {
                date: 0,
                julian_day: None,
                ul_x: 1,
                ul_y: 2,
                cloud_cover: Some(3),
                entity_id: 4,
                quality: vec![5, 6],
                corners: Some(7),
                offset_resolution: 30.0,
                data_version: None,
                downloadable: None,
                sensor_id: None,
            },
            resolutions: vec![crate::profile::Resolution {
                pixel_size: 1000.0,
                single_cell: false,
            }],
            full_mosaic: false,
            swath_mode: false,
            default_uses_cloud_cover: true,
            has_quality: true,
            navigation: RegularGrid::one_degree_global(),
            bumper: None,
            default_projection: ProjectionCode(1),
        }
    }

    const RECORD: &str = "10,20,3,1,1,2\n\
        20200601,1000,5000,10,E1,9,7,0,0,100,0,100,100,0,100\n\
        20200101,1000,5000,-1,E2,9,9,0,0,100,0,100,100,0,100\n";

    #[test]
    fn test_parse_record() {
        let cell = parse_cell_record(RECORD, GridCoord::new(10, 20), &profile()).unwrap();
        assert!(cell.valid);
        assert_eq!(cell.projection, Some(ProjectionCode(3)));
        assert_eq!(cell.len(), 2);
        // Sorted oldest first
        assert_eq!(cell.scenes()[0].entity_id, "E2");
        assert_eq!(cell.scenes()[0].cloud_cover, None);
        assert_eq!(cell.scenes()[1].quality, Some(7));
        assert_eq!(cell.scenes()[1].cloud_cover, Some(10));
        assert_eq!(cell.max_footprint, 3000.0);
    }

    #[test]
    fn test_header_scene_count_mismatch() {
        let text = "10,20,3,1,1,3\n20200601,1000,5000,10,E1,9,7,0,0,100,0,100,100,0,100\n";
        let err = parse_cell_record(text, GridCoord::new(10, 20), &profile()).unwrap_err();
        assert!(err.is_cell_scoped());
    }

    #[test]
    fn test_header_wrong_cell() {
        let err = parse_cell_record("11,20,3,1,1,0\n", GridCoord::new(10, 20), &profile());
        assert!(err.is_err());
    }

    #[test]
    fn test_oversized_scene_count_is_rejected() {
        let text = "10,20,3,1,1,9000000000000000000\n";
        let err = parse_cell_record(text, GridCoord::new(10, 20), &profile()).unwrap_err();
        assert!(err.is_cell_scoped());
        assert!(err.to_string().contains("header declares 9000000000000000000 scenes"));
    }

    #[test]
    fn test_negative_scene_count_is_rejected() {
        let err = parse_header("10,20,3,1,1,-1", GridCoord::new(10, 20)).unwrap_err();
        assert!(err.to_string().contains("negative scene count"));
    }

    #[test]
    fn test_header_column_out_of_range_is_rejected() {
        // 4294967306 would wrap to 10 if narrowed unchecked
        let err = parse_header("4294967306,20,3,1,1,0", GridCoord::new(10, 20)).unwrap_err();
        assert!(err.is_cell_scoped());
        assert!(err.to_string().contains("out of range"));
        assert!(parse_header("10,20,99999999999,1,1,0", GridCoord::new(10, 20)).is_err());
    }

    #[test]
    fn test_metrics_flag_off_hides_cloud_and_quality() {
        let text = "10,20,3,0,0,1\n20200601,1000,5000,10,E1,9,7,0,0,100,0,100,100,0,100\n";
        let cell = parse_cell_record(text, GridCoord::new(10, 20), &profile()).unwrap();
        let scene = &cell.scenes()[0];
        assert_eq!(scene.cloud_cover, None);
        assert_eq!(scene.quality, None);
        assert_eq!(scene.corners, CornerOffsets::default());
    }

    #[test]
    fn test_julian_day_with_bare_year() {
        let mut profile = profile();
        profile.layout.julian_day = Some(15);
        let text = "10,20,3,1,1,1\n2020,1000,5000,10,E1,9,7,0,0,100,0,100,100,0,100,153\n";
        let cell = parse_cell_record(text, GridCoord::new(10, 20), &profile).unwrap();
        assert_eq!(cell.scenes()[0].date.yyyymmdd, 20200601);
    }

    #[test]
    fn test_empty_cell_is_valid() {
        let cell = parse_cell_record("10,20,3,1,1,0\n", GridCoord::new(10, 20), &profile()).unwrap();
        assert!(cell.valid);
        assert!(cell.is_empty());
        assert_eq!(cell.extent, None);
    }
}
