//! Focus pixel and bad pixel repair.
//!
//! Both maps store sensor coordinates, so a map stays valid while the recorded window pans
//! across the sensor. Defective samples are replaced with the mean (MLVFS style) or the
//! median (raw2dng style) of their same-colour neighbours. Dual ISO frames interleave two
//! exposures by row, so only neighbours on the same row are usable there.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::image_pipeline::common::error::{RawProcError, Result};
use crate::image_pipeline::correction::defect_map::{MapStatus, PixelCoord, PixelMap};
use crate::image_pipeline::correction::frame::RawFrame;
use crate::image_pipeline::correction::kernels::{BadPixelParams, FocusPixelParams};
use crate::image_pipeline::correction::lut::EV_RESOLUTION;
use crate::image_pipeline::correction::modes::{BadPixelSearch, PixelInterpolation};
use crate::image_pipeline::kernels::median_i32;

const NEIGHBOURS: [(isize, isize); 8] = [(-2, -2), (0, -2), (2, -2), (-2, 0), (2, 0), (-2, 2), (0, 2), (2, 2)];
const ROW_NEIGHBOURS: [(isize, isize); 4] = [(-4, 0), (-2, 0), (2, 0), (4, 0)];

/// Deviation from the neighbour median, in stops, that marks a pixel as bad.
const BAD_PIXEL_STOPS: i32 = 2;
const AGGRESSIVE_BAD_PIXEL_STOPS: i32 = 1;
/// Smaller absolute deviations are noise, whatever their size in stops.
const MIN_BAD_PIXEL_DELTA: i32 = 32;

fn neighbour_offsets(row_only: bool) -> &'static [(isize, isize)] {
    if row_only { &ROW_NEIGHBOURS } else { &NEIGHBOURS }
}

/// File name of the focus pixel map for a camera and sensor readout size.
pub fn focus_map_file_name(camera_model: u32, raw_width: u32, raw_height: u32, crop_rec: bool) -> String {
    format!(
        "{:08x}_{}x{}{}.fpm",
        camera_model,
        raw_width,
        raw_height,
        if crop_rec { "_crop" } else { "" }
    )
}

/// Reads a focus pixel map: one `x y` sensor coordinate per line, `#` starts a comment.
pub fn load_focus_map(path: &Path) -> Result<Vec<PixelCoord>> {
    let text = fs::read_to_string(path)?;
    let mut pixels = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace().map(str::parse::<i32>);
        match (fields.next(), fields.next(), fields.next()) {
            (Some(Ok(x)), Some(Ok(y)), None) => pixels.push(PixelCoord { x, y }),
            _ => {
                return Err(RawProcError::DecodeError(format!(
                    "{}:{}: expected 'x y'",
                    path.display(),
                    number + 1
                )));
            }
        }
    }
    Ok(pixels)
}

/// Sensor coordinates that fall inside the frame, translated to frame coordinates.
fn to_frame_coords(pixels: &[PixelCoord], pan_x: u16, pan_y: u16, width: usize, height: usize) -> Vec<PixelCoord> {
    pixels
        .iter()
        .map(|p| PixelCoord { x: p.x - pan_x as i32, y: p.y - pan_y as i32 })
        .filter(|p| p.x >= 0 && p.y >= 0 && (p.x as usize) < width && (p.y as usize) < height)
        .collect()
}

fn estimate(values: &mut [i32], method: PixelInterpolation) -> Option<i32> {
    match method {
        PixelInterpolation::Mlvfs => {
            if values.is_empty() {
                return None;
            }
            Some(values.iter().sum::<i32>() / values.len() as i32)
        }
        PixelInterpolation::Raw2Dng => median_i32(values),
    }
}

/// Replaces the listed samples with an estimate from their healthy same-colour neighbours.
/// Samples within `tolerance` of the estimate are left alone. Returns how many changed.
fn interpolate(
    frame: &mut RawFrame<'_>,
    pixels: &[PixelCoord],
    method: PixelInterpolation,
    row_only: bool,
    tolerance: i32,
) -> usize {
    let defective: HashSet<(i32, i32)> = pixels.iter().map(|p| (p.x, p.y)).collect();
    let mut fixed = 0;
    let mut values = Vec::with_capacity(NEIGHBOURS.len());
    for p in pixels {
        values.clear();
        for &(dx, dy) in neighbour_offsets(row_only) {
            let (nx, ny) = (p.x as isize + dx, p.y as isize + dy);
            if defective.contains(&(nx as i32, ny as i32)) {
                continue;
            }
            if let Some(v) = frame.get(nx, ny) {
                values.push(v as i32);
            }
        }
        let Some(value) = estimate(&mut values, method) else {
            continue;
        };
        let current = frame.get(p.x as isize, p.y as isize).unwrap_or(0) as i32;
        if (current - value).abs() > tolerance {
            frame.set(p.x as usize, p.y as usize, value.clamp(0, u16::MAX as i32) as u16);
            fixed += 1;
        }
    }
    fixed
}

pub(crate) fn fix_focus_pixels(
    map_dir: Option<&Path>,
    map: &mut PixelMap,
    frame: &mut RawFrame<'_>,
    params: &FocusPixelParams<'_>,
) {
    if map.status() < MapStatus::Cached {
        map.promote(MapStatus::Computing);
        let file_name = focus_map_file_name(params.camera_model, params.raw_width, params.raw_height, params.crop_rec);
        let loaded = match map_dir {
            Some(dir) => {
                let path = dir.join(&file_name);
                match load_focus_map(&path) {
                    Ok(pixels) => pixels,
                    Err(e) => {
                        warn!(path = %path.display(), "No usable focus pixel map: {}", e);
                        Vec::new()
                    }
                }
            }
            None => {
                debug!(file_name = %file_name, "No focus pixel map directory configured");
                Vec::new()
            }
        };
        if loaded.is_empty() {
            map.promote(MapStatus::Stable);
            return;
        }
        info!(file_name = %file_name, pixels = loaded.len(), "Loaded focus pixel map");
        map.set_pixels(loaded);
        map.promote(MapStatus::Cached);
    }

    let pixels = to_frame_coords(map.pixels(), params.pan_x, params.pan_y, frame.width(), frame.height());
    let fixed = interpolate(frame, &pixels, params.method, params.dual_iso, params.restricted_lossless_bias);
    debug!(fixed, "Focus pixels interpolated");
}

/// Scans the frame for samples that stand out from their same-colour neighbours in the
/// exposure domain. Returns frame coordinates.
fn search_bad_pixels(frame: &RawFrame<'_>, params: &BadPixelParams<'_>) -> Vec<PixelCoord> {
    let (width, height) = (frame.width(), frame.height());
    let samples = frame.samples();
    let offsets = neighbour_offsets(params.dual_iso);
    let margin_x = offsets.iter().map(|&(dx, _)| dx.unsigned_abs()).max().unwrap_or(0);
    let margin_y = offsets.iter().map(|&(_, dy)| dy.unsigned_abs()).max().unwrap_or(0);
    if width <= 2 * margin_x || height <= 2 * margin_y {
        return Vec::new();
    }

    let stops = if params.aggressive { AGGRESSIVE_BAD_PIXEL_STOPS } else { BAD_PIXEL_STOPS };
    let threshold = stops * EV_RESOLUTION;
    let luts = params.luts;

    (margin_y..height - margin_y)
        .into_par_iter()
        .flat_map_iter(|y| {
            let mut values = Vec::with_capacity(offsets.len());
            (margin_x..width - margin_x).filter_map(move |x| {
                values.clear();
                values.extend(offsets.iter().map(|&(dx, dy)| {
                    samples[(y as isize + dy) as usize * width + (x as isize + dx) as usize] as i32
                }));
                let median = median_i32(&mut values)?;
                let sample = samples[y * width + x] as i32;
                let ev_delta = luts.raw2ev(sample as u16) - luts.raw2ev(median as u16);
                if ev_delta.abs() > threshold && (sample - median).abs() > MIN_BAD_PIXEL_DELTA {
                    Some(PixelCoord { x: x as i32, y: y as i32 })
                } else {
                    None
                }
            })
        })
        .collect()
}

pub(crate) fn fix_bad_pixels(map: &mut PixelMap, frame: &mut RawFrame<'_>, params: &BadPixelParams<'_>) {
    let rebuild = map.status() < MapStatus::Cached || params.search == BadPixelSearch::Force;
    if rebuild {
        map.promote(MapStatus::Computing);
        let found = search_bad_pixels(frame, params);
        debug!(found = found.len(), aggressive = params.aggressive, "Bad pixel search");
        let sensor: Vec<PixelCoord> = found
            .iter()
            .map(|p| PixelCoord { x: p.x + params.pan_x as i32, y: p.y + params.pan_y as i32 })
            .collect();
        let done = sensor.is_empty() && params.search == BadPixelSearch::Normal;
        map.set_pixels(sensor);
        if done {
            map.promote(MapStatus::Stable);
            return;
        }
        map.promote(MapStatus::Cached);
    }

    let pixels = to_frame_coords(map.pixels(), params.pan_x, params.pan_y, frame.width(), frame.height());
    let fixed = interpolate(frame, &pixels, params.method, params.dual_iso, 0);
    debug!(fixed, "Bad pixels interpolated");
}
