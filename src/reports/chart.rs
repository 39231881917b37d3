use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use plotters::prelude::*;

/// Bar fill matching the dashboard chart palette
const BAR_COLOR: RGBColor = RGBColor(54, 162, 235);
const GRID_COLOR: RGBColor = RGBColor(220, 220, 220);

/// Render the status distribution as a bar chart into a raw RGB buffer
///
/// The buffer is `width * height * 3` bytes, row major. Labels live in
/// the PDF text layer; this draws bars, baseline and gridlines only.
pub fn render_status_chart(
    counts: &BTreeMap<String, u64>,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    if counts.is_empty() {
        return Err(anyhow!("no status buckets to draw"));
    }

    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow!("fill: {e}"))?;

        let (left, right, top, bottom) = (40i32, 20i32, 20i32, 30i32);
        let plot_w = width as i32 - left - right;
        let plot_h = height as i32 - top - bottom;
        let baseline = height as i32 - bottom;
        let max = counts.values().copied().max().unwrap_or(1).max(1);

        // Light horizontal gridlines at quarter intervals
        for i in 1..=4 {
            let y = baseline - plot_h * i / 4;
            root.draw(&PathElement::new(
                vec![(left, y), (left + plot_w, y)],
                GRID_COLOR.stroke_width(1),
            ))
            .map_err(|e| anyhow!("gridline: {e}"))?;
        }

        let slot = plot_w / counts.len() as i32;
        for (i, count) in counts.values().enumerate() {
            let bar_w = slot * 3 / 5;
            let x0 = left + slot * i as i32 + (slot - bar_w) / 2;
            let bar_h = ((*count as f64 / max as f64) * plot_h as f64).round() as i32;
            root.draw(&Rectangle::new(
                [(x0, baseline - bar_h), (x0 + bar_w, baseline)],
                BAR_COLOR.filled(),
            ))
            .map_err(|e| anyhow!("bar: {e}"))?;
        }

        root.draw(&PathElement::new(
            vec![(left, baseline), (left + plot_w, baseline)],
            BLACK.stroke_width(1),
        ))
        .map_err(|e| anyhow!("baseline: {e}"))?;

        root.present().map_err(|e| anyhow!("present: {e}"))?;
    }
    Ok(buffer)
}
