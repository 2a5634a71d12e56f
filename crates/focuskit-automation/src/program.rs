//! Raster program generation for height scans.

use focuskit_core::HeightSurface;
use focuskit_settings::ScanSettings;

/// Build the scan program for `surface`
///
/// Visits the cells in capture order and pauses (`M25`) at each one so the
/// player can report the sample. The surface must be freshly allocated by
/// [`HeightSurface::create_zero_surface`].
pub fn generate_scan_program(surface: &HeightSurface, settings: &ScanSettings) -> String {
    let mut gcode = String::new();

    gcode.push_str("; FocusKit height scan\n");
    gcode.push_str(&format!(
        "; Grid: {} rows x {} cols, {} samples\n",
        surface.rows(),
        surface.cols(),
        surface.len()
    ));
    gcode.push_str("G90\n");
    gcode.push_str(&format!("M204 S{}\n", settings.acceleration));
    gcode.push_str(&format!("G0 F{}\n", settings.feed_rate));

    for point in surface.points() {
        gcode.push_str(&format!("G0 X{:.3} Y{:.3}\n", point.x, point.y));
        gcode.push_str("M25\n");
    }

    gcode.push_str("; End of height scan\n");
    gcode
}

/// Number of pause markers in a scan program
pub fn count_pauses(program: &str) -> usize {
    program.lines().filter(|line| line.trim() == "M25").count()
}
